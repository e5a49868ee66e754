use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use coordinate_transformer::GeoTransform;

use crate::{error::RasterError, memory::MemoryRaster, source::RasterSource};

#[derive(Debug, Default)]
struct AsciiGridHeader {
    columns: Option<usize>,
    rows: Option<usize>,
    xllcorner: Option<f64>,
    yllcorner: Option<f64>,
    xllcenter: Option<f64>,
    yllcenter: Option<f64>,
    cell_size: Option<f64>,
    nodata: Option<f64>,
}

impl AsciiGridHeader {
    fn geo_transform(&self, rows: usize) -> Result<GeoTransform, RasterError> {
        let cell_size = self
            .cell_size
            .ok_or_else(|| RasterError::MissingGeoTransform("cellsize is missing".to_string()))?;
        let (west, south) = match (self.xllcorner, self.yllcorner, self.xllcenter, self.yllcenter)
        {
            (Some(x), Some(y), _, _) => (x, y),
            (_, _, Some(x), Some(y)) => (x - 0.5 * cell_size, y - 0.5 * cell_size),
            _ => {
                return Err(RasterError::MissingGeoTransform(
                    "lower left corner or center is missing".to_string(),
                ))
            }
        };
        let north = south + rows as f64 * cell_size;
        Ok(GeoTransform::north_up(west, north, cell_size, cell_size))
    }
}

fn parse_value<T: std::str::FromStr>(value: &str, line: usize) -> Result<T, RasterError> {
    value.trim().parse::<T>().map_err(|_| RasterError::Parse {
        line,
        message: format!("cannot parse '{}'", value.trim()),
    })
}

/// Reads an ESRI ASCII grid into memory as a single band raster.
pub fn read_ascii_grid(path: &Path) -> Result<MemoryRaster, RasterError> {
    let file = File::open(path).map_err(|source| RasterError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut header = AsciiGridHeader::default();
    let mut data: Vec<f64> = Vec::new();
    let mut in_data = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        let mut fields = line.split_whitespace();
        let Some(first) = fields.next() else {
            continue;
        };

        // Header keys only precede the first data row, which may hold "nan".
        if !in_data && first.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            let value = fields.next().ok_or_else(|| RasterError::Parse {
                line: line_number,
                message: format!("header key '{}' has no value", first),
            })?;
            match first.to_ascii_lowercase().as_str() {
                "ncols" => header.columns = Some(parse_value(value, line_number)?),
                "nrows" => header.rows = Some(parse_value(value, line_number)?),
                "xllcorner" => header.xllcorner = Some(parse_value(value, line_number)?),
                "yllcorner" => header.yllcorner = Some(parse_value(value, line_number)?),
                "xllcenter" => header.xllcenter = Some(parse_value(value, line_number)?),
                "yllcenter" => header.yllcenter = Some(parse_value(value, line_number)?),
                "cellsize" => header.cell_size = Some(parse_value(value, line_number)?),
                "nodata_value" => header.nodata = Some(parse_value(value, line_number)?),
                other => {
                    return Err(RasterError::Parse {
                        line: line_number,
                        message: format!("unknown header key '{}'", other),
                    })
                }
            }
            continue;
        }

        in_data = true;
        data.push(parse_value(first, line_number)?);
        for value in fields {
            data.push(parse_value(value, line_number)?);
        }
    }

    let (Some(columns), Some(rows)) = (header.columns, header.rows) else {
        return Err(RasterError::Parse {
            line: 0,
            message: "ncols and nrows are required".to_string(),
        });
    };
    if data.len() != columns * rows {
        return Err(RasterError::Parse {
            line: 0,
            message: format!(
                "expected {} values for {} x {} grid, found {}",
                columns * rows,
                columns,
                rows,
                data.len()
            ),
        });
    }

    let geo_transform = header.geo_transform(rows)?;
    let mut raster = MemoryRaster::new(columns, rows, Some(geo_transform)).with_band(data)?;
    raster.set_nodata(1, header.nodata)?;
    log::debug!(
        "read ASCII grid {:?}: {} x {}, nodata {:?}",
        path,
        raster.width(),
        raster.height(),
        header.nodata
    );
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_grid(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".asc").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_corner_registered_grid() {
        let file = write_grid(
            "ncols 3\nnrows 2\nxllcorner 100.0\nyllcorner 200.0\ncellsize 2.0\nNODATA_value -9999\n\
             1 2 3\n4 5 -9999\n",
        );
        let mut raster = read_ascii_grid(file.path()).unwrap();

        assert_eq!(raster.width(), 3);
        assert_eq!(raster.height(), 2);
        assert_eq!(
            raster.geo_transform().unwrap(),
            GeoTransform::new([100.0, 2.0, 0.0, 204.0, 0.0, -2.0])
        );
        assert_eq!(raster.read_cell(1, 2, 0).unwrap(), 3.0);
        assert_eq!(raster.read_cell(1, 0, 1).unwrap(), 4.0);

        let band = raster.band(1).unwrap();
        assert!(band.is_nodata(raster.read_cell(1, 2, 1).unwrap()));
    }

    #[test]
    fn center_registration_shifts_half_a_cell() {
        let file = write_grid(
            "ncols 1\nnrows 1\nxllcenter 10.5\nyllcenter 20.5\ncellsize 1\n7\n",
        );
        let raster = read_ascii_grid(file.path()).unwrap();
        assert_eq!(
            raster.geo_transform().unwrap(),
            GeoTransform::new([10.0, 1.0, 0.0, 21.0, 0.0, -1.0])
        );
    }

    #[test]
    fn nan_rows_are_data_not_header_keys() {
        let file = write_grid(
            "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nnan 1\nNaN inf\n",
        );
        let mut raster = read_ascii_grid(file.path()).unwrap();
        assert!(raster.read_cell(1, 0, 0).unwrap().is_nan());
        assert_eq!(raster.read_cell(1, 1, 0).unwrap(), 1.0);
        assert!(raster.read_cell(1, 0, 1).unwrap().is_nan());
        assert_eq!(raster.read_cell(1, 1, 1).unwrap(), f64::INFINITY);
    }

    #[test]
    fn short_grid_is_an_error() {
        let file = write_grid("ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n");
        assert!(matches!(
            read_ascii_grid(file.path()),
            Err(RasterError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        assert!(matches!(
            read_ascii_grid(Path::new("/nonexistent/dem.asc")),
            Err(RasterError::Open { .. })
        ));
    }
}
