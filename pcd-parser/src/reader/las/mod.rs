use std::path::{Path, PathBuf};

use las::{point::ScanDirection, Reader};
use pcd_core::pointcloud::{
    metadata::{BoundingVolume, Metadata},
    point::{Color, Point, PointAttributes, Quantization},
};

use super::PointReader;
use crate::error::ParseError;

pub struct LasPointReader {
    path: PathBuf,
    reader: Option<Reader>,
    header: las::Header,
    metadata: Metadata,
    points_read: u64,
}

impl LasPointReader {
    pub fn open(path: &Path) -> Result<Self, ParseError> {
        let reader = Reader::from_path(path).map_err(|source| ParseError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let header = reader.header().clone();
        let metadata = metadata_from_header(&header);
        log::debug!(
            "opened {:?}: LAS {} with {} points",
            path,
            metadata.version,
            metadata.point_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(reader),
            header,
            metadata,
            points_read: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header of the input file, used as the template for the output file.
    pub fn header(&self) -> &las::Header {
        &self.header
    }

    pub fn points_read(&self) -> u64 {
        self.points_read
    }

    fn convert_las_point(
        las_point: las::Point,
        quantization: &Quantization,
        index: u64,
    ) -> Result<Point, ParseError> {
        let store = |axis: usize, value: f64| {
            quantization
                .to_stored(axis, value)
                .map_err(|source| ParseError::Quantization { index, source })
        };

        let color = las_point.color.map(|c| Color {
            r: c.red,
            g: c.green,
            b: c.blue,
        });

        let attributes = PointAttributes {
            intensity: las_point.intensity,
            return_number: las_point.return_number,
            number_of_returns: las_point.number_of_returns,
            scan_direction_left_to_right: las_point.scan_direction == ScanDirection::LeftToRight,
            is_edge_of_flight_line: las_point.is_edge_of_flight_line,
            classification: u8::from(las_point.classification),
            is_synthetic: las_point.is_synthetic,
            is_key_point: las_point.is_key_point,
            is_withheld: las_point.is_withheld,
            is_overlap: las_point.is_overlap,
            scanner_channel: las_point.scanner_channel,
            scan_angle: las_point.scan_angle,
            user_data: las_point.user_data,
            point_source_id: las_point.point_source_id,
            gps_time: las_point.gps_time,
            nir: las_point.nir,
        };

        Ok(Point {
            x: store(0, las_point.x)?,
            y: store(1, las_point.y)?,
            z: store(2, las_point.z)?,
            color,
            attributes,
        })
    }
}

pub fn metadata_from_header(header: &las::Header) -> Metadata {
    let transforms = header.transforms();
    let bounds = header.bounds();
    Metadata {
        point_count: header.number_of_points(),
        bounding_volume: BoundingVolume {
            min: [bounds.min.x, bounds.min.y, bounds.min.z],
            max: [bounds.max.x, bounds.max.y, bounds.max.z],
        },
        quantization: Quantization::new(
            [
                transforms.x.scale,
                transforms.y.scale,
                transforms.z.scale,
            ],
            [
                transforms.x.offset,
                transforms.y.offset,
                transforms.z.offset,
            ],
        ),
        version: header.version().to_string(),
        system_identifier: header.system_identifier().to_string(),
        generating_software: header.generating_software().to_string(),
    }
}

impl PointReader for LasPointReader {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn next_point(&mut self) -> Result<Option<Point>, ParseError> {
        let reader = self.reader.as_mut().ok_or(ParseError::Closed)?;
        match reader.points().next() {
            Some(Ok(las_point)) => {
                let index = self.points_read;
                let point =
                    Self::convert_las_point(las_point, &self.metadata.quantization, index)?;
                self.points_read += 1;
                Ok(Some(point))
            }
            Some(Err(source)) => Err(ParseError::Read {
                index: self.points_read,
                source,
            }),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> Result<u64, ParseError> {
        self.reader = None;
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

#[cfg(test)]
mod tests {
    use las::{point::Classification, Builder, Transform, Vector, Writer};

    use super::*;

    fn write_sample(path: &Path) {
        let mut builder = Builder::from((1, 2));
        builder.point_format = las::point::Format::new(1).unwrap();
        builder.transforms = Vector {
            x: Transform {
                scale: 0.01,
                offset: 0.0,
            },
            y: Transform {
                scale: 0.01,
                offset: 0.0,
            },
            z: Transform {
                scale: 0.01,
                offset: 0.0,
            },
        };
        let header = builder.into_header().unwrap();
        let mut writer = Writer::from_path(path, header).unwrap();
        for (x, y, z) in [(0.5, 2.5, 150.0), (1.5, 1.5, 200.25)] {
            writer
                .write_point(las::Point {
                    x,
                    y,
                    z,
                    intensity: 42,
                    return_number: 1,
                    number_of_returns: 2,
                    classification: Classification::Ground,
                    gps_time: Some(12.5),
                    ..Default::default()
                })
                .unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn streams_points_in_stored_units() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.las");
        write_sample(&path);

        let mut reader = LasPointReader::open(&path).unwrap();
        let metadata = reader.metadata().clone();
        assert_eq!(metadata.point_count, 2);
        assert_eq!(metadata.quantization.scale, [0.01; 3]);
        assert_eq!(metadata.version, "1.2");

        let first = reader.next_point().unwrap().unwrap();
        assert_eq!(first.stored(), [50, 250, 15000]);
        assert_eq!(first.attributes.intensity, 42);
        assert_eq!(first.attributes.classification, 2);
        assert_eq!(first.attributes.number_of_returns, 2);
        assert_eq!(first.attributes.gps_time, Some(12.5));

        let second = reader.next_point().unwrap().unwrap();
        assert_eq!(second.stored(), [150, 150, 20025]);
        assert!(reader.next_point().unwrap().is_none());
        assert_eq!(reader.points_read(), 2);

        assert!(reader.close().unwrap() > 0);
        assert!(matches!(reader.next_point(), Err(ParseError::Closed)));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        assert!(matches!(
            LasPointReader::open(Path::new("/nonexistent/input.las")),
            Err(ParseError::Open { .. })
        ));
    }
}
