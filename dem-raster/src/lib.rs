pub mod arcascii;
pub mod error;
pub mod geotiff;
pub mod memory;
pub mod source;

use std::{ffi::OsStr, path::Path};

pub use arcascii::read_ascii_grid;
pub use error::RasterError;
pub use geotiff::GeoTiffRaster;
pub use memory::MemoryRaster;
pub use source::{BandInfo, RasterSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    GeoTiff,
    AsciiGrid,
}

pub fn get_format(path: &Path) -> Result<RasterFormat, RasterError> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("tif") | Some("tiff") => Ok(RasterFormat::GeoTiff),
        Some("asc") => Ok(RasterFormat::AsciiGrid),
        _ => Err(RasterError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Opens a DEM read-only, choosing the reader from the file extension.
pub fn open_raster(path: &Path) -> Result<Box<dyn RasterSource>, RasterError> {
    let raster: Box<dyn RasterSource> = match get_format(path)? {
        RasterFormat::GeoTiff => Box::new(GeoTiffRaster::open(path)?),
        RasterFormat::AsciiGrid => Box::new(read_ascii_grid(path)?),
    };
    log::debug!(
        "opened DEM {:?}: {} x {} pixels, {} band(s)",
        path,
        raster.width(),
        raster.height(),
        raster.band_count()
    );
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            get_format(Path::new("dem.TIF")).unwrap(),
            RasterFormat::GeoTiff
        );
        assert_eq!(
            get_format(Path::new("dem.tiff")).unwrap(),
            RasterFormat::GeoTiff
        );
        assert_eq!(
            get_format(Path::new("dem.asc")).unwrap(),
            RasterFormat::AsciiGrid
        );
        assert!(matches!(
            get_format(Path::new("dem.img")),
            Err(RasterError::UnsupportedFormat(_))
        ));
    }
}
