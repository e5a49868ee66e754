use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("cannot open raster {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported raster format: {0:?}")]
    UnsupportedFormat(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("TIFF decoding error")]
    Tiff(#[from] tiff::TiffError),
    #[error("raster has no georeferencing: {0}")]
    MissingGeoTransform(String),
    #[error("band {index} requested but raster has {count} band(s)")]
    BandOutOfRange { index: usize, count: usize },
    #[error("cell ({pixel}, {line}) is outside the {width} x {height} raster")]
    CellOutOfRange {
        pixel: usize,
        line: usize,
        width: usize,
        height: usize,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("unsupported raster layout: {0}")]
    Unsupported(String),
}
