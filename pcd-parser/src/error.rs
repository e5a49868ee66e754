use std::path::PathBuf;

use pcd_core::pointcloud::point::QuantizationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot open point cloud {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: las::Error,
    },
    #[error("failed to read point {index}")]
    Read {
        index: u64,
        #[source]
        source: las::Error,
    },
    #[error("point {index} cannot be stored with the header scale")]
    Quantization {
        index: u64,
        #[source]
        source: QuantizationError,
    },
    #[error("point cloud reader is already closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
