use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create point cloud {path:?}")]
    Create {
        path: PathBuf,
        #[source]
        source: las::Error,
    },
    #[error("failed to write point #{index}")]
    Write {
        index: u64,
        #[source]
        source: las::Error,
    },
    #[error("failed to finalize point cloud")]
    Finalize(#[source] las::Error),
    #[error("point cloud writer is already closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] io::Error),
}
