use std::{error::Error, io, path::PathBuf};

use dem_raster::RasterError;
use pcd_exporter::ExportError;
use pcd_parser::ParseError;
use pcd_transformer::NormalizeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Config(String),
    #[error("cannot open DEM")]
    Raster(#[from] RasterError),
    #[error("cannot open input point cloud")]
    Parse(#[from] ParseError),
    #[error("cannot create output point cloud")]
    Export(#[from] ExportError),
    #[error("normalization failed")]
    Normalize(#[from] NormalizeError),
    #[error("cannot write report {path:?}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot serialize report")]
    Json(#[from] serde_json::Error),
}

/// Joins an error and all of its sources with `": "`.
pub fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
