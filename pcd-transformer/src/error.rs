use coordinate_transformer::GeoTransformError;
use dem_raster::RasterError;
use pcd_core::pointcloud::point::QuantizationError;
use pcd_exporter::ExportError;
use pcd_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("DEM geotransform cannot be used")]
    GeoTransform(#[from] GeoTransformError),
    #[error("DEM access failed")]
    Raster(#[from] RasterError),
    #[error("reading the input point cloud failed")]
    Parse(#[from] ParseError),
    #[error("writing the output point cloud failed")]
    Export(#[from] ExportError),
    #[error("normalized elevation cannot be stored")]
    Quantization(#[from] QuantizationError),
    #[error("point at ({x}, {y}) lies outside the DEM")]
    OutOfBounds { x: f64, y: f64 },
    #[error("DEM has no data at cell ({pixel}, {line})")]
    NoData { pixel: usize, line: usize },
    #[error("normalization was cancelled after {points_read} points")]
    Cancelled { points_read: u64 },
}
