mod error;
mod transformer;

pub use error::GeoTransformError;
pub use transformer::{invert, to_cell, CellIndex, GeoTransform, InverseGeoTransform};
