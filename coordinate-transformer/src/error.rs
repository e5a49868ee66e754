use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeoTransformError {
    #[error("geotransform is singular (determinant {determinant}) and cannot be inverted")]
    Singular { determinant: f64 },
    #[error("geotransform has non-finite coefficients: {coefficients:?}")]
    NonFinite { coefficients: [f64; 6] },
}
