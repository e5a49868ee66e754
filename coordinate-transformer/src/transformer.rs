use crate::error::GeoTransformError;

// Tolerance on |det| relative to the product of the pixel and line axis lengths.
const SINGULAR_EPSILON: f64 = 1e-10;

/// Affine map from raster cell indices to ground coordinates.
///
/// ```text
/// x = c0 + pixel * c1 + line * c2
/// y = c3 + pixel * c4 + line * c5
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

/// Affine map from ground coordinates to fractional cell indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseGeoTransform(pub [f64; 6]);

/// Integer cell obtained by flooring fractional cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub pixel: i64,
    pub line: i64,
}

impl GeoTransform {
    pub fn new(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }

    /// North-up raster with the given upper left corner and cell size.
    pub fn north_up(origin_x: f64, origin_y: f64, cell_width: f64, cell_height: f64) -> Self {
        Self([origin_x, cell_width, 0.0, origin_y, 0.0, -cell_height])
    }

    pub fn coefficients(&self) -> &[f64; 6] {
        &self.0
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.0[0], self.0[3])
    }

    pub fn pixel_size(&self) -> (f64, f64) {
        (self.0[1], self.0[5])
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    pub fn determinant(&self) -> f64 {
        self.0[1] * self.0[5] - self.0[2] * self.0[4]
    }

    pub fn apply(&self, pixel: f64, line: f64) -> (f64, f64) {
        let c = &self.0;
        (
            c[0] + pixel * c[1] + line * c[2],
            c[3] + pixel * c[4] + line * c[5],
        )
    }

    pub fn invert(&self) -> Result<InverseGeoTransform, GeoTransformError> {
        invert(self)
    }
}

impl InverseGeoTransform {
    pub fn coefficients(&self) -> &[f64; 6] {
        &self.0
    }

    /// Fractional `(pixel, line)` of a ground coordinate.
    pub fn to_cell(&self, x: f64, y: f64) -> (f64, f64) {
        let c = &self.0;
        (c[0] + c[1] * x + c[2] * y, c[3] + c[4] * x + c[5] * y)
    }

    /// Cell containing a ground coordinate, without any bounds check.
    ///
    /// Returns `None` when the fractional coordinates are not finite or do not fit in `i64`.
    pub fn cell(&self, x: f64, y: f64) -> Option<CellIndex> {
        let (pixel, line) = self.to_cell(x, y);
        Some(CellIndex {
            pixel: floor_to_i64(pixel)?,
            line: floor_to_i64(line)?,
        })
    }
}

impl CellIndex {
    /// Unsigned `(pixel, line)` when the cell lies in `[0, width) x [0, height)`.
    pub fn within(&self, width: usize, height: usize) -> Option<(usize, usize)> {
        let pixel = usize::try_from(self.pixel).ok()?;
        let line = usize::try_from(self.line).ok()?;
        (pixel < width && line < height).then_some((pixel, line))
    }
}

fn floor_to_i64(value: f64) -> Option<i64> {
    let floored = value.floor();
    if !floored.is_finite() || floored < i64::MIN as f64 || floored >= i64::MAX as f64 {
        return None;
    }
    Some(floored as i64)
}

/// Inverts the affine map.
///
/// Fails when the pixel and line axes are parallel, i.e. when `|det|` is
/// negligible against the product of the axis lengths. Axes of very
/// different lengths are fine.
pub fn invert(transform: &GeoTransform) -> Result<InverseGeoTransform, GeoTransformError> {
    let c = &transform.0;
    if c.iter().any(|v| !v.is_finite()) {
        return Err(GeoTransformError::NonFinite { coefficients: *c });
    }

    let determinant = transform.determinant();
    let pixel_axis = c[1].hypot(c[4]);
    let line_axis = c[2].hypot(c[5]);
    if determinant == 0.0 || determinant.abs() <= SINGULAR_EPSILON * pixel_axis * line_axis {
        return Err(GeoTransformError::Singular { determinant });
    }

    if transform.is_axis_aligned() {
        return Ok(InverseGeoTransform([
            -c[0] / c[1],
            1.0 / c[1],
            0.0,
            -c[3] / c[5],
            0.0,
            1.0 / c[5],
        ]));
    }

    let inv_det = 1.0 / determinant;
    Ok(InverseGeoTransform([
        (c[2] * c[3] - c[0] * c[5]) * inv_det,
        c[5] * inv_det,
        -c[2] * inv_det,
        (-c[1] * c[3] + c[0] * c[4]) * inv_det,
        -c[4] * inv_det,
        c[1] * inv_det,
    ]))
}

pub fn to_cell(inverse: &InverseGeoTransform, x: f64, y: f64) -> (f64, f64) {
    inverse.to_cell(x, y)
}
