use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointAttributes {
    pub intensity: u16,
    pub return_number: u8,
    pub number_of_returns: u8,
    /// `true` when the scanner mirror was travelling left to right.
    pub scan_direction_left_to_right: bool,
    pub is_edge_of_flight_line: bool,
    pub classification: u8,
    pub is_synthetic: bool,
    pub is_key_point: bool,
    pub is_withheld: bool,
    pub is_overlap: bool,
    pub scanner_channel: u8,
    pub scan_angle: f32,
    pub user_data: u8,
    pub point_source_id: u16,
    pub gps_time: Option<f64>,
    pub nir: Option<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

// LAS data coordinates are stored as scaled i32 values
// The actual coordinates are calculated based on a combination of scale and offset, as follows
// x = (X * scale[0]) + offset[0]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub color: Option<Color>,
    pub attributes: PointAttributes,
}

impl Point {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self {
            x,
            y,
            z,
            ..Default::default()
        }
    }

    pub fn stored(&self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum QuantizationError {
    #[error("value {value} on axis {axis} cannot be stored with scale {scale} and offset {offset}")]
    OutOfRange {
        axis: usize,
        value: f64,
        scale: f64,
        offset: f64,
    },
}

/// Per-axis scale and offset converting stored integers to ground units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantization {
    pub scale: [f64; 3],
    pub offset: [f64; 3],
}

impl Default for Quantization {
    fn default() -> Self {
        Self {
            scale: [0.01; 3],
            offset: [0.0; 3],
        }
    }
}

impl Quantization {
    pub fn new(scale: [f64; 3], offset: [f64; 3]) -> Self {
        Self { scale, offset }
    }

    pub fn to_ground(&self, point: &Point) -> [f64; 3] {
        let stored = point.stored();
        [
            self.axis_to_ground(0, stored[0]),
            self.axis_to_ground(1, stored[1]),
            self.axis_to_ground(2, stored[2]),
        ]
    }

    pub fn axis_to_ground(&self, axis: usize, stored: i32) -> f64 {
        f64::from(stored) * self.scale[axis] + self.offset[axis]
    }

    /// Rounds `(value - offset) / scale` to the nearest storable integer.
    pub fn to_stored(&self, axis: usize, value: f64) -> Result<i32, QuantizationError> {
        let stored = ((value - self.offset[axis]) / self.scale[axis]).round();
        if !stored.is_finite() || stored > f64::from(i32::MAX) || stored < f64::from(i32::MIN) {
            return Err(QuantizationError::OutOfRange {
                axis,
                value,
                scale: self.scale[axis],
                offset: self.offset[axis],
            });
        }
        Ok(stored as i32)
    }
}
