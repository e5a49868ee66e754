use serde::Serialize;

use super::{
    metadata::BoundingVolume,
    point::{Point, Quantization},
};

pub const MAX_RETURN_NUMBER: usize = 15;

/// Running statistics of the points handed to an output stream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    pub point_count: u64,
    pub points_by_return: [u64; MAX_RETURN_NUMBER],
    pub bounding_volume: BoundingVolume,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, point: &Point, quantization: &Quantization) {
        self.point_count += 1;
        let return_number = point.attributes.return_number as usize;
        if (1..=MAX_RETURN_NUMBER).contains(&return_number) {
            self.points_by_return[return_number - 1] += 1;
        }
        self.bounding_volume.extend(quantization.to_ground(point));
    }
}
