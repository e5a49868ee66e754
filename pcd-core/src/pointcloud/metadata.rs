use serde::Serialize;

use super::point::Quantization;

// This represents the maximum and minimum values of the ground coordinates obtained by combining the scale and offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingVolume {
    pub fn empty() -> Self {
        Self {
            min: [f64::MAX, f64::MAX, f64::MAX],
            max: [f64::MIN, f64::MIN, f64::MIN],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0]
    }

    pub fn extend(&mut self, xyz: [f64; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(xyz[axis]);
            self.max[axis] = self.max[axis].max(xyz[axis]);
        }
    }
}

/// Header of a point cloud file, as far as the pipeline needs to know it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metadata {
    pub point_count: u64,
    pub bounding_volume: BoundingVolume,
    pub quantization: Quantization,
    pub version: String,
    pub system_identifier: String,
    pub generating_software: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_volume_grows_with_points() {
        let mut volume = BoundingVolume::empty();
        assert!(volume.is_empty());

        volume.extend([1.0, -2.0, 3.0]);
        volume.extend([-1.0, 4.0, 0.5]);
        assert!(!volume.is_empty());
        assert_eq!(volume.min, [-1.0, -2.0, 0.5]);
        assert_eq!(volume.max, [1.0, 4.0, 3.0]);
    }
}
