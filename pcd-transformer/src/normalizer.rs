use coordinate_transformer::{GeoTransform, InverseGeoTransform};
use dem_raster::{BandInfo, RasterSource};
use pcd_core::pointcloud::point::{Point, Quantization};
use serde::Serialize;

use crate::{
    error::NormalizeError,
    options::{MissingGroundPolicy, NormalizeOptions},
};

/// Why no ground elevation was found for a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingGround {
    OutOfBounds,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundSample {
    Ground(f64),
    OutOfBounds,
    NoData { pixel: usize, line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointOutcome {
    /// Z now holds the height above `ground`.
    Normalized { ground: f64, height: f64 },
    /// The point must not be written.
    Skipped(MissingGround),
    /// The point is written with its elevation unchanged.
    PassedThrough(MissingGround),
}

/// Per-run context subtracting the DEM elevation from each point.
pub struct ElevationNormalizer<R> {
    raster: R,
    geo_transform: GeoTransform,
    inverse: InverseGeoTransform,
    band: BandInfo,
    options: NormalizeOptions,
}

impl<R: RasterSource> ElevationNormalizer<R> {
    pub(crate) fn new(
        raster: R,
        geo_transform: GeoTransform,
        inverse: InverseGeoTransform,
        band: BandInfo,
        options: NormalizeOptions,
    ) -> Self {
        Self {
            raster,
            geo_transform,
            inverse,
            band,
            options,
        }
    }

    pub fn geo_transform(&self) -> &GeoTransform {
        &self.geo_transform
    }

    pub fn inverse(&self) -> &InverseGeoTransform {
        &self.inverse
    }

    pub fn band(&self) -> &BandInfo {
        &self.band
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn raster(&self) -> &R {
        &self.raster
    }

    /// Ground elevation under `(x, y)` after band correction. Cells matching the
    /// band nodata value or holding a non-finite elevation have no ground.
    pub fn sample(&mut self, x: f64, y: f64) -> Result<GroundSample, NormalizeError> {
        let width = self.raster.width();
        let height = self.raster.height();
        let Some((pixel, line)) = self
            .inverse
            .cell(x, y)
            .and_then(|cell| cell.within(width, height))
        else {
            return Ok(GroundSample::OutOfBounds);
        };

        let raw = self.raster.read_cell(self.band.index, pixel, line)?;
        if self.band.is_nodata(raw) {
            return Ok(GroundSample::NoData { pixel, line });
        }
        let ground = self.band.apply(raw);
        if !ground.is_finite() {
            return Ok(GroundSample::NoData { pixel, line });
        }
        Ok(GroundSample::Ground(ground))
    }

    /// Replaces the stored Z of `point` with its height above the DEM.
    pub fn normalize_point(
        &mut self,
        point: &mut Point,
        quantization: &Quantization,
    ) -> Result<PointOutcome, NormalizeError> {
        let [x, y, z] = quantization.to_ground(point);

        let (missing, policy, error) = match self.sample(x, y)? {
            GroundSample::Ground(ground) => {
                let height = z - ground;
                point.z = quantization.to_stored(2, height)?;
                return Ok(PointOutcome::Normalized { ground, height });
            }
            GroundSample::OutOfBounds => (
                MissingGround::OutOfBounds,
                self.options.out_of_bounds,
                NormalizeError::OutOfBounds { x, y },
            ),
            GroundSample::NoData { pixel, line } => (
                MissingGround::NoData,
                self.options.nodata,
                NormalizeError::NoData { pixel, line },
            ),
        };

        match policy {
            MissingGroundPolicy::Skip => Ok(PointOutcome::Skipped(missing)),
            MissingGroundPolicy::PassThrough => Ok(PointOutcome::PassedThrough(missing)),
            MissingGroundPolicy::Fail => Err(error),
        }
    }
}
