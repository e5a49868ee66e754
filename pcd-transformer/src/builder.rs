use coordinate_transformer::GeoTransform;
use dem_raster::{BandInfo, RasterSource};

use crate::{error::NormalizeError, normalizer::ElevationNormalizer, options::NormalizeOptions};

/// Runs every fatal DEM check before the first point is read.
pub struct ElevationNormalizerBuilder<R> {
    raster: R,
    options: NormalizeOptions,
}

impl<R: RasterSource> ElevationNormalizerBuilder<R> {
    pub fn new(raster: R) -> Self {
        Self {
            raster,
            options: NormalizeOptions::default(),
        }
    }

    pub fn options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<ElevationNormalizer<R>, NormalizeError> {
        let geo_transform = self.raster.geo_transform()?;
        let inverse = geo_transform.invert()?;
        let band = self.raster.band(self.options.band)?;
        describe_dem(&self.raster, &geo_transform, &band);

        Ok(ElevationNormalizer::new(
            self.raster,
            geo_transform,
            inverse,
            band,
            self.options,
        ))
    }
}

fn describe_dem<R: RasterSource>(raster: &R, geo_transform: &GeoTransform, band: &BandInfo) {
    log::info!(
        "DEM size is {} x {} pixels",
        raster.width(),
        raster.height()
    );
    if geo_transform.is_axis_aligned() {
        let (origin_x, origin_y) = geo_transform.origin();
        let (pixel_width, pixel_height) = geo_transform.pixel_size();
        log::info!("DEM origin is ({}, {})", origin_x, origin_y);
        log::info!("DEM pixel size is ({}, {})", pixel_width, pixel_height);
    } else {
        log::info!("DEM geotransform is {:?}", geo_transform.coefficients());
    }
    if band.has_correction() {
        log::info!(
            "band {} values are scaled by {} with offset {}",
            band.index,
            band.scale,
            band.offset
        );
    }
    if let Some(nodata) = band.nodata {
        log::debug!("band {} nodata value is {}", band.index, nodata);
    }
}
