use coordinate_transformer::GeoTransform;

use crate::{
    error::RasterError,
    source::{BandInfo, RasterSource},
};

/// Raster held entirely in memory, row-major per band.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    width: usize,
    height: usize,
    geo_transform: Option<GeoTransform>,
    bands: Vec<(BandInfo, Vec<f64>)>,
}

impl MemoryRaster {
    pub fn new(width: usize, height: usize, geo_transform: Option<GeoTransform>) -> Self {
        Self {
            width,
            height,
            geo_transform,
            bands: Vec::new(),
        }
    }

    /// Adds a band from row-major values. Fails when the value count does not match the size.
    pub fn with_band(mut self, values: Vec<f64>) -> Result<Self, RasterError> {
        if values.len() != self.width * self.height {
            return Err(RasterError::Unsupported(format!(
                "band has {} values, expected {} x {}",
                values.len(),
                self.width,
                self.height
            )));
        }
        let info = BandInfo::new(self.bands.len() + 1);
        self.bands.push((info, values));
        Ok(self)
    }

    pub fn with_constant_band(self, value: f64) -> Result<Self, RasterError> {
        let values = vec![value; self.width * self.height];
        self.with_band(values)
    }

    pub fn set_band_scaling(
        &mut self,
        index: usize,
        offset: f64,
        scale: f64,
    ) -> Result<(), RasterError> {
        let info = self.band_info_mut(index)?;
        info.offset = offset;
        info.scale = scale;
        Ok(())
    }

    pub fn set_nodata(&mut self, index: usize, nodata: Option<f64>) -> Result<(), RasterError> {
        self.band_info_mut(index)?.nodata = nodata;
        Ok(())
    }

    pub fn set(
        &mut self,
        band: usize,
        pixel: usize,
        line: usize,
        value: f64,
    ) -> Result<(), RasterError> {
        self.check_band(band)?;
        self.check_cell(pixel, line)?;
        let width = self.width;
        self.bands[band - 1].1[line * width + pixel] = value;
        Ok(())
    }

    fn band_info_mut(&mut self, index: usize) -> Result<&mut BandInfo, RasterError> {
        self.check_band(index)?;
        Ok(&mut self.bands[index - 1].0)
    }
}

impl RasterSource for MemoryRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn geo_transform(&self) -> Result<GeoTransform, RasterError> {
        self.geo_transform.ok_or_else(|| {
            RasterError::MissingGeoTransform("in-memory raster has no geotransform".to_string())
        })
    }

    fn band(&self, index: usize) -> Result<BandInfo, RasterError> {
        self.check_band(index)?;
        Ok(self.bands[index - 1].0)
    }

    fn read_cell(&mut self, band: usize, pixel: usize, line: usize) -> Result<f64, RasterError> {
        self.check_band(band)?;
        self.check_cell(pixel, line)?;
        Ok(self.bands[band - 1].1[line * self.width + pixel])
    }
}
