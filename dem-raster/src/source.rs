use coordinate_transformer::GeoTransform;

use crate::error::RasterError;

/// Metadata of a single raster band. Band indices start at 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandInfo {
    pub index: usize,
    pub offset: f64,
    pub scale: f64,
    pub nodata: Option<f64>,
}

impl BandInfo {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            offset: 0.0,
            scale: 1.0,
            nodata: None,
        }
    }

    pub fn has_correction(&self) -> bool {
        self.offset != 0.0 || self.scale != 1.0
    }

    /// Converts a stored cell value to ground units: `raw * scale + offset`.
    pub fn apply(&self, raw: f64) -> f64 {
        if self.has_correction() {
            raw * self.scale + self.offset
        } else {
            raw
        }
    }

    pub fn is_nodata(&self, raw: f64) -> bool {
        match self.nodata {
            Some(nodata) if nodata.is_nan() => raw.is_nan(),
            Some(nodata) => raw == nodata,
            None => false,
        }
    }
}

/// Read-only access to a georeferenced raster.
pub trait RasterSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn band_count(&self) -> usize;
    fn geo_transform(&self) -> Result<GeoTransform, RasterError>;
    fn band(&self, index: usize) -> Result<BandInfo, RasterError>;

    /// Reads the stored value of one cell, before offset/scale correction.
    fn read_cell(&mut self, band: usize, pixel: usize, line: usize) -> Result<f64, RasterError>;

    fn check_band(&self, index: usize) -> Result<(), RasterError> {
        if index == 0 || index > self.band_count() {
            return Err(RasterError::BandOutOfRange {
                index,
                count: self.band_count(),
            });
        }
        Ok(())
    }

    fn check_cell(&self, pixel: usize, line: usize) -> Result<(), RasterError> {
        if pixel >= self.width() || line >= self.height() {
            return Err(RasterError::CellOutOfRange {
                pixel,
                line,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }
}

impl<R: RasterSource + ?Sized> RasterSource for Box<R> {
    fn width(&self) -> usize {
        (**self).width()
    }

    fn height(&self) -> usize {
        (**self).height()
    }

    fn band_count(&self) -> usize {
        (**self).band_count()
    }

    fn geo_transform(&self) -> Result<GeoTransform, RasterError> {
        (**self).geo_transform()
    }

    fn band(&self, index: usize) -> Result<BandInfo, RasterError> {
        (**self).band(index)
    }

    fn read_cell(&mut self, band: usize, pixel: usize, line: usize) -> Result<f64, RasterError> {
        (**self).read_cell(band, pixel, line)
    }
}
