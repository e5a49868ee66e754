use std::{
    collections::{HashMap, VecDeque},
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use coordinate_transformer::GeoTransform;
use tiff::{
    decoder::{Decoder, DecodingResult},
    tags::Tag,
};

use crate::{
    error::RasterError,
    source::{BandInfo, RasterSource},
};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const MODEL_TRANSFORMATION_TAG: u16 = 34264;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_METADATA_TAG: u16 = 42112;
const GDAL_NODATA_TAG: u16 = 42113;

const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const RASTER_PIXEL_IS_POINT: u16 = 2;

const PLANAR_CONFIGURATION_SEPARATE: u16 = 2;

// Number of decoded strips/tiles kept in memory at once.
const CHUNK_CACHE_CAPACITY: usize = 64;

// Known codes decode to named variants, so lookups must use the same mapping.
fn geotiff_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// GeoTIFF DEM decoded lazily, one strip or tile at a time.
pub struct GeoTiffRaster {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    width: usize,
    height: usize,
    samples_per_pixel: usize,
    chunk_width: usize,
    chunk_height: usize,
    chunks_across: usize,
    geo_transform: Option<GeoTransform>,
    bands: Vec<BandInfo>,
    cache: HashMap<u32, Vec<f64>>,
    cache_order: VecDeque<u32>,
}

impl GeoTiffRaster {
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let file = File::open(path).map_err(|source| RasterError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut decoder = Decoder::new(BufReader::new(file))?;

        let (width, height) = decoder.dimensions()?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();

        let samples_per_pixel = match decoder.find_tag(Tag::SamplesPerPixel)? {
            Some(value) => usize::from(value.into_u16()?),
            None => 1,
        };
        let planar_configuration = match decoder.find_tag(Tag::PlanarConfiguration)? {
            Some(value) => value.into_u16()?,
            None => 1,
        };
        if samples_per_pixel > 1 && planar_configuration == PLANAR_CONFIGURATION_SEPARATE {
            return Err(RasterError::Unsupported(format!(
                "{:?} stores {} bands in separate planes",
                path, samples_per_pixel
            )));
        }

        let geo_transform = read_geo_transform(&mut decoder)?;

        let nodata = match decoder.find_tag(geotiff_tag(GDAL_NODATA_TAG))? {
            Some(value) => parse_nodata(&value.into_string()?),
            None => None,
        };
        let metadata = match decoder.find_tag(geotiff_tag(GDAL_METADATA_TAG))? {
            Some(value) => parse_gdal_metadata(&value.into_string()?),
            None => Vec::new(),
        };
        let bands = (1..=samples_per_pixel)
            .map(|index| band_info(index, nodata, &metadata))
            .collect();

        let chunk_width = chunk_width.max(1) as usize;
        let chunk_height = chunk_height.max(1) as usize;
        let width = width as usize;

        Ok(Self {
            path: path.to_path_buf(),
            decoder,
            width,
            height: height as usize,
            samples_per_pixel,
            chunk_width,
            chunk_height,
            chunks_across: width.div_ceil(chunk_width),
            geo_transform,
            bands,
            cache: HashMap::new(),
            cache_order: VecDeque::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_chunk(&mut self, chunk_index: u32) -> Result<&[f64], RasterError> {
        if !self.cache.contains_key(&chunk_index) {
            if self.cache_order.len() >= CHUNK_CACHE_CAPACITY {
                if let Some(evicted) = self.cache_order.pop_front() {
                    self.cache.remove(&evicted);
                }
            }
            let data = decoding_result_to_f64(self.decoder.read_chunk(chunk_index)?);
            self.cache.insert(chunk_index, data);
            self.cache_order.push_back(chunk_index);
        }
        self.cache
            .get(&chunk_index)
            .map(Vec::as_slice)
            .ok_or_else(|| RasterError::Unsupported(format!("chunk {} not cached", chunk_index)))
    }
}

impl RasterSource for GeoTiffRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.samples_per_pixel
    }

    fn geo_transform(&self) -> Result<GeoTransform, RasterError> {
        self.geo_transform.ok_or_else(|| {
            RasterError::MissingGeoTransform(format!(
                "{:?} has neither a model transformation nor a tiepoint with pixel scale",
                self.path
            ))
        })
    }

    fn band(&self, index: usize) -> Result<BandInfo, RasterError> {
        self.check_band(index)?;
        Ok(self.bands[index - 1])
    }

    fn read_cell(&mut self, band: usize, pixel: usize, line: usize) -> Result<f64, RasterError> {
        self.check_band(band)?;
        self.check_cell(pixel, line)?;

        let chunk_col = pixel / self.chunk_width;
        let chunk_row = line / self.chunk_height;
        let chunk_index = u32::try_from(chunk_row * self.chunks_across + chunk_col)
            .map_err(|_| RasterError::Unsupported(format!("too many chunks in {:?}", self.path)))?;

        // Edge chunks may be cropped to the image extent by the decoder.
        let full_len = self.chunk_width * self.chunk_height * self.samples_per_pixel;
        let cropped_width = self
            .chunk_width
            .min(self.width - chunk_col * self.chunk_width);
        let local_col = pixel - chunk_col * self.chunk_width;
        let local_row = line - chunk_row * self.chunk_height;
        let (chunk_width, samples_per_pixel) = (self.chunk_width, self.samples_per_pixel);

        let data = self.load_chunk(chunk_index)?;
        let stride = if data.len() == full_len {
            chunk_width
        } else {
            cropped_width
        };
        let index = (local_row * stride + local_col) * samples_per_pixel + (band - 1);
        let (value, len) = (data.get(index).copied(), data.len());

        value.ok_or_else(|| {
            RasterError::Unsupported(format!(
                "chunk {} of {:?} holds {} samples, cell ({}, {}) needs index {}",
                chunk_index, self.path, len, pixel, line, index
            ))
        })
    }
}

fn read_geo_transform(
    decoder: &mut Decoder<BufReader<File>>,
) -> Result<Option<GeoTransform>, RasterError> {
    let transformation = match decoder.find_tag(geotiff_tag(MODEL_TRANSFORMATION_TAG))? {
        Some(value) => Some(value.into_f64_vec()?),
        None => None,
    };
    let tiepoint = match decoder.find_tag(geotiff_tag(MODEL_TIEPOINT_TAG))? {
        Some(value) => Some(value.into_f64_vec()?),
        None => None,
    };
    let pixel_scale = match decoder.find_tag(geotiff_tag(MODEL_PIXEL_SCALE_TAG))? {
        Some(value) => Some(value.into_f64_vec()?),
        None => None,
    };
    let pixel_is_point = match decoder.find_tag(geotiff_tag(GEO_KEY_DIRECTORY_TAG))? {
        Some(value) => {
            geo_key_value(&value.into_u16_vec()?, GT_RASTER_TYPE_GEO_KEY)
                == Some(RASTER_PIXEL_IS_POINT)
        }
        None => false,
    };

    let Some(mut coefficients) = geo_transform_from_tags(
        transformation.as_deref(),
        tiepoint.as_deref(),
        pixel_scale.as_deref(),
    ) else {
        return Ok(None);
    };

    if pixel_is_point {
        // Tie points refer to cell centers; move the origin to the upper left corner.
        coefficients[0] -= 0.5 * coefficients[1] + 0.5 * coefficients[2];
        coefficients[3] -= 0.5 * coefficients[4] + 0.5 * coefficients[5];
    }
    Ok(Some(GeoTransform::new(coefficients)))
}

fn geo_transform_from_tags(
    transformation: Option<&[f64]>,
    tiepoint: Option<&[f64]>,
    pixel_scale: Option<&[f64]>,
) -> Option<[f64; 6]> {
    if let Some(m) = transformation.filter(|m| m.len() >= 16) {
        return Some([m[3], m[0], m[1], m[7], m[4], m[5]]);
    }

    let tiepoint = tiepoint.filter(|t| t.len() >= 6)?;
    let scale = pixel_scale.filter(|s| s.len() >= 2)?;
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Some([
        x - i * scale[0],
        scale[0],
        0.0,
        y + j * scale[1],
        0.0,
        -scale[1],
    ])
}

fn geo_key_value(directory: &[u16], key: u16) -> Option<u16> {
    let key_count = usize::from(*directory.get(3)?);
    directory
        .get(4..4 + 4 * key_count)?
        .chunks_exact(4)
        .find(|entry| entry[0] == key && entry[1] == 0)
        .map(|entry| entry[3])
}

fn parse_nodata(value: &str) -> Option<f64> {
    let value = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    value.parse::<f64>().ok()
}

#[derive(Debug, Clone, PartialEq)]
struct MetadataItem {
    name: String,
    sample: Option<usize>,
    value: String,
}

// Minimal reader for the flat <GDALMetadata><Item ...>value</Item></GDALMetadata> document.
fn parse_gdal_metadata(xml: &str) -> Vec<MetadataItem> {
    let mut items = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<Item") {
        rest = &rest[start + "<Item".len()..];
        let Some(tag_end) = rest.find('>') else {
            break;
        };
        let attributes = &rest[..tag_end];
        rest = &rest[tag_end + 1..];
        let Some(close) = rest.find("</Item>") else {
            break;
        };
        let value = rest[..close].trim().to_string();
        rest = &rest[close + "</Item>".len()..];

        let Some(name) = xml_attribute(attributes, "name") else {
            continue;
        };
        let sample = xml_attribute(attributes, "sample").and_then(|s| s.parse().ok());
        items.push(MetadataItem {
            name: name.to_string(),
            sample,
            value,
        });
    }
    items
}

fn xml_attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{}=\"", name);
    let mut search = attributes;
    loop {
        let start = search.find(&pattern)?;
        // reject matches inside a longer attribute name such as "xname="
        let preceded_by_space = start == 0
            || search[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        let after = &search[start + pattern.len()..];
        if preceded_by_space {
            let end = after.find('"')?;
            return Some(&after[..end]);
        }
        search = after;
    }
}

fn band_info(index: usize, nodata: Option<f64>, metadata: &[MetadataItem]) -> BandInfo {
    let lookup = |name: &str| {
        metadata
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(name) && item.sample == Some(index - 1))
            .and_then(|item| item.value.parse::<f64>().ok())
    };
    BandInfo {
        index,
        offset: lookup("OFFSET").unwrap_or(0.0),
        scale: lookup("SCALE").unwrap_or(1.0),
        nodata,
    }
}

fn decoding_result_to_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::U16(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::U32(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::U64(values) => values.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::I16(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::I32(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::I64(values) => values.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(values) => values.into_iter().map(f64::from).collect(),
        DecodingResult::F64(values) => values,
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use tiff::encoder::{colortype, TiffEncoder};

    use super::*;

    const METADATA: &str = "<GDALMetadata>\n  \
        <Item name=\"OFFSET\" sample=\"0\" role=\"offset\">10</Item>\n  \
        <Item name=\"SCALE\" sample=\"0\" role=\"scale\">2</Item>\n\
        </GDALMetadata>";

    fn write_dem(path: &Path, width: u32, height: u32, values: &[f32], metadata: bool) {
        let file = File::create(path).unwrap();
        let mut tiff = TiffEncoder::new(file).unwrap();
        let mut image = tiff
            .new_image::<colortype::Gray32Float>(width, height)
            .unwrap();
        image
            .encoder()
            .write_tag(geotiff_tag(MODEL_PIXEL_SCALE_TAG), &[1.0f64, 1.0, 0.0][..])
            .unwrap();
        image
            .encoder()
            .write_tag(
                geotiff_tag(MODEL_TIEPOINT_TAG),
                &[0.0f64, 0.0, 0.0, 1000.0, 2000.0, 0.0][..],
            )
            .unwrap();
        image
            .encoder()
            .write_tag(geotiff_tag(GDAL_NODATA_TAG), "-9999")
            .unwrap();
        if metadata {
            image
                .encoder()
                .write_tag(geotiff_tag(GDAL_METADATA_TAG), METADATA)
                .unwrap();
        }
        image.write_data(values).unwrap();
    }

    #[test]
    fn reads_georeferencing_and_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.tif");
        let values: Vec<f32> = (0..12).map(|v| v as f32).collect();
        write_dem(&path, 4, 3, &values, false);

        let mut raster = GeoTiffRaster::open(&path).unwrap();
        assert_eq!(raster.width(), 4);
        assert_eq!(raster.height(), 3);
        assert_eq!(raster.band_count(), 1);
        assert_eq!(
            raster.geo_transform().unwrap(),
            GeoTransform::new([1000.0, 1.0, 0.0, 2000.0, 0.0, -1.0])
        );
        assert_eq!(raster.read_cell(1, 0, 0).unwrap(), 0.0);
        assert_eq!(raster.read_cell(1, 3, 0).unwrap(), 3.0);
        assert_eq!(raster.read_cell(1, 1, 2).unwrap(), 9.0);
        assert_eq!(raster.read_cell(1, 3, 2).unwrap(), 11.0);
        assert!(matches!(
            raster.read_cell(1, 4, 0),
            Err(RasterError::CellOutOfRange { .. })
        ));

        let band = raster.band(1).unwrap();
        assert!(!band.has_correction());
        assert_eq!(band.nodata, Some(-9999.0));
    }

    #[test]
    fn reads_band_scale_and_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaled.tif");
        write_dem(&path, 2, 2, &[5.0, 5.0, 5.0, 5.0], true);

        let mut raster = GeoTiffRaster::open(&path).unwrap();
        let band = raster.band(1).unwrap();
        assert_eq!(band.scale, 2.0);
        assert_eq!(band.offset, 10.0);
        let raw = raster.read_cell(1, 1, 1).unwrap();
        assert_eq!(band.apply(raw), 20.0);
    }

    #[test]
    fn model_transformation_wins_over_tiepoint() {
        let m = [
            0.5, 0.1, 0.0, 100.0, //
            0.2, -0.5, 0.0, 200.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let tiepoint = [0.0, 0.0, 0.0, 1.0, 2.0, 0.0];
        let scale = [1.0, 1.0, 0.0];
        assert_eq!(
            geo_transform_from_tags(Some(&m[..]), Some(&tiepoint[..]), Some(&scale[..])),
            Some([100.0, 0.5, 0.1, 200.0, 0.2, -0.5])
        );
        assert_eq!(
            geo_transform_from_tags(None, Some(&tiepoint[..]), None),
            None
        );
    }

    #[test]
    fn tiepoint_away_from_origin_is_moved_to_corner() {
        let tiepoint = [10.0, 5.0, 0.0, 1010.0, 1995.0, 0.0];
        let scale = [2.0, 2.0, 0.0];
        assert_eq!(
            geo_transform_from_tags(None, Some(&tiepoint[..]), Some(&scale[..])),
            Some([990.0, 2.0, 0.0, 2005.0, 0.0, -2.0])
        );
    }

    #[test]
    fn geo_keys_are_looked_up_inline() {
        let directory: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 2];
        assert_eq!(geo_key_value(&directory, GT_RASTER_TYPE_GEO_KEY), Some(2));
        assert_eq!(geo_key_value(&directory, 3072), None);
    }

    #[test]
    fn gdal_metadata_items_are_parsed() {
        let items = parse_gdal_metadata(METADATA);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "OFFSET");
        assert_eq!(items[0].sample, Some(0));
        assert_eq!(items[1].value, "2");

        let band = band_info(1, None, &items);
        assert_eq!((band.offset, band.scale), (10.0, 2.0));
        let second = band_info(2, None, &items);
        assert_eq!((second.offset, second.scale), (0.0, 1.0));
    }

    #[test]
    fn nodata_strings_are_trimmed() {
        assert_eq!(parse_nodata("-9999\0"), Some(-9999.0));
        assert!(parse_nodata("nan").is_some_and(f64::is_nan));
        assert_eq!(parse_nodata("none"), None);
    }
}
