use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use las::{
    point::{Classification, ScanDirection},
    Builder, Writer,
};
use pcd_core::pointcloud::{
    inventory::Inventory,
    metadata::Metadata,
    point::{Point, Quantization},
};

use super::PointWriter;
use crate::error::ExportError;

const LASZIP_USER_ID: &str = "laszip encoded";

pub fn is_compressed_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("laz"))
}

pub struct LasPointWriter {
    path: PathBuf,
    writer: Option<Writer<BufWriter<File>>>,
    quantization: Quantization,
    inventory: Inventory,
    metadata: Metadata,
    points_written: u64,
}

impl LasPointWriter {
    /// Creates the output file with the point format, transforms and VLRs of `template`.
    /// The output is LAZ compressed when the path ends with `.laz`.
    pub fn create(path: &Path, template: &las::Header) -> Result<Self, ExportError> {
        let mut builder = Builder::from(template.version());
        builder.point_format = template.point_format().clone();
        builder.point_format.is_compressed = is_compressed_path(path);
        builder.transforms = template.transforms().clone();
        builder.system_identifier = template.system_identifier().to_string();
        builder.generating_software = template.generating_software().to_string();
        builder.file_source_id = template.file_source_id();
        builder.gps_time_type = template.gps_time_type();
        // The writer adds its own compression record when needed.
        builder.vlrs = template
            .vlrs()
            .iter()
            .filter(|vlr| vlr.user_id != LASZIP_USER_ID)
            .cloned()
            .collect();
        builder.evlrs = template.evlrs().to_vec();
        let header = builder.into_header().map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        let transforms = header.transforms();
        let quantization = Quantization::new(
            [
                transforms.x.scale,
                transforms.y.scale,
                transforms.z.scale,
            ],
            [
                transforms.x.offset,
                transforms.y.offset,
                transforms.z.offset,
            ],
        );
        let metadata = Metadata {
            quantization,
            version: header.version().to_string(),
            system_identifier: header.system_identifier().to_string(),
            generating_software: header.generating_software().to_string(),
            ..Default::default()
        };

        let writer = Writer::from_path(path, header).map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "created {:?} (compressed: {})",
            path,
            is_compressed_path(path)
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            quantization,
            inventory: Inventory::new(),
            metadata,
            points_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn quantization(&self) -> &Quantization {
        &self.quantization
    }

    fn to_las_point(&self, point: &Point, index: u64) -> Result<las::Point, ExportError> {
        let [x, y, z] = self.quantization.to_ground(point);
        let attributes = &point.attributes;
        let classification = Classification::new(attributes.classification)
            .map_err(|source| ExportError::Write { index, source })?;

        Ok(las::Point {
            x,
            y,
            z,
            intensity: attributes.intensity,
            return_number: attributes.return_number,
            number_of_returns: attributes.number_of_returns,
            scan_direction: if attributes.scan_direction_left_to_right {
                ScanDirection::LeftToRight
            } else {
                ScanDirection::RightToLeft
            },
            is_edge_of_flight_line: attributes.is_edge_of_flight_line,
            classification,
            is_synthetic: attributes.is_synthetic,
            is_key_point: attributes.is_key_point,
            is_withheld: attributes.is_withheld,
            is_overlap: attributes.is_overlap,
            scanner_channel: attributes.scanner_channel,
            scan_angle: attributes.scan_angle,
            user_data: attributes.user_data,
            point_source_id: attributes.point_source_id,
            gps_time: attributes.gps_time,
            color: point.color.map(|c| las::Color {
                red: c.r,
                green: c.g,
                blue: c.b,
            }),
            nir: attributes.nir,
            ..Default::default()
        })
    }
}

impl PointWriter for LasPointWriter {
    fn write_point(&mut self, point: &Point) -> Result<(), ExportError> {
        let index = self.points_written;
        let las_point = self.to_las_point(point, index)?;
        let writer = self.writer.as_mut().ok_or(ExportError::Closed)?;
        writer
            .write_point(las_point)
            .map_err(|source| ExportError::Write { index, source })?;
        self.points_written += 1;
        Ok(())
    }

    fn update_inventory(&mut self, point: &Point) {
        self.inventory.add(point, &self.quantization);
    }

    fn update_header(&mut self, metadata: &Metadata, recompute_bounds: bool) {
        let mut merged = metadata.clone();
        merged.point_count = self.inventory.point_count;
        merged.quantization = self.quantization;
        if recompute_bounds {
            merged.bounding_volume = self.inventory.bounding_volume;
        }
        self.metadata = merged;
    }

    fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn close(&mut self) -> Result<u64, ExportError> {
        let mut writer = self.writer.take().ok_or(ExportError::Closed)?;
        writer.close().map_err(ExportError::Finalize)?;
        drop(writer);
        Ok(std::fs::metadata(&self.path)?.len())
    }
}
