use std::time::Instant;

use dem_raster::RasterSource;
use pcd_exporter::writer::PointWriter;
use pcd_parser::reader::PointReader;
use serde::Serialize;

use crate::{
    cancel::CancellationToken,
    error::NormalizeError,
    normalizer::{ElevationNormalizer, MissingGround, PointOutcome},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeStats {
    pub points_read: u64,
    pub points_written: u64,
    pub points_skipped: u64,
    pub points_passed_through: u64,
    pub out_of_bounds: u64,
    pub nodata: u64,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
    pub bytes_written: u64,
    pub bytes_read: u64,
    pub elapsed_seconds: f64,
}

impl NormalizeStats {
    fn record_height(&mut self, height: f64) {
        self.min_height = Some(self.min_height.map_or(height, |min| min.min(height)));
        self.max_height = Some(self.max_height.map_or(height, |max| max.max(height)));
    }

    fn record_missing(&mut self, missing: MissingGround) {
        match missing {
            MissingGround::OutOfBounds => self.out_of_bounds += 1,
            MissingGround::NoData => self.nodata += 1,
        }
    }
}

/// Streams every point of `source` through `normalizer` into `sink`, in input order.
///
/// The sink header is finalized and both ends are closed once the source is
/// exhausted. On error the run stops and whatever the sink already flushed stays
/// on disk.
pub fn run<S, R, W>(
    source: &mut S,
    normalizer: &mut ElevationNormalizer<R>,
    sink: &mut W,
    cancel: &CancellationToken,
) -> Result<NormalizeStats, NormalizeError>
where
    S: PointReader + ?Sized,
    R: RasterSource,
    W: PointWriter + ?Sized,
{
    let start = Instant::now();
    let metadata = source.metadata().clone();
    let quantization = metadata.quantization;
    let progress_interval = normalizer.options().progress_interval;
    let mut stats = NormalizeStats::default();

    loop {
        if cancel.is_cancelled() {
            return Err(NormalizeError::Cancelled {
                points_read: stats.points_read,
            });
        }
        let Some(mut point) = source.next_point()? else {
            break;
        };
        stats.points_read += 1;

        let write = match normalizer.normalize_point(&mut point, &quantization)? {
            PointOutcome::Normalized { height, .. } => {
                stats.record_height(height);
                true
            }
            PointOutcome::Skipped(missing) => {
                stats.points_skipped += 1;
                stats.record_missing(missing);
                false
            }
            PointOutcome::PassedThrough(missing) => {
                stats.points_passed_through += 1;
                stats.record_missing(missing);
                true
            }
        };

        if write {
            sink.write_point(&point)?;
            sink.update_inventory(&point);
            stats.points_written += 1;
        }

        if progress_interval > 0 && stats.points_read % progress_interval == 0 {
            log_progress(stats.points_read, metadata.point_count);
        }
    }

    sink.update_header(&metadata, true);
    stats.bytes_written = sink.close()?;
    stats.bytes_read = source.close()?;
    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    if stats.points_skipped > 0 {
        log::warn!(
            "skipped {} points without ground ({} outside the DEM, {} on nodata cells)",
            stats.points_skipped,
            stats.out_of_bounds,
            stats.nodata
        );
    }
    if stats.points_passed_through > 0 {
        log::warn!(
            "{} points without ground were written with their original elevation",
            stats.points_passed_through
        );
    }

    Ok(stats)
}

fn log_progress(points_read: u64, declared: u64) {
    if declared > 0 {
        log::info!(
            "processed {} of {} points ({:.1}%)",
            points_read,
            declared,
            points_read as f64 * 100.0 / declared as f64
        );
    } else {
        log::info!("processed {} points", points_read);
    }
}
