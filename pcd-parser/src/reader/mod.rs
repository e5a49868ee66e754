pub mod las;

use pcd_core::pointcloud::{metadata::Metadata, point::Point};

use crate::error::ParseError;

/// Sequential source of points in file order.
pub trait PointReader {
    fn metadata(&self) -> &Metadata;

    /// Returns `Ok(None)` once the stream is exhausted.
    fn next_point(&mut self) -> Result<Option<Point>, ParseError>;

    /// Releases the underlying file and returns its size in bytes.
    fn close(&mut self) -> Result<u64, ParseError>;
}
