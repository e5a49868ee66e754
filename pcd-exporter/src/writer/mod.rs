pub mod las;

use pcd_core::pointcloud::{inventory::Inventory, metadata::Metadata, point::Point};

use crate::error::ExportError;

/// Sequential sink of points in stored units.
pub trait PointWriter {
    fn write_point(&mut self, point: &Point) -> Result<(), ExportError>;

    /// Adds a written point to the running statistics.
    fn update_inventory(&mut self, point: &Point);

    /// Takes `metadata` as the output header and merges the inventory into it.
    /// With `recompute_bounds` the bounds come from the inventory.
    fn update_header(&mut self, metadata: &Metadata, recompute_bounds: bool);

    fn inventory(&self) -> &Inventory;
    fn metadata(&self) -> &Metadata;

    /// Finalizes the output and returns its size in bytes.
    fn close(&mut self) -> Result<u64, ExportError>;
}
