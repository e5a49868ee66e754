pub mod error;
pub mod writer;

pub use error::ExportError;
