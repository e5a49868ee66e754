pub mod builder;
pub mod cancel;
pub mod error;
pub mod normalizer;
pub mod options;
pub mod runner;

pub use builder::ElevationNormalizerBuilder;
pub use cancel::CancellationToken;
pub use error::NormalizeError;
pub use normalizer::{ElevationNormalizer, GroundSample, MissingGround, PointOutcome};
pub use options::{MissingGroundPolicy, NormalizeOptions};
pub use runner::{run, NormalizeStats};
