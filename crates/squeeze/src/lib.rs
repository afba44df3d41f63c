pub mod config;
pub mod scan;
pub mod artifact;
pub mod profile;
pub mod encoder;
pub mod driver;
pub mod batch;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, SqueezeConfig};
pub use scan::{Candidate, ScanReport};
pub use profile::EncodeProfile;
pub use encoder::{EncodeError, Encoder, FfmpegEncoder};
pub use driver::Outcome;
pub use batch::BatchSummary;
