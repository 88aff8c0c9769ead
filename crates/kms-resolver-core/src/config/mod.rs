//! Stack configuration
//!
//! Loads YAML stack configs and resolves their tagged parameters through the
//! resolver registry.

mod error;
mod file;

pub use error::{ConfigError, ConfigResult};
pub use file::StackConfig;
