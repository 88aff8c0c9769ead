//! Stack config errors

use thiserror::Error;

/// Errors that can occur while loading a stack config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Stack config has no name")]
    MissingName,

    #[error("Invalid parameter '{key}': {message}")]
    InvalidParameter { key: String, message: String },
}

impl ConfigError {
    pub fn invalid_parameter(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
