//! Resolver error types

use thiserror::Error;

use crate::config::ConfigError;
use crate::connection::CallError;

/// Errors that can occur while resolving a configuration value
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The ciphertext argument is not valid base64
    #[error("Invalid base64 ciphertext: {0}")]
    Decoding(#[from] base64::DecodeError),

    /// The remote response lacks an expected field
    #[error("Invalid response, missing field: {field}")]
    MissingField { field: String },

    /// The remote service reports that the referenced key/parameter does not exist
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// The decrypted plaintext is not valid UTF-8
    #[error("Plaintext is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Remote call failed; the call error is passed through unchanged
    #[error(transparent)]
    Call(#[from] CallError),

    /// No resolver is registered under the requested tag
    #[error("No resolver registered for: {0}")]
    UnknownResolver(String),

    /// Stack config could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResolverError {
    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    /// Check whether this is the domain-specific parameter-not-found error
    pub fn is_parameter_not_found(&self) -> bool {
        matches!(self, Self::ParameterNotFound(_))
    }

    /// Short stable name of the error kind, for hosts that map errors by name
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decoding(_) => "decoding",
            Self::MissingField { .. } => "missing_field",
            Self::ParameterNotFound(_) => "parameter_not_found",
            Self::InvalidUtf8(_) => "invalid_utf8",
            Self::Call(CallError::Malformed(_)) => "malformed_request",
            Self::Call(CallError::Service(_)) => "service",
            Self::UnknownResolver(_) => "unknown_resolver",
            Self::Config(_) => "config",
        }
    }
}

pub type ResolverResult<T> = Result<T, ResolverError>;
