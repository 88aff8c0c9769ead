//! Remote call error types

use thiserror::Error;

/// Structured error reported by a remote service (`{Error: {Code, Message}}`)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ServiceError {
    /// Service error code, e.g. `ParameterNotFound` or `AccessDeniedException`
    pub code: String,
    /// Human-readable message from the service
    pub message: String,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by a [`ConnectionManager`](super::ConnectionManager) call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The request had the wrong argument types or shape. Always a caller bug.
    #[error("Malformed request: {0}")]
    Malformed(String),

    /// The service answered with a structured error
    #[error("Service error {0}")]
    Service(#[from] ServiceError),
}

impl CallError {
    /// Create a malformed-request error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Create a structured service error
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service(ServiceError::new(code, message))
    }

    /// The service error code, if this is a structured service error
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service(err) => Some(&err.code),
            Self::Malformed(_) => None,
        }
    }
}

pub type CallResult<T> = Result<T, CallError>;
