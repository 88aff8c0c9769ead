//! Mock connection manager for testing
//!
//! Provides deterministic, configurable responses without network dependencies.
//! Every call is recorded so tests can assert on what was dispatched.

use std::sync::{Mutex, PoisonError};

use super::error::{CallError, CallResult};
use super::traits::{ConnectionManager, ParamValue, ServiceCall, ServiceResponse};

/// Mock response mode
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Answer `decrypt` with the submitted `CiphertextBlob` as `Plaintext`
    Echo,
    /// Return a fixed response
    Respond(ServiceResponse),
    /// Fail every call with the given error
    Fail(CallError),
}

impl Default for MockMode {
    fn default() -> Self {
        MockMode::Echo
    }
}

/// Mock connection manager
#[derive(Debug, Default)]
pub struct MockConnectionManager {
    mode: MockMode,
    calls: Mutex<Vec<ServiceCall>>,
}

impl MockConnectionManager {
    /// Key id reported by mock decrypt responses
    pub const KEY_ID: &'static str =
        "arn:aws:kms:us-east-1:111111111111:key/17c85202-6da4-4ee1-afc9-b8cef983e0d9";

    /// Create with a specific mode
    pub fn with_mode(mode: MockMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create an echo manager (plaintext == ciphertext blob)
    pub fn echo() -> Self {
        Self::with_mode(MockMode::Echo)
    }

    /// Create a manager returning a fixed response
    pub fn responding(response: ServiceResponse) -> Self {
        Self::with_mode(MockMode::Respond(response))
    }

    /// Create a manager returning a decrypt response with the given plaintext
    pub fn plaintext(plaintext: impl Into<Vec<u8>>) -> Self {
        Self::responding(
            ServiceResponse::new()
                .with_field("KeyId", Self::KEY_ID)
                .with_field("Plaintext", ParamValue::Blob(plaintext.into())),
        )
    }

    /// Create an error-producing manager
    pub fn failing(error: CallError) -> Self {
        Self::with_mode(MockMode::Fail(error))
    }

    /// All calls received so far, oldest first
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The most recent call
    pub fn last_call(&self) -> Option<ServiceCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn echo_response(call: &ServiceCall) -> ServiceResponse {
        let mut response = ServiceResponse::new().with_field("KeyId", Self::KEY_ID);
        if let Some(ParamValue::Blob(blob)) = call.kwarg("CiphertextBlob") {
            response.insert("Plaintext", blob.clone());
        }
        response
    }
}

impl ConnectionManager for MockConnectionManager {
    fn call(&self, call: ServiceCall) -> CallResult<ServiceResponse> {
        let result = match &self.mode {
            MockMode::Echo => Ok(Self::echo_response(&call)),
            MockMode::Respond(response) => Ok(response.clone()),
            MockMode::Fail(error) => Err(error.clone()),
        };

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        result
    }
}
