//! Connection capability trait and request/response types

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::error::CallResult;

/// A value passed to or returned from a remote command
///
/// `Debug` output never includes the contents, only their size, because
/// responses may carry decrypted secrets.
#[derive(Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Raw binary payload (ciphertext blobs, plaintext)
    Blob(Vec<u8>),
    /// Text payload (key ids, algorithm names)
    Text(String),
}

impl ParamValue {
    /// Get the binary payload, if this is a blob
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            ParamValue::Blob(bytes) => Some(bytes),
            ParamValue::Text(_) => None,
        }
    }

    /// Get the text payload, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(text) => Some(text),
            ParamValue::Blob(_) => None,
        }
    }
}

impl fmt::Debug for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Blob(bytes) => write!(f, "Blob(<{} bytes>)", bytes.len()),
            ParamValue::Text(text) => write!(f, "Text(<{} chars>)", text.chars().count()),
        }
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(bytes: Vec<u8>) -> Self {
        ParamValue::Blob(bytes)
    }
}

impl From<&[u8]> for ParamValue {
    fn from(bytes: &[u8]) -> Self {
        ParamValue::Blob(bytes.to_vec())
    }
}

impl From<String> for ParamValue {
    fn from(text: String) -> Self {
        ParamValue::Text(text)
    }
}

impl From<&str> for ParamValue {
    fn from(text: &str) -> Self {
        ParamValue::Text(text.to_string())
    }
}

/// A single remote command invocation
///
/// Built fresh for every call; the connection layer owns signing, retries
/// and credential lookup for the given profile/region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCall {
    /// Service id, e.g. `kms`
    pub service: String,
    /// Command id, e.g. `decrypt`
    pub command: String,
    /// Command arguments
    pub kwargs: BTreeMap<String, ParamValue>,
    /// Credentials profile to use, or the connection default
    pub profile: Option<String>,
    /// Region to call, or the connection default
    pub region: Option<String>,
}

impl ServiceCall {
    /// Create a call with no arguments against the default profile/region
    pub fn new(service: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            command: command.into(),
            kwargs: BTreeMap::new(),
            profile: None,
            region: None,
        }
    }

    /// Add a command argument
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Set the credentials profile
    pub fn with_profile(mut self, profile: Option<&str>) -> Self {
        self.profile = profile.map(str::to_string);
        self
    }

    /// Set the region
    pub fn with_region(mut self, region: Option<&str>) -> Self {
        self.region = region.map(str::to_string);
        self
    }

    /// Get a command argument
    pub fn kwarg(&self, key: &str) -> Option<&ParamValue> {
        self.kwargs.get(key)
    }
}

/// Structured response of a successful remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceResponse {
    fields: BTreeMap<String, ParamValue>,
}

impl ServiceResponse {
    /// Create an empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Get a field
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.fields.get(key)
    }

    /// Get a binary field. Text fields of the same name are not returned.
    pub fn get_blob(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(ParamValue::as_blob)
    }

    /// Check whether a field is present
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ParamValue)> for ServiceResponse {
    fn from_iter<I: IntoIterator<Item = (K, ParamValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Remote-service connection capability
///
/// This is the seam to the host's connection layer. Implementations:
/// - `MockConnectionManager`: canned responses for testing and dry runs
/// - Python host adapter: forwards to the host's `connection_manager.call`
/// - Custom implementations (SDK clients, HTTP, etc.)
///
/// A call either returns the structured response or a [`CallError`](super::CallError).
/// Implementations own timeouts, retries and throttling.
pub trait ConnectionManager: Send + Sync {
    /// Invoke `call.command` on `call.service`
    fn call(&self, call: ServiceCall) -> CallResult<ServiceResponse>;
}

/// Type alias for an Arc-wrapped connection manager
pub type SharedConnectionManager = Arc<dyn ConnectionManager>;
