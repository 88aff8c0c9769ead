//! Remote-service connection abstractions
//!
//! The resolvers never talk to a key-management service directly. They hand a
//! [`ServiceCall`] to a [`ConnectionManager`] supplied by the host, which owns
//! credentials, profile/region selection, signing and retries.
//!
//! - `ConnectionManager` trait for plugging in the host's connection layer
//! - `MockConnectionManager` for tests and dry runs

mod error;
mod traits;
pub mod mock;

pub use error::{CallError, CallResult, ServiceError};
pub use traits::{ConnectionManager, ParamValue, ServiceCall, ServiceResponse, SharedConnectionManager};
pub use mock::{MockConnectionManager, MockMode};
