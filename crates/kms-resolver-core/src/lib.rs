//! KMS Resolver Core
//!
//! Decrypts base64 KMS ciphertexts referenced from CloudFormation stack
//! configs, so secrets can be committed encrypted and only appear in plain
//! text at deploy time.
//! This crate is host agnostic: remote calls go through an injected
//! [`connection::ConnectionManager`] and diagnostics through an injected
//! [`logging::Logger`]. Python bindings live in `kms-resolver-python`.
//!
//! ## Resolving a parameter
//!
//! ```rust
//! use std::sync::Arc;
//! use kms_resolver_core::{KmsResolver, MockConnectionManager, Resolver, Stack};
//!
//! let connection = Arc::new(MockConnectionManager::plaintext("Secret"));
//! let stack = Arc::new(Stack::new("dev/database", connection).with_region("eu-west-1"));
//!
//! let resolver = KmsResolver::new(Some("AQICAHjd17DKHzNyNq9XvuZzboDpt6OhdLG7eDPA".to_string()), stack);
//! assert_eq!(resolver.resolve().unwrap(), Some("Secret".to_string()));
//! ```
//!
//! ## Stack configs
//!
//! `config::StackConfig` loads a YAML stack config and resolves every
//! `!kms <ciphertext>` parameter through the resolver registry.

pub mod connection;
pub mod config;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod stack;

// Re-export commonly used types
pub use connection::{
    CallError, CallResult, ConnectionManager, MockConnectionManager, ParamValue,
    ServiceCall, ServiceError, ServiceResponse, SharedConnectionManager,
};

pub use config::{ConfigError, StackConfig};

pub use error::{ResolverError, ResolverResult};

pub use logging::{ConsoleLogger, LogLevel, Logger, MemoryLogger, NoOpLogger, SharedLogger, TracingLogger};

pub use resolver::{
    create_resolver, list_resolvers, register_resolver,
    KmsBase, KmsResolver, Resolver,
};

pub use stack::Stack;
