//! Configuration value resolvers
//!
//! - `Resolver` trait, the contract the host calls during substitution
//! - `KmsBase` / `KmsResolver` for decrypting KMS ciphertexts
//! - A registry for creating resolvers by config tag

mod traits;
mod kms;
mod registry;

pub use traits::Resolver;
pub use kms::{
    decode_ciphertext, resolve_argument, KmsBase, KmsResolver,
    CIPHERTEXT_BLOB, DECRYPT_COMMAND, KMS_SERVICE, PARAMETER_NOT_FOUND_CODE, PLAINTEXT_FIELD,
};
pub use registry::{
    create_resolver, has_resolver, list_resolvers, register_resolver, unregister_resolver,
    ResolverDefinition, ResolverFactory,
};
