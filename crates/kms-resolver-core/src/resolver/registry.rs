//! Resolver registry for creating resolvers by config tag

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::stack::Stack;
use super::kms::KmsResolver;
use super::traits::Resolver;

/// Factory function type for creating resolvers from `(argument, stack)`
pub type ResolverFactory = Box<dyn Fn(Option<String>, Arc<Stack>) -> Box<dyn Resolver> + Send + Sync>;

/// Definition of a registered resolver
pub struct ResolverDefinition {
    /// Tag the resolver is bound to in stack config (`!kms`)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Factory function to create instances
    pub factory: ResolverFactory,
}

impl std::fmt::Debug for ResolverDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Global registry of resolvers
static REGISTRY: Lazy<RwLock<HashMap<String, ResolverDefinition>>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        "kms".to_string(),
        ResolverDefinition {
            name: "kms".to_string(),
            description: "Decrypt a base64 KMS ciphertext".to_string(),
            factory: Box::new(|argument, stack| Box::new(KmsResolver::new(argument, stack))),
        },
    );

    RwLock::new(map)
});

/// Register a resolver under `name`, replacing any previous registration
///
/// # Example
///
/// ```
/// use kms_resolver_core::resolver::{register_resolver, has_resolver, unregister_resolver, KmsResolver};
///
/// register_resolver(
///     "kms_alias",
///     "Same as kms",
///     Box::new(|argument, stack| Box::new(KmsResolver::new(argument, stack))),
/// );
/// assert!(has_resolver("kms_alias"));
/// unregister_resolver("kms_alias");
/// ```
pub fn register_resolver(name: &str, description: &str, factory: ResolverFactory) {
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.insert(
        name.to_string(),
        ResolverDefinition {
            name: name.to_string(),
            description: description.to_string(),
            factory,
        },
    );
}

/// Create a resolver by name
///
/// Returns `None` if the name is not registered.
pub fn create_resolver(name: &str, argument: Option<String>, stack: Arc<Stack>) -> Option<Box<dyn Resolver>> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    registry.get(name).map(|def| (def.factory)(argument, stack))
}

/// List all registered resolvers as `(name, description)`, sorted by name
pub fn list_resolvers() -> Vec<(String, String)> {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    let mut resolvers: Vec<_> = registry
        .values()
        .map(|def| (def.name.clone(), def.description.clone()))
        .collect();
    resolvers.sort();
    resolvers
}

/// Check if a resolver is registered
pub fn has_resolver(name: &str) -> bool {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    registry.contains_key(name)
}

/// Unregister a resolver (mainly for testing)
pub fn unregister_resolver(name: &str) -> bool {
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    registry.remove(name).is_some()
}
