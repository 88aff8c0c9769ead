//! Resolver contract exposed to the host

use crate::error::ResolverResult;

/// A pluggable unit that converts a configuration placeholder into a value
///
/// The host constructs a resolver with `(argument, stack)` and calls
/// [`resolve`](Resolver::resolve) while substituting configuration values.
/// Any error is fatal for that stack's deployment.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use kms_resolver_core::connection::MockConnectionManager;
/// use kms_resolver_core::resolver::{KmsResolver, Resolver};
/// use kms_resolver_core::Stack;
///
/// let stack = Arc::new(Stack::new("dev/database", Arc::new(MockConnectionManager::plaintext("Secret"))));
/// let resolver = KmsResolver::new(Some("AQICAHjd17DKHzNyNq9XvuZzboDpt6OhdLG7eDPA".to_string()), stack);
/// assert_eq!(resolver.resolve().unwrap(), Some("Secret".to_string()));
/// ```
pub trait Resolver: Send + Sync {
    /// Name the resolver is registered under (the config tag, e.g. `kms`)
    fn name(&self) -> &str;

    /// Resolve the configured argument. `None` when there is nothing to resolve.
    fn resolve(&self) -> ResolverResult<Option<String>>;
}
