//! Stack context shared by resolvers

use std::fmt;

use crate::connection::SharedConnectionManager;

/// The deployment unit a resolver runs for
///
/// Owned by the host. Resolvers hold it behind an `Arc` and only read from it:
/// the name is used in diagnostics, profile/region are forwarded to every
/// remote call, and the connection manager performs the calls.
#[derive(Clone)]
pub struct Stack {
    name: String,
    profile: Option<String>,
    region: Option<String>,
    connection_manager: SharedConnectionManager,
}

impl Stack {
    /// Create a stack using the connection's default profile and region
    pub fn new(name: impl Into<String>, connection_manager: SharedConnectionManager) -> Self {
        Self {
            name: name.into(),
            profile: None,
            region: None,
            connection_manager,
        }
    }

    /// Set the credentials profile
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn connection_manager(&self) -> &SharedConnectionManager {
        &self.connection_manager
    }
}

// Implement Debug manually since Arc<dyn ConnectionManager> doesn't implement Debug
impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("name", &self.name)
            .field("profile", &self.profile)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
