//! YAML stack config with tagged resolver parameters
//!
//! ```yaml
//! name: dev/database
//! profile: test_profile
//! region: eu-west-1
//! parameters:
//!   DbPassword: !kms AQICAHjd17DKHzNyNq9XvuZzboDpt6OhdLG7eDPA
//!   Environment: dev
//! ```
//!
//! Keys other than the ones below are ignored, so full host stack configs
//! (template paths, tags, hooks) load without changes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_yaml::Value;

use crate::connection::SharedConnectionManager;
use crate::error::{ResolverError, ResolverResult};
use crate::resolver::create_resolver;
use crate::stack::Stack;
use super::error::{ConfigError, ConfigResult};

/// Stack config file structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StackConfig {
    /// Stack name; defaults to the file stem when loaded from disk
    #[serde(default)]
    pub name: Option<String>,

    /// Credentials profile for remote calls
    #[serde(default)]
    pub profile: Option<String>,

    /// Region for remote calls
    #[serde(default)]
    pub region: Option<String>,

    /// Template parameters. Values tagged `!<resolver> <argument>` are
    /// resolved; everything else is used as is.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

impl StackConfig {
    /// Parse a config from YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a config file, naming the stack after the file if the config doesn't
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&content)?;

        if config.name.is_none() {
            config.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned());
        }

        Ok(config)
    }

    /// Build the stack context for this config
    pub fn to_stack(&self, connection_manager: SharedConnectionManager) -> ConfigResult<Stack> {
        let name = self.name.as_deref().ok_or(ConfigError::MissingName)?;

        let mut stack = Stack::new(name, connection_manager);
        if let Some(profile) = &self.profile {
            stack = stack.with_profile(profile.as_str());
        }
        if let Some(region) = &self.region {
            stack = stack.with_region(region.as_str());
        }
        Ok(stack)
    }

    /// Resolve every parameter to its final string value
    ///
    /// Tagged values go through the resolver registered for the tag. Lists
    /// are joined with commas, as CloudFormation expects for list
    /// parameters. The first failure aborts resolution for the stack.
    pub fn resolve_parameters(&self, stack: &Arc<Stack>) -> ResolverResult<BTreeMap<String, String>> {
        self.parameters
            .iter()
            .map(|(key, value)| Ok((key.clone(), resolve_value(key, value, stack)?)))
            .collect()
    }
}

fn resolve_value(key: &str, value: &Value, stack: &Arc<Stack>) -> ResolverResult<String> {
    match value {
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');

            let argument = match &tagged.value {
                Value::Null => None,
                Value::String(argument) => Some(argument.clone()),
                _ => {
                    return Err(ConfigError::invalid_parameter(
                        key,
                        format!("argument of !{} must be a string", name),
                    )
                    .into())
                }
            };

            let resolver = create_resolver(name, argument, Arc::clone(stack))
                .ok_or_else(|| ResolverError::UnknownResolver(name.to_string()))?;

            Ok(resolver.resolve()?.unwrap_or_default())
        }
        Value::String(text) => Ok(text.clone()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Null => Ok(String::new()),
        Value::Sequence(items) => {
            let values = items
                .iter()
                .map(|item| resolve_value(key, item, stack))
                .collect::<ResolverResult<Vec<_>>>()?;
            Ok(values.join(","))
        }
        Value::Mapping(_) => Err(ConfigError::invalid_parameter(key, "mappings are not supported").into()),
    }
}
