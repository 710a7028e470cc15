//! Container configuration.
//!
//! Settings can be built in code, read from `FERROUS_LIFECYCLE_*` environment
//! variables, or (with the `config` feature) parsed from JSON.

use std::env;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Environment variable toggling early exposure for cycles.
pub const ENV_ALLOW_CIRCULAR: &str = "FERROUS_LIFECYCLE_ALLOW_CIRCULAR";
/// Environment variable capping the construction depth.
pub const ENV_MAX_DEPTH: &str = "FERROUS_LIFECYCLE_MAX_DEPTH";
/// Environment variable enabling eager singleton construction on refresh.
pub const ENV_EAGER: &str = "FERROUS_LIFECYCLE_EAGER";

const DEFAULT_MAX_DEPTH: usize = 1024;

/// Runtime settings of a [`Container`](crate::Container).
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{Container, ContainerConfig};
///
/// let config = ContainerConfig::default()
///     .allow_circular_references(false)
///     .max_depth(64);
/// let container = Container::with_config(config);
/// assert_eq!(container.config().max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct ContainerConfig {
    /// Register deferred early-reference factories so singleton cycles resolve
    pub allow_circular_references: bool,
    /// Longest dependency chain a single resolution may build
    pub max_depth: usize,
    /// Whether `refresh` builds every singleton up front
    pub eager_singletons: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            max_depth: DEFAULT_MAX_DEPTH,
            eager_singletons: false,
        }
    }
}

impl ContainerConfig {
    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    /// Caps the dependency chain length. A depth of 0 is raised to 1.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn eager_singletons(mut self, eager: bool) -> Self {
        self.eager_singletons = eager;
        self
    }

    /// Defaults overridden by any `FERROUS_LIFECYCLE_*` variables that are set.
    pub fn from_env() -> DiResult<Self> {
        let mut config = Self::default();
        if let Some(allow) = read_env::<bool>(ENV_ALLOW_CIRCULAR)? {
            config.allow_circular_references = allow;
        }
        if let Some(depth) = read_env::<usize>(ENV_MAX_DEPTH)? {
            config.max_depth = depth;
        }
        if let Some(eager) = read_env::<bool>(ENV_EAGER)? {
            config.eager_singletons = eager;
        }
        config.validate()?;
        tracing::debug!(?config, "Loaded container configuration from environment");
        Ok(config)
    }

    fn validate(&self) -> DiResult<()> {
        if self.max_depth == 0 {
            return Err(DiError::InvalidConfig("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Parses a JSON object; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> DiResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| DiError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> DiResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DiError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }
}

fn read_env<T>(key: &str) -> DiResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .to_ascii_lowercase()
            .parse::<T>()
            .map(Some)
            .map_err(|e| DiError::InvalidConfig(format!("{}='{}': {}", key, raw, e))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(DiError::InvalidConfig(format!("{}: {}", key, e))),
    }
}
