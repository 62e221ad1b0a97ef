//! Configuration types
//!
//! - [`ClientConfig`]: where and how to reach the remote service
//! - [`ResolverOptions`]: bounds for reference traversal
//! - [`AccessConfig`]: defaults applied to list queries

use serde::{Deserialize, Serialize};

/// Environment variable holding the service base URL
pub const ENV_URL: &str = "RAGIC_URL";
/// Environment variable holding the account namespace
pub const ENV_NAMESPACE: &str = "RAGIC_NAMESPACE";
/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "RAGIC_API_KEY";

/// Errors raised while assembling configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Connection settings for the remote service
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://www.ragic.com`
    pub base_url: String,
    /// Account namespace, the first path segment after the base URL
    pub namespace: String,
    /// API key sent as HTTP basic credentials
    pub api_key: String,
    /// API version (`v=` query parameter)
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    3
}

impl ClientConfig {
    pub fn new(
        base_url: impl Into<String>,
        namespace: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            namespace: namespace.into(),
            api_key: api_key.into(),
            version: default_version(),
        }
    }

    /// Read `RAGIC_URL`, `RAGIC_NAMESPACE` and `RAGIC_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let config = Self::new(get(ENV_URL)?, get(ENV_NAMESPACE)?, get(ENV_API_KEY)?);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.version == 0 {
            return Err(ConfigError::Invalid("API version must be positive".to_string()));
        }
        Ok(())
    }
}

// The API key never appears in debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .field("api_key", &"<redacted>")
            .field("version", &self.version)
            .finish()
    }
}

/// Bounds for walking sub-table and source-table chains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Longest chain (in hops) accepted; `None` means the number of tables.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl ResolverOptions {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
        }
    }

    pub fn effective_depth(&self, table_count: usize) -> usize {
        self.max_depth.unwrap_or(table_count)
    }
}

/// Defaults for list queries that leave paging or sub-tables unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default)]
    pub include_subtables: bool,
}

fn default_limit() -> usize {
    100
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            include_subtables: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_URL, "https://www.ragic.com"),
            (ENV_NAMESPACE, "acme"),
            (ENV_API_KEY, "secret"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "acme");
        assert_eq!(config.version, 3);
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_missing_variable_is_named() {
        let result = ClientConfig::from_lookup(lookup(&[
            (ENV_URL, "https://www.ragic.com"),
            (ENV_API_KEY, "secret"),
        ]));
        assert_eq!(result, Err(ConfigError::Missing(ENV_NAMESPACE)));

        let result = ClientConfig::from_lookup(lookup(&[
            (ENV_URL, "https://www.ragic.com"),
            (ENV_NAMESPACE, "  "),
            (ENV_API_KEY, "secret"),
        ]));
        assert_eq!(result, Err(ConfigError::Missing(ENV_NAMESPACE)));
    }

    #[test]
    fn test_invalid_url() {
        let result = ClientConfig::from_lookup(lookup(&[
            (ENV_URL, "ftp://example.com"),
            (ENV_NAMESPACE, "acme"),
            (ENV_API_KEY, "secret"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_resolver_depth_defaults_to_table_count() {
        assert_eq!(ResolverOptions::default().effective_depth(7), 7);
        assert_eq!(ResolverOptions::with_max_depth(2).effective_depth(7), 2);
    }
}
