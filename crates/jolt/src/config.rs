//! Runtime configuration

use serde::Deserialize;

/// Component runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Render into a shadow root unless a component opts out
    pub default_use_shadow: bool,
    /// Upper bound on reaction/re-render passes in one `process` call
    pub max_flush_passes: usize,
    /// Log a warning when mounting an unregistered tag
    pub warn_unregistered: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_use_shadow: true,
            max_flush_passes: 32,
            warn_unregistered: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid runtime config: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "max_flush_passes": 4 }"#).unwrap();
        assert_eq!(config.max_flush_passes, 4);
        assert!(config.default_use_shadow);
        assert!(config.warn_unregistered);
    }

    #[test]
    fn test_invalid_json() {
        assert!(RuntimeConfig::from_json("{ nope").is_err());
        assert!(RuntimeConfig::from_json(r#"{ "max_flush_passes": "many" }"#).is_err());
    }
}
