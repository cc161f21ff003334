//! Rewrite pass configuration.
//!
//! Configuration can be built in code or loaded from YAML/JSON:
//!
//! ```yaml
//! rules: SAFE_NAVIGATION | BINARY_OPERATORS
//! safeNavigationTemps: always
//! syntheticLocalPrefix: obj
//! ```

use crate::errors::ConfigError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::path::Path;

bitflags! {
    /// Rewrite rules that may run. A disabled rule declines every node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Rules: u32 {
        const SAFE_NAVIGATION = 0b00001;
        const BINARY_OPERATORS = 0b00010;
        const ARRAY_INDEX = 0b00100;
        const STATIC_CALLS = 0b01000;
        const NAMED_CONSTRUCTORS = 0b10000;
    }
}

impl Default for Rules {
    fn default() -> Self {
        Rules::all()
    }
}

/// When safe navigation binds its receiver to a temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafeNavigationTemps {
    /// Only receivers that may have side effects (calls, property reads, ...)
    #[default]
    WhenImpure,
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RewriteConfig {
    pub rules: Rules,
    pub safe_navigation_temps: SafeNavigationTemps,
    /// Prefix of the local built by keyword-argument constructor desugaring
    pub synthetic_local_prefix: String,
    /// Prefix of temporaries that keep receivers single-evaluation
    pub temporary_prefix: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            rules: Rules::default(),
            safe_navigation_temps: SafeNavigationTemps::default(),
            synthetic_local_prefix: "obj".to_string(),
            temporary_prefix: "tmp".to_string(),
        }
    }
}

impl RewriteConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&source),
            Some("json") => Self::from_json_str(&source),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn is_enabled(&self, rule: Rules) -> bool {
        self.rules.contains(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_every_rule() {
        let config = RewriteConfig::default();
        assert!(config.is_enabled(Rules::SAFE_NAVIGATION));
        assert!(config.is_enabled(Rules::NAMED_CONSTRUCTORS));
        assert_eq!(config.safe_navigation_temps, SafeNavigationTemps::WhenImpure);
    }

    #[test]
    fn test_yaml_partial_config_keeps_defaults() {
        let config = RewriteConfig::from_yaml_str("temporaryPrefix: t\n").unwrap();
        assert_eq!(config.temporary_prefix, "t");
        assert_eq!(config.synthetic_local_prefix, "obj");
        assert_eq!(config.rules, Rules::all());
    }

    #[test]
    fn test_yaml_rules_and_policy() {
        let config = RewriteConfig::from_yaml_str(
            "rules: SAFE_NAVIGATION | STATIC_CALLS\nsafeNavigationTemps: always\n",
        )
        .unwrap();
        assert!(config.is_enabled(Rules::SAFE_NAVIGATION));
        assert!(config.is_enabled(Rules::STATIC_CALLS));
        assert!(!config.is_enabled(Rules::ARRAY_INDEX));
        assert_eq!(config.safe_navigation_temps, SafeNavigationTemps::Always);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = RewriteConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
