//! Engine configuration
//!
//! [`EngineConfig`] holds the limits and naming conventions shared by every
//! translation for one target. All fields have defaults, so an empty TOML
//! document is a valid configuration.

use serde::{Deserialize, Serialize};

/// Tunables for one translation target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Maximum alias hops before giving up
    pub max_alias_depth: usize,
    /// Maximum resource tree depth
    pub max_tree_depth: usize,
    /// Prefix of composite step keys in response documents
    pub step_key_prefix: String,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns error if the document is not valid TOML or has wrong types
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// With max alias depth
    #[inline]
    #[must_use]
    pub fn with_max_alias_depth(mut self, depth: usize) -> Self {
        self.max_alias_depth = depth;
        self
    }

    /// With max tree depth
    #[inline]
    #[must_use]
    pub fn with_max_tree_depth(mut self, depth: usize) -> Self {
        self.max_tree_depth = depth;
        self
    }

    /// With step key prefix
    #[inline]
    #[must_use]
    pub fn with_step_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.step_key_prefix = prefix.into();
        self
    }

    /// Key of the composite step at `index` (numbered from 0)
    #[inline]
    #[must_use]
    pub fn step_key(&self, index: usize) -> String {
        format!("{}{index}", self.step_key_prefix)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_alias_depth: 8,
            max_tree_depth: 128,
            step_key_prefix: "step-".to_string(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Malformed TOML
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
