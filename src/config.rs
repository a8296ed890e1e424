//! TOML configuration
//!
//! ```toml
//! root = "prompts"
//!
//! [overrides]
//! "reviewer.analyze" = "cot"
//! "shared.rubric" = "strict"
//! ```
//!
//! A relative `root` is resolved against the directory holding the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PromptError, Result};
use crate::registry::{OverrideTable, RegistryBuilder};

/// Settings loaded from a configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PromptConfig {
    /// Prompts directory
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Variant selection per dotted name
    #[serde(default)]
    pub overrides: OverrideTable,
}

impl PromptConfig {
    /// Load a config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| PromptError::io(path.display(), &e))?;
        let mut config = Self::from_str(&content)?;
        if let (Some(root), Some(dir)) = (&config.root, path.parent()) {
            if root.is_relative() {
                config.root = Some(dir.join(root));
            }
        }
        Ok(config)
    }

    /// Parse a config from a TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PromptError::Config(format!("Failed to parse config TOML: {e}")))
    }

    /// A builder whose prompts root is the configured one
    pub fn builder(&self) -> RegistryBuilder {
        match &self.root {
            Some(root) => RegistryBuilder::new().with_prompts_root(root),
            None => RegistryBuilder::new(),
        }
    }
}
