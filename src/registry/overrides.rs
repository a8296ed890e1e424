//! Override table: config-driven variant selection

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PromptError, Result};

/// Selector that always denotes a definition's designated default variant
pub const DEFAULT_VARIANT: &str = "default";

/// Mapping from dotted name to the variant it should resolve to
///
/// Entries may name entry points or internal fragments alike. An entry for
/// a fragment affects every definition that references it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideTable(BTreeMap<String, String>);

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, variant: impl Into<String>) -> Self {
        self.insert(name, variant);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, variant: impl Into<String>) {
        self.0.insert(name.into(), variant.into());
    }

    /// Parse a `name=variant` assignment, as given on the command line
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<()> {
        let Some((name, variant)) = assignment.split_once('=') else {
            return Err(PromptError::Config(format!(
                "override '{assignment}' must look like NAME=VARIANT"
            )));
        };
        let (name, variant) = (name.trim(), variant.trim());
        if name.is_empty() || variant.is_empty() {
            return Err(PromptError::Config(format!(
                "override '{assignment}' must look like NAME=VARIANT"
            )));
        }
        self.insert(name, variant);
        Ok(())
    }

    /// Entries of `other` win over entries of `self`
    pub fn merge(&mut self, other: OverrideTable) {
        self.0.extend(other.0);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, variant) in iter {
            table.insert(name, variant);
        }
        table
    }
}
