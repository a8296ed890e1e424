//! Structured item records and their loader

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::PathBuf;

use serde_yaml::Value as YamlValue;

use crate::error::{PromptError, Result};
use crate::source::{Metadata, Sources};

/// One record of a structured item collection
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredItem {
    /// Unique within its owning list
    pub id: String,
    pub label: Option<String>,
    pub content: Option<String>,
    pub children: Vec<StructuredItem>,
    /// Every other key of the record, uninterpreted
    pub metadata: Metadata,
}

impl StructuredItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            content: None,
            children: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_child(mut self, child: StructuredItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<YamlValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The label, falling back to the id
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    /// Value used when ordering by `key`
    pub fn sort_value(&self, key: &str) -> SortValue<'_> {
        match key {
            "id" => SortValue::Text(&self.id),
            "label" if self.label.is_some() => SortValue::Text(self.display_label()),
            "content" if self.content.is_some() => {
                SortValue::Text(self.content.as_deref().unwrap_or_default())
            }
            _ => self
                .metadata
                .get(key)
                .map_or(SortValue::Missing, SortValue::from_yaml),
        }
    }
}

/// A sort key value with a total order across YAML types
///
/// A missing key compares below everything so such items sort first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortValue<'a> {
    Missing,
    Null,
    Bool(bool),
    Number(f64),
    Text(&'a str),
    /// Sequences, mappings and tagged values; mutually unordered
    Other,
}

impl<'a> SortValue<'a> {
    fn from_yaml(value: &'a YamlValue) -> Self {
        match value {
            YamlValue::Null => Self::Null,
            YamlValue::Bool(b) => Self::Bool(*b),
            YamlValue::Number(n) => n.as_f64().map_or(Self::Other, Self::Number),
            YamlValue::String(s) => Self::Text(s),
            _ => Self::Other,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Null => 1,
            Self::Bool(_) => 2,
            Self::Number(_) => 3,
            Self::Text(_) => 4,
            Self::Other => 5,
        }
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Where a collection's records come from
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemSource {
    /// No records
    #[default]
    Empty,
    /// Records given literally
    Inline(Vec<YamlValue>),
    /// A YAML file holding a list of records
    File(PathBuf),
}

impl ItemSource {
    /// Parse a literal YAML list of records
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::Inline(Vec::new()));
        }
        let value: YamlValue = serde_yaml::from_str(text)
            .map_err(|e| PromptError::malformed("inline items", format!("invalid YAML: {e}")))?;
        match value {
            YamlValue::Null => Ok(Self::Inline(Vec::new())),
            YamlValue::Sequence(records) => Ok(Self::Inline(records)),
            _ => Err(PromptError::malformed(
                "inline items",
                "expected a list of records",
            )),
        }
    }
}

/// Load records, validating the minimal schema
///
/// Records need a unique `id`; `children`, when present, must be a list of
/// records of the same shape.
pub fn load(source: &ItemSource, sources: &Sources) -> Result<Vec<StructuredItem>> {
    match source {
        ItemSource::Empty => Ok(Vec::new()),
        ItemSource::Inline(records) => parse_list(records, "items"),
        ItemSource::File(path) => {
            let data = sources.data(path)?;
            let location = path.display().to_string();
            match data.as_ref() {
                YamlValue::Null => Ok(Vec::new()),
                YamlValue::Sequence(records) => parse_list(records, &location),
                _ => Err(PromptError::malformed(location, "expected a list of records")),
            }
        }
    }
}

fn parse_list(records: &[YamlValue], location: &str) -> Result<Vec<StructuredItem>> {
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let here = format!("{location}[{idx}]");
        let item = parse_record(record, &here)?;
        if !seen.insert(item.id.clone()) {
            return Err(PromptError::malformed(
                here,
                format!("duplicate id '{}'", item.id),
            ));
        }
        items.push(item);
    }
    Ok(items)
}

fn parse_record(record: &YamlValue, location: &str) -> Result<StructuredItem> {
    let YamlValue::Mapping(map) = record else {
        return Err(PromptError::malformed(location, "record must be a mapping"));
    };

    let mut id = None;
    let mut item = StructuredItem::new(String::new());
    for (key, value) in map {
        let Some(key) = key.as_str() else {
            return Err(PromptError::malformed(location, "record keys must be strings"));
        };
        match key {
            "id" => id = Some(scalar_text(value, location, "id")?),
            "label" => item.label = optional_text(value, location, "label")?,
            "content" => item.content = optional_text(value, location, "content")?,
            "children" => {
                item.children = match value {
                    YamlValue::Null => Vec::new(),
                    YamlValue::Sequence(children) => {
                        parse_list(children, &format!("{location}.children"))?
                    }
                    _ => {
                        return Err(PromptError::malformed(
                            location,
                            "children must be a list of records",
                        ))
                    }
                }
            }
            _ => {
                item.metadata.insert(key.to_string(), value.clone());
            }
        }
    }

    item.id = id.ok_or_else(|| PromptError::malformed(location, "missing required 'id'"))?;
    Ok(item)
}

fn scalar_text(value: &YamlValue, location: &str, field: &str) -> Result<String> {
    match value {
        YamlValue::String(s) if !s.is_empty() => Ok(s.clone()),
        YamlValue::Number(n) => Ok(n.to_string()),
        YamlValue::Bool(b) => Ok(b.to_string()),
        _ => Err(PromptError::malformed(
            location,
            format!("'{field}' must be a non-empty scalar"),
        )),
    }
}

fn optional_text(value: &YamlValue, location: &str, field: &str) -> Result<Option<String>> {
    match value {
        YamlValue::Null => Ok(None),
        YamlValue::String(s) => Ok(Some(s.clone())),
        _ => scalar_text(value, location, field).map(Some),
    }
}
