//! Ordering, selection and formatting of item collections

use std::path::PathBuf;

use serde_yaml::Value as YamlValue;

use crate::context::Context;
use crate::error::Result;
use crate::node::Node;
use crate::registry::Prompt;
use crate::render::RenderSession;
use crate::source::{Metadata, Sources};

use super::record::{self, ItemSource, StructuredItem};

const INDENT: &str = "  ";

/// A collection of structured items and the hooks that shape its output
///
/// Only [`ItemSet::source`] is required. The pipeline is
/// load, [`order`], [`ItemSet::select`], then [`ItemSet::format`] for each
/// surviving item with its 1-based position.
pub trait ItemSet: Send + Sync {
    fn source(&self) -> &ItemSource;

    /// Metadata key to order by; `None` keeps the source order
    fn sort_key(&self) -> Option<&str> {
        None
    }

    /// Filter or rearrange the ordered items
    fn select(&self, items: Vec<StructuredItem>, _ctx: &Context) -> Result<Vec<StructuredItem>> {
        Ok(items)
    }

    fn format(&self, index: usize, item: &StructuredItem, _ctx: &Context) -> Result<String> {
        Ok(format_item(index, item, 0))
    }

    /// Informational metadata reported for the owning definition
    fn metadata(&self) -> Metadata {
        Metadata::new()
    }
}

/// Stable sort by the value at `sort_key`; items lacking the key come first
pub fn order(mut items: Vec<StructuredItem>, sort_key: Option<&str>) -> Vec<StructuredItem> {
    if let Some(key) = sort_key {
        items.sort_by(|a, b| a.sort_value(key).compare(&b.sort_value(key)));
    }
    items
}

/// Default item line: `{index}. **{label}** -- {content}`
///
/// Children follow on their own lines, one level deeper, numbered from 1 in
/// source order.
pub fn format_item(index: usize, item: &StructuredItem, depth: usize) -> String {
    let mut out = INDENT.repeat(depth);
    out.push_str(&format!("{}. **{}**", index, item.display_label()));
    match &item.content {
        Some(content) if !content.is_empty() => out.push_str(&format!(" -- {}", content)),
        _ => {}
    }
    for (idx, child) in item.children.iter().enumerate() {
        out.push('\n');
        out.push_str(&format_item(idx + 1, child, depth + 1));
    }
    out
}

/// Run the full pipeline, one text node per surviving item
pub fn render<S: ItemSet + ?Sized>(set: &S, sources: &Sources, ctx: &Context) -> Result<Node> {
    let items = record::load(set.source(), sources)?;
    let items = set.select(order(items, set.sort_key()), ctx)?;
    let lines = items
        .iter()
        .enumerate()
        .map(|(idx, item)| set.format(idx + 1, item, ctx).map(Node::Text))
        .collect::<Result<Vec<_>>>()?;
    Ok(Node::Sequence(lines))
}

/// Adapts an [`ItemSet`] into a definition variant
#[derive(Debug, Clone)]
pub struct ItemPrompt<S> {
    set: S,
}

impl<S: ItemSet> ItemPrompt<S> {
    pub fn new(set: S) -> Self {
        Self { set }
    }

    pub fn set(&self) -> &S {
        &self.set
    }
}

impl<S: ItemSet> Prompt for ItemPrompt<S> {
    fn compose(&self, session: &mut RenderSession<'_>, ctx: &Context) -> Result<Node> {
        render(&self.set, session.sources(), ctx)
    }

    fn meta(&self, _sources: &Sources) -> Result<Metadata> {
        Ok(self.set.metadata())
    }
}

/// An item set with the default hooks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticItems {
    source: ItemSource,
    sort_key: Option<String>,
    metadata: Metadata,
}

impl StaticItems {
    pub fn new(source: ItemSource) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// Items from a YAML file relative to the prompts root
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(ItemSource::File(path.into()))
    }

    /// Items given as a literal YAML list
    pub fn inline(yaml: &str) -> Result<Self> {
        ItemSource::from_yaml(yaml).map(Self::new)
    }

    pub fn sorted_by(mut self, key: impl Into<String>) -> Self {
        self.sort_key = Some(key.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<YamlValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl ItemSet for StaticItems {
    fn source(&self) -> &ItemSource {
        &self.source
    }

    fn sort_key(&self) -> Option<&str> {
        self.sort_key.as_deref()
    }

    fn metadata(&self) -> Metadata {
        self.metadata.clone()
    }
}
