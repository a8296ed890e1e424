//! Template and data sources
//!
//! A template source is a document with an optional YAML front matter
//! header followed by a body for the templating backend:
//!
//! ```text
//! ---
//! description: Analyze a document
//! model: large
//! ---
//! Analyze {{ document }}.
//! ```
//!
//! [`Sources`] resolves relative paths against the prompts root and caches
//! parsed files by path.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::error::{PromptError, Result};

/// Informational key/value pairs attached to a definition or template
pub type Metadata = BTreeMap<String, YamlValue>;

/// Front matter key listing blocks to pre-render
pub const BLOCKS_KEY: &str = "blocks";
/// Front matter key marking a file as an internal fragment
pub const FRAGMENT_KEY: &str = "fragment";

/// A parsed template document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateSource {
    pub meta: Metadata,
    pub body: String,
}

impl TemplateSource {
    /// Split the front matter header from the body
    ///
    /// `origin` only names the document in error messages. A header that is
    /// never closed is treated as part of the body.
    pub fn parse(text: &str, origin: &str) -> Result<Self> {
        let Some(rest) = text
            .strip_prefix("---")
            .and_then(|r| r.strip_prefix('\n').or_else(|| r.strip_prefix("\r\n")))
        else {
            return Ok(Self {
                meta: Metadata::new(),
                body: text.to_string(),
            });
        };

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if line.trim_end() == "---" {
                let header = &rest[..offset];
                let body = &rest[offset + line.len()..];
                return Ok(Self {
                    meta: parse_header(header, origin)?,
                    body: body.to_string(),
                });
            }
            offset += line.len();
        }

        Ok(Self {
            meta: Metadata::new(),
            body: text.to_string(),
        })
    }

    /// Block names declared in the header
    pub fn blocks(&self) -> Vec<String> {
        match self.meta.get(BLOCKS_KEY) {
            Some(YamlValue::Sequence(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(YamlValue::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }

    /// Whether the header marks this document as an internal fragment
    pub fn is_fragment(&self) -> bool {
        self.meta
            .get(FRAGMENT_KEY)
            .and_then(YamlValue::as_bool)
            .unwrap_or(false)
    }
}

fn parse_header(header: &str, origin: &str) -> Result<Metadata> {
    if header.trim().is_empty() {
        return Ok(Metadata::new());
    }
    let value: YamlValue =
        serde_yaml::from_str(header).map_err(|e| PromptError::FrontMatter {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;

    match value {
        YamlValue::Null => Ok(Metadata::new()),
        YamlValue::Mapping(map) => {
            let mut meta = Metadata::new();
            for (key, value) in map {
                let YamlValue::String(key) = key else {
                    return Err(PromptError::FrontMatter {
                        origin: origin.to_string(),
                        message: "header keys must be strings".to_string(),
                    });
                };
                meta.insert(key, value);
            }
            Ok(meta)
        }
        _ => Err(PromptError::FrontMatter {
            origin: origin.to_string(),
            message: "header must be a mapping".to_string(),
        }),
    }
}

/// Where a template body comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    /// Source text held in memory
    Inline(String),
    /// A file, relative to the prompts root unless absolute
    File(PathBuf),
}

/// Path resolution and parsed-source cache
///
/// Entries are immutable once inserted. Two threads racing to fill the same
/// key both parse the same file and one result wins, which is harmless.
#[derive(Debug, Default)]
pub struct Sources {
    root: Option<PathBuf>,
    templates: RwLock<HashMap<PathBuf, Arc<TemplateSource>>>,
    data: RwLock<HashMap<PathBuf, Arc<YamlValue>>>,
}

impl Sources {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// The prompts root, if one was configured
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolve a path against the prompts root
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        match &self.root {
            Some(root) => Ok(root.join(path)),
            None => Err(PromptError::Config(format!(
                "a prompts root must be configured to load '{}'",
                path.display()
            ))),
        }
    }

    /// Load and parse a template source
    pub fn template(&self, source: &TemplateRef) -> Result<Arc<TemplateSource>> {
        match source {
            TemplateRef::Inline(text) => Ok(Arc::new(TemplateSource::parse(text, "inline template")?)),
            TemplateRef::File(path) => {
                let path = self.resolve_path(path)?;
                if let Some(hit) = read_cache(&self.templates, &path) {
                    return Ok(hit);
                }
                debug!("Loading template source {:?}", path);
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| PromptError::io(path.display(), &e))?;
                let parsed = Arc::new(TemplateSource::parse(&text, &path.display().to_string())?);
                Ok(write_cache(&self.templates, path, parsed))
            }
        }
    }

    /// Load and parse a YAML data file
    pub fn data(&self, path: &Path) -> Result<Arc<YamlValue>> {
        let path = self.resolve_path(path)?;
        if let Some(hit) = read_cache(&self.data, &path) {
            return Ok(hit);
        }
        debug!("Loading data file {:?}", path);
        let text =
            std::fs::read_to_string(&path).map_err(|e| PromptError::io(path.display(), &e))?;
        if text.trim().is_empty() {
            return Ok(write_cache(&self.data, path, Arc::new(YamlValue::Null)));
        }
        let value: YamlValue = serde_yaml::from_str(&text).map_err(|e| {
            PromptError::malformed(path.display().to_string(), format!("invalid YAML: {e}"))
        })?;
        Ok(write_cache(&self.data, path, Arc::new(value)))
    }
}

fn read_cache<T>(cache: &RwLock<HashMap<PathBuf, Arc<T>>>, path: &Path) -> Option<Arc<T>> {
    cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(path)
        .cloned()
}

fn write_cache<T>(cache: &RwLock<HashMap<PathBuf, Arc<T>>>, path: PathBuf, value: Arc<T>) -> Arc<T> {
    cache
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(path)
        .or_insert(value)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_front_matter() {
        let src = TemplateSource::parse(
            "---\ndescription: Analyze\nmodel: large\n---\nBody {{ x }}\n",
            "t",
        )
        .expect("Should parse");
        assert_eq!(src.body, "Body {{ x }}\n");
        assert_eq!(
            src.meta.get("model").and_then(YamlValue::as_str),
            Some("large")
        );
    }

    #[test]
    fn test_parse_without_front_matter() {
        let src = TemplateSource::parse("Just a body", "t").expect("Should parse");
        assert!(src.meta.is_empty());
        assert_eq!(src.body, "Just a body");
    }

    #[test]
    fn test_unterminated_header_is_body() {
        let text = "---\nnot: closed\nstill body";
        let src = TemplateSource::parse(text, "t").expect("Should parse");
        assert!(src.meta.is_empty());
        assert_eq!(src.body, text);
    }

    #[test]
    fn test_empty_header() {
        let src = TemplateSource::parse("---\n---\nbody", "t").expect("Should parse");
        assert!(src.meta.is_empty());
        assert_eq!(src.body, "body");
    }

    #[test]
    fn test_non_mapping_header_is_error() {
        let result = TemplateSource::parse("---\n- a\n- b\n---\nbody", "t");
        assert!(matches!(result, Err(PromptError::FrontMatter { .. })));
    }

    #[test]
    fn test_blocks_and_fragment_flags() {
        let src = TemplateSource::parse(
            "---\nfragment: true\nblocks: [shared.rubric, shared.tone]\n---\n",
            "t",
        )
        .expect("Should parse");
        assert!(src.is_fragment());
        assert_eq!(src.blocks(), vec!["shared.rubric", "shared.tone"]);
    }

    #[test]
    fn test_relative_path_needs_root() {
        let sources = Sources::new(None);
        let result = sources.template(&TemplateRef::File(PathBuf::from("a.md")));
        assert!(matches!(result, Err(PromptError::Config(_))));
    }

    #[test]
    fn test_file_sources_are_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.md"), "---\nmodel: small\n---\nhello").unwrap();
        let sources = Sources::new(Some(dir.path().to_path_buf()));
        let tref = TemplateRef::File(PathBuf::from("a.md"));

        let first = sources.template(&tref).expect("Should load");
        std::fs::write(dir.path().join("a.md"), "changed").unwrap();
        let second = sources.template(&tref).expect("Should load");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.body, "hello");
    }

    #[test]
    fn test_data_invalid_yaml_is_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("items.yaml"), "- id: [unclosed").unwrap();
        let sources = Sources::new(Some(dir.path().to_path_buf()));
        let result = sources.data(Path::new("items.yaml"));
        assert!(matches!(result, Err(PromptError::MalformedDataItem { .. })));
    }
}
