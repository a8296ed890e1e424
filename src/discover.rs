//! Prompts directory discovery
//!
//! Files map to definitions by their path below the root:
//!
//! - `reviewer/analyze.md` becomes the definition `reviewer.analyze`
//! - `reviewer/analyze@cot.md` becomes its variant `cot`
//! - `shared/rules.yaml` becomes an item-set fragment `shared.rules`
//!
//! Template files whose front matter sets `fragment: true` are registered
//! as fragments; everything else is an entry point. Hidden files and
//! directories are skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{PromptError, Result};
use crate::items::{ItemPrompt, StaticItems};
use crate::naming::Reference;
use crate::registry::{Prompt, PromptDefinition, RegistryBuilder, Visibility};
use crate::render::TemplatePrompt;
use crate::source::TemplateSource;

const TEMPLATE_EXTENSIONS: &[&str] = &["md", "jinja", "j2", "txt"];
const DATA_EXTENSIONS: &[&str] = &["yaml", "yml"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Template,
    Items,
}

#[derive(Debug)]
struct Found {
    reference: Reference,
    path: PathBuf,
    kind: SourceKind,
}

impl Found {
    fn prompt(&self) -> Arc<dyn Prompt> {
        match self.kind {
            SourceKind::Template => Arc::new(TemplatePrompt::file(&self.path)),
            SourceKind::Items => Arc::new(ItemPrompt::new(StaticItems::file(&self.path))),
        }
    }

    fn visibility(&self) -> Result<Visibility> {
        if self.kind == SourceKind::Items {
            return Ok(Visibility::Fragment);
        }
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| PromptError::io(self.path.display(), &e))?;
        let source = TemplateSource::parse(&text, &self.path.display().to_string())?;
        Ok(if source.is_fragment() {
            Visibility::Fragment
        } else {
            Visibility::EntryPoint
        })
    }
}

/// Register every prompt file below `root`
///
/// Returns the names of the registered definitions in discovery order,
/// which is sorted by path. The builder's prompts root is set to `root`
/// unless one was configured already.
pub fn discover(root: &Path, builder: &mut RegistryBuilder) -> Result<Vec<String>> {
    let root = root
        .canonicalize()
        .map_err(|e| PromptError::io(root.display(), &e))?;
    if builder.prompts_root().is_none() {
        builder.set_prompts_root(root.clone());
    }

    let mut defaults = Vec::new();
    let mut variants = Vec::new();

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|e| PromptError::Io {
            path: e.path().unwrap_or(root.as_path()).display().to_string(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = source_kind(entry.path()) else {
            continue;
        };

        let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
        let reference = Reference::parse(&relative.to_string_lossy())?;
        debug!(?relative, "Discovered prompt source '{}'", reference);

        let found = Found {
            reference,
            path: entry.path().to_path_buf(),
            kind,
        };
        if found.reference.variant.is_some() {
            variants.push(found);
        } else {
            defaults.push(found);
        }
    }

    let mut names = Vec::with_capacity(defaults.len());
    for found in defaults {
        let definition = PromptDefinition::from_arc(found.reference.name.clone(), found.prompt())
            .with_visibility(found.visibility()?);
        builder.register(definition)?;
        names.push(found.reference.name);
    }

    for found in variants {
        let name = &found.reference.name;
        if !builder.contains(name) {
            return Err(PromptError::invalid_definition(
                name,
                format!(
                    "variant file '{}' has no default file",
                    found.path.display()
                ),
            ));
        }
        let variant = found.reference.variant.as_deref().unwrap_or_default();
        builder.add_variant(name, variant, found.prompt())?;
    }

    Ok(names)
}

fn source_kind(path: &Path) -> Option<SourceKind> {
    let ext = path.extension()?.to_str()?;
    if TEMPLATE_EXTENSIONS.contains(&ext) {
        Some(SourceKind::Template)
    } else if DATA_EXTENSIONS.contains(&ext) {
        Some(SourceKind::Items)
    } else {
        None
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_maps_paths_to_names() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "reviewer/analyze.md", "Analyze");
        write(temp.path(), "reviewer/analyze@cot.md", "Think first");
        write(temp.path(), "shared/rules.yaml", "- id: a\n");
        write(temp.path(), "shared/tone.md", "---\nfragment: true\n---\nBe kind");
        write(temp.path(), "notes.rst", "ignored");
        write(temp.path(), ".hidden/secret.md", "ignored");

        let mut builder = RegistryBuilder::new();
        let names = discover(temp.path(), &mut builder).expect("Should discover");
        assert_eq!(
            names,
            vec!["reviewer.analyze", "shared.rules", "shared.tone"]
        );

        let registry = builder.build(Default::default());
        assert_eq!(registry.list_visible(), vec!["reviewer.analyze"]);
        let definition = registry.definition("reviewer.analyze").unwrap();
        assert_eq!(definition.variant_names(), vec!["default", "cot"]);
    }

    #[test]
    fn test_variant_without_default_is_invalid() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "orphan@v2.md", "Nope");

        let mut builder = RegistryBuilder::new();
        let result = discover(temp.path(), &mut builder);
        assert!(matches!(
            result,
            Err(PromptError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_same_name_from_two_files_is_duplicate() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/b.md", "template");
        write(temp.path(), "a/b.yaml", "- id: x\n");

        let mut builder = RegistryBuilder::new();
        let result = discover(temp.path(), &mut builder);
        assert!(matches!(
            result,
            Err(PromptError::DuplicateRegistration { .. })
        ));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let temp = TempDir::new().unwrap();
        let mut builder = RegistryBuilder::new();
        let result = discover(&temp.path().join("nope"), &mut builder);
        assert!(matches!(result, Err(PromptError::Io { .. })));
    }
}
