//! Name and version resolution
//!
//! Definitions are registered on a [`RegistryBuilder`] during setup, then
//! frozen together with an [`OverrideTable`] into a [`Registry`]. A frozen
//! registry is never mutated again and can serve concurrent renders: all
//! per-render state lives in a [`RenderSession`].
//!
//! Resolution of a dotted name:
//! 1. an override table entry for the name selects that variant
//! 2. otherwise the definition's default variant is used
//! 3. a selector that matches no variant is an error, never a silent fallback

mod definition;
mod overrides;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::Environment;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{PromptError, Result};
use crate::naming::{self, Reference};
use crate::render::{template, ReferenceResolver, RenderSession};
use crate::source::{Metadata, Sources};

pub use definition::{
    compose_fn, Decorator, FnPrompt, Next, Prompt, PromptDefinition, Traced, Trimmed, Visibility,
};
pub use overrides::{OverrideTable, DEFAULT_VARIANT};

pub(crate) use definition::decorate;

/// How a variant was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No override entry; the designated default
    Default,
    /// Selected by the override table
    Override,
    /// Named explicitly with `name@variant`
    Pinned,
}

/// The active variant of a definition
#[derive(Clone)]
pub struct Resolved<'r> {
    definition: &'r PromptDefinition,
    variant: &'r str,
    prompt: &'r Arc<dyn Prompt>,
    origin: Resolution,
}

impl<'r> Resolved<'r> {
    pub fn name(&self) -> &'r str {
        self.definition.name()
    }

    /// Selector of the chosen variant, `default` for the default one
    pub fn variant(&self) -> &'r str {
        self.variant
    }

    pub fn origin(&self) -> Resolution {
        self.origin
    }

    pub fn definition(&self) -> &'r PromptDefinition {
        self.definition
    }

    pub fn prompt(&self) -> &'r Arc<dyn Prompt> {
        self.prompt
    }
}

impl fmt::Debug for Resolved<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("name", &self.name())
            .field("variant", &self.variant)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Collects definitions before the registry is frozen
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    definitions: Vec<PromptDefinition>,
    index: HashMap<String, usize>,
    root: Option<PathBuf>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that relative template and data paths are resolved against
    pub fn with_prompts_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn set_prompts_root(&mut self, root: impl Into<PathBuf>) {
        self.root = Some(root.into());
    }

    pub fn prompts_root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Register a definition under its name
    ///
    /// Registering the very same definition again is a no-op; binding the
    /// name to anything else is a duplicate registration.
    pub fn register(&mut self, definition: PromptDefinition) -> Result<()> {
        definition.validate()?;

        if let Some(&idx) = self.index.get(definition.name()) {
            if self.definitions[idx].same_as(&definition) {
                return Ok(());
            }
            return Err(PromptError::duplicate(
                definition.name(),
                "name is already bound to a different definition",
            ));
        }

        debug!("Registered prompt '{}'", definition.name());
        self.index
            .insert(definition.name().to_string(), self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    /// Add a variant to an already registered definition
    pub fn add_variant(
        &mut self,
        name: &str,
        variant: &str,
        prompt: Arc<dyn Prompt>,
    ) -> Result<()> {
        let Some(&idx) = self.index.get(name) else {
            return Err(PromptError::unresolved(name, "no such prompt"));
        };
        naming::validate_segment(name, variant)?;

        let definition = &mut self.definitions[idx];
        if variant == DEFAULT_VARIANT {
            return Err(PromptError::duplicate(
                name,
                format!("'{DEFAULT_VARIANT}' is reserved for the default variant"),
            ));
        }
        if let Some(existing) = definition.variant(variant) {
            if definition::same_prompt(existing, &prompt) {
                return Ok(());
            }
            return Err(PromptError::duplicate(
                name,
                format!("variant '{variant}' is already bound"),
            ));
        }
        definition.push_variant(variant.to_string(), prompt);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Freeze the registered definitions together with an override table
    pub fn build(self, overrides: OverrideTable) -> Registry {
        for (name, variant) in overrides.iter() {
            match self.index.get(name) {
                None => warn!("Override for unknown prompt '{}' ignored", name),
                Some(&idx) if self.definitions[idx].variant(variant).is_none() => warn!(
                    "Override '{}' selects unknown variant '{}'; resolving it will fail",
                    name, variant
                ),
                Some(_) => {}
            }
        }

        let catalog = Arc::new(Catalog {
            definitions: self.definitions,
            index: self.index,
            overrides,
            sources: Sources::new(self.root),
        });
        let env = template::build_environment(Arc::clone(&catalog));
        Registry { catalog, env }
    }
}

/// The frozen resolution tables shared with the templating backend
pub(crate) struct Catalog {
    definitions: Vec<PromptDefinition>,
    index: HashMap<String, usize>,
    overrides: OverrideTable,
    pub(crate) sources: Sources,
}

impl Catalog {
    pub(crate) fn definition(&self, name: &str) -> Result<&PromptDefinition> {
        self.index
            .get(name)
            .map(|&idx| &self.definitions[idx])
            .ok_or_else(|| PromptError::unresolved(name, "no such prompt"))
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<Resolved<'_>> {
        let definition = self.definition(name)?;
        match self.overrides.get(name) {
            Some(selector) => {
                debug!("Override selects variant '{}' of '{}'", selector, name);
                select(definition, selector, Resolution::Override)
            }
            None => select(definition, DEFAULT_VARIANT, Resolution::Default),
        }
    }

    /// Resolve a canonical reference, honoring an explicit variant pin
    pub(crate) fn resolve_reference(&self, reference: &Reference) -> Result<Resolved<'_>> {
        match &reference.variant {
            Some(variant) => select(self.definition(&reference.name)?, variant, Resolution::Pinned),
            None => self.resolve(&reference.name),
        }
    }
}

fn select<'r>(
    definition: &'r PromptDefinition,
    selector: &str,
    origin: Resolution,
) -> Result<Resolved<'r>> {
    let names = definition.variant_names();
    let Some(variant) = names.iter().copied().find(|name| *name == selector) else {
        return Err(PromptError::unresolved(
            definition.name(),
            format!(
                "variant '{}' not found (available: {})",
                selector,
                names.join(", ")
            ),
        ));
    };
    let prompt = definition
        .variant(variant)
        .ok_or_else(|| PromptError::unresolved(definition.name(), "variant vanished"))?;
    Ok(Resolved {
        definition,
        variant,
        prompt,
        origin,
    })
}

/// Frozen registry: resolves names and renders them
pub struct Registry {
    catalog: Arc<Catalog>,
    env: Environment<'static>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Resolve a dotted name to its active variant
    pub fn resolve(&self, name: &str) -> Result<Resolved<'_>> {
        self.catalog.resolve(name)
    }

    /// Resolve a reference path, which may pin a variant with `@variant`
    pub fn resolve_reference(&self, reference: &str) -> Result<Resolved<'_>> {
        self.catalog.resolve_reference(&Reference::parse(reference)?)
    }

    pub fn definition(&self, name: &str) -> Option<&PromptDefinition> {
        self.catalog.definition(name).ok()
    }

    /// Entry points in registration order; fragments are left out
    pub fn list_visible(&self) -> Vec<&str> {
        self.names(false)
    }

    /// Registered names in registration order
    pub fn names(&self, include_fragments: bool) -> Vec<&str> {
        self.catalog
            .definitions
            .iter()
            .filter(|def| include_fragments || !def.is_fragment())
            .map(|def| def.name())
            .collect()
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.catalog.overrides
    }

    pub fn sources(&self) -> &Sources {
        &self.catalog.sources
    }

    /// Render a definition's active variant to text
    pub fn render(&self, name: &str, ctx: &Context) -> Result<String> {
        self.session().render(name, ctx)
    }

    /// Start an empty render session
    pub fn session(&self) -> RenderSession<'_> {
        RenderSession::new(self)
    }

    /// A resolver for inclusion directives with its own inclusion stack
    pub fn reference_resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(&self.catalog)
    }

    /// Informational metadata of the active variant
    ///
    /// Definition-level metadata overlaid with the variant's own, e.g. a
    /// template's front matter.
    pub fn meta(&self, name: &str) -> Result<Metadata> {
        let resolved = self.resolve(name)?;
        let mut meta = resolved.definition().metadata().clone();
        meta.extend(resolved.prompt().meta(self.sources())?);
        Ok(meta)
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn env(&self) -> &Environment<'static> {
        &self.env
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("definitions", &self.catalog.definitions)
            .field("overrides", &self.catalog.overrides)
            .field("root", &self.catalog.sources.root())
            .finish()
    }
}
