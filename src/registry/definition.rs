//! Prompt definitions: a dotted name bound to a table of variants

use std::fmt;
use std::sync::Arc;

use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::context::Context;
use crate::error::{PromptError, Result};
use crate::naming;
use crate::node::Node;
use crate::render::RenderSession;
use crate::source::{Metadata, Sources, TemplateRef};

use super::overrides::DEFAULT_VARIANT;

/// Composition logic of one variant
///
/// `compose` produces the render tree for a context. Nested definitions are
/// referenced with [`Node::include`] and rendered by the session, which also
/// guards against reference cycles.
pub trait Prompt: Send + Sync {
    fn compose(&self, session: &mut RenderSession<'_>, ctx: &Context) -> Result<Node>;

    /// The template body backing this variant, if any
    ///
    /// Only template-backed variants can be the target of an inclusion
    /// directive.
    fn template(&self) -> Option<&TemplateRef> {
        None
    }

    /// Informational metadata of this variant
    fn meta(&self, _sources: &Sources) -> Result<Metadata> {
        Ok(Metadata::new())
    }
}

/// A variant whose composition is a plain function of the context
pub struct FnPrompt<F> {
    compose: F,
}

impl<F> FnPrompt<F>
where
    F: Fn(&Context) -> Result<Node> + Send + Sync,
{
    pub fn new(compose: F) -> Self {
        Self { compose }
    }
}

impl<F> Prompt for FnPrompt<F>
where
    F: Fn(&Context) -> Result<Node> + Send + Sync,
{
    fn compose(&self, _session: &mut RenderSession<'_>, ctx: &Context) -> Result<Node> {
        (self.compose)(ctx)
    }
}

/// Shorthand for [`FnPrompt::new`]
pub fn compose_fn<F>(compose: F) -> FnPrompt<F>
where
    F: Fn(&Context) -> Result<Node> + Send + Sync,
{
    FnPrompt::new(compose)
}

/// Whether a definition is listed as an entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Listed by enumeration
    #[default]
    EntryPoint,
    /// Only reachable by reference
    Fragment,
}

/// The continuation handed to a decorator
pub type Next<'a> = &'a mut dyn FnMut(&Context) -> Result<String>;

/// Behavior wrapped around every render of a definition
///
/// Decorators see the final text of the definition they are attached to and
/// may change the context going in or the text coming out.
pub trait Decorator: Send + Sync {
    fn around(&self, name: &str, ctx: &Context, next: Next<'_>) -> Result<String>;
}

/// Strips leading and trailing whitespace from the rendered text
#[derive(Debug, Clone, Copy, Default)]
pub struct Trimmed;

impl Decorator for Trimmed {
    fn around(&self, _name: &str, ctx: &Context, next: Next<'_>) -> Result<String> {
        next(ctx).map(|text| text.trim().to_string())
    }
}

/// Logs each render at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct Traced;

impl Decorator for Traced {
    fn around(&self, name: &str, ctx: &Context, next: Next<'_>) -> Result<String> {
        debug!("Rendering '{}' with {} context keys", name, ctx.len());
        let result = next(ctx);
        match &result {
            Ok(text) => debug!("Rendered '{}' ({} bytes)", name, text.len()),
            Err(e) => debug!("Render of '{}' failed: {}", name, e),
        }
        result
    }
}

/// Apply `decorators` outermost-first around `inner`
pub(crate) fn decorate(
    decorators: &[Arc<dyn Decorator>],
    name: &str,
    ctx: &Context,
    inner: Next<'_>,
) -> Result<String> {
    match decorators.split_first() {
        None => inner(ctx),
        Some((outer, rest)) => {
            outer.around(name, ctx, &mut |c: &Context| decorate(rest, name, c, &mut *inner))
        }
    }
}

/// A named, versioned unit of composition
///
/// The default variant is addressed by the reserved selector `default`;
/// further variants are added by name.
#[derive(Clone)]
pub struct PromptDefinition {
    name: String,
    default: Arc<dyn Prompt>,
    variants: Vec<(String, Arc<dyn Prompt>)>,
    visibility: Visibility,
    metadata: Metadata,
    decorators: Vec<Arc<dyn Decorator>>,
}

impl PromptDefinition {
    /// An entry point with the given default variant
    pub fn new(name: impl Into<String>, prompt: impl Prompt + 'static) -> Self {
        Self::from_arc(name, Arc::new(prompt))
    }

    /// An internal fragment with the given default variant
    pub fn fragment(name: impl Into<String>, prompt: impl Prompt + 'static) -> Self {
        Self::new(name, prompt).with_visibility(Visibility::Fragment)
    }

    pub fn from_arc(name: impl Into<String>, prompt: Arc<dyn Prompt>) -> Self {
        Self {
            name: name.into(),
            default: prompt,
            variants: Vec::new(),
            visibility: Visibility::EntryPoint,
            metadata: Metadata::new(),
            decorators: Vec::new(),
        }
    }

    /// Add a named variant
    pub fn with_variant(self, variant: impl Into<String>, prompt: impl Prompt + 'static) -> Self {
        self.with_variant_arc(variant, Arc::new(prompt))
    }

    pub fn with_variant_arc(mut self, variant: impl Into<String>, prompt: Arc<dyn Prompt>) -> Self {
        self.variants.push((variant.into(), prompt));
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Attach an informational key/value pair, e.g. a suggested model tier
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<YamlValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Wrap every render of this definition; the first one attached runs outermost
    pub fn with_decorator(mut self, decorator: impl Decorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_fragment(&self) -> bool {
        self.visibility == Visibility::Fragment
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub(crate) fn decorators(&self) -> &[Arc<dyn Decorator>] {
        &self.decorators
    }

    /// All selectors, `default` first, then named variants in insertion order
    pub fn variant_names(&self) -> Vec<&str> {
        std::iter::once(DEFAULT_VARIANT)
            .chain(self.variants.iter().map(|(name, _)| name.as_str()))
            .collect()
    }

    /// Look up a variant by selector
    pub fn variant(&self, selector: &str) -> Option<&Arc<dyn Prompt>> {
        if selector == DEFAULT_VARIANT {
            return Some(&self.default);
        }
        self.variants
            .iter()
            .find(|(name, _)| name == selector)
            .map(|(_, prompt)| prompt)
    }

    pub fn default_variant(&self) -> &Arc<dyn Prompt> {
        &self.default
    }

    /// Check the name and the variant table
    pub(crate) fn validate(&self) -> Result<()> {
        naming::validate(&self.name)?;
        for (idx, (variant, _)) in self.variants.iter().enumerate() {
            naming::validate_segment(&self.name, variant)?;
            if variant == DEFAULT_VARIANT {
                return Err(PromptError::duplicate(
                    &self.name,
                    format!("'{DEFAULT_VARIANT}' is reserved for the default variant"),
                ));
            }
            if self.variants[..idx].iter().any(|(other, _)| other == variant) {
                return Err(PromptError::duplicate(
                    &self.name,
                    format!("variant '{variant}' declared twice"),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn push_variant(&mut self, variant: String, prompt: Arc<dyn Prompt>) {
        self.variants.push((variant, prompt));
    }

    /// Whether `other` is the very same definition, not merely an equal-looking one
    pub(crate) fn same_as(&self, other: &Self) -> bool {
        self.name == other.name
            && self.visibility == other.visibility
            && self.metadata == other.metadata
            && same_prompt(&self.default, &other.default)
            && self.variants.len() == other.variants.len()
            && self
                .variants
                .iter()
                .zip(&other.variants)
                .all(|((a, pa), (b, pb))| a == b && same_prompt(pa, pb))
            && self.decorators.len() == other.decorators.len()
            && self
                .decorators
                .iter()
                .zip(&other.decorators)
                .all(|(a, b)| Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ())
    }
}

pub(crate) fn same_prompt(a: &Arc<dyn Prompt>, b: &Arc<dyn Prompt>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl fmt::Debug for PromptDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptDefinition")
            .field("name", &self.name)
            .field("variants", &self.variant_names())
            .field("visibility", &self.visibility)
            .field("metadata", &self.metadata)
            .field("decorators", &self.decorators.len())
            .finish()
    }
}
