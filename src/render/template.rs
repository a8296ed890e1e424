//! Template-backed prompts and the templating backend
//!
//! Template bodies are rendered with `minijinja`. Missing variables are
//! errors, output is never escaped, and inclusion directives are resolved
//! by name through the override table instead of the filesystem:
//!
//! ```text
//! {% include "shared/rubric.md" %}
//! ```
//!
//! The backend caches compiled templates by name, so every template is
//! named by its full inclusion chain (`outer@default>shared/rubric.md`).
//! The loader sees each distinct chain and can reject cycles with the same
//! stack discipline the flattener uses.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior, Value};
use tracing::debug;

use crate::context::Context;
use crate::error::{PromptError, Result};
use crate::naming::Reference;
use crate::node::Node;
use crate::registry::{Catalog, Prompt};
use crate::source::{Metadata, Sources, TemplateRef};

use super::reference::ReferenceResolver;
use super::stack::CHAIN_SEPARATOR;
use super::RenderSession;

/// Context key under which pre-rendered blocks are exposed
pub const BLOCKS_VAR: &str = "blocks";

/// A variant whose text comes from a template body
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePrompt {
    source: TemplateRef,
    blocks: Vec<String>,
}

impl TemplatePrompt {
    pub fn new(source: TemplateRef) -> Self {
        Self {
            source,
            blocks: Vec::new(),
        }
    }

    /// A template file, relative to the prompts root unless absolute
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(TemplateRef::File(path.into()))
    }

    pub fn inline(text: impl Into<String>) -> Self {
        Self::new(TemplateRef::Inline(text.into()))
    }

    /// Pre-render the named definition and expose it as `blocks.<last segment>`
    pub fn with_block(mut self, name: impl Into<String>) -> Self {
        self.blocks.push(name.into());
        self
    }
}

impl Prompt for TemplatePrompt {
    fn compose(&self, session: &mut RenderSession<'_>, ctx: &Context) -> Result<Node> {
        let source = session.sources().template(&self.source)?;

        let mut blocks = BTreeMap::new();
        for block in self.blocks.iter().cloned().chain(source.blocks()) {
            let key = block_key(&block)?;
            if blocks.contains_key(&key) {
                let owner = session.stack().current().map(|f| f.name.clone());
                return Err(PromptError::invalid_definition(
                    owner.unwrap_or_default(),
                    format!("block '{block}' collides with another block named '{key}'"),
                ));
            }
            let text = session.render(&block, ctx)?;
            blocks.insert(key, text);
        }

        if blocks.is_empty() {
            return session.render_template(ctx).map(Node::Text);
        }
        let ctx = ctx.clone().with(BLOCKS_VAR, Value::from_serialize(&blocks));
        session.render_template(&ctx).map(Node::Text)
    }

    fn template(&self) -> Option<&TemplateRef> {
        Some(&self.source)
    }

    fn meta(&self, sources: &Sources) -> Result<Metadata> {
        Ok(sources.template(&self.source)?.meta.clone())
    }
}

fn block_key(block: &str) -> Result<String> {
    let reference = Reference::parse(block)?;
    Ok(reference
        .name
        .rsplit('.')
        .next()
        .unwrap_or(&reference.name)
        .to_string())
}

/// Build the backend environment for a frozen catalog
pub(crate) fn build_environment(catalog: Arc<Catalog>) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_path_join_callback(|name, parent| {
        Cow::Owned(format!("{parent}{CHAIN_SEPARATOR}{name}"))
    });
    env.set_loader(move |chain| match load_chain(&catalog, chain) {
        Ok(body) => Ok(Some(body)),
        Err(e) => Err(into_backend_error(e)),
    });
    env
}

fn load_chain(catalog: &Catalog, chain: &str) -> Result<String> {
    let (mut resolver, target) = match chain.rsplit_once(CHAIN_SEPARATOR) {
        Some((prefix, target)) => (ReferenceResolver::from_chain(catalog, prefix)?, target),
        None => (ReferenceResolver::new(catalog), chain),
    };
    let resolved = resolver.resolve_reference(target)?;
    debug!(
        "Loaded template '{}@{}' for '{}'",
        resolved.canonical_name, resolved.variant, chain
    );
    Ok(resolved.source.body.clone())
}

fn into_backend_error(err: PromptError) -> minijinja::Error {
    minijinja::Error::new(ErrorKind::InvalidOperation, err.to_string()).with_source(err)
}

/// Recover a crate error from a backend error
///
/// Errors raised by the loader travel through the backend as a source and
/// come back out unchanged. Backend failures are classified by the
/// innermost backend error, since failures inside an include are wrapped.
pub(crate) fn from_backend_error(prompt: &str, err: minijinja::Error) -> PromptError {
    let mut innermost = &err;
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = current {
        if let Some(original) = e.downcast_ref::<PromptError>() {
            return original.clone();
        }
        if let Some(backend) = e.downcast_ref::<minijinja::Error>() {
            innermost = backend;
        }
        current = e.source();
    }

    let template = innermost
        .name()
        .map(template_name)
        .unwrap_or_else(|| prompt.to_string());
    match innermost.kind() {
        ErrorKind::UndefinedError => PromptError::MissingVariable {
            prompt: template,
            detail: innermost.to_string(),
        },
        ErrorKind::SyntaxError => PromptError::TemplateSyntax {
            template,
            line: innermost.line(),
            message: innermost
                .detail()
                .map(str::to_string)
                .unwrap_or_else(|| innermost.to_string()),
        },
        ErrorKind::TemplateNotFound => PromptError::unresolved(template, innermost.to_string()),
        _ => PromptError::Template {
            template,
            message: err.to_string(),
        },
    }
}

/// Dotted name of the innermost frame of an encoded chain
fn template_name(chain: &str) -> String {
    let last = chain.rsplit(CHAIN_SEPARATOR).next().unwrap_or(chain);
    Reference::parse(last)
        .map(|r| r.name)
        .unwrap_or_else(|_| last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_key_uses_last_segment() {
        assert_eq!(block_key("shared.rubric").unwrap(), "rubric");
        assert_eq!(block_key("shared/tone.md").unwrap(), "tone");
        assert_eq!(block_key("intro@short").unwrap(), "intro");
    }

    #[test]
    fn test_template_name_from_chain() {
        assert_eq!(template_name("a.b@default"), "a.b");
        assert_eq!(template_name("a.b@default>shared/rubric.md"), "shared.rubric");
    }

    #[test]
    fn test_loader_errors_round_trip() {
        let original = PromptError::cycle(vec!["a".into(), "b".into(), "a".into()]);
        let wrapped = minijinja::Error::new(ErrorKind::BadInclude, "error in include")
            .with_source(into_backend_error(original.clone()));
        assert_eq!(from_backend_error("a", wrapped), original);
    }

    #[test]
    fn test_undefined_maps_to_missing_variable() {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        let err = env
            .render_str("Hello {{ name }}", ())
            .expect_err("Should fail in strict mode");
        assert!(matches!(
            from_backend_error("greeting", err),
            PromptError::MissingVariable { .. }
        ));
    }
}
