//! Promptree - composable, versioned prompt definitions
//!
//! Prompts are registered under dotted names, each with a default variant
//! and optional named variants. A definition composes a tree of text,
//! nested definitions and structured item lists; rendering flattens that
//! tree to a single string. Which variant runs is decided by an override
//! table frozen together with the definitions.
//!
//! # Example
//!
//! ```rust
//! use promptree::{compose_fn, Context, Node, OverrideTable, PromptDefinition, Registry, TemplatePrompt};
//!
//! let mut builder = Registry::builder();
//! builder.register(PromptDefinition::fragment(
//!     "shared.tone",
//!     TemplatePrompt::inline("Be concise."),
//! ))?;
//! builder.register(
//!     PromptDefinition::new(
//!         "reviewer.analyze",
//!         compose_fn(|_| {
//!             Ok(Node::sequence([
//!                 Node::text("Review the document."),
//!                 Node::include("shared.tone"),
//!             ]))
//!         }),
//!     )
//!     .with_variant("strict", TemplatePrompt::inline("Review {{ doc }} strictly.")),
//! )?;
//!
//! let ctx = Context::new().with("doc", "README");
//!
//! let registry = builder.build(OverrideTable::new());
//! let text = registry.render("reviewer.analyze", &ctx)?;
//! assert_eq!(text, "Review the document.\n\nBe concise.");
//! # Ok::<(), promptree::PromptError>(())
//! ```
//!
//! The same definitions frozen with an override entry run the other variant:
//!
//! ```rust
//! # use promptree::{Context, OverrideTable, PromptDefinition, Registry, TemplatePrompt};
//! # let mut builder = Registry::builder();
//! # builder.register(
//! #     PromptDefinition::new("reviewer.analyze", TemplatePrompt::inline("Review."))
//! #         .with_variant("strict", TemplatePrompt::inline("Review {{ doc }} strictly.")),
//! # )?;
//! let registry = builder.build(OverrideTable::new().with("reviewer.analyze", "strict"));
//! let text = registry.render("reviewer.analyze", &Context::new().with("doc", "README"))?;
//! assert_eq!(text, "Review README strictly.");
//! # Ok::<(), promptree::PromptError>(())
//! ```

pub mod config;
pub mod context;
pub mod discover;
pub mod error;
pub mod items;
pub mod naming;
pub mod node;
pub mod registry;
pub mod render;
pub mod source;

pub use config::PromptConfig;
pub use context::Context;
pub use discover::discover;
pub use error::{PromptError, Result};
pub use items::{ItemPrompt, ItemSet, ItemSource, StaticItems, StructuredItem};
pub use node::{Include, Node};
pub use registry::{
    compose_fn, Decorator, OverrideTable, Prompt, PromptDefinition, Registry, RegistryBuilder,
    Resolution, Resolved, Traced, Trimmed, Visibility, DEFAULT_VARIANT,
};
pub use render::{flatten, RenderSession, TemplatePrompt};
pub use source::Metadata;

/// Discover a prompts directory and freeze it with `overrides`
///
/// Shorthand for a [`RegistryBuilder`] filled by [`discover`].
pub fn load_dir(root: &std::path::Path, overrides: OverrideTable) -> Result<Registry> {
    let mut builder = RegistryBuilder::new();
    discover(root, &mut builder)?;
    Ok(builder.build(overrides))
}
