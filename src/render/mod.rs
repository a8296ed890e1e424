//! Rendering: the tree flattener and the per-call session
//!
//! A [`RenderSession`] carries everything that belongs to a single
//! top-level render, the resolution stack in particular. Nested
//! definitions, blocks and inclusion directives all go through the same
//! stack, so a definition can never recurse into itself no matter which
//! path the reference takes.

mod flatten;
mod reference;
mod stack;
pub(crate) mod template;

use crate::context::Context;
use crate::error::{PromptError, Result};
use crate::naming::Reference;
use crate::node::Node;
use crate::registry::{Registry, Resolved};
use crate::source::Sources;

pub use flatten::{flatten, SEQUENCE_SEPARATOR};
pub use reference::{ReferenceResolver, ResolvedReference};
pub use stack::{Frame, ResolutionStack};
pub use template::{TemplatePrompt, BLOCKS_VAR};

/// State of one top-level render
pub struct RenderSession<'r> {
    registry: &'r Registry,
    stack: ResolutionStack,
}

impl<'r> RenderSession<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            stack: ResolutionStack::new(),
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn sources(&self) -> &'r Sources {
        self.registry.sources()
    }

    pub fn stack(&self) -> &ResolutionStack {
        &self.stack
    }

    /// Resolve a reference and render it with `ctx`
    ///
    /// `reference` is a dotted name, optionally pinned with `@variant`.
    pub fn render(&mut self, reference: &str, ctx: &Context) -> Result<String> {
        let reference = Reference::parse(reference)?;
        self.stack.check(&reference.name)?;
        let resolved = self.registry.catalog().resolve_reference(&reference)?;
        self.render_resolved(resolved, ctx)
    }

    /// Render an already resolved variant
    pub fn render_resolved(&mut self, resolved: Resolved<'r>, ctx: &Context) -> Result<String> {
        self.stack.enter(resolved.name(), resolved.variant())?;

        let name = resolved.name();
        let prompt = resolved.prompt();
        let decorators = resolved.definition().decorators();
        let result = crate::registry::decorate(decorators, name, ctx, &mut |ctx: &Context| {
            let node = prompt.compose(self, ctx)?;
            flatten(&node, self)
        });

        self.stack.leave();
        result
    }

    /// Flatten a tree within this session
    pub fn flatten(&mut self, node: &Node) -> Result<String> {
        flatten(node, self)
    }

    /// Render the template body of the definition currently being composed
    pub fn render_template(&mut self, ctx: &Context) -> Result<String> {
        let Some(frame) = self.stack.current() else {
            return Err(PromptError::Template {
                template: String::new(),
                message: "no definition is being rendered".to_string(),
            });
        };
        let prompt = frame.name.clone();
        let chain = self.stack.encode();

        let env = self.registry.env();
        let template = env
            .get_template(&chain)
            .map_err(|e| template::from_backend_error(&prompt, e))?;
        template
            .render(ctx.to_value())
            .map_err(|e| template::from_backend_error(&prompt, e))
    }
}
