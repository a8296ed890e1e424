//! Override-aware resolution of inclusion directives
//!
//! When a template body includes another fragment by path, the target is
//! resolved the same way a nested definition is: canonicalized to a dotted
//! name, looked up through the override table and checked against an
//! inclusion stack. An override entry for a shared fragment therefore
//! affects every template that includes it.

use std::sync::Arc;

use crate::error::{PromptError, Result};
use crate::naming::Reference;
use crate::registry::Catalog;
use crate::source::TemplateSource;

use super::stack::{ResolutionStack, CHAIN_SEPARATOR};

/// The outcome of resolving an inclusion directive
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// Dotted name the reference path canonicalized to
    pub canonical_name: String,
    /// Selector of the variant that was chosen
    pub variant: String,
    pub source: Arc<TemplateSource>,
}

/// Resolves inclusion directives for one top-level render
pub struct ReferenceResolver<'c> {
    catalog: &'c Catalog,
    stack: ResolutionStack,
}

impl<'c> ReferenceResolver<'c> {
    pub(crate) fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            stack: ResolutionStack::new(),
        }
    }

    /// Rebuild the inclusion stack from an encoded chain such as
    /// `reviewer.analyze@default>shared/rubric.md`
    pub(crate) fn from_chain(catalog: &'c Catalog, chain: &str) -> Result<Self> {
        let mut resolver = Self::new(catalog);
        for segment in chain.split(CHAIN_SEPARATOR) {
            let reference = Reference::parse(segment)?;
            resolver.stack.check(&reference.name)?;
            let resolved = catalog.resolve_reference(&reference)?;
            resolver.stack.enter(resolved.name(), resolved.variant())?;
        }
        Ok(resolver)
    }

    /// Resolve a reference path and push it onto the inclusion stack
    ///
    /// The target must be a template-backed variant. Call [`Self::leave`]
    /// once the included body has been rendered.
    pub fn resolve_reference(&mut self, reference_path: &str) -> Result<ResolvedReference> {
        let reference = Reference::parse(reference_path)?;
        self.stack.check(&reference.name)?;

        let resolved = self.catalog.resolve_reference(&reference)?;
        let template = resolved.prompt().template().ok_or_else(|| {
            PromptError::unresolved(
                resolved.name(),
                format!(
                    "variant '{}' is not template-backed and cannot be included",
                    resolved.variant()
                ),
            )
        })?;
        let source = self.catalog.sources.template(template)?;

        self.stack.enter(resolved.name(), resolved.variant())?;
        Ok(ResolvedReference {
            canonical_name: resolved.name().to_string(),
            variant: resolved.variant().to_string(),
            source,
        })
    }

    /// Pop the most recently resolved reference
    pub fn leave(&mut self) {
        self.stack.leave();
    }

    pub fn stack(&self) -> &ResolutionStack {
        &self.stack
    }
}
