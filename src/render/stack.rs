//! The per-render resolution stack used for cycle detection

use tracing::trace;

use crate::error::{PromptError, Result};

/// Separates frames in an encoded chain
pub(crate) const CHAIN_SEPARATOR: char = '>';

/// One definition being rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub variant: String,
}

/// Definitions currently being rendered, outermost first
///
/// Entering a name that is already on the stack is a cycle. The stack
/// belongs to a single render call and is never shared between callers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStack {
    frames: Vec<Frame>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a cycle error if `name` is already being rendered
    pub fn check(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            let mut chain: Vec<String> = self.frames.iter().map(|f| f.name.clone()).collect();
            chain.push(name.to_string());
            return Err(PromptError::cycle(chain));
        }
        Ok(())
    }

    /// Push a frame after checking for a cycle
    pub fn enter(&mut self, name: &str, variant: &str) -> Result<()> {
        self.check(name)?;
        trace!(depth = self.frames.len(), "Entering '{}@{}'", name, variant);
        self.frames.push(Frame {
            name: name.to_string(),
            variant: variant.to_string(),
        });
        Ok(())
    }

    pub fn leave(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.name == name)
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Names from the outermost frame inward
    pub fn names(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.name.as_str()).collect()
    }

    /// Encode as `outer@v>...>inner@v`, the form used for backend template names
    pub(crate) fn encode(&self) -> String {
        let mut out = String::new();
        for (idx, frame) in self.frames.iter().enumerate() {
            if idx > 0 {
                out.push(CHAIN_SEPARATOR);
            }
            out.push_str(&frame.name);
            out.push('@');
            out.push_str(&frame.variant);
        }
        out
    }
}
