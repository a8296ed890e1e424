//! Error types for registration, resolution and rendering

use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Errors that can occur anywhere in the prompt pipeline.
///
/// None of these are recovered internally. A failed render yields no text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromptError {
    /// A template body referenced a variable absent from the render context
    #[error("missing variable while rendering '{prompt}': {detail}")]
    MissingVariable { prompt: String, detail: String },

    /// A composite node or inclusion directive re-entered a name already being resolved
    #[error("reference cycle detected: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// A name or variant selector does not match any registered definition
    #[error("unresolved reference '{name}': {reason}")]
    UnresolvedReference { name: String, reason: String },

    /// A name was registered twice with conflicting definitions
    #[error("duplicate registration for '{name}': {reason}")]
    DuplicateRegistration { name: String, reason: String },

    /// A structured item record violates the minimal schema
    #[error("malformed data item at {location}: {reason}")]
    MalformedDataItem { location: String, reason: String },

    /// A dotted name or reference path is not well formed
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A definition is structurally unusable
    #[error("invalid definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// The templating backend rejected a template body
    #[error("syntax error in template '{template}'{}: {message}", line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    TemplateSyntax {
        template: String,
        line: Option<usize>,
        message: String,
    },

    /// Any other failure reported by the templating backend
    #[error("failed to render template '{template}': {message}")]
    Template { template: String, message: String },

    /// Front matter header could not be parsed
    #[error("invalid front matter in {origin}: {message}")]
    FrontMatter { origin: String, message: String },

    /// Reading a template or data file failed
    #[error("error reading {path}: {message}")]
    Io { path: String, message: String },

    /// Configuration is missing or unusable
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = PromptError> = std::result::Result<T, E>;

impl PromptError {
    /// Create a cycle error from the chain of names, ending with the repeated one
    pub fn cycle(chain: Vec<String>) -> Self {
        Self::Cycle { chain }
    }

    pub fn unresolved(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn duplicate(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DuplicateRegistration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDataItem {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_definition(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an IO error that remembers which path failed
    pub fn io(path: impl std::fmt::Display, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// The template this error points into, if any
    pub fn template(&self) -> Option<&str> {
        match self {
            Self::TemplateSyntax { template, .. } | Self::Template { template, .. } => {
                Some(template)
            }
            _ => None,
        }
    }

    /// Format the error with source context using ariadne
    ///
    /// Only syntax errors carry a position; everything else is returned
    /// as the plain message.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let Self::TemplateSyntax {
            line: Some(line),
            message,
            ..
        } = self
        else {
            return self.to_string();
        };
        let Some(span) = line_span(source, *line) else {
            return self.to_string();
        };

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(message)
            .with_label(
                Label::new((filename, span))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Byte range of a 1-based line, excluding its newline
fn line_span(source: &str, line: usize) -> Option<Range<usize>> {
    let mut start = 0;
    for (idx, text) in source.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            let end = start + text.trim_end_matches(['\n', '\r']).len();
            return Some(start..end);
        }
        start += text.len();
    }
    None
}
