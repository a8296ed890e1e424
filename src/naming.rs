//! Dotted names, reference paths and the type naming convention
//!
//! A definition is addressed by a dotted path such as `reviewer.analyze`.
//! Inclusion directives may spell the same name as a relative file path
//! (`reviewer/analyze.md`) and may pin a variant with `@variant`.

use std::fmt;

use crate::error::{PromptError, Result};

/// Extensions stripped when a reference is written as a file path
const SOURCE_EXTENSIONS: &[&str] = &["md", "jinja", "j2", "txt", "yaml", "yml"];

/// A canonical reference: dotted name plus an optional variant pin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub name: String,
    pub variant: Option<String>,
}

impl Reference {
    /// Canonicalize a reference path
    ///
    /// `reviewer/analyze.md`, `./reviewer/analyze` and `reviewer.analyze`
    /// all canonicalize to `reviewer.analyze`.
    pub fn parse(reference: &str) -> Result<Self> {
        let trimmed = reference.trim();
        let trimmed = trimmed.trim_start_matches("./").trim_start_matches('/');
        let trimmed = strip_source_extension(trimmed);

        let (path, variant) = match trimmed.split_once('@') {
            Some((path, variant)) => {
                validate_segment(reference, variant)?;
                (path, Some(variant.to_string()))
            }
            None => (trimmed, None),
        };

        let name = path.replace(['/', '\\'], ".");
        validate(&name)?;
        Ok(Self { name, variant })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variant {
            Some(variant) => write!(f, "{}@{}", self.name, variant),
            None => f.write_str(&self.name),
        }
    }
}

/// Check that `name` is a well formed dotted name
///
/// A final segment spelled like a source extension (`report.txt`) is
/// rejected, since references drop that segment when canonicalizing.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PromptError::invalid_name(name, "name is empty"));
    }
    for segment in name.split('.') {
        validate_segment(name, segment)?;
    }
    if strip_source_extension(name) != name {
        return Err(PromptError::invalid_name(
            name,
            "last segment reads as a file extension",
        ));
    }
    Ok(())
}

/// Check one name segment or variant selector
pub fn validate_segment(name: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(PromptError::invalid_name(name, "empty segment"));
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(PromptError::invalid_name(
            name,
            format!("unexpected character '{bad}' in '{segment}'"),
        ));
    }
    Ok(())
}

fn strip_source_extension(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((stem, ext)) if SOURCE_EXTENSIONS.contains(&ext) && !stem.is_empty() => stem,
        _ => path,
    }
}

/// Derive a dotted name from a Rust type path
///
/// A type living under a `prompts` module is named after the module that
/// owns it: `app::reviewer::prompts::AnalyzeDoc` becomes
/// `reviewer.analyze_doc`. Anything else is just the snake-cased type name.
pub fn conventional_name(type_path: &str) -> String {
    let path = type_path.split('<').next().unwrap_or(type_path);
    let mut segments: Vec<&str> = path.split("::").collect();
    let type_name = segments.pop().unwrap_or_default();
    let snake = to_snake(type_name);

    match segments.iter().position(|s| *s == "prompts") {
        Some(idx) if idx > 0 => format!("{}.{}", segments[idx - 1], snake),
        _ => snake,
    }
}

/// [`conventional_name`] applied to `T`
pub fn conventional_name_of<T: ?Sized>() -> String {
    conventional_name(std::any::type_name::<T>())
}

/// `ExtractSignals` -> `extract_signals`, `HTTPServer` -> `http_server`
pub fn to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && prev != '_' {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_forms_agree() {
        for form in ["reviewer.analyze", "reviewer/analyze.md", "./reviewer/analyze"] {
            let r = Reference::parse(form).expect("Should parse");
            assert_eq!(r.name, "reviewer.analyze", "form {form}");
            assert_eq!(r.variant, None);
        }
    }

    #[test]
    fn test_reference_with_variant_pin() {
        let r = Reference::parse("reviewer/analyze@cot.md").expect("Should parse");
        assert_eq!(r.name, "reviewer.analyze");
        assert_eq!(r.variant.as_deref(), Some("cot"));
        assert_eq!(r.to_string(), "reviewer.analyze@cot");
    }

    #[test]
    fn test_invalid_names() {
        assert!(validate("").is_err());
        assert!(validate("a..b").is_err());
        assert!(validate("a.b c").is_err());
        assert!(validate("a>b").is_err());
        assert!(validate("shared.rubric-v2").is_ok());
        assert!(validate("report.txt").is_err());
        assert!(validate("docs.md").is_err());
        assert!(validate("md").is_ok());
        assert!(validate("report.text").is_ok());
    }

    #[test]
    fn test_to_snake() {
        assert_eq!(to_snake("ExtractSignals"), "extract_signals");
        assert_eq!(to_snake("ClassifyContent"), "classify_content");
        assert_eq!(to_snake("HTTPServer"), "http_server");
        assert_eq!(to_snake("Analyze2Step"), "analyze2_step");
        assert_eq!(to_snake("plain"), "plain");
    }

    #[test]
    fn test_conventional_name_uses_owning_module() {
        assert_eq!(
            conventional_name("sampleapp::observer::prompts::ExtractSignals"),
            "observer.extract_signals"
        );
        assert_eq!(conventional_name("sampleapp::Diagnose"), "diagnose");
        assert_eq!(conventional_name("prompts::Top"), "top");
    }

    mod reviewer {
        pub mod prompts {
            pub struct AnalyzeDoc;
        }
    }

    #[test]
    fn test_conventional_name_of_type() {
        assert_eq!(
            conventional_name_of::<reviewer::prompts::AnalyzeDoc>(),
            "reviewer.analyze_doc"
        );
    }
}
