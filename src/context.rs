//! Render context: the variables a prompt body can reference

use std::collections::BTreeMap;

use minijinja::value::{Value, ValueKind};
use serde::Serialize;

use crate::error::{PromptError, Result};

/// Ordered mapping of variable name to value
///
/// Keys are kept sorted so that two renders with equal contexts see the
/// exact same input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from any serializable map-like value
    ///
    /// Structs and maps are accepted; anything else is a configuration error.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        let value = Value::from_serialize(value);
        if value.kind() != ValueKind::Map {
            return Err(PromptError::Config(format!(
                "render context must be a mapping, got {}",
                value.kind()
            )));
        }

        let keys = value
            .try_iter()
            .map_err(|e| PromptError::Config(e.to_string()))?;
        let mut ctx = Self::new();
        for key in keys {
            let Some(name) = key.as_str() else {
                return Err(PromptError::Config(format!(
                    "render context keys must be strings, got {key}"
                )));
            };
            let item = value
                .get_item(&key)
                .map_err(|e| PromptError::Config(e.to_string()))?;
            ctx.values.insert(name.to_string(), item);
        }
        Ok(ctx)
    }

    /// Set a variable, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style [`Context::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Convert into the value handed to the templating backend
    pub fn to_value(&self) -> Value {
        Value::from_serialize(&self.values)
    }
}

impl<K, V> FromIterator<(K, V)> for Context
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Review {
        document: String,
        strict: bool,
    }

    #[test]
    fn test_insert_and_get() {
        let ctx = Context::new().with("name", "world").with("count", 3);
        assert_eq!(ctx.get("name").and_then(|v| v.as_str()), Some("world"));
        assert!(ctx.contains("count"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_keys_are_sorted() {
        let ctx: Context = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect();
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_from_serialize_struct() {
        let ctx = Context::from_serialize(&Review {
            document: "doc".into(),
            strict: true,
        })
        .expect("Should convert");
        assert_eq!(ctx.get("document").and_then(|v| v.as_str()), Some("doc"));
        assert!(ctx.get("strict").is_some_and(|v| v.is_true()));
    }

    #[test]
    fn test_from_serialize_rejects_non_mapping() {
        let result = Context::from_serialize(&vec![1, 2, 3]);
        assert!(matches!(result, Err(PromptError::Config(_))));
    }
}
