//! Renderable nodes: the tree a prompt's composition step produces

use crate::context::Context;

/// A reference to another definition, rendered by re-entering the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    /// Dotted name, optionally pinned to a variant with `@variant`
    pub name: String,
    /// Context the referenced definition is rendered with
    pub context: Context,
}

/// One node of a render tree
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    /// Renders to the empty string
    #[default]
    Empty,
    /// Literal text, emitted unchanged
    Text(String),
    /// A nested definition
    Composite(Include),
    /// Children flattened in order and joined by a blank line
    Sequence(Vec<Node>),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Reference another definition with an empty context
    pub fn include(name: impl Into<String>) -> Self {
        Self::include_with(name, Context::new())
    }

    /// Reference another definition with its own context
    pub fn include_with(name: impl Into<String>, context: Context) -> Self {
        Self::Composite(Include {
            name: name.into(),
            context,
        })
    }

    pub fn sequence<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        Self::Sequence(nodes.into_iter().map(Into::into).collect())
    }

    /// Any displayable scalar, coerced to its textual representation
    pub fn scalar(value: impl std::fmt::Display) -> Self {
        Self::Text(value.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Include> for Node {
    fn from(include: Include) -> Self {
        Self::Composite(include)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(nodes: Vec<T>) -> Self {
        Self::sequence(nodes)
    }
}

macro_rules! scalar_nodes {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Self {
                    Self::scalar(value)
                }
            }
        )*
    };
}

scalar_nodes!(bool, char, i32, i64, u32, u64, usize, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_none_is_empty() {
        let node: Node = Option::<&str>::None.into();
        assert!(node.is_empty());
    }

    #[test]
    fn test_vec_becomes_sequence() {
        let node: Node = vec!["a", "b"].into();
        assert_eq!(
            node,
            Node::Sequence(vec![Node::text("a"), Node::text("b")])
        );
    }

    #[test]
    fn test_scalars_become_text() {
        assert_eq!(Node::from(42_i64), Node::text("42"));
        assert_eq!(Node::from(true), Node::text("true"));
        assert_eq!(Node::from(1.5_f64), Node::text("1.5"));
    }

    #[test]
    fn test_include_carries_own_context() {
        let ctx = Context::new().with("lang", "en");
        match Node::include_with("shared.rubric", ctx.clone()) {
            Node::Composite(include) => {
                assert_eq!(include.name, "shared.rubric");
                assert_eq!(include.context, ctx);
            }
            other => panic!("Expected Composite, got {:?}", other),
        }
    }
}
