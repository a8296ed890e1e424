//! Tree flattening

use crate::error::Result;
use crate::node::Node;

use super::RenderSession;

/// Separator between the non-empty members of a sequence
pub const SEQUENCE_SEPARATOR: &str = "\n\n";

/// Flatten a render tree to text
///
/// Text is used verbatim. Composites are rendered through the session with
/// their own context. Empty members of a sequence are dropped before the
/// rest are joined with a blank line.
pub fn flatten(node: &Node, session: &mut RenderSession<'_>) -> Result<String> {
    match node {
        Node::Empty => Ok(String::new()),
        Node::Text(text) => Ok(text.clone()),
        Node::Composite(include) => session.render(&include.name, &include.context),
        Node::Sequence(nodes) => {
            let mut parts = Vec::with_capacity(nodes.len());
            for node in nodes {
                let part = flatten(node, session)?;
                if !part.is_empty() {
                    parts.push(part);
                }
            }
            Ok(parts.join(SEQUENCE_SEPARATOR))
        }
    }
}
