//! Structured item collections rendered as numbered lists

mod record;
mod set;

pub use record::{load, ItemSource, SortValue, StructuredItem};
pub use set::{format_item, order, render, ItemPrompt, ItemSet, StaticItems};
