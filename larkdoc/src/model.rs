//! Vendor document model
//!
//! Two views of the same schema:
//! - [`Block`] is a node fetched from the platform. It always has an ID and
//!   refers to its children by ID.
//! - [`BlockDescriptor`] is a node that does not exist yet. Its children are
//!   nested descriptors because no IDs have been assigned.

mod block;
mod descriptor;
mod text;

pub use block::{
    Block, BlockMap, FileBody, ImageBody, MergeInfo, ReferenceBody, TableBody, TableProperty,
    TokenBody,
};
pub use descriptor::{BlockBody, BlockDescriptor};
pub use text::{
    Equation, Link, LinkPreview, MentionDoc, MentionUser, TextBlockStyle, TextBody, TextElement,
    TextRun, TextStyle,
};
