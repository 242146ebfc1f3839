//! Block schema for the vendor document model
//!
//! Centralizes the closed enumeration of block types and the code-language
//! table so that the renderer and the converter never branch on raw integers.

mod block_type;
mod code_language;

pub use block_type::{BlockType, ContainerKind, MAX_HEADING_LEVEL, MAX_MARKDOWN_HEADING};
pub use code_language::{code_language, language_name, PLAIN_TEXT};

/// Maximum number of children the vendor accepts in a single creation request
pub const MAX_CHILDREN_PER_REQUEST: usize = 50;

/// Maximum number of characters the vendor accepts in a single text run
pub const MAX_TEXT_RUN_CHARS: usize = 2000;

/// Text block alignment code for centered content
pub const ALIGN_CENTER: u32 = 2;
