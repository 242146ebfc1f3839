//! Block type tags and their vendor integer codes

use serde::{Deserialize, Serialize};

/// Deepest heading level the vendor schema represents
pub const MAX_HEADING_LEVEL: u8 = 9;

/// Deepest heading level expressible with Markdown `#` markers
pub const MAX_MARKDOWN_HEADING: u8 = 6;

/// Offset between a heading level and its block type code
const HEADING_CODE_OFFSET: u32 = 2;

/// Block type tag
///
/// Serialized as the vendor's integer code. Codes this crate does not know
/// about survive a round trip through [`BlockType::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum BlockType {
    Page,
    #[default]
    Text,
    /// Heading with level 1..=9; out-of-range levels encode clamped
    Heading(u8),
    Bullet,
    Ordered,
    Code,
    Quote,
    Todo,
    Bitable,
    Callout,
    Divider,
    File,
    Image,
    Sheet,
    Table,
    TableCell,
    QuoteContainer,
    Board,
    ReferenceBase,
    Unknown(u32),
}

/// How a block combines its own content with its rendered children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Children lines are prefixed with a block-quote marker
    Quoted,
    /// Children lines are indented under the list marker
    ListItem,
    /// Children follow the block after a blank line
    Plain,
}

impl BlockType {
    /// Build a heading type, clamping the level to 1..=9
    pub fn heading(level: u8) -> Self {
        BlockType::Heading(level.clamp(1, MAX_HEADING_LEVEL))
    }

    /// Vendor integer code
    pub fn code(self) -> u32 {
        match self {
            BlockType::Page => 1,
            BlockType::Text => 2,
            BlockType::Heading(level) => {
                HEADING_CODE_OFFSET + u32::from(level.clamp(1, MAX_HEADING_LEVEL))
            }
            BlockType::Bullet => 12,
            BlockType::Ordered => 13,
            BlockType::Code => 14,
            BlockType::Quote => 15,
            BlockType::Todo => 17,
            BlockType::Bitable => 18,
            BlockType::Callout => 19,
            BlockType::Divider => 22,
            BlockType::File => 23,
            BlockType::Image => 27,
            BlockType::Sheet => 30,
            BlockType::Table => 31,
            BlockType::TableCell => 32,
            BlockType::QuoteContainer => 34,
            BlockType::Board => 43,
            BlockType::ReferenceBase => 53,
            BlockType::Unknown(code) => code,
        }
    }

    /// Name of the JSON field holding this type's payload
    pub fn payload_key(self) -> Option<&'static str> {
        let key = match self {
            BlockType::Page => "page",
            BlockType::Text => "text",
            BlockType::Heading(level) => match level.clamp(1, MAX_HEADING_LEVEL) {
                1 => "heading1",
                2 => "heading2",
                3 => "heading3",
                4 => "heading4",
                5 => "heading5",
                6 => "heading6",
                7 => "heading7",
                8 => "heading8",
                _ => "heading9",
            },
            BlockType::Bullet => "bullet",
            BlockType::Ordered => "ordered",
            BlockType::Code => "code",
            BlockType::Quote => "quote",
            BlockType::Todo => "todo",
            BlockType::Bitable => "bitable",
            BlockType::Callout => "callout",
            BlockType::Divider => "divider",
            BlockType::File => "file",
            BlockType::Image => "image",
            BlockType::Sheet => "sheet",
            BlockType::Table => "table",
            BlockType::TableCell => "table_cell",
            BlockType::QuoteContainer => "quote_container",
            BlockType::Board => "board",
            BlockType::ReferenceBase => "reference_base",
            BlockType::Unknown(_) => return None,
        };
        Some(key)
    }

    /// Whether a block of this type with no text elements is visually empty
    ///
    /// Code blocks are excluded: an empty code block is still a visible block.
    pub fn drops_when_empty(self) -> bool {
        matches!(
            self,
            BlockType::Text
                | BlockType::Heading(_)
                | BlockType::Bullet
                | BlockType::Ordered
                | BlockType::Todo
                | BlockType::Quote
        )
    }

    /// How rendered children attach to this block
    pub fn container_kind(self) -> ContainerKind {
        match self {
            BlockType::Quote | BlockType::QuoteContainer | BlockType::Callout => {
                ContainerKind::Quoted
            }
            BlockType::Bullet | BlockType::Ordered | BlockType::Todo => ContainerKind::ListItem,
            _ => ContainerKind::Plain,
        }
    }
}

impl From<u32> for BlockType {
    fn from(code: u32) -> Self {
        match code {
            1 => BlockType::Page,
            2 => BlockType::Text,
            3..=11 => BlockType::Heading((code - HEADING_CODE_OFFSET) as u8),
            12 => BlockType::Bullet,
            13 => BlockType::Ordered,
            14 => BlockType::Code,
            15 => BlockType::Quote,
            17 => BlockType::Todo,
            18 => BlockType::Bitable,
            19 => BlockType::Callout,
            22 => BlockType::Divider,
            23 => BlockType::File,
            27 => BlockType::Image,
            30 => BlockType::Sheet,
            31 => BlockType::Table,
            32 => BlockType::TableCell,
            34 => BlockType::QuoteContainer,
            43 => BlockType::Board,
            53 => BlockType::ReferenceBase,
            other => BlockType::Unknown(other),
        }
    }
}

impl From<BlockType> for u32 {
    fn from(block_type: BlockType) -> Self {
        block_type.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_codes_cover_levels_one_to_nine() {
        for level in 1..=MAX_HEADING_LEVEL {
            let code = BlockType::heading(level).code();
            assert_eq!(code, u32::from(level) + 2);
            assert_eq!(BlockType::from(code), BlockType::Heading(level));
        }
    }

    #[test]
    fn test_heading_level_is_clamped() {
        assert_eq!(BlockType::heading(0), BlockType::Heading(1));
        assert_eq!(BlockType::heading(12), BlockType::Heading(9));
    }

    #[test]
    fn test_out_of_range_heading_variant_encodes_clamped() {
        assert_eq!(BlockType::Heading(0).code(), 3);
        assert_eq!(BlockType::Heading(0).payload_key(), Some("heading1"));
        assert_eq!(BlockType::Heading(200).code(), 11);
    }

    #[test]
    fn test_unknown_code_survives() {
        let block_type = BlockType::from(999);
        assert_eq!(block_type, BlockType::Unknown(999));
        assert_eq!(block_type.code(), 999);
        assert!(block_type.payload_key().is_none());
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&BlockType::Table).unwrap();
        assert_eq!(json, "31");
        let parsed: BlockType = serde_json::from_str("5").unwrap();
        assert_eq!(parsed, BlockType::Heading(3));
    }

    #[test]
    fn test_container_kinds() {
        assert_eq!(BlockType::Callout.container_kind(), ContainerKind::Quoted);
        assert_eq!(BlockType::Todo.container_kind(), ContainerKind::ListItem);
        assert_eq!(BlockType::Text.container_kind(), ContainerKind::Plain);
    }

    #[test]
    fn test_code_blocks_are_not_dropped_when_empty() {
        assert!(!BlockType::Code.drops_when_empty());
        assert!(BlockType::Quote.drops_when_empty());
    }
}
