//! Write-side block descriptors
//!
//! A descriptor is the intent to create a block. It carries no ID; nested
//! content is expressed as child descriptors and has to be pushed after the
//! parent exists.

use super::block::{Block, ImageBody, TableBody, TableProperty};
use super::text::{TextBlockStyle, TextBody, TextElement};
use crate::schema::{BlockType, ALIGN_CENTER};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Payload of a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockBody {
    /// Every text-bearing type; the block type selects the JSON field
    Text(TextBody),
    /// Image; a placeholder has no token
    Image(ImageBody),
    Table(TableProperty),
    TableCell,
    Divider,
}

/// A block that has not been created yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    pub block_type: BlockType,
    pub body: BlockBody,
    pub children: Vec<BlockDescriptor>,
}

impl BlockDescriptor {
    fn text_like(block_type: BlockType, body: TextBody) -> Self {
        Self {
            block_type,
            body: BlockBody::Text(body),
            children: Vec::new(),
        }
    }

    /// Plain paragraph
    pub fn text(elements: Vec<TextElement>) -> Self {
        Self::text_like(BlockType::Text, TextBody::new(elements))
    }

    /// Heading; the level is clamped to the vendor range
    pub fn heading(level: u8, elements: Vec<TextElement>) -> Self {
        Self::text_like(BlockType::heading(level), TextBody::new(elements))
    }

    pub fn bullet(elements: Vec<TextElement>) -> Self {
        Self::text_like(BlockType::Bullet, TextBody::new(elements))
    }

    /// Ordered item with an explicit number or `auto`
    pub fn ordered(elements: Vec<TextElement>, sequence: impl Into<String>) -> Self {
        let style = TextBlockStyle {
            sequence: Some(sequence.into()),
            ..TextBlockStyle::default()
        };
        Self::text_like(BlockType::Ordered, TextBody::with_style(elements, style))
    }

    pub fn todo(elements: Vec<TextElement>, done: bool) -> Self {
        let style = TextBlockStyle {
            done: Some(done),
            ..TextBlockStyle::default()
        };
        Self::text_like(BlockType::Todo, TextBody::with_style(elements, style))
    }

    pub fn code(elements: Vec<TextElement>, language: u32) -> Self {
        let style = TextBlockStyle {
            language: Some(language),
            ..TextBlockStyle::default()
        };
        Self::text_like(BlockType::Code, TextBody::with_style(elements, style))
    }

    pub fn quote(elements: Vec<TextElement>) -> Self {
        Self::text_like(BlockType::Quote, TextBody::new(elements))
    }

    /// Centered paragraph holding a single equation element
    pub fn equation(content: impl Into<String>) -> Self {
        let style = TextBlockStyle {
            align: Some(ALIGN_CENTER),
            ..TextBlockStyle::default()
        };
        Self::text_like(
            BlockType::Text,
            TextBody::with_style(vec![TextElement::equation(content)], style),
        )
    }

    pub fn divider() -> Self {
        Self {
            block_type: BlockType::Divider,
            body: BlockBody::Divider,
            children: Vec::new(),
        }
    }

    /// Image with no media; filled after the block exists
    pub fn image_placeholder() -> Self {
        Self {
            block_type: BlockType::Image,
            body: BlockBody::Image(ImageBody::default()),
            children: Vec::new(),
        }
    }

    /// Table whose children are its cells in row-major order
    pub fn table(row_size: usize, column_size: usize, cells: Vec<BlockDescriptor>) -> Self {
        Self {
            block_type: BlockType::Table,
            body: BlockBody::Table(TableProperty {
                row_size,
                column_size,
                ..TableProperty::default()
            }),
            children: cells,
        }
    }

    /// Table cell holding content blocks
    pub fn table_cell(content: Vec<BlockDescriptor>) -> Self {
        Self {
            block_type: BlockType::TableCell,
            body: BlockBody::TableCell,
            children: content,
        }
    }

    /// Attach nested children
    pub fn with_children(mut self, children: Vec<BlockDescriptor>) -> Self {
        self.children = children;
        self
    }

    /// Text elements of text-bearing descriptors
    pub fn elements(&self) -> Option<&[TextElement]> {
        match &self.body {
            BlockBody::Text(body) => Some(&body.elements),
            _ => None,
        }
    }

    /// Table geometry of table descriptors
    pub fn table_property(&self) -> Option<&TableProperty> {
        match &self.body {
            BlockBody::Table(property) => Some(property),
            _ => None,
        }
    }

    /// Whether this descriptor would render as a visually empty block
    pub fn is_visually_empty(&self) -> bool {
        self.block_type.drops_when_empty() && self.elements().is_some_and(<[_]>::is_empty)
    }

    /// Copy of this descriptor without nested children
    pub fn without_children(&self) -> Self {
        Self {
            block_type: self.block_type,
            body: self.body.clone(),
            children: Vec::new(),
        }
    }

    /// Turn the descriptor into a stored block with the given IDs
    ///
    /// Child IDs are left empty; the caller links children as it creates them.
    pub fn materialize(&self, block_id: &str, parent_id: &str) -> Block {
        let mut block = Block::new(block_id, self.block_type);
        block.parent_id = Some(parent_id.to_string());
        match &self.body {
            BlockBody::Text(body) => {
                block.set_text_body(body.clone());
            }
            BlockBody::Image(image) => block.image = Some(image.clone()),
            BlockBody::Table(property) => {
                block.table = Some(TableBody {
                    property: property.clone(),
                    cells: Vec::new(),
                })
            }
            BlockBody::TableCell | BlockBody::Divider => {}
        }
        block
    }
}

/// Serialized in the vendor's creation shape: `block_type`, the payload
/// under its type-specific key, and nested `children` when present.
impl Serialize for BlockDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("block_type", &self.block_type.code())?;

        if let Some(key) = self.block_type.payload_key() {
            match &self.body {
                BlockBody::Text(body) => map.serialize_entry(key, body)?,
                BlockBody::Image(image) => map.serialize_entry(key, image)?,
                BlockBody::Table(property) => map.serialize_entry(
                    key,
                    &TableBody {
                        property: property.clone(),
                        cells: Vec::new(),
                    },
                )?,
                BlockBody::TableCell | BlockBody::Divider => {
                    map.serialize_entry(key, &serde_json::Map::new())?
                }
            }
        }

        if !self.children.is_empty() {
            map.serialize_entry("children", &self.children)?;
        }
        map.end()
    }
}
