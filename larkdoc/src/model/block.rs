//! Blocks as fetched from the platform

use super::text::TextBody;
use crate::schema::{BlockType, MAX_HEADING_LEVEL};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

fn one() -> usize {
    1
}

/// Span of a merged table region, stored at its top-left cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeInfo {
    #[serde(default = "one")]
    pub row_span: usize,

    #[serde(default = "one")]
    pub col_span: usize,
}

impl MergeInfo {
    pub fn new(row_span: usize, col_span: usize) -> Self {
        Self { row_span, col_span }
    }
}

impl Default for MergeInfo {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Table geometry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProperty {
    #[serde(default)]
    pub row_size: usize,

    #[serde(default)]
    pub column_size: usize,

    /// Row-major spans, one entry per grid position
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merge_info: Vec<MergeInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_row: Option<bool>,
}

/// Table payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableBody {
    #[serde(default)]
    pub property: TableProperty,

    /// Cell block IDs in row-major order (read side only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<String>,
}

/// Image payload; a placeholder has no token yet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ImageBody {
    /// The media token, treating an empty string as absent
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Payload of embedded objects addressed by a single token
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBody {
    #[serde(default)]
    pub token: String,
}

/// Reference to a base table view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceBody {
    #[serde(default)]
    pub token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,
}

/// File attachment payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBody {
    #[serde(default)]
    pub token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A node of the platform's document tree
///
/// Children are referenced by ID; the blocks themselves are separate
/// entries of the document's flat block list. The payload lives in the
/// field named after the block type, mirroring the vendor JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub block_id: String,

    pub block_type: BlockType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading1: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading2: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading3: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading4: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading5: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading6: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading7: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading8: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading9: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo: Option<TextBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callout: Option<TextBody>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<TokenBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<TokenBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitable: Option<TokenBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_base: Option<ReferenceBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileBody>,
}

impl Block {
    /// Create a block with no payload
    pub fn new(block_id: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            block_id: block_id.into(),
            block_type,
            ..Self::default()
        }
    }

    fn text_slot(&self) -> Option<&Option<TextBody>> {
        let slot = match self.block_type {
            BlockType::Page => &self.page,
            BlockType::Text => &self.text,
            BlockType::Heading(level) => match level.clamp(1, MAX_HEADING_LEVEL) {
                1 => &self.heading1,
                2 => &self.heading2,
                3 => &self.heading3,
                4 => &self.heading4,
                5 => &self.heading5,
                6 => &self.heading6,
                7 => &self.heading7,
                8 => &self.heading8,
                _ => &self.heading9,
            },
            BlockType::Bullet => &self.bullet,
            BlockType::Ordered => &self.ordered,
            BlockType::Code => &self.code,
            BlockType::Quote => &self.quote,
            BlockType::Todo => &self.todo,
            BlockType::Callout => &self.callout,
            _ => return None,
        };
        Some(slot)
    }

    fn text_slot_mut(&mut self) -> Option<&mut Option<TextBody>> {
        let slot = match self.block_type {
            BlockType::Page => &mut self.page,
            BlockType::Text => &mut self.text,
            BlockType::Heading(level) => match level.clamp(1, MAX_HEADING_LEVEL) {
                1 => &mut self.heading1,
                2 => &mut self.heading2,
                3 => &mut self.heading3,
                4 => &mut self.heading4,
                5 => &mut self.heading5,
                6 => &mut self.heading6,
                7 => &mut self.heading7,
                8 => &mut self.heading8,
                _ => &mut self.heading9,
            },
            BlockType::Bullet => &mut self.bullet,
            BlockType::Ordered => &mut self.ordered,
            BlockType::Code => &mut self.code,
            BlockType::Quote => &mut self.quote,
            BlockType::Todo => &mut self.todo,
            BlockType::Callout => &mut self.callout,
            _ => return None,
        };
        Some(slot)
    }

    /// Text payload for text-bearing block types
    pub fn text_body(&self) -> Option<&TextBody> {
        self.text_slot().and_then(Option::as_ref)
    }

    /// Replace the text payload; returns false for non-text block types
    pub fn set_text_body(&mut self, body: TextBody) -> bool {
        match self.text_slot_mut() {
            Some(slot) => {
                *slot = Some(body);
                true
            }
            None => false,
        }
    }

    /// Media token of an image block
    pub fn image_token(&self) -> Option<&str> {
        self.image.as_ref().and_then(ImageBody::token)
    }

    /// Whether this is an image block that has not received its media yet
    pub fn is_image_placeholder(&self) -> bool {
        self.block_type == BlockType::Image && self.image_token().is_none()
    }
}

/// A document's blocks indexed by ID, keeping the fetch order
#[derive(Debug, Clone, Default)]
pub struct BlockMap {
    blocks: HashMap<String, Block>,
    order: Vec<String>,
}

impl BlockMap {
    /// Index a flat block list
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut map = Self::default();
        for block in blocks {
            if !map.blocks.contains_key(&block.block_id) {
                map.order.push(block.block_id.clone());
            }
            map.blocks.insert(block.block_id.clone(), block);
        }
        map
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, block_id: &str) -> Option<&Block> {
        self.blocks.get(block_id)
    }

    /// The page block, or the first fetched block when there is no page
    pub fn root(&self) -> Option<&Block> {
        self.order
            .iter()
            .filter_map(|id| self.blocks.get(id))
            .find(|b| b.block_type == BlockType::Page)
            .or_else(|| self.order.first().and_then(|id| self.blocks.get(id)))
    }

    /// Resolve a block's children, skipping IDs missing from the map
    pub fn children<'a>(&'a self, block: &'a Block) -> impl Iterator<Item = &'a Block> + 'a {
        block.children.iter().filter_map(move |id| {
            let child = self.blocks.get(id);
            if child.is_none() {
                log::warn!(
                    "Block {} references missing child {}",
                    block.block_id,
                    id
                );
            }
            child
        })
    }

    /// All blocks reachable from the root, depth-first in document order
    pub fn preorder(&self) -> Vec<&Block> {
        let mut out = Vec::with_capacity(self.blocks.len());
        let mut seen = HashSet::new();
        let Some(root) = self.root() else {
            return out;
        };

        let mut stack = vec![root];
        while let Some(block) = stack.pop() {
            if !seen.insert(block.block_id.as_str()) {
                continue;
            }
            out.push(block);
            let children: Vec<&Block> = self.children(block).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextElement;

    fn block_with_children(id: &str, block_type: BlockType, children: &[&str]) -> Block {
        let mut block = Block::new(id, block_type);
        block.children = children.iter().map(|c| c.to_string()).collect();
        block
    }

    #[test]
    fn test_parse_vendor_heading_block() {
        let json = r#"{
            "block_id": "b1",
            "block_type": 4,
            "parent_id": "doc",
            "heading2": {"elements": [{"text_run": {"content": "Intro"}}]}
        }"#;

        let block: Block = serde_json::from_str(json).unwrap();

        assert_eq!(block.block_type, BlockType::Heading(2));
        let body = block.text_body().unwrap();
        assert_eq!(body.elements, vec![TextElement::text("Intro")]);
    }

    #[test]
    fn test_parse_table_property_defaults_spans() {
        let json = r#"{
            "block_id": "t",
            "block_type": 31,
            "table": {"property": {"row_size": 1, "column_size": 2, "merge_info": [{}, {"col_span": 1}]}}
        }"#;

        let block: Block = serde_json::from_str(json).unwrap();

        let property = &block.table.unwrap().property;
        assert_eq!(property.merge_info, vec![MergeInfo::new(1, 1); 2]);
    }

    #[test]
    fn test_set_text_body_rejects_non_text_types() {
        let mut image = Block::new("i", BlockType::Image);
        assert!(!image.set_text_body(TextBody::default()));

        let mut text = Block::new("t", BlockType::Text);
        assert!(text.set_text_body(TextBody::new(vec![TextElement::text("x")])));
        assert_eq!(text.text_body().unwrap().plain_text(), "x");
    }

    #[test]
    fn test_image_placeholder_detection() {
        let mut image = Block::new("i", BlockType::Image);
        image.image = Some(ImageBody {
            token: Some(String::new()),
            ..ImageBody::default()
        });
        assert!(image.is_image_placeholder());

        image.image = Some(ImageBody {
            token: Some("boxcn".to_string()),
            ..ImageBody::default()
        });
        assert!(!image.is_image_placeholder());
    }

    #[test]
    fn test_root_prefers_page_block() {
        let map = BlockMap::from_blocks(vec![
            Block::new("x", BlockType::Text),
            block_with_children("doc", BlockType::Page, &["x"]),
        ]);
        assert_eq!(map.root().unwrap().block_id, "doc");
    }

    #[test]
    fn test_preorder_follows_children_order() {
        let map = BlockMap::from_blocks(vec![
            block_with_children("doc", BlockType::Page, &["a", "b"]),
            block_with_children("a", BlockType::Bullet, &["a1"]),
            Block::new("a1", BlockType::Bullet),
            Block::new("b", BlockType::Text),
        ]);

        let ids: Vec<&str> = map.preorder().iter().map(|b| b.block_id.as_str()).collect();

        assert_eq!(ids, vec!["doc", "a", "a1", "b"]);
    }

    #[test]
    fn test_missing_children_are_skipped() {
        let root = block_with_children("doc", BlockType::Page, &["gone", "b"]);
        let map = BlockMap::from_blocks(vec![root.clone(), Block::new("b", BlockType::Text)]);
        let ids: Vec<&str> = map.children(&root).map(|b| b.block_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }
}
