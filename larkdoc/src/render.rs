//! Document-to-Markdown renderer
//!
//! Walks a fetched block tree depth-first and produces Markdown. Each block
//! renders its own content, then its children, and combines the two by its
//! [`ContainerKind`]: quoted containers prefix child lines with `> `, list
//! items indent them, everything else appends them after a blank line.
//! Tables short-circuit into grid reconstruction.

mod embed;
mod table;
mod text;

pub use table::{format_grid, format_matrix, reconstruct_grid, GridCell, TableGrid};
pub use text::{decode_url, render_elements, style_run};

use crate::api::{ApiError, DocumentApi, TableFormat};
use crate::model::{Block, BlockMap, TextBody};
use crate::schema::{language_name, BlockType, ContainerKind, MAX_MARKDOWN_HEADING};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Indentation of list item children
const LIST_INDENT: &str = "    ";

/// Errors that abort a render
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to list blocks of document {document_id}: {source}")]
    ListBlocks {
        document_id: String,
        #[source]
        source: ApiError,
    },
}

/// Options controlling Markdown output
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Format of tables, sheets and base tables
    pub table_format: TableFormat,

    /// Wrap each block's content in `<!-- block:ID -->` comments
    pub embed_block_ids: bool,

    /// Append a node table after each whiteboard image
    pub export_board_metadata: bool,

    /// Directory downloaded media lands in; links use its name as prefix
    pub assets_dir: Option<PathBuf>,
}

/// Fetch a document and render it to Markdown
///
/// Listing the blocks is the only fatal step. Leaf content that fails to
/// load degrades to placeholders.
pub fn render_document(
    api: &dyn DocumentApi,
    document_id: &str,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let blocks = api
        .list_document_blocks(document_id)
        .map_err(|source| RenderError::ListBlocks {
            document_id: document_id.to_string(),
            source,
        })?;
    log::info!("Fetched {} blocks of document {}", blocks.len(), document_id);

    let map = BlockMap::from_blocks(blocks);
    Ok(render_blocks(&map, api, options))
}

/// Render an already fetched block map, starting at its root
///
/// A page root contributes its title as a leading `# Title` line.
pub fn render_blocks(blocks: &BlockMap, api: &dyn DocumentApi, options: &RenderOptions) -> String {
    let Some(root) = blocks.root() else {
        log::warn!("No root block found; nothing to render");
        return String::new();
    };

    let mut renderer = Renderer::new(blocks, api, options);
    let body = renderer.render_block(root, None);

    if root.block_type != BlockType::Page {
        return body;
    }

    let title = renderer.text(root.page.as_ref());
    if body.is_empty() {
        format!("# {}", title)
    } else {
        format!("# {}\n\n{}", title, body)
    }
}

/// Render a single block and its subtree
pub fn render_block(
    block: &Block,
    blocks: &BlockMap,
    api: &dyn DocumentApi,
    options: &RenderOptions,
) -> String {
    Renderer::new(blocks, api, options).render_block(block, None)
}

/// Ordered list numbering across one sibling list
///
/// `auto` (or no sequence at all) continues from the last number; an
/// explicit number restarts the count there.
#[derive(Debug, Default)]
struct OrderedCounter {
    last: u64,
}

impl OrderedCounter {
    fn next(&mut self, sequence: Option<&str>) -> u64 {
        self.last = match sequence.map(str::trim) {
            Some(seq) if seq != "auto" => match seq.parse() {
                Ok(number) => number,
                Err(_) => {
                    log::debug!("Unrecognized list sequence {:?}; continuing", seq);
                    self.last + 1
                }
            },
            _ => self.last + 1,
        };
        self.last
    }
}

pub(crate) struct Renderer<'a> {
    blocks: &'a BlockMap,
    api: &'a dyn DocumentApi,
    options: &'a RenderOptions,
    user_names: HashMap<String, String>,

    /// Blocks on the current path from the root
    ancestors: HashSet<&'a str>,
}

impl<'a> Renderer<'a> {
    fn new(blocks: &'a BlockMap, api: &'a dyn DocumentApi, options: &'a RenderOptions) -> Self {
        Self {
            blocks,
            api,
            options,
            user_names: HashMap::new(),
            ancestors: HashSet::new(),
        }
    }

    /// Render `block` and its children; `ordinal` numbers ordered items
    fn render_block(&mut self, block: &'a Block, ordinal: Option<u64>) -> String {
        if !self.ancestors.insert(block.block_id.as_str()) {
            log::warn!("Block {} contains itself; skipping", block.block_id);
            return String::new();
        }
        let rendered = if block.block_type == BlockType::Table {
            self.render_table(block)
        } else {
            self.render_container(block, ordinal)
        };
        self.ancestors.remove(block.block_id.as_str());
        rendered
    }

    fn render_container(&mut self, block: &'a Block, ordinal: Option<u64>) -> String {
        let mut content = self.render_self(block, ordinal);
        let children = self.render_children(block);

        if !children.is_empty() {
            let joined = children.join("\n\n");
            match block.block_type.container_kind() {
                ContainerKind::Quoted => {
                    content.push('\n');
                    content.push_str(&prefix_lines(&joined, "> "));
                }
                ContainerKind::ListItem => {
                    content.push('\n');
                    content.push_str(&prefix_lines(&joined, LIST_INDENT));
                }
                ContainerKind::Plain => {
                    content.push_str("\n\n");
                    content.push_str(&joined);
                }
            }
        }

        content.trim().to_string()
    }

    /// Rendered non-empty children, numbering ordered items along the way
    fn render_children(&mut self, block: &'a Block) -> Vec<String> {
        let mut counter = OrderedCounter::default();
        let mut rendered = Vec::with_capacity(block.children.len());
        let blocks = self.blocks;

        for child in blocks.children(block) {
            let ordinal = (child.block_type == BlockType::Ordered).then(|| {
                let sequence = child
                    .text_body()
                    .and_then(|body| body.style.as_ref())
                    .and_then(|style| style.sequence.as_deref());
                counter.next(sequence)
            });

            let text = self.render_block(child, ordinal);
            if !text.is_empty() {
                rendered.push(text);
            }
        }
        rendered
    }

    fn render_self(&mut self, block: &'a Block, ordinal: Option<u64>) -> String {
        let content = self.render_content(block, ordinal);
        if self.options.embed_block_ids && !content.is_empty() {
            format!(
                "<!-- block:{} -->\n{}\n<!-- /block -->",
                block.block_id, content
            )
        } else {
            content
        }
    }

    fn render_content(&mut self, block: &'a Block, ordinal: Option<u64>) -> String {
        let body = block.text_body();
        match block.block_type {
            BlockType::Page | BlockType::QuoteContainer | BlockType::TableCell => String::new(),
            BlockType::Text => self.text(body),
            BlockType::Heading(level) => {
                let markers = "#".repeat(usize::from(level.clamp(1, MAX_MARKDOWN_HEADING)));
                format!("{} {}", markers, self.text(body))
            }
            BlockType::Bullet => format!("- {}", self.text(body)),
            BlockType::Ordered => format!("{}. {}", ordinal.unwrap_or(1), self.text(body)),
            BlockType::Todo => {
                let done = body
                    .and_then(|b| b.style.as_ref())
                    .and_then(|style| style.done)
                    .unwrap_or(false);
                let status = if done { "[x]" } else { "[ ]" };
                format!("- {} {}", status, self.text(body))
            }
            BlockType::Code => {
                let language = body
                    .and_then(|b| b.style.as_ref())
                    .and_then(|style| style.language)
                    .map(language_name)
                    .unwrap_or("text");
                let code = body.map(TextBody::plain_text).unwrap_or_default();
                format!("```{}\n{}\n```", language, code)
            }
            BlockType::Quote => format!("> {}", self.text(body)),
            BlockType::Callout => format!("> 💡 {}", self.text(body)),
            BlockType::Divider => "---".to_string(),
            BlockType::Image => self.render_image(block),
            BlockType::Board => self.render_board(block),
            BlockType::Sheet => self.render_sheet(block),
            BlockType::Bitable => self.render_bitable(block),
            BlockType::ReferenceBase => self.render_reference(block),
            BlockType::File => self.render_file(block),
            BlockType::Table => self.render_table(block),
            BlockType::Unknown(code) => {
                log::debug!("Skipping block {} of unknown type {}", block.block_id, code);
                String::new()
            }
        }
    }

    fn render_table(&mut self, block: &'a Block) -> String {
        let Some(table) = block.table.as_ref() else {
            return "[empty table]".to_string();
        };
        let property = &table.property;

        let blocks = self.blocks;
        let cells: Vec<String> = blocks
            .children(block)
            .map(|cell| {
                blocks
                    .children(cell)
                    .map(|child| self.render_block(child, None))
                    .collect::<Vec<_>>()
                    .join("<br>")
            })
            .collect();

        let grid = reconstruct_grid(
            property.row_size,
            property.column_size,
            &property.merge_info,
            &cells,
        );
        format_grid(&grid, self.options.table_format)
    }

    /// Render a text payload, resolving user mentions once per user
    fn text(&mut self, body: Option<&TextBody>) -> String {
        let Some(body) = body else {
            return String::new();
        };
        let api = self.api;
        let names = &mut self.user_names;
        render_elements(&body.elements, |user_id| {
            names
                .entry(user_id.to_string())
                .or_insert_with(|| match api.user_name(user_id) {
                    Ok(name) => name,
                    Err(err) => {
                        log::warn!("Failed to resolve user {}: {}", user_id, err);
                        user_id.to_string()
                    }
                })
                .clone()
        })
    }
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    text.split('\n')
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
