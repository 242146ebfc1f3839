//! Markdown-to-block converter
//!
//! Parses Markdown and maps each node onto block descriptors. Local images
//! cannot be embedded at creation time, so each becomes an empty image
//! placeholder and its path is collected, in document order, alongside the
//! descriptors.

mod ast;
mod inline;
mod latex;
mod table;

pub use inline::split_run;
pub use latex::sanitize_latex;

use crate::model::{BlockDescriptor, TextElement};
use crate::schema::{code_language, BlockType, MAX_MARKDOWN_HEADING};
use ast::{Inline, ListItem, Node};
use inline::{flatten, is_blank, to_elements, Piece};
use serde::Serialize;

/// Converter output
///
/// `image_paths[i]` belongs to the i-th image placeholder in a depth-first
/// walk of `blocks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Conversion {
    pub blocks: Vec<BlockDescriptor>,
    pub image_paths: Vec<String>,
}

impl Conversion {
    fn append(&mut self, mut other: Conversion) {
        self.blocks.append(&mut other.blocks);
        self.image_paths.append(&mut other.image_paths);
    }

    /// Whether any descriptor, at any depth, is a table
    pub fn has_tables(&self) -> bool {
        fn any_table(blocks: &[BlockDescriptor]) -> bool {
            blocks
                .iter()
                .any(|b| b.block_type == BlockType::Table || any_table(&b.children))
        }
        any_table(&self.blocks)
    }
}

/// Convert Markdown text into block descriptors and local image paths
pub fn convert_markdown(markdown: &str) -> Conversion {
    let nodes = ast::parse(markdown);
    let mut out = convert_nodes(&nodes);
    out.blocks = drop_empty(out.blocks);
    log::debug!(
        "Converted {} nodes into {} blocks and {} local images",
        nodes.len(),
        out.blocks.len(),
        out.image_paths.len()
    );
    out
}

fn convert_nodes(nodes: &[Node]) -> Conversion {
    let mut out = Conversion::default();
    for node in nodes {
        out.append(convert_node(node));
    }
    out
}

fn convert_node(node: &Node) -> Conversion {
    match node {
        Node::Heading { level, content } => {
            let pieces = flatten(content);
            if pieces.iter().any(|p| matches!(p, Piece::Image(_))) {
                log::debug!("Dropping images inside a heading");
            }
            let level = (*level).clamp(1, MAX_MARKDOWN_HEADING);
            single(BlockDescriptor::heading(level, to_elements(&pieces)))
        }
        Node::Paragraph(inlines) => paragraph_blocks(inlines),
        Node::List { start, items } => convert_list(*start, items),
        Node::CodeBlock { info, text } => {
            let code = text.strip_suffix('\n').unwrap_or(text);
            let elements = split_run(code).into_iter().map(TextElement::text).collect();
            single(BlockDescriptor::code(elements, code_language(info)))
        }
        Node::BlockQuote(children) => convert_quote(children),
        Node::Rule => single(BlockDescriptor::divider()),
        Node::Table { head, rows } => table::convert_table(head, rows),
        Node::Html(html) => {
            log::debug!("Dropping HTML block {:?}", html.trim());
            Conversion::default()
        }
    }
}

fn single(block: BlockDescriptor) -> Conversion {
    Conversion {
        blocks: vec![block],
        image_paths: Vec::new(),
    }
}

/// Paragraph content as text blocks, split around images and display math
pub(crate) fn paragraph_blocks(inlines: &[Inline]) -> Conversion {
    let mut out = Conversion::default();
    let mut buffer = Vec::new();

    for piece in flatten(inlines) {
        match piece {
            Piece::Image(url) => {
                flush_text(&mut buffer, &mut out);
                out.append(image_block(&url));
            }
            Piece::DisplayMath(math) => {
                flush_text(&mut buffer, &mut out);
                out.blocks.push(BlockDescriptor::equation(math));
            }
            other => buffer.push(other),
        }
    }
    flush_text(&mut buffer, &mut out);
    out
}

fn flush_text(buffer: &mut Vec<Piece>, out: &mut Conversion) {
    let pieces = std::mem::take(buffer);
    if !is_blank(&pieces) {
        out.blocks.push(BlockDescriptor::text(to_elements(&pieces)));
    }
}

/// Remote and data URLs cannot be uploaded; they stay as literal Markdown
fn is_remote(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:")
        || lower.starts_with("//")
}

fn image_block(url: &str) -> Conversion {
    if url.is_empty() {
        return Conversion::default();
    }
    if is_remote(url) {
        return single(BlockDescriptor::text(vec![TextElement::text(format!(
            "![Image]({})",
            url
        ))]));
    }
    Conversion {
        blocks: vec![BlockDescriptor::image_placeholder()],
        image_paths: vec![url.to_string()],
    }
}

/// One block per item
///
/// The first paragraph is the item's text; its images and display math
/// follow the item as siblings. Everything else nests under the item.
fn convert_list(start: Option<u64>, items: &[ListItem]) -> Conversion {
    let mut out = Conversion::default();

    for (index, item) in items.iter().enumerate() {
        let mut elements = Vec::new();
        let mut siblings = Conversion::default();
        let mut rest = item.children.as_slice();

        if let Some((Node::Paragraph(inlines), tail)) = item.children.split_first() {
            let mut buffer = Vec::new();
            for piece in flatten(inlines) {
                match piece {
                    Piece::Image(url) => siblings.append(image_block(&url)),
                    Piece::DisplayMath(math) => {
                        siblings.blocks.push(BlockDescriptor::equation(math))
                    }
                    other => buffer.push(other),
                }
            }
            if !is_blank(&buffer) {
                elements = to_elements(&buffer);
            }
            rest = tail;
        }

        let nested = convert_nodes(rest);
        let block = match (item.task, start) {
            (Some(done), _) => BlockDescriptor::todo(elements, done),
            (None, Some(first)) => {
                let sequence = if index == 0 {
                    first.to_string()
                } else {
                    "auto".to_string()
                };
                BlockDescriptor::ordered(elements, sequence)
            }
            (None, None) => BlockDescriptor::bullet(elements),
        };

        out.blocks.push(block.with_children(nested.blocks));
        out.image_paths.extend(nested.image_paths);
        out.append(siblings);
    }
    out
}

/// Quote text is the paragraphs' inline content joined by spaces
///
/// Other children cannot live inside a quote block and follow it as
/// siblings, as do images.
fn convert_quote(children: &[Node]) -> Conversion {
    let mut pieces: Vec<Piece> = Vec::new();
    let mut siblings = Conversion::default();

    for child in children {
        match child {
            Node::Paragraph(inlines) => {
                let mut paragraph = Vec::new();
                for piece in flatten(inlines) {
                    match piece {
                        Piece::Image(url) => siblings.append(image_block(&url)),
                        Piece::DisplayMath(math) => paragraph.push(Piece::Equation(math)),
                        other => paragraph.push(other),
                    }
                }
                if is_blank(&paragraph) {
                    continue;
                }
                if !pieces.is_empty() {
                    pieces.push(Piece::Text(" ".to_string(), Default::default()));
                }
                pieces.append(&mut paragraph);
            }
            other => siblings.append(convert_node(other)),
        }
    }

    let mut out = single(BlockDescriptor::quote(to_elements(&pieces)));
    out.append(siblings);
    out
}

/// Drop visually empty blocks at every depth, hoisting their children
pub(crate) fn drop_empty(blocks: Vec<BlockDescriptor>) -> Vec<BlockDescriptor> {
    let mut out = Vec::with_capacity(blocks.len());
    for mut block in blocks {
        block.children = drop_empty(std::mem::take(&mut block.children));
        if block.is_visually_empty() {
            out.append(&mut block.children);
        } else {
            out.push(block);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockBody, TextRun, TextStyle};
    use crate::schema::ALIGN_CENTER;

    fn plain(elements: &[TextElement]) -> String {
        elements.iter().map(TextElement::plain_text).collect()
    }

    #[test]
    fn test_convert_heading_and_paragraph() {
        // Arrange
        let markdown = "# Title\n\nHello **world**";

        // Act
        let out = convert_markdown(markdown);

        // Assert
        assert_eq!(out.blocks.len(), 2);
        assert_eq!(out.blocks[0].block_type, BlockType::Heading(1));
        assert_eq!(plain(out.blocks[0].elements().unwrap()), "Title");
        assert_eq!(
            out.blocks[1].elements().unwrap(),
            &[
                TextElement::text("Hello "),
                TextElement::TextRun(TextRun::styled(
                    "world",
                    &TextStyle {
                        bold: true,
                        ..TextStyle::default()
                    }
                )),
            ]
        );
    }

    #[test]
    fn test_convert_heading_levels_clamp() {
        let out = convert_markdown("###### six");
        assert_eq!(out.blocks[0].block_type, BlockType::Heading(6));
    }

    #[test]
    fn test_convert_local_image_placeholder() {
        let out = convert_markdown("![alt](./pic.png)");

        assert_eq!(out.image_paths, vec!["./pic.png"]);
        assert_eq!(out.blocks, vec![BlockDescriptor::image_placeholder()]);
    }

    #[test]
    fn test_convert_remote_image_stays_literal() {
        let out = convert_markdown("![alt](https://host/pic.png)");

        assert!(out.image_paths.is_empty());
        assert_eq!(
            out.blocks,
            vec![BlockDescriptor::text(vec![TextElement::text(
                "![Image](https://host/pic.png)"
            )])]
        );
    }

    #[test]
    fn test_convert_paragraph_splits_around_image() {
        // Arrange
        let markdown = "before ![a](a.png) after";

        // Act
        let out = convert_markdown(markdown);

        // Assert
        let types: Vec<BlockType> = out.blocks.iter().map(|b| b.block_type).collect();
        assert_eq!(types, vec![BlockType::Text, BlockType::Image, BlockType::Text]);
        assert_eq!(plain(out.blocks[0].elements().unwrap()), "before ");
        assert_eq!(plain(out.blocks[2].elements().unwrap()), " after");
    }

    #[test]
    fn test_convert_display_math_is_centered_equation() {
        let out = convert_markdown("$$\\tag{2} x$$");

        let block = &out.blocks[0];
        assert_eq!(block.block_type, BlockType::Text);
        assert_eq!(block.elements().unwrap(), &[TextElement::equation("(2) x")]);
        let BlockBody::Text(body) = &block.body else {
            panic!("expected text body");
        };
        assert_eq!(body.style.as_ref().unwrap().align, Some(ALIGN_CENTER));
    }

    #[test]
    fn test_convert_ordered_list_sequences() {
        let out = convert_markdown("3. a\n4. b\n5. c\n");

        let sequences: Vec<String> = out
            .blocks
            .iter()
            .map(|b| match &b.body {
                BlockBody::Text(body) => body.style.as_ref().unwrap().sequence.clone().unwrap(),
                _ => panic!("expected text body"),
            })
            .collect();
        assert_eq!(sequences, vec!["3", "auto", "auto"]);
    }

    #[test]
    fn test_convert_nested_list_becomes_children() {
        // Arrange
        let markdown = "- parent ![i](p.png)\n    - child\n- next\n";

        // Act
        let out = convert_markdown(markdown);

        // Assert
        let types: Vec<BlockType> = out.blocks.iter().map(|b| b.block_type).collect();
        assert_eq!(types, vec![BlockType::Bullet, BlockType::Image, BlockType::Bullet]);
        assert_eq!(out.blocks[0].children.len(), 1);
        assert_eq!(plain(out.blocks[0].children[0].elements().unwrap()), "child");
        assert_eq!(out.image_paths, vec!["p.png"]);
    }

    #[test]
    fn test_convert_task_list() {
        let out = convert_markdown("- [x] done\n- [ ] todo\n");
        assert!(out.blocks.iter().all(|b| b.block_type == BlockType::Todo));
    }

    #[test]
    fn test_convert_quote_flattens_paragraphs() {
        let out = convert_markdown("> one\n>\n> two\n>\n> ```\n> code\n> ```\n");

        assert_eq!(out.blocks.len(), 2);
        assert_eq!(out.blocks[0].block_type, BlockType::Quote);
        assert_eq!(plain(out.blocks[0].elements().unwrap()), "one two");
        assert_eq!(out.blocks[1].block_type, BlockType::Code);
    }

    #[test]
    fn test_convert_code_block() {
        let out = convert_markdown("```py\nprint(1)\n```\n");

        let BlockBody::Text(body) = &out.blocks[0].body else {
            panic!("expected text body");
        };
        assert_eq!(body.plain_text(), "print(1)");
        assert_eq!(body.style.as_ref().unwrap().language, Some(code_language("python")));
    }

    #[test]
    fn test_convert_rule_and_html() {
        let out = convert_markdown("<div>x</div>\n\n---\n");
        assert_eq!(out.blocks, vec![BlockDescriptor::divider()]);
    }

    #[test]
    fn test_drop_empty_hoists_children() {
        // Arrange
        let blocks = vec![BlockDescriptor::bullet(vec![])
            .with_children(vec![BlockDescriptor::bullet(vec![TextElement::text("x")])])];

        // Act
        let out = drop_empty(blocks);

        // Assert
        assert_eq!(out, vec![BlockDescriptor::bullet(vec![TextElement::text("x")])]);
    }

    #[test]
    fn test_has_tables() {
        assert!(convert_markdown("| a |\n|---|\n| b |\n").has_tables());
        assert!(!convert_markdown("plain").has_tables());
    }
}
