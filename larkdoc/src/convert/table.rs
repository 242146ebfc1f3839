//! Markdown tables to table descriptors

use super::ast::Inline;
use super::{drop_empty, paragraph_blocks, Conversion};
use crate::model::{BlockDescriptor, TextElement};

/// Build a table descriptor whose children are the cells, row-major
///
/// The head row comes first. Short rows are padded with empty cells, and a
/// cell without content holds one empty text block.
pub(super) fn convert_table(head: &[Vec<Inline>], rows: &[Vec<Vec<Inline>>]) -> Conversion {
    let mut normalized: Vec<&[Vec<Inline>]> = Vec::with_capacity(rows.len() + 1);
    if !head.is_empty() {
        normalized.push(head);
    }
    normalized.extend(rows.iter().map(Vec::as_slice));

    let row_count = normalized.len();
    let col_count = normalized.iter().map(|row| row.len()).max().unwrap_or(0);
    if row_count == 0 || col_count == 0 {
        return Conversion::default();
    }

    let mut out = Conversion::default();
    let mut cells = Vec::with_capacity(row_count * col_count);
    for row in normalized {
        for col in 0..col_count {
            let mut content = row
                .get(col)
                .map(|inlines| paragraph_blocks(inlines))
                .unwrap_or_default();
            content.blocks = drop_empty(content.blocks);
            if content.blocks.is_empty() {
                content.blocks.push(empty_text());
            }
            out.image_paths.append(&mut content.image_paths);
            cells.push(BlockDescriptor::table_cell(content.blocks));
        }
    }

    out.blocks
        .push(BlockDescriptor::table(row_count, col_count, cells));
    out
}

fn empty_text() -> BlockDescriptor {
    BlockDescriptor::text(vec![TextElement::text("")])
}
