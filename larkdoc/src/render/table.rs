//! Table grid reconstruction and formatting
//!
//! The platform stores a table as a flat list of cell blocks plus a
//! row-major `merge_info` array. Only the top-left cell of a merged region
//! owns a cell block; spanned-over positions consume nothing.

use crate::api::TableFormat;
use crate::model::MergeInfo;
use itertools::Itertools;

/// Content origin of a (possibly merged) table region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub content: String,
    pub row_span: usize,
    pub col_span: usize,
}

/// Sparse table grid: origins hold content, spanned positions hold nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Option<GridCell>>,
}

impl TableGrid {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Origin at `(row, col)`, `None` for spanned-over or out-of-range positions
    pub fn get(&self, row: usize, col: usize) -> Option<&GridCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells[row * self.cols + col].as_ref()
    }

    /// All origins in row-major order
    pub fn origins(&self) -> impl Iterator<Item = (usize, usize, &GridCell)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            cell.as_ref().map(|cell| (i / self.cols, i % self.cols, cell))
        })
    }
}

/// Rebuild the grid of a `rows` x `cols` table
///
/// Walks positions row-major. Each unvisited position reads its span from
/// `merge_info` (1x1 when missing, zero spans count as 1), marks the spanned
/// rectangle visited and takes the next unconsumed entry of `cells` as its
/// content. Missing cell contents render empty. Dimensions whose product
/// overflows yield an empty grid.
pub fn reconstruct_grid(
    rows: usize,
    cols: usize,
    merge_info: &[MergeInfo],
    cells: &[String],
) -> TableGrid {
    let Some(size) = rows.checked_mul(cols) else {
        log::warn!("Table size {}x{} is out of range; rendering it empty", rows, cols);
        return TableGrid {
            rows: 0,
            cols: 0,
            cells: Vec::new(),
        };
    };
    let mut grid = TableGrid {
        rows,
        cols,
        cells: vec![None; size],
    };
    let mut visited = vec![false; size];
    let mut cursor = 0;

    for row in 0..rows {
        for col in 0..cols {
            let flat = row * cols + col;
            if visited[flat] {
                continue;
            }

            let span = merge_info.get(flat).copied().unwrap_or_default();
            let row_span = span.row_span.max(1);
            let col_span = span.col_span.max(1);

            for r in row..row.saturating_add(row_span).min(rows) {
                for c in col..col.saturating_add(col_span).min(cols) {
                    visited[r * cols + c] = true;
                }
            }

            let content = match cells.get(cursor) {
                Some(content) => {
                    cursor += 1;
                    content.clone()
                }
                None => String::new(),
            };

            grid.cells[flat] = Some(GridCell {
                content,
                row_span,
                col_span,
            });
        }
    }

    if cursor < cells.len() {
        log::warn!(
            "Table has {} cell blocks but only {} grid regions; extra cells dropped",
            cells.len(),
            cursor
        );
    }

    grid
}

/// Format a reconstructed grid
///
/// Markdown has no spans, so spanned-over positions become empty cells and
/// the first row is the header. HTML keeps spans as `rowspan`/`colspan`.
pub fn format_grid(grid: &TableGrid, format: TableFormat) -> String {
    if grid.rows == 0 || grid.cols == 0 {
        return String::new();
    }

    match format {
        TableFormat::Markdown => {
            let rows: Vec<Vec<String>> = (0..grid.rows)
                .map(|r| {
                    (0..grid.cols)
                        .map(|c| grid.get(r, c).map(|cell| cell.content.clone()).unwrap_or_default())
                        .collect()
                })
                .collect();
            markdown_table(&rows, grid.cols)
        }
        TableFormat::Html => {
            let mut output = String::from("<table>\n");
            for r in 0..grid.rows {
                output.push_str("<tr>");
                for c in 0..grid.cols {
                    let Some(cell) = grid.get(r, c) else {
                        continue;
                    };
                    output.push_str("<td");
                    if cell.row_span > 1 {
                        output.push_str(&format!(" rowspan=\"{}\"", cell.row_span));
                    }
                    if cell.col_span > 1 {
                        output.push_str(&format!(" colspan=\"{}\"", cell.col_span));
                    }
                    output.push('>');
                    output.push_str(&cell.content);
                    output.push_str("</td>");
                }
                output.push_str("</tr>\n");
            }
            output.push_str("</table>");
            output
        }
    }
}

/// Format a row-major value matrix whose first row is the header
///
/// Used for embedded sheets and base tables. Short rows are padded.
pub fn format_matrix(matrix: &[Vec<String>], format: TableFormat) -> String {
    let cols = matrix.iter().map(Vec::len).max().unwrap_or(0);
    if cols == 0 {
        return String::new();
    }

    match format {
        TableFormat::Markdown => markdown_table(matrix, cols),
        TableFormat::Html => {
            let mut output = String::from("<table>\n<thead>\n<tr>\n");
            for header in padded(&matrix[0], cols) {
                output.push_str(&format!("<th>{}</th>\n", escape_html(header)));
            }
            output.push_str("</tr>\n</thead>\n<tbody>\n");
            for row in matrix.iter().skip(1) {
                output.push_str("<tr>\n");
                for cell in padded(row, cols) {
                    output.push_str(&format!("<td>{}</td>\n", escape_html(cell)));
                }
                output.push_str("</tr>\n");
            }
            output.push_str("</tbody>\n</table>");
            output
        }
    }
}

fn padded(row: &[String], cols: usize) -> impl Iterator<Item = &str> {
    row.iter()
        .map(String::as_str)
        .pad_using(cols, |_| "")
        .take(cols)
}

fn markdown_table(rows: &[Vec<String>], cols: usize) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(format!(
            "| {} |",
            padded(row, cols).map(escape_markdown_cell).join(" | ")
        ));
        if i == 0 {
            lines.push(format!("|{}", "---|".repeat(cols)));
        }
    }
    lines.join("\n")
}

fn escape_markdown_cell(text: &str) -> String {
    text.trim().replace('|', "\\|").replace('\n', "<br>")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
