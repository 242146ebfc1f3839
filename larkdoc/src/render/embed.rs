//! Leaf content materialized through the platform API
//!
//! Images, whiteboards, sheets, base tables and attachments all need a
//! collaborator call. A failing call degrades to a placeholder and never
//! aborts the render.

use super::table::format_matrix;
use super::Renderer;
use crate::api::{ApiError, BitableField, BoardNode};
use crate::model::Block;
use serde_json::Value;
use std::path::Path;

/// Whiteboard nodes listed in the metadata table
const BOARD_NODE_LIMIT: usize = 20;
const BOARD_ID_CHARS: usize = 8;
const BOARD_TEXT_CHARS: usize = 30;

impl Renderer<'_> {
    pub(super) fn render_image(&self, block: &Block) -> String {
        let Some(token) = block.image_token() else {
            return String::new();
        };
        match self.api.download_media(token) {
            Ok(path) => format!("![image]({})", self.asset_link(&path)),
            Err(err) => {
                log::warn!("Failed to download image {}: {}", token, err);
                format!("![image download failed]({})", token)
            }
        }
    }

    pub(super) fn render_board(&self, block: &Block) -> String {
        let Some(board_id) = block
            .board
            .as_ref()
            .map(|board| board.token.as_str())
            .filter(|token| !token.is_empty())
        else {
            return String::new();
        };

        let mut parts = Vec::new();
        match self.api.download_whiteboard_image(board_id) {
            Ok(path) => parts.push(format!("![whiteboard]({})", self.asset_link(&path))),
            Err(err) => {
                log::warn!("Failed to export whiteboard {}: {}", board_id, err);
                parts.push(format!("![whiteboard export failed]({})", board_id));
            }
        }

        if self.options.export_board_metadata {
            match self.api.whiteboard_nodes(board_id) {
                Ok(nodes) => {
                    let metadata = board_metadata(&nodes);
                    if !metadata.is_empty() {
                        parts.push(metadata);
                    }
                }
                Err(err) => log::warn!("Failed to fetch nodes of whiteboard {}: {}", board_id, err),
            }
        }

        parts.join("\n\n")
    }

    /// Sheet tokens are `<spreadsheet>_<sheet id>`
    pub(super) fn render_sheet(&self, block: &Block) -> String {
        let Some(token) = block.sheet.as_ref().map(|sheet| sheet.token.as_str()) else {
            return String::new();
        };
        let Some((spreadsheet, sheet_id)) = token.split_once('_') else {
            log::warn!("Malformed sheet token {}", token);
            return String::new();
        };

        match self.api.sheet_values(spreadsheet, sheet_id) {
            Ok(values) => format_matrix(&values, self.options.table_format),
            Err(err) => {
                log::warn!("Failed to fetch sheet {}: {}", token, err);
                format!("[sheet unavailable: {}]", token)
            }
        }
    }

    /// Base tokens are `<app>_<table id>`
    pub(super) fn render_bitable(&self, block: &Block) -> String {
        let Some(token) = block.bitable.as_ref().map(|bitable| bitable.token.as_str()) else {
            return String::new();
        };
        match token.split_once('_') {
            Some((app, table_id)) => self.bitable_table(token, app, table_id, None),
            None => {
                log::warn!("Malformed bitable token {}", token);
                String::new()
            }
        }
    }

    /// Reference blocks render only when they point at a base table
    pub(super) fn render_reference(&self, block: &Block) -> String {
        let Some(reference) = block.reference_base.as_ref() else {
            return String::new();
        };
        let parts: Vec<&str> = reference.token.split('_').collect();
        match parts.as_slice() {
            [app, table_id] if table_id.starts_with("tb") => self.bitable_table(
                &reference.token,
                app,
                table_id,
                reference.view_id.as_deref(),
            ),
            _ => {
                log::debug!("Skipping reference block {}", block.block_id);
                String::new()
            }
        }
    }

    pub(super) fn render_file(&self, block: &Block) -> String {
        let Some(file) = block.file.as_ref() else {
            return String::new();
        };
        let name = file
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("untitled file");

        match self.api.file_download_url(&file.token) {
            Ok(url) if !url.is_empty() => format!("📎 [{}]({})", name, url),
            Ok(_) => format!("📎 {} (token: `{}`)", name, file.token),
            Err(err) => {
                log::warn!("Failed to get download URL of {}: {}", file.token, err);
                format!("📎 {} (token: `{}`)", name, file.token)
            }
        }
    }

    fn bitable_table(&self, token: &str, app: &str, table_id: &str, view_id: Option<&str>) -> String {
        match self.bitable_matrix(app, table_id, view_id) {
            Ok(matrix) => format_matrix(&matrix, self.options.table_format),
            Err(err) => {
                log::warn!("Failed to fetch bitable {}: {}", token, err);
                format!("[bitable unavailable: {}]", token)
            }
        }
    }

    fn bitable_matrix(
        &self,
        app: &str,
        table_id: &str,
        view_id: Option<&str>,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        let fields = self.api.bitable_fields(app, table_id, view_id)?;
        if fields.is_empty() {
            return Err(ApiError::NotFound {
                method: "bitable.v1.app_table_field.list",
                resource: format!("fields of {}/{}", app, table_id),
            });
        }
        let records = self.api.bitable_records(app, table_id, view_id)?;

        let mut matrix = Vec::with_capacity(records.len() + 1);
        matrix.push(fields.iter().map(|f| f.field_name.clone()).collect());
        for record in &records {
            matrix.push(
                fields
                    .iter()
                    .map(|field| bitable_cell_text(field, record.fields.get(&field.field_name)))
                    .collect(),
            );
        }
        Ok(matrix)
    }

    /// Link to a downloaded asset relative to the Markdown file
    fn asset_link(&self, path: &Path) -> String {
        let dir_name = self
            .options
            .assets_dir
            .as_deref()
            .and_then(Path::file_name);
        match (dir_name, path.file_name()) {
            (Some(dir), Some(file)) => {
                format!("{}/{}", dir.to_string_lossy(), file.to_string_lossy())
            }
            _ => path.display().to_string(),
        }
    }
}

/// Plain-text rendering of a base table field value
pub(super) fn bitable_cell_text(field: &BitableField, value: Option<&Value>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    if field.ui_type.as_deref() == Some("DateTime") {
        if let Some(millis) = value.as_i64() {
            if let Some(time) = chrono::DateTime::from_timestamp_millis(millis) {
                return time.format("%Y-%m-%d %H:%M:%S").to_string();
            }
        }
    }

    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => join_items(items),
        Value::Object(map) => {
            if let Some(text) = map.get("text").or_else(|| map.get("name")) {
                scalar_text(text)
            } else if let Some(Value::Array(items)) = map.get("value") {
                join_items(items)
            } else {
                value.to_string()
            }
        }
        other => other.to_string(),
    }
}

fn join_items(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => ["text", "name", "url", "full_name"]
                .iter()
                .find_map(|key| map.get(*key))
                .map(scalar_text)
                .unwrap_or_else(|| item.to_string()),
            other => scalar_text(other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Collapsible node table appended after a whiteboard image
pub(super) fn board_metadata(nodes: &[BoardNode]) -> String {
    if nodes.is_empty() {
        return String::new();
    }

    let mut lines = vec![
        "<details>".to_string(),
        "<summary>Whiteboard structure</summary>".to_string(),
        String::new(),
        format!("**Nodes**: {}", nodes.len()),
        String::new(),
        "| Node ID | Type | Position | Size | Text |".to_string(),
        "|---|---|---|---|---|".to_string(),
    ];

    for node in nodes.iter().take(BOARD_NODE_LIMIT) {
        let node_id = if node.node_id.is_empty() {
            "N/A".to_string()
        } else {
            truncate(&node.node_id, BOARD_ID_CHARS, BOARD_ID_CHARS)
        };
        let node_type = if node.node_type.is_empty() {
            "unknown"
        } else {
            node.node_type.as_str()
        };
        let position = node
            .position
            .as_ref()
            .map(|p| format!("({}, {})", p.x, p.y))
            .unwrap_or_else(|| "N/A".to_string());
        let size = node
            .size
            .as_ref()
            .map(|s| format!("{}×{}", s.width, s.height))
            .unwrap_or_else(|| "N/A".to_string());
        let text = match node.text.as_deref() {
            Some(text) if !text.is_empty() => {
                truncate(text, BOARD_TEXT_CHARS, BOARD_TEXT_CHARS - 3)
            }
            _ => "-".to_string(),
        };

        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            node_id,
            node_type,
            position,
            size,
            text.replace('|', "\\|")
        ));
    }

    if nodes.len() > BOARD_NODE_LIMIT {
        lines.push(format!("| ... | {} nodes total | ... | ... | ... |", nodes.len()));
    }

    lines.push(String::new());
    lines.push("</details>".to_string());
    lines.join("\n")
}

/// Cut to `keep` characters plus an ellipsis when longer than `limit`
fn truncate(text: &str, limit: usize, keep: usize) -> String {
    if text.chars().count() > limit {
        format!("{}...", text.chars().take(keep).collect::<String>())
    } else {
        text.to_string()
    }
}
