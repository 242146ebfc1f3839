//! Boundary to the platform API
//!
//! The HTTP client, authentication and token caching live behind the
//! [`DocumentApi`] trait. An implementation carries its own credentials; the
//! renderer and the write orchestrator only see these operations.

use crate::model::{Block, BlockDescriptor, TextBody};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by a [`DocumentApi`] implementation
#[derive(Error, Debug)]
pub enum ApiError {
    /// The platform answered with a non-success response
    #[error("{method} failed (status: {status:?}, code: {code}): {message}")]
    Vendor {
        method: &'static str,
        status: Option<u16>,
        code: i64,
        message: String,
    },

    #[error("{method}: {resource} not found")]
    NotFound {
        method: &'static str,
        resource: String,
    },

    #[error("{method} is not supported by this backend")]
    Unsupported { method: &'static str },

    #[error("IO error in {method}: {source}")]
    Io {
        method: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Name of the API operation that failed
    pub fn method(&self) -> &'static str {
        match self {
            ApiError::Vendor { method, .. }
            | ApiError::NotFound { method, .. }
            | ApiError::Unsupported { method }
            | ApiError::Io { method, .. } => method,
        }
    }
}

/// Output format for tables and embedded tabular data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableFormat {
    #[default]
    #[serde(rename = "md")]
    Markdown,
    #[serde(rename = "html")]
    Html,
}

/// A single-block modification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockUpdate {
    /// Replace the text payload of a text-bearing block
    ReplaceText { block_id: String, body: TextBody },
    /// Point an image block at uploaded media
    ReplaceImage { block_id: String, file_token: String },
    /// Remove a block from the document
    Delete { block_id: String },
}

impl BlockUpdate {
    pub fn block_id(&self) -> &str {
        match self {
            BlockUpdate::ReplaceText { block_id, .. }
            | BlockUpdate::ReplaceImage { block_id, .. }
            | BlockUpdate::Delete { block_id } => block_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardPosition {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSize {
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// A node on a whiteboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardNode {
    #[serde(default)]
    pub node_id: String,

    #[serde(default, rename = "type")]
    pub node_type: String,

    #[serde(default)]
    pub position: Option<BoardPosition>,

    #[serde(default)]
    pub size: Option<BoardSize>,

    #[serde(default)]
    pub text: Option<String>,
}

/// Column of a base table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitableField {
    pub field_name: String,

    /// UI type reported by the platform (`DateTime`, `Text`, ...)
    #[serde(default)]
    pub ui_type: Option<String>,
}

/// Row of a base table keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BitableRecord {
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Operations consumed from the platform
///
/// Calls are synchronous and may block on the network. Structural calls
/// (listing and creating blocks) are expected to fail loudly; callers decide
/// which failures degrade.
pub trait DocumentApi {
    /// Every block of a document in document order, all pages fetched
    fn list_document_blocks(&self, document_id: &str) -> Result<Vec<Block>, ApiError>;

    /// Direct children of a block
    fn get_block_children(&self, document_id: &str, block_id: &str)
        -> Result<Vec<Block>, ApiError>;

    /// Create children under `parent_id`
    ///
    /// Callers send at most [`crate::schema::MAX_CHILDREN_PER_REQUEST`]
    /// descriptors per call. Nested descriptor children other than empty
    /// table cells are not part of the request. `index` of `None` appends.
    fn create_blocks(
        &self,
        document_id: &str,
        parent_id: &str,
        children: &[BlockDescriptor],
        index: Option<usize>,
    ) -> Result<Vec<Block>, ApiError>;

    /// Apply one modification
    fn update_block(&self, document_id: &str, update: &BlockUpdate) -> Result<Block, ApiError>;

    /// Apply several modifications in one request
    fn batch_update_blocks(
        &self,
        document_id: &str,
        updates: &[BlockUpdate],
    ) -> Result<Vec<Block>, ApiError>;

    /// Delete the children of `parent_id` in `start..end`
    fn delete_block_children(
        &self,
        document_id: &str,
        parent_id: &str,
        start: usize,
        end: usize,
    ) -> Result<(), ApiError>;

    /// Convert Markdown with the platform's own converter
    fn convert_markdown_native(&self, markdown: &str) -> Result<Vec<BlockDescriptor>, ApiError>;

    /// Upload a local image for the given image block, returning its file token
    fn upload_image(
        &self,
        local_path: &Path,
        parent_block_id: &str,
        document_id: &str,
    ) -> Result<String, ApiError>;

    /// Download media to the local assets directory
    fn download_media(&self, file_token: &str) -> Result<PathBuf, ApiError>;

    /// Export a whiteboard as an image in the local assets directory
    fn download_whiteboard_image(&self, board_id: &str) -> Result<PathBuf, ApiError>;

    /// Nodes of a whiteboard
    fn whiteboard_nodes(&self, board_id: &str) -> Result<Vec<BoardNode>, ApiError>;

    /// Temporary download URL of an attachment
    fn file_download_url(&self, file_token: &str) -> Result<String, ApiError>;

    /// Cell values of one sheet, row-major
    fn sheet_values(&self, spreadsheet_token: &str, sheet_id: &str)
        -> Result<Vec<Vec<String>>, ApiError>;

    fn bitable_fields(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: Option<&str>,
    ) -> Result<Vec<BitableField>, ApiError>;

    /// All records of a base table, all pages fetched
    fn bitable_records(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: Option<&str>,
    ) -> Result<Vec<BitableRecord>, ApiError>;

    /// Display name of a user
    fn user_name(&self, user_id: &str) -> Result<String, ApiError>;

    /// Create an empty document, returning its ID
    fn create_document(&self, title: &str, folder_token: Option<&str>)
        -> Result<String, ApiError>;

    fn replace_image(
        &self,
        document_id: &str,
        block_id: &str,
        file_token: &str,
    ) -> Result<Block, ApiError> {
        self.update_block(
            document_id,
            &BlockUpdate::ReplaceImage {
                block_id: block_id.to_string(),
                file_token: file_token.to_string(),
            },
        )
    }

    fn delete_block(&self, document_id: &str, block_id: &str) -> Result<(), ApiError> {
        self.batch_update_blocks(
            document_id,
            &[BlockUpdate::Delete {
                block_id: block_id.to_string(),
            }],
        )
        .map(|_| ())
    }
}
