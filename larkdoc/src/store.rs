//! In-memory document store
//!
//! [`MemoryStore`] implements [`DocumentApi`] without a network. It behaves
//! like the platform where the write path depends on it: IDs are assigned on
//! creation, table cells are created with their table, creation calls are
//! limited to [`MAX_CHILDREN_PER_REQUEST`] children, and image blocks only
//! accept tokens of uploaded media. Documents load from and save to JSON
//! snapshots of their block list.

use crate::api::{ApiError, BitableField, BitableRecord, BlockUpdate, BoardNode, DocumentApi};
use crate::convert::convert_markdown;
use crate::model::{Block, BlockDescriptor, BlockMap, ImageBody, TextBody, TextElement};
use crate::schema::{BlockType, MAX_CHILDREN_PER_REQUEST};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Vendor code for rejected request parameters
const INVALID_PARAM: i64 = 1_770_001;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid snapshot {path}: {source}", path = .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot contains no blocks")]
    Empty,

    #[error("Unknown document {0}")]
    UnknownDocument(String),
}

/// Snapshot file layout: a bare block list or a `{"items": [...]}` page
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Items { items: Vec<Block> },
    List(Vec<Block>),
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    items: Vec<&'a Block>,
}

#[derive(Debug, Default)]
struct Document {
    root_id: String,
    blocks: HashMap<String, Block>,
}

impl Document {
    fn block_mut(&mut self, method: &'static str, block_id: &str) -> Result<&mut Block, ApiError> {
        self.blocks.get_mut(block_id).ok_or_else(|| ApiError::NotFound {
            method,
            resource: format!("block {}", block_id),
        })
    }

    /// Blocks depth-first from the root, as the platform lists them
    fn ordered_blocks(&self) -> Vec<&Block> {
        let mut out = Vec::with_capacity(self.blocks.len());
        let mut stack = vec![self.root_id.as_str()];
        while let Some(id) = stack.pop() {
            if let Some(block) = self.blocks.get(id) {
                out.push(block);
                stack.extend(block.children.iter().rev().map(String::as_str));
            }
        }
        out
    }

    fn remove_subtree(&mut self, block_id: &str) {
        if let Some(block) = self.blocks.remove(block_id) {
            for child in &block.children {
                self.remove_subtree(child);
            }
        }
    }
}

#[derive(Debug, Default)]
struct State {
    documents: HashMap<String, Document>,
    primary: Option<String>,
    next_id: u64,
    uploads: Vec<(String, PathBuf)>,
    media: HashMap<String, PathBuf>,
    boards: HashMap<String, (PathBuf, Vec<BoardNode>)>,
    sheets: HashMap<(String, String), Vec<Vec<String>>>,
    bitables: HashMap<(String, String), (Vec<BitableField>, Vec<BitableRecord>)>,
    file_urls: HashMap<String, String>,
    users: HashMap<String, String>,
    native_conversion: bool,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    fn document(&self, method: &'static str, document_id: &str) -> Result<&Document, ApiError> {
        self.documents.get(document_id).ok_or_else(|| ApiError::NotFound {
            method,
            resource: format!("document {}", document_id),
        })
    }

    fn document_mut(
        &mut self,
        method: &'static str,
        document_id: &str,
    ) -> Result<&mut Document, ApiError> {
        self.documents.get_mut(document_id).ok_or_else(|| ApiError::NotFound {
            method,
            resource: format!("document {}", document_id),
        })
    }

    fn apply(&mut self, document_id: &str, update: &BlockUpdate) -> Result<Block, ApiError> {
        const METHOD: &str = "docx.v1.document_block.patch";
        match update {
            BlockUpdate::ReplaceText { block_id, body } => {
                let block = self.document_mut(METHOD, document_id)?.block_mut(METHOD, block_id)?;
                if !block.set_text_body(body.clone()) {
                    return Err(invalid_param(METHOD, "block does not carry text"));
                }
                Ok(block.clone())
            }
            BlockUpdate::ReplaceImage {
                block_id,
                file_token,
            } => {
                if !self.uploads.iter().any(|(token, _)| token == file_token) {
                    return Err(invalid_param(METHOD, "unknown file token"));
                }
                let block = self.document_mut(METHOD, document_id)?.block_mut(METHOD, block_id)?;
                if block.block_type != BlockType::Image {
                    return Err(invalid_param(METHOD, "block is not an image"));
                }
                let image = block.image.get_or_insert_with(ImageBody::default);
                image.token = Some(file_token.clone());
                Ok(block.clone())
            }
            BlockUpdate::Delete { block_id } => {
                let document = self.document_mut(METHOD, document_id)?;
                if *block_id == document.root_id {
                    return Err(invalid_param(METHOD, "cannot delete the page block"));
                }
                let block = document.block_mut(METHOD, block_id)?.clone();
                if let Some(parent) = block
                    .parent_id
                    .as_deref()
                    .and_then(|id| document.blocks.get_mut(id))
                {
                    parent.children.retain(|id| id != block_id);
                }
                document.remove_subtree(block_id);
                Ok(block)
            }
        }
    }
}

fn invalid_param(method: &'static str, message: &str) -> ApiError {
    ApiError::Vendor {
        method,
        status: Some(400),
        code: INVALID_PARAM,
        message: message.to_string(),
    }
}

/// Single-threaded in-memory implementation of [`DocumentApi`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot as the primary document
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: SnapshotFile =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let blocks = match snapshot {
            SnapshotFile::Items { items } => items,
            SnapshotFile::List(blocks) => blocks,
        };

        let store = Self::new();
        store.insert_document(blocks)?;
        Ok(store)
    }

    /// Write a document's blocks as a snapshot
    pub fn save<P: AsRef<Path>>(&self, document_id: &str, path: P) -> Result<(), StoreError> {
        let path = path.as_ref();
        let state = self.state.borrow();
        let document = state
            .documents
            .get(document_id)
            .ok_or_else(|| StoreError::UnknownDocument(document_id.to_string()))?;
        let snapshot = SnapshotOut {
            items: document.ordered_blocks(),
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Add a document from a fetched block list, returning its ID
    ///
    /// The document ID is the page block's ID, or the first block's.
    pub fn insert_document(&self, blocks: Vec<Block>) -> Result<String, StoreError> {
        let map = BlockMap::from_blocks(blocks.clone());
        let root_id = map.root().map(|b| b.block_id.clone()).ok_or(StoreError::Empty)?;

        let mut state = self.state.borrow_mut();
        let document = Document {
            root_id: root_id.clone(),
            blocks: blocks
                .into_iter()
                .map(|block| (block.block_id.clone(), block))
                .collect(),
        };
        state.documents.insert(root_id.clone(), document);
        state.primary.get_or_insert_with(|| root_id.clone());
        Ok(root_id)
    }

    /// ID of the first loaded or created document
    pub fn primary_document(&self) -> Option<String> {
        self.state.borrow().primary.clone()
    }

    /// Uploaded media as `(file token, local path)`, in upload order
    pub fn uploads(&self) -> Vec<(String, PathBuf)> {
        self.state.borrow().uploads.clone()
    }

    /// Let `convert_markdown_native` succeed using the local converter
    pub fn enable_native_conversion(&self) {
        self.state.borrow_mut().native_conversion = true;
    }

    pub fn add_media(&self, file_token: &str, path: impl Into<PathBuf>) {
        self.state
            .borrow_mut()
            .media
            .insert(file_token.to_string(), path.into());
    }

    pub fn add_board(&self, board_id: &str, image: impl Into<PathBuf>, nodes: Vec<BoardNode>) {
        self.state
            .borrow_mut()
            .boards
            .insert(board_id.to_string(), (image.into(), nodes));
    }

    pub fn add_sheet(&self, spreadsheet_token: &str, sheet_id: &str, values: Vec<Vec<String>>) {
        self.state.borrow_mut().sheets.insert(
            (spreadsheet_token.to_string(), sheet_id.to_string()),
            values,
        );
    }

    pub fn add_bitable(
        &self,
        app_token: &str,
        table_id: &str,
        fields: Vec<BitableField>,
        records: Vec<BitableRecord>,
    ) {
        self.state.borrow_mut().bitables.insert(
            (app_token.to_string(), table_id.to_string()),
            (fields, records),
        );
    }

    pub fn add_file_url(&self, file_token: &str, url: &str) {
        self.state
            .borrow_mut()
            .file_urls
            .insert(file_token.to_string(), url.to_string());
    }

    pub fn add_user(&self, user_id: &str, name: &str) {
        self.state
            .borrow_mut()
            .users
            .insert(user_id.to_string(), name.to_string());
    }
}

fn not_found(method: &'static str, resource: String) -> ApiError {
    ApiError::NotFound { method, resource }
}

impl DocumentApi for MemoryStore {
    fn list_document_blocks(&self, document_id: &str) -> Result<Vec<Block>, ApiError> {
        let state = self.state.borrow();
        let document = state.document("docx.v1.document_block.list", document_id)?;
        Ok(document.ordered_blocks().into_iter().cloned().collect())
    }

    fn get_block_children(
        &self,
        document_id: &str,
        block_id: &str,
    ) -> Result<Vec<Block>, ApiError> {
        const METHOD: &str = "docx.v1.document_block_children.get";
        let state = self.state.borrow();
        let document = state.document(METHOD, document_id)?;
        let block = document
            .blocks
            .get(block_id)
            .ok_or_else(|| not_found(METHOD, format!("block {}", block_id)))?;
        Ok(block
            .children
            .iter()
            .filter_map(|id| document.blocks.get(id))
            .cloned()
            .collect())
    }

    fn create_blocks(
        &self,
        document_id: &str,
        parent_id: &str,
        children: &[BlockDescriptor],
        index: Option<usize>,
    ) -> Result<Vec<Block>, ApiError> {
        const METHOD: &str = "docx.v1.document_block_children.create";
        if children.len() > MAX_CHILDREN_PER_REQUEST {
            return Err(invalid_param(METHOD, "too many children in one request"));
        }

        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let document = state
            .documents
            .get_mut(document_id)
            .ok_or_else(|| not_found(METHOD, format!("document {}", document_id)))?;
        if !document.blocks.contains_key(parent_id) {
            return Err(not_found(METHOD, format!("block {}", parent_id)));
        }

        let mut created = Vec::with_capacity(children.len());
        for descriptor in children {
            let block_id = {
                state.next_id += 1;
                format!("blk{}", state.next_id)
            };
            let mut block = descriptor.materialize(&block_id, parent_id);

            if let Some(property) = descriptor.table_property() {
                let cell_count = property.row_size * property.column_size;
                let mut cell_ids = Vec::with_capacity(cell_count);
                for _ in 0..cell_count {
                    state.next_id += 1;
                    let cell_id = format!("cell{}", state.next_id);
                    let cell = BlockDescriptor::table_cell(Vec::new()).materialize(&cell_id, &block_id);
                    document.blocks.insert(cell_id.clone(), cell);
                    cell_ids.push(cell_id);
                }
                if let Some(table) = block.table.as_mut() {
                    table.cells = cell_ids.clone();
                }
                block.children = cell_ids;
            }

            document.blocks.insert(block_id.clone(), block.clone());
            created.push(block);
        }

        let parent = document.block_mut(METHOD, parent_id)?;
        let at = index
            .unwrap_or(parent.children.len())
            .min(parent.children.len());
        parent
            .children
            .splice(at..at, created.iter().map(|b| b.block_id.clone()));

        Ok(created)
    }

    fn update_block(&self, document_id: &str, update: &BlockUpdate) -> Result<Block, ApiError> {
        self.state.borrow_mut().apply(document_id, update)
    }

    fn batch_update_blocks(
        &self,
        document_id: &str,
        updates: &[BlockUpdate],
    ) -> Result<Vec<Block>, ApiError> {
        let mut state = self.state.borrow_mut();
        updates
            .iter()
            .map(|update| state.apply(document_id, update))
            .collect()
    }

    fn delete_block_children(
        &self,
        document_id: &str,
        parent_id: &str,
        start: usize,
        end: usize,
    ) -> Result<(), ApiError> {
        const METHOD: &str = "docx.v1.document_block_children.batch_delete";
        let mut state = self.state.borrow_mut();
        let document = state.document_mut(METHOD, document_id)?;
        let parent = document.block_mut(METHOD, parent_id)?;
        let end = end.min(parent.children.len());
        if start >= end {
            return Err(invalid_param(METHOD, "empty delete range"));
        }
        let removed: Vec<String> = parent.children.drain(start..end).collect();
        for id in &removed {
            document.remove_subtree(id);
        }
        Ok(())
    }

    fn convert_markdown_native(&self, markdown: &str) -> Result<Vec<BlockDescriptor>, ApiError> {
        if !self.state.borrow().native_conversion {
            return Err(ApiError::Unsupported {
                method: "docx.v1.document.convert",
            });
        }
        Ok(convert_markdown(markdown).blocks)
    }

    fn upload_image(
        &self,
        local_path: &Path,
        parent_block_id: &str,
        document_id: &str,
    ) -> Result<String, ApiError> {
        const METHOD: &str = "drive.v1.media.upload_all";
        fs::metadata(local_path).map_err(|source| ApiError::Io {
            method: METHOD,
            source,
        })?;

        let mut state = self.state.borrow_mut();
        let document = state.document(METHOD, document_id)?;
        if !document.blocks.contains_key(parent_block_id) {
            return Err(not_found(METHOD, format!("block {}", parent_block_id)));
        }
        let token = state.next_id("file");
        state.uploads.push((token.clone(), local_path.to_path_buf()));
        Ok(token)
    }

    fn download_media(&self, file_token: &str) -> Result<PathBuf, ApiError> {
        self.state
            .borrow()
            .media
            .get(file_token)
            .cloned()
            .ok_or_else(|| not_found("drive.v1.media.download", format!("media {}", file_token)))
    }

    fn download_whiteboard_image(&self, board_id: &str) -> Result<PathBuf, ApiError> {
        self.state
            .borrow()
            .boards
            .get(board_id)
            .map(|(image, _)| image.clone())
            .ok_or_else(|| {
                not_found(
                    "board.v1.whiteboard.download_as_image",
                    format!("whiteboard {}", board_id),
                )
            })
    }

    fn whiteboard_nodes(&self, board_id: &str) -> Result<Vec<BoardNode>, ApiError> {
        self.state
            .borrow()
            .boards
            .get(board_id)
            .map(|(_, nodes)| nodes.clone())
            .ok_or_else(|| {
                not_found(
                    "board.v1.whiteboard_node.list",
                    format!("whiteboard {}", board_id),
                )
            })
    }

    fn file_download_url(&self, file_token: &str) -> Result<String, ApiError> {
        self.state
            .borrow()
            .file_urls
            .get(file_token)
            .cloned()
            .ok_or_else(|| {
                not_found(
                    "drive.v1.media.batch_get_tmp_download_url",
                    format!("file {}", file_token),
                )
            })
    }

    fn sheet_values(
        &self,
        spreadsheet_token: &str,
        sheet_id: &str,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        self.state
            .borrow()
            .sheets
            .get(&(spreadsheet_token.to_string(), sheet_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                not_found(
                    "sheets.v2.values",
                    format!("sheet {}_{}", spreadsheet_token, sheet_id),
                )
            })
    }

    fn bitable_fields(
        &self,
        app_token: &str,
        table_id: &str,
        _view_id: Option<&str>,
    ) -> Result<Vec<BitableField>, ApiError> {
        self.state
            .borrow()
            .bitables
            .get(&(app_token.to_string(), table_id.to_string()))
            .map(|(fields, _)| fields.clone())
            .ok_or_else(|| {
                not_found(
                    "bitable.v1.app_table_field.list",
                    format!("table {}_{}", app_token, table_id),
                )
            })
    }

    fn bitable_records(
        &self,
        app_token: &str,
        table_id: &str,
        _view_id: Option<&str>,
    ) -> Result<Vec<BitableRecord>, ApiError> {
        self.state
            .borrow()
            .bitables
            .get(&(app_token.to_string(), table_id.to_string()))
            .map(|(_, records)| records.clone())
            .ok_or_else(|| {
                not_found(
                    "bitable.v1.app_table_record.search",
                    format!("table {}_{}", app_token, table_id),
                )
            })
    }

    fn user_name(&self, user_id: &str) -> Result<String, ApiError> {
        self.state
            .borrow()
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| not_found("contact.v3.user.get", format!("user {}", user_id)))
    }

    fn create_document(&self, title: &str, folder_token: Option<&str>) -> Result<String, ApiError> {
        if let Some(folder) = folder_token {
            log::debug!("Folder {} ignored by the in-memory store", folder);
        }
        let mut state = self.state.borrow_mut();
        let document_id = state.next_id("doc");

        let mut page = Block::new(document_id.clone(), BlockType::Page);
        page.set_text_body(TextBody::new(vec![TextElement::text(title)]));

        let document = Document {
            root_id: document_id.clone(),
            blocks: HashMap::from([(document_id.clone(), page)]),
        };
        state.documents.insert(document_id.clone(), document);
        state.primary.get_or_insert_with(|| document_id.clone());
        Ok(document_id)
    }
}
