//! Markdown-to-document write orchestration
//!
//! A write runs in stages:
//! 1. **Conversion**: Markdown to descriptors and local image paths, or the
//!    platform's native conversion when there is nothing to upload
//! 2. **Clearing**: unless appending, existing content is removed
//! 3. **Creation**: flat top-level descriptors in chunked calls
//! 4. **Filling**: nested children and table cells pushed under real IDs
//! 5. **Images**: placeholders read back and replaced with uploads
//!
//! Only stages 1 and 3 can fail the write. Everything after creation is
//! isolated per item and reported in [`WriteOutcome::failures`].

mod images;
mod plan;
mod settle;

pub use settle::SettlePolicy;

use crate::api::{ApiError, BlockUpdate, DocumentApi};
use crate::convert::convert_markdown;
use crate::model::{Block, BlockDescriptor, TextBody, TextElement};
use crate::schema::{BlockType, MAX_CHILDREN_PER_REQUEST};
use plan::{detach, image_count, Fill, Plan};
use settle::pause;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Children deleted per clearing call
const CLEAR_BATCH: usize = 200;

/// Clearing calls before giving up on a document that keeps refilling
const CLEAR_MAX_ROUNDS: usize = 20;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to read {path}: {source}", path = .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create blocks in document {document_id}: {source}")]
    Create {
        document_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to create document {title:?}: {source}")]
    CreateDocument {
        title: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to update block {block_id}: {source}")]
    UpdateBlock {
        block_id: String,
        #[source]
        source: ApiError,
    },
}

/// A per-item failure that did not stop the write
#[derive(Error, Debug)]
pub enum ItemFailure {
    #[error("Failed to fill children of block {parent_id}: {source}")]
    Children {
        parent_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to resolve cells of table {table_id}: {source}")]
    TableCells {
        table_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Image {path} skipped; the block holding it was not created", path = .path.display())]
    ImageSkipped { path: PathBuf },

    #[error("Failed to read back image placeholders: {source}")]
    ReadBack {
        #[source]
        source: ApiError,
    },

    #[error("Image {path} not found; placeholder {block_id} removed", path = .path.display())]
    ImageMissing { block_id: String, path: PathBuf },

    #[error("Failed to upload {path} for block {block_id}: {source}", path = .path.display())]
    ImageUpload {
        block_id: String,
        path: PathBuf,
        #[source]
        source: ApiError,
    },

    #[error("Failed to attach {path} to block {block_id}: {source}", path = .path.display())]
    ImageReplace {
        block_id: String,
        path: PathBuf,
        #[source]
        source: ApiError,
    },
}

/// Where the Markdown comes from
#[derive(Debug, Clone)]
pub enum MarkdownInput {
    /// Inline text; image paths resolve against the working directory
    Text(String),

    /// A file; image paths resolve against its directory
    File(PathBuf),
}

impl MarkdownInput {
    fn read(&self) -> Result<(String, PathBuf), WriteError> {
        match self {
            MarkdownInput::Text(text) => Ok((text.clone(), PathBuf::new())),
            MarkdownInput::File(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| WriteError::Read {
                    path: path.clone(),
                    source,
                })?;
                let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
                Ok((text, base))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Keep existing content and add after it
    pub append: bool,

    /// Position among the root's children; `None` appends at the end
    pub index: Option<usize>,

    /// Try the platform's own conversion when there are no images or tables
    pub use_native_conversion: bool,

    /// Children per creation call, clamped to the vendor limit
    pub chunk_size: usize,

    /// Pause between table cell fills
    pub cell_fill_delay: Duration,

    /// Poll used before reading back image placeholders
    pub settle: SettlePolicy,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            append: true,
            index: None,
            use_native_conversion: false,
            chunk_size: MAX_CHILDREN_PER_REQUEST,
            cell_fill_delay: Duration::from_millis(100),
            settle: SettlePolicy::default(),
        }
    }
}

/// Result of a write that created its top-level blocks
#[derive(Debug, Default)]
pub struct WriteOutcome {
    /// Top-level blocks as returned by creation
    pub created: Vec<Block>,

    /// Images uploaded and attached
    pub images_attached: usize,

    pub failures: Vec<ItemFailure>,
}

impl WriteOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write Markdown into an existing document
///
/// # Parameters
/// * `api` - Platform the document lives on
/// * `document_id` - Target document; its page block has the same ID
/// * `input` - Markdown text or file
/// * `options` - Append or replace, chunking and pacing
///
/// # Returns
/// * `Ok(WriteOutcome)` - Top-level blocks were created; per-item failures are listed
/// * `Err(WriteError)` - Input could not be read or top-level creation failed
pub fn write_markdown(
    api: &dyn DocumentApi,
    document_id: &str,
    input: &MarkdownInput,
    options: &WriteOptions,
) -> Result<WriteOutcome, WriteError> {
    let (markdown, base_dir) = input.read()?;
    let conversion = convert_markdown(&markdown);

    let descriptors = if options.use_native_conversion
        && conversion.image_paths.is_empty()
        && !conversion.has_tables()
    {
        match api.convert_markdown_native(&markdown) {
            Ok(blocks) => {
                log::info!("Using native conversion ({} blocks)", blocks.len());
                blocks
            }
            Err(err) => {
                log::warn!("Native conversion failed, using local conversion: {}", err);
                conversion.blocks.clone()
            }
        }
    } else {
        conversion.blocks.clone()
    };

    if !options.append {
        match clear_document(api, document_id) {
            Ok(removed) => log::info!("Cleared {} blocks", removed),
            Err(err) => log::warn!("Failed to clear document {}: {}", document_id, err),
        }
    }

    let mut writer = Writer {
        api,
        document_id,
        options,
        created_ids: HashSet::new(),
        skipped_images: HashSet::new(),
        failures: Vec::new(),
    };

    let plan = detach(descriptors);
    let created = writer
        .create_chunked(document_id, &plan.blocks, options.index)
        .map_err(|source| WriteError::Create {
            document_id: document_id.to_string(),
            source,
        })?;
    log::info!("Created {} top-level blocks", created.len());

    writer.fill_all(&created, plan, 0);

    let mut image_paths = Vec::with_capacity(conversion.image_paths.len());
    for (index, raw) in conversion.image_paths.iter().enumerate() {
        if writer.skipped_images.contains(&index) {
            writer.failures.push(ItemFailure::ImageSkipped {
                path: PathBuf::from(raw),
            });
        } else {
            image_paths.push(raw.clone());
        }
    }

    let mut images_attached = 0;
    if !image_paths.is_empty() {
        images_attached = images::attach_images(
            api,
            document_id,
            &image_paths,
            &base_dir,
            &writer.created_ids,
            options.settle,
            &mut writer.failures,
        );
        log::info!(
            "Attached {} of {} images",
            images_attached,
            image_paths.len()
        );
    }

    for failure in &writer.failures {
        log::warn!("{}", failure);
    }

    Ok(WriteOutcome {
        created,
        images_attached,
        failures: writer.failures,
    })
}

/// Create a document and write Markdown into it
///
/// Returns the new document's ID with the write outcome.
pub fn create_document_with_markdown(
    api: &dyn DocumentApi,
    title: &str,
    folder_token: Option<&str>,
    input: &MarkdownInput,
    options: &WriteOptions,
) -> Result<(String, WriteOutcome), WriteError> {
    let document_id =
        api.create_document(title, folder_token)
            .map_err(|source| WriteError::CreateDocument {
                title: title.to_string(),
                source,
            })?;
    log::info!("Created document {}", document_id);

    let options = WriteOptions {
        append: true,
        ..options.clone()
    };
    let outcome = write_markdown(api, &document_id, input, &options)?;
    Ok((document_id, outcome))
}

/// Replace a block's text with a single plain run
pub fn update_block_text(
    api: &dyn DocumentApi,
    document_id: &str,
    block_id: &str,
    text: &str,
) -> Result<Block, WriteError> {
    let update = BlockUpdate::ReplaceText {
        block_id: block_id.to_string(),
        body: TextBody::new(vec![TextElement::text(text)]),
    };
    api.update_block(document_id, &update)
        .map_err(|source| WriteError::UpdateBlock {
            block_id: block_id.to_string(),
            source,
        })
}

/// Delete the page's children in batches
///
/// Returns the number of children removed.
pub fn clear_document(api: &dyn DocumentApi, document_id: &str) -> Result<usize, ApiError> {
    let mut removed = 0;
    for _ in 0..CLEAR_MAX_ROUNDS {
        let children = api.get_block_children(document_id, document_id)?;
        if children.is_empty() {
            return Ok(removed);
        }
        let batch = children.len().min(CLEAR_BATCH);
        api.delete_block_children(document_id, document_id, 0, batch)?;
        removed += batch;
    }
    log::warn!(
        "Document {} still has content after {} clearing rounds",
        document_id,
        CLEAR_MAX_ROUNDS
    );
    Ok(removed)
}

struct Writer<'a> {
    api: &'a dyn DocumentApi,
    document_id: &'a str,
    options: &'a WriteOptions,
    created_ids: HashSet<String>,

    /// Indexes into the image paths whose placeholders were never created
    skipped_images: HashSet<usize>,

    failures: Vec<ItemFailure>,
}

impl Writer<'_> {
    /// Create flat descriptors under `parent_id`, keeping their order
    fn create_chunked(
        &mut self,
        parent_id: &str,
        blocks: &[BlockDescriptor],
        mut index: Option<usize>,
    ) -> Result<Vec<Block>, ApiError> {
        let chunk_size = self.options.chunk_size.clamp(1, MAX_CHILDREN_PER_REQUEST);
        let mut created = Vec::with_capacity(blocks.len());
        for chunk in blocks.chunks(chunk_size) {
            let response = self
                .api
                .create_blocks(self.document_id, parent_id, chunk, index)?;
            if let Some(position) = index.as_mut() {
                *position += chunk.len();
            }
            created.extend(response);
        }
        for block in &created {
            self.created_ids.insert(block.block_id.clone());
            self.created_ids.extend(block.children.iter().cloned());
        }
        Ok(created)
    }

    /// Push deferred content; `first_image` is the index of the first image
    /// path owned by `plan`
    fn fill_all(&mut self, created: &[Block], plan: Plan, first_image: usize) {
        if created.len() != plan.fills.len() {
            log::warn!(
                "Created {} blocks for {} descriptors; nested content is matched by position",
                created.len(),
                plan.fills.len()
            );
        }

        let mut next_image = first_image;
        let entries = plan.blocks.iter().zip(plan.fills).zip(plan.fill_images);
        for (index, ((descriptor, fill), images)) in entries.enumerate() {
            if descriptor.block_type == BlockType::Image {
                next_image += 1;
            }
            match (created.get(index), fill) {
                (_, Fill::None) => {}
                (Some(block), Fill::Children(children)) => {
                    self.create_nested(&block.block_id, children, next_image)
                }
                (Some(block), Fill::Cells(cells)) => {
                    self.fill_cells(block, cells, next_image, images)
                }
                (None, _) => self.skip_images(next_image, images),
            }
            next_image += images;
        }
    }

    /// Create nested children and, recursively, their own children
    fn create_nested(
        &mut self,
        parent_id: &str,
        children: Vec<BlockDescriptor>,
        first_image: usize,
    ) {
        let plan = detach(children);
        match self.create_chunked(parent_id, &plan.blocks, None) {
            Ok(created) => self.fill_all(&created, plan, first_image),
            Err(source) => {
                self.skip_images(first_image, plan.image_count());
                self.failures.push(ItemFailure::Children {
                    parent_id: parent_id.to_string(),
                    source,
                });
            }
        }
    }

    fn fill_cells(
        &mut self,
        table: &Block,
        cells: Vec<Vec<BlockDescriptor>>,
        first_image: usize,
        images: usize,
    ) {
        let cell_ids = if table.children.is_empty() {
            match self.api.get_block_children(self.document_id, &table.block_id) {
                Ok(children) => children.into_iter().map(|b| b.block_id).collect(),
                Err(source) => {
                    self.skip_images(first_image, images);
                    self.failures.push(ItemFailure::TableCells {
                        table_id: table.block_id.clone(),
                        source,
                    });
                    return;
                }
            }
        } else {
            table.children.clone()
        };
        self.created_ids.extend(cell_ids.iter().cloned());

        if cell_ids.len() != cells.len() {
            log::warn!(
                "Table {} has {} cells but {} were planned",
                table.block_id,
                cell_ids.len(),
                cells.len()
            );
        }

        let mut next_image = first_image;
        let mut cell_ids = cell_ids.iter();
        for content in cells {
            let cell_images: usize = content.iter().map(image_count).sum();
            match cell_ids.next() {
                Some(_) if content.is_empty() => {}
                Some(cell_id) => {
                    pause(self.options.cell_fill_delay);
                    self.create_nested(cell_id, content, next_image);
                }
                None => self.skip_images(next_image, cell_images),
            }
            next_image += cell_images;
        }

        // Cells dropped while planning still own their image paths
        let end = first_image + images;
        if next_image < end {
            self.skip_images(next_image, end - next_image);
        }
    }

    fn skip_images(&mut self, first: usize, count: usize) {
        self.skipped_images.extend(first..first + count);
    }
}
