//! larkdoc - Markdown bridge for block-structured cloud documents
//!
//! Reads a document's block tree and renders it to Markdown, and converts
//! Markdown into block descriptors that are written back through a
//! [`DocumentApi`](api::DocumentApi).

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod config;
pub mod convert;
pub mod model;
pub mod render;
pub mod schema;
pub mod store;
pub mod write;

pub use api::{ApiError, DocumentApi, TableFormat};
pub use convert::{convert_markdown, Conversion};
pub use render::{render_blocks, render_document, RenderError, RenderOptions};
pub use store::MemoryStore;
pub use write::{
    create_document_with_markdown, update_block_text, write_markdown, MarkdownInput,
    WriteError, WriteOptions, WriteOutcome,
};
