//! Command-line interface definitions for larkdoc

use clap::{Parser, Subcommand, ValueEnum};
use larkdoc::api::TableFormat;
use std::path::PathBuf;

/// Table output format
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TableFormatArg {
    /// Markdown pipe tables (merged cells are left empty)
    Md,
    /// HTML tables with rowspan/colspan
    Html,
}

impl From<TableFormatArg> for TableFormat {
    fn from(arg: TableFormatArg) -> Self {
        match arg {
            TableFormatArg::Md => TableFormat::Markdown,
            TableFormatArg::Html => TableFormat::Html,
        }
    }
}

/// CLI structure for the larkdoc application
#[derive(Parser)]
#[command(name = "larkdoc")]
#[command(version)]
#[command(about = "Convert between Markdown and cloud document blocks", long_about = None)]
pub struct Cli {
    /// Settings file (defaults to ./larkdoc.toml when present)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for larkdoc
#[derive(Subcommand)]
pub enum Commands {
    /// Convert Markdown to block descriptors (JSON)
    Convert {
        /// Markdown file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a document snapshot to Markdown
    Render {
        /// Snapshot of the document's blocks (JSON)
        snapshot: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Table format, overriding the settings file
        #[arg(short, long, value_enum)]
        table_format: Option<TableFormatArg>,

        /// Wrap block content in block ID comments
        #[arg(long)]
        embed_block_ids: bool,

        /// Append node tables after whiteboards
        #[arg(long)]
        board_metadata: bool,
    },

    /// Write Markdown into a document snapshot
    Write {
        /// Snapshot to update; created when it does not exist
        snapshot: PathBuf,

        /// Markdown file
        input: PathBuf,

        /// Replace existing content instead of appending
        #[arg(long)]
        replace: bool,

        /// Title of a new document (required when the snapshot does not exist)
        #[arg(long)]
        title: Option<String>,
    },

    /// Replace one block's text
    SetText {
        /// Snapshot to update
        snapshot: PathBuf,

        /// Block to update
        block_id: String,

        /// New text
        text: String,
    },
}
