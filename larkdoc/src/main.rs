//! larkdoc - Markdown bridge for cloud documents
//!
//! Works offline against JSON snapshots of a document's block list.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![allow(clippy::module_name_repetitions)]

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use larkdoc::config::Settings;
use larkdoc::write::{
    create_document_with_markdown, update_block_text, write_markdown, MarkdownInput,
    WriteOutcome,
};
use larkdoc::{convert_markdown, render_document, MemoryStore};
use std::path::{Path, PathBuf};

/// Settings file picked up from the working directory
const DEFAULT_CONFIG: &str = "larkdoc.toml";

/// Main entry point for the larkdoc CLI application
fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

/// Run the CLI application
fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Convert { input, output } => {
            handle_convert_command(&input, output.as_deref())?;
        }

        Commands::Render {
            snapshot,
            output,
            table_format,
            embed_block_ids,
            board_metadata,
        } => {
            let mut options = settings.render_options();
            if let Some(format) = table_format {
                options.table_format = format.into();
            }
            options.embed_block_ids |= embed_block_ids;
            options.export_board_metadata |= board_metadata;

            let store = load_store(&snapshot)?;
            let document_id = primary_document(&store, &snapshot)?;
            let markdown = render_document(&store, &document_id, &options)
                .with_context(|| format!("Failed to render {}", snapshot.display()))?;
            emit(&markdown, output.as_deref())?;
        }

        Commands::Write {
            snapshot,
            input,
            replace,
            title,
        } => {
            handle_write_command(&settings, snapshot, input, replace, title)?;
        }

        Commands::SetText {
            snapshot,
            block_id,
            text,
        } => {
            let store = load_store(&snapshot)?;
            let document_id = primary_document(&store, &snapshot)?;
            update_block_text(&store, &document_id, &block_id, &text)?;
            store
                .save(&document_id, &snapshot)
                .with_context(|| format!("Failed to save {}", snapshot.display()))?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .init();
    }
}

/// Explicit settings file, else ./larkdoc.toml when present, else defaults
fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            Settings::load(DEFAULT_CONFIG).context("Failed to load larkdoc.toml")
        }
        None => Ok(Settings::default()),
    }
}

fn load_store(snapshot: &Path) -> Result<MemoryStore> {
    MemoryStore::load(snapshot)
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))
}

fn primary_document(store: &MemoryStore, snapshot: &Path) -> Result<String> {
    store
        .primary_document()
        .with_context(|| format!("Snapshot {} has no document", snapshot.display()))
}

/// Write to a file, or stdout when no file is given
fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/// Handle the convert command
fn handle_convert_command(input: &Path, output: Option<&Path>) -> Result<()> {
    let markdown = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let conversion = convert_markdown(&markdown);
    let json = serde_json::to_string_pretty(&conversion).context("Failed to encode blocks")?;
    emit(&json, output)
}

/// Handle the write command
fn handle_write_command(
    settings: &Settings,
    snapshot: PathBuf,
    input: PathBuf,
    replace: bool,
    title: Option<String>,
) -> Result<()> {
    let mut options = settings.write_options();
    if replace {
        options.append = false;
    }
    let input = MarkdownInput::File(input);

    let (store, document_id, outcome) = if snapshot.exists() {
        let store = load_store(&snapshot)?;
        let document_id = primary_document(&store, &snapshot)?;
        let outcome = write_markdown(&store, &document_id, &input, &options)?;
        (store, document_id, outcome)
    } else {
        let Some(title) = title else {
            bail!(
                "Snapshot {} does not exist; pass --title to create a document",
                snapshot.display()
            );
        };
        let store = MemoryStore::new();
        let (document_id, outcome) =
            create_document_with_markdown(&store, &title, None, &input, &options)?;
        (store, document_id, outcome)
    };

    store
        .save(&document_id, &snapshot)
        .with_context(|| format!("Failed to save {}", snapshot.display()))?;
    print_outcome(&document_id, &outcome);
    Ok(())
}

fn print_outcome(document_id: &str, outcome: &WriteOutcome) {
    println!(
        "Wrote {} blocks and {} images to {}",
        outcome.created.len(),
        outcome.images_attached,
        document_id
    );
    for failure in &outcome.failures {
        eprintln!("  - {}", failure);
    }
}
