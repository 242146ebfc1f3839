//! Settings from larkdoc.toml

use crate::api::TableFormat;
use crate::render::RenderOptions;
use crate::schema::MAX_CHILDREN_PER_REQUEST;
use crate::write::{SettlePolicy, WriteOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Settings file; every field has a default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub export: ExportSettings,
    pub write: WriteSettings,
}

/// `[export]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    /// "md" or "html"
    pub table_format: TableFormat,

    pub embed_block_ids: bool,

    pub export_board_metadata: bool,

    /// Directory downloaded media is linked from
    pub assets_dir: Option<PathBuf>,
}

/// `[write]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteSettings {
    pub append: bool,

    pub use_native_conversion: bool,

    /// Children per creation call (1 to 50)
    pub chunk_size: usize,

    pub cell_fill_delay_ms: u64,

    pub settle_interval_ms: u64,

    pub settle_max_attempts: u32,
}

impl Default for WriteSettings {
    fn default() -> Self {
        let options = WriteOptions::default();
        Self {
            append: options.append,
            use_native_conversion: options.use_native_conversion,
            chunk_size: options.chunk_size,
            cell_fill_delay_ms: options.cell_fill_delay.as_millis() as u64,
            settle_interval_ms: options.settle.interval.as_millis() as u64,
            settle_max_attempts: options.settle.max_attempts,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}: {source}", path = .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Parameters
    /// * `path` - Path to the larkdoc.toml file
    ///
    /// # Returns
    /// * `Ok(Settings)` - Parsed settings with defaults for missing fields
    /// * `Err(ConfigError)` - The file could not be read or is not valid settings
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            table_format: self.export.table_format,
            embed_block_ids: self.export.embed_block_ids,
            export_board_metadata: self.export.export_board_metadata,
            assets_dir: self.export.assets_dir.clone(),
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        let write = &self.write;
        let chunk_size = write.chunk_size.clamp(1, MAX_CHILDREN_PER_REQUEST);
        if chunk_size != write.chunk_size {
            log::warn!(
                "chunk_size {} out of range; using {}",
                write.chunk_size,
                chunk_size
            );
        }
        WriteOptions {
            append: write.append,
            index: None,
            use_native_conversion: write.use_native_conversion,
            chunk_size,
            cell_fill_delay: Duration::from_millis(write.cell_fill_delay_ms),
            settle: SettlePolicy {
                interval: Duration::from_millis(write.settle_interval_ms),
                max_attempts: write.settle_max_attempts,
            },
        }
    }
}
