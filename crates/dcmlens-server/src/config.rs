use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use dcmlens_store::IndexConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server settings, loadable from a TOML file. Missing keys take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding `<file_id>.dcm` files and the dedup index log.
    pub upload_dir: PathBuf,
    /// Largest accepted request body, in bytes.
    pub max_upload_size: usize,
    pub index: IndexSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            upload_dir: PathBuf::from("uploads"),
            max_upload_size: 256 * 1024 * 1024,
            index: IndexSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Location of the dedup index log.
    pub fn index_path(&self) -> PathBuf {
        self.upload_dir.join(&self.index.file_name)
    }
}

/// Dedup index settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Log file name inside `upload_dir`.
    pub file_name: String,
    pub sync_on_write: bool,
    pub compact_threshold: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        let log = IndexConfig::default();
        Self {
            file_name: "dedup-index.log".to_string(),
            sync_on_write: log.sync_on_write,
            compact_threshold: log.compact_threshold,
        }
    }
}

impl IndexSettings {
    pub fn log_config(&self) -> IndexConfig {
        IndexConfig {
            sync_on_write: self.sync_on_write,
            compact_threshold: self.compact_threshold,
        }
    }
}
