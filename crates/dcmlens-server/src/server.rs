use std::sync::Arc;

use dcmlens_dataset::DicomParser;
use dcmlens_service::UploadService;
use dcmlens_store::{DedupIndex, FsBlobStore, LogDedupIndex};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// The dcmlens upload server.
pub struct DcmlensServer {
    config: ServerConfig,
    state: AppState,
}

impl DcmlensServer {
    /// Open the upload directory and index named by `config`.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let blobs = FsBlobStore::open(&config.upload_dir)?;
        let index = LogDedupIndex::open(config.index_path(), config.index.log_config())?;
        info!(
            upload_dir = %config.upload_dir.display(),
            indexed = index.len(),
            "storage opened"
        );
        let service = UploadService::new(Arc::new(blobs), Arc::new(index), Arc::new(DicomParser));
        Ok(Self::with_state(config, AppState::new(service)))
    }

    /// Serve an already-built state (in-memory stores in tests).
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), self.config.max_upload_size)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "dcmlens server listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            upload_dir: dir.path().join("uploads"),
            ..ServerConfig::default()
        };
        let server = DcmlensServer::open(config).unwrap();
        assert!(server.config().upload_dir.is_dir());
        let _router = server.router();
    }

    #[test]
    fn open_fails_when_upload_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, b"x").unwrap();
        let config = ServerConfig {
            upload_dir: file,
            ..ServerConfig::default()
        };
        assert!(matches!(DcmlensServer::open(config), Err(ServerError::Store(_))));
    }
}
