//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::config::{ServerConfig, StorageKind};
use crate::media::MediaStore;
use crate::repository::{
    FileSessionRepository, InMemorySessionRepository, RepositoryError, SessionRepository,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn SessionRepository>,
    pub media: Arc<MediaStore>,
}

impl AppState {
    pub fn new(repository: Arc<dyn SessionRepository>, media: MediaStore) -> Self {
        Self {
            repository,
            media: Arc::new(media),
        }
    }

    /// State backed by process memory, with media written under `media_dir`.
    pub fn in_memory(media_dir: impl Into<std::path::PathBuf>) -> Self {
        Self::new(
            Arc::new(InMemorySessionRepository::new()),
            MediaStore::new(media_dir),
        )
    }

    /// Build the storage backends named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file repository cannot be opened.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, RepositoryError> {
        let repository: Arc<dyn SessionRepository> = match config.storage {
            StorageKind::Memory => Arc::new(InMemorySessionRepository::new()),
            StorageKind::File => Arc::new(FileSessionRepository::open(config.data_dir.clone()).await?),
        };
        tracing::info!(storage = %config.storage, "Session storage ready");
        Ok(Self::new(repository, MediaStore::new(config.media_dir.clone())))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("media", &self.media)
            .finish_non_exhaustive()
    }
}
