//! Shared state for the notes API.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;

use crate::api::error::ApiError;
use crate::db::open_connection;
use crate::pipeline::extraction::TextExtractor;
use crate::pipeline::import::FileStore;
use crate::pipeline_config::DEFAULT_MAX_INPUT_BYTES;

/// Shared context for all API routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    /// Migrated database; each request opens its own connection.
    pub db_path: PathBuf,
    pub file_store: Arc<FileStore>,
    pub extractor: Arc<dyn TextExtractor + Send + Sync>,
    /// Largest accepted uploaded file, in bytes.
    pub max_upload_bytes: usize,
}

impl ApiContext {
    pub fn new(
        db_path: PathBuf,
        file_store: FileStore,
        extractor: Arc<dyn TextExtractor + Send + Sync>,
    ) -> Self {
        Self {
            db_path,
            file_store: Arc::new(file_store),
            extractor,
            max_upload_bytes: DEFAULT_MAX_INPUT_BYTES as usize,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn open_db(&self) -> Result<Connection, ApiError> {
        open_connection(&self.db_path).map_err(ApiError::from)
    }
}
