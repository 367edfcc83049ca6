//! File-based store.
//!
//! Reads a JSON [`StoreFixture`] from disk on every fetch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eltwatch_types::{ActivePin, IngestionCycle};

use super::{PinWithHistory, StoreFixture, StoreReader};
use crate::error::FetchError;

/// A store that reads its tables from a JSON fixture file.
///
/// Useful for demos and for replaying a captured store state. The file is
/// re-read on every fetch, so edits show up on the next poll.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    description: String,
}

impl FileStore {
    /// Create a new file store for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file.
    async fn load(&self) -> Result<StoreFixture, FetchError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl StoreReader for FileStore {
    async fn fetch_latest_cycle(&self) -> Result<Option<IngestionCycle>, FetchError> {
        Ok(self.load().await?.latest_cycle)
    }

    async fn fetch_buffer_count(&self) -> Result<u64, FetchError> {
        Ok(self.load().await?.buffer_count)
    }

    async fn fetch_pin_with_history(
        &self,
        pin_id: &str,
    ) -> Result<Option<PinWithHistory>, FetchError> {
        Ok(self.load().await?.pin_with_history(pin_id))
    }

    async fn fetch_active_pins(&self) -> Result<Vec<ActivePin>, FetchError> {
        Ok(self.load().await?.active_pins())
    }

    fn description(&self) -> &str {
        &self.description
    }
}
