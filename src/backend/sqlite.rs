// src/backend/sqlite.rs

//! Embedded file-based store backend.
//!
//! Nothing to spawn: the site creates the database file itself. The variant
//! still implements [`Backend`] so callers stay agnostic; `start` only
//! provisions a throwaway data directory and `describe` points at it.

use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::debug;

use crate::backend::Backend;
use crate::errors::Result;

pub struct SqliteStore {
    base_dir: Option<PathBuf>,
    datadir: Option<TempDir>,
}

impl SqliteStore {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir,
            datadir: None,
        }
    }
}

#[async_trait]
impl Backend for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn start(&mut self) -> Result<()> {
        let base = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir(),
        };
        tokio::fs::create_dir_all(&base).await?;
        let datadir = tempfile::Builder::new()
            .prefix("stagehand-sqlite-")
            .tempdir_in(&base)?;
        debug!(dir = %datadir.path().display(), "sqlite data dir");
        self.datadir = Some(datadir);
        Ok(())
    }

    async fn stop(&mut self) {
        // Drops the TempDir, removing the data directory.
        self.datadir = None;
    }

    fn describe(&self) -> String {
        self.datadir
            .as_ref()
            .map(|dir| dir.path().to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_provisions_a_data_dir_and_stop_removes_it() {
        let mut store = SqliteStore::new(None);
        assert_eq!(store.describe(), "");

        store.start().await.unwrap();
        let path = PathBuf::from(store.describe());
        assert!(path.is_dir());

        store.stop().await;
        assert!(!path.exists());
        assert_eq!(store.describe(), "");
    }

    #[tokio::test]
    async fn stop_without_start_is_a_noop() {
        let mut store = SqliteStore::new(None);
        store.stop().await;
        store.stop().await;
    }
}
