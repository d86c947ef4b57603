//! Local-filesystem trace store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{DirEntry, EntryKind, StoreError, TraceStore};

/// Serves a benchmark → configuration → task hierarchy from a local
/// directory root.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl TraceStore for FsStore {
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, StoreError> {
        let dir = self.resolve(path);
        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|source| io_error(&dir, path, source))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|source| io_error(&dir, path, source))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let file_type = entry
                .file_type()
                .await
                .map_err(|source| io_error(&dir, path, source))?;
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry { name, kind });
        }
        // Deterministic index regardless of readdir order.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let file = self.resolve(path);
        tokio::fs::read(&file)
            .await
            .map_err(|source| io_error(&file, path, source))
    }
}

fn io_error(local: &Path, path: &str, source: std::io::Error) -> StoreError {
    if source.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound(path.to_string())
    } else {
        StoreError::Io {
            path: local.display().to_string(),
            source,
        }
    }
}
