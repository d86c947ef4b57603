pub mod fs;

use async_trait::async_trait;
use thiserror::Error;

/// What a directory listing entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// A storage boundary failure. The core imposes no timeout or retry policy;
/// both belong to the transport behind this trait.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Storage/transport collaborator: hierarchical directory listings plus raw
/// content fetch. Both operations are fallible, asynchronous boundary calls;
/// the core does not assume a particular transport behind them.
#[async_trait]
pub trait TraceStore: Send + Sync {
    /// List the entries directly under a hierarchical path. `""` is the root.
    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, StoreError>;

    /// Fetch the raw bytes of one file.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Join two hierarchical path segments.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_handles_root() {
        assert_eq!(join_path("", "gaia"), "gaia");
        assert_eq!(join_path("gaia", "cfg"), "gaia/cfg");
        assert_eq!(join_path("gaia/cfg", "task.json"), "gaia/cfg/task.json");
    }
}
