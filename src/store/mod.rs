//! Remote object store access.
//!
//! `ObjectStore` is the seam between the sync protocol and the transport:
//! `GitHubStore` speaks the GitHub Contents API, `MemoryStore` keeps objects
//! in process for tests. `RemoteStoreAdapter` layers the document conventions
//! (paths, sidecars, merge) on top of either.

pub mod adapter;
pub mod github;
pub mod memory;
pub mod merge;
pub mod paths;

pub use adapter::*;
pub use github::*;
pub use memory::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credentials::CredentialError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No access token configured for the object store")]
    AuthMissing,

    #[error("Credential store error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Object store unreachable: {0}")]
    RemoteUnavailable(String),

    #[error("Object store returned error (status {status}): {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Unexpected object store response: {0}")]
    ResponseParsing(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Could not encode metadata: {0}")]
    Encoding(String),

    #[error("Invalid remote path: {0}")]
    InvalidPath(String),

    #[error("Object not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Network failure or non-2xx answer from the remote.
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_) | Self::RemoteStatus { .. })
    }
}

/// One entry of a directory listing (GitHub Contents API shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
}

fn default_entry_kind() -> String {
    "file".to_string()
}

impl RemoteEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// Minimal surface the sync protocol needs from a remote store.
///
/// The store has no query, update-in-place, or transaction support;
/// everything richer is built on these four calls.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List the objects directly under `path`.
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, StoreError>;

    /// Fetch raw object bytes, preferring `download_url` when given.
    async fn read(&self, path: &str, download_url: Option<&str>) -> Result<Vec<u8>, StoreError>;

    /// Create or overwrite the object at `path`.
    async fn put(&self, path: &str, content: &[u8], message: &str)
        -> Result<RemoteEntry, StoreError>;

    /// Remove the object at `path`; `sha` must match the current object.
    async fn delete(&self, path: &str, sha: &str, message: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_entry_parses_contents_listing_item() {
        let raw = r#"{
            "name": "2024-01-15_tax_return.pdf",
            "path": "uploads/2024-01-15_tax_return.pdf",
            "sha": "3d21ec53a331a6f037a91c368710b99387d012c1",
            "size": 2048,
            "url": "https://api.github.com/repos/o/r/contents/uploads/2024-01-15_tax_return.pdf",
            "html_url": "https://github.com/o/r/blob/main/uploads/2024-01-15_tax_return.pdf",
            "git_url": "https://api.github.com/repos/o/r/git/blobs/3d21ec5",
            "download_url": "https://raw.githubusercontent.com/o/r/main/uploads/2024-01-15_tax_return.pdf",
            "type": "file"
        }"#;
        let entry: RemoteEntry = serde_json::from_str(raw).unwrap();
        assert!(entry.is_file());
        assert_eq!(entry.size, 2048);
        assert!(entry.download_url.unwrap().starts_with("https://raw."));
    }

    #[test]
    fn directory_entries_are_not_files() {
        let raw = r#"{"name":"archive","path":"uploads/archive","sha":"abc","size":0,
                      "download_url":null,"html_url":null,"type":"dir"}"#;
        let entry: RemoteEntry = serde_json::from_str(raw).unwrap();
        assert!(!entry.is_file());
        assert!(entry.download_url.is_none());
    }

    #[test]
    fn remote_unavailable_classification() {
        assert!(StoreError::RemoteUnavailable("down".into()).is_remote_unavailable());
        assert!(StoreError::RemoteStatus { status: 502, body: String::new() }.is_remote_unavailable());
        assert!(!StoreError::AuthMissing.is_remote_unavailable());
    }
}
