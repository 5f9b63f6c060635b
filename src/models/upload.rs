use std::path::Path;

use serde::{Deserialize, Serialize};

use super::enums::Category;

/// A file handed to the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// MIME type as reported by the caller; guessed from the name when absent.
    pub mime_type: Option<String>,
}

impl UploadFile {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            bytes,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        let mime_type = mime_guess::from_path(path).first().map(|m| m.to_string());
        Ok(Self {
            name,
            bytes,
            mime_type,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// MIME type to record in the sidecar.
    pub fn effective_mime_type(&self) -> String {
        match &self.mime_type {
            Some(m) if !m.is_empty() => m.clone(),
            _ => mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}

/// Validated classification applied to every file of one upload batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub category: Category,
    pub jurisdiction: String,
    pub service_line: String,
    pub entity: String,
    pub client: String,
    pub client_number: String,
    pub client_approved: bool,
}
