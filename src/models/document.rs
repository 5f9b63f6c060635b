use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::Category;

/// One uploaded file merged with its metadata, as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Remote content hash. Unique and never reassigned.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: String,
    pub uploaded_by: String,
    pub upload_date: DateTime<Utc>,
    pub category: Category,
    pub jurisdiction: String,
    pub service_line: String,
    pub record_type: String,
    pub entity: String,
    pub client: String,
    pub client_number: String,
    pub client_contact: String,
    pub client_approved: bool,
    pub is_archived: bool,
    pub url: String,
    pub download_url: Option<String>,
    /// Remote path of the content object.
    pub path: String,
    /// Hash of the paired sidecar, if one was found.
    pub sidecar_sha: Option<String>,
    /// Sidecar payload as retrieved (`Null` when the document has none).
    pub metadata: serde_json::Value,
}

/// Metadata sidecar stored next to each content object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sidecar {
    pub jurisdiction: String,
    pub service_line: String,
    #[serde(default)]
    pub entity: String,
    pub client_approved: bool,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub client_number: String,
    pub category: Category,
    pub original_name: String,
    pub upload_date: DateTime<Utc>,
    /// Original size in bytes.
    #[serde(default)]
    pub size: u64,
    /// MIME type reported at upload.
    #[serde(rename = "type", default)]
    pub mime_type: String,
}

/// What can be recovered from a content path alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMetadata {
    pub upload_date: DateTime<Utc>,
    pub category: Category,
    pub name: String,
}
