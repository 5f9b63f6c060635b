//! Pairing content objects with their sidecars.
//!
//! Pure functions only: the adapter fetches bytes, this module decides what
//! Document (if any) each listing entry becomes.

use std::collections::HashMap;

use thiserror::Error;

use super::paths::{is_sidecar, parse_content_name};
use super::RemoteEntry;
use crate::config::{DEFAULT_JURISDICTION, DEFAULT_SERVICE_LINE, SIDECAR_SUFFIX};
use crate::models::{format_size, Document, FileKind, PartialMetadata, Sidecar};

/// Why one listing entry could not become a Document. Never surfaced to
/// callers; the entry is skipped and the rest of the batch continues.
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("sidecar could not be fetched: {0}")]
    Unreadable(String),

    #[error("sidecar is not valid metadata JSON: {0}")]
    Malformed(String),

    #[error("no sidecar and name does not follow the date_category_name convention")]
    UnexpectedName,
}

/// Listing split into content objects, sidecars keyed by their name, and
/// subfolders still to be walked.
#[derive(Debug, Default)]
pub struct PartitionedListing {
    pub contents: Vec<RemoteEntry>,
    pub sidecars: HashMap<String, RemoteEntry>,
    pub folders: Vec<RemoteEntry>,
}

impl PartitionedListing {
    /// Sidecar paired with `content` by exact name match.
    pub fn sidecar_for(&self, content: &RemoteEntry) -> Option<&RemoteEntry> {
        self.sidecars
            .get(&format!("{}{}", content.name, SIDECAR_SUFFIX))
    }
}

/// Split a raw listing. Symlinks and submodules are dropped.
pub fn partition(entries: Vec<RemoteEntry>) -> PartitionedListing {
    let mut listing = PartitionedListing::default();
    for entry in entries {
        if entry.kind == "dir" {
            listing.folders.push(entry);
        } else if !entry.is_file() {
            continue;
        } else if is_sidecar(&entry.name) {
            listing.sidecars.insert(entry.name.clone(), entry);
        } else {
            listing.contents.push(entry);
        }
    }
    listing
}

/// Build a Document from a content entry and its fetched sidecar bytes.
pub fn document_from_sidecar(
    content: &RemoteEntry,
    sidecar_entry: &RemoteEntry,
    sidecar_bytes: &[u8],
    default_uploader: &str,
) -> Result<Document, SidecarError> {
    let raw: serde_json::Value = serde_json::from_slice(sidecar_bytes)
        .map_err(|e| SidecarError::Malformed(e.to_string()))?;
    let sidecar: Sidecar = serde_json::from_value(raw.clone())
        .map_err(|e| SidecarError::Malformed(e.to_string()))?;

    let name = if sidecar.original_name.trim().is_empty() {
        content.name.clone()
    } else {
        sidecar.original_name.clone()
    };
    let mime = Some(sidecar.mime_type.as_str()).filter(|m| !m.is_empty());

    Ok(Document {
        id: content.sha.clone(),
        file_type: FileKind::detect(&name, mime).as_str().to_string(),
        name,
        size: format_size(content.size),
        uploaded_by: raw_str(&raw, "uploadedBy").unwrap_or_else(|| default_uploader.to_string()),
        upload_date: sidecar.upload_date,
        category: sidecar.category,
        jurisdiction: sidecar.jurisdiction,
        service_line: sidecar.service_line,
        record_type: raw_str(&raw, "recordType")
            .unwrap_or_else(|| sidecar.category.default_record_type().to_string()),
        entity: sidecar.entity,
        client: sidecar.client,
        client_number: sidecar.client_number,
        client_contact: raw_str(&raw, "clientContact").unwrap_or_default(),
        client_approved: sidecar.client_approved,
        is_archived: false,
        url: content.html_url.clone().unwrap_or_default(),
        download_url: content.download_url.clone(),
        path: content.path.clone(),
        sidecar_sha: Some(sidecar_entry.sha.clone()),
        metadata: raw,
    })
}

/// Build a Document for a content entry without a sidecar, using only what
/// its name encodes plus defaults.
pub fn document_from_name(
    content: &RemoteEntry,
    default_uploader: &str,
) -> Result<Document, SidecarError> {
    let partial = parse_content_name(&content.name).ok_or(SidecarError::UnexpectedName)?;
    Ok(with_defaults(content, partial, default_uploader))
}

fn with_defaults(content: &RemoteEntry, partial: PartialMetadata, uploader: &str) -> Document {
    Document {
        id: content.sha.clone(),
        file_type: FileKind::detect(&partial.name, None).as_str().to_string(),
        name: partial.name,
        size: format_size(content.size),
        uploaded_by: uploader.to_string(),
        upload_date: partial.upload_date,
        category: partial.category,
        jurisdiction: DEFAULT_JURISDICTION.to_string(),
        service_line: DEFAULT_SERVICE_LINE.to_string(),
        record_type: partial.category.default_record_type().to_string(),
        entity: String::new(),
        client: String::new(),
        client_number: String::new(),
        client_contact: String::new(),
        client_approved: false,
        is_archived: false,
        url: content.html_url.clone().unwrap_or_default(),
        download_url: content.download_url.clone(),
        path: content.path.clone(),
        sidecar_sha: None,
        metadata: serde_json::Value::Null,
    }
}

fn raw_str(raw: &serde_json::Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Newest first. Stable, so equal dates keep listing order.
pub fn sort_newest_first(documents: &mut [Document]) {
    documents.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
}
