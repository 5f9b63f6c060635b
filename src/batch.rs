//! Batch operations over a selection.
//!
//! Archive and delete touch only the local index. Move and copy write to
//! the object store one document at a time and stop at the first failure;
//! documents already relocated before the failure stay relocated. A move
//! whose originals could not be removed still counts as done and leaves a
//! warning on the report.

use std::collections::HashSet;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::index::DocumentIndex;
use crate::models::Document;
use crate::store::{RelocateOutcome, RemoteStoreAdapter, StoreError};

pub const NOTHING_SELECTED: &str = "No documents selected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Download,
    Archive,
    Delete,
    Move,
    Copy,
}

impl BatchOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Archive => "archive",
            Self::Delete => "delete",
            Self::Move => "move",
            Self::Copy => "copy",
        }
    }
}

impl std::fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub operation: BatchOperation,
    pub requested: usize,
    pub succeeded: usize,
    /// Download only: selected documents without a direct content link.
    pub missing_url: usize,
    /// User-facing message when the operation did nothing.
    pub notice: Option<String>,
    /// Completed items that left something behind (move cleanup failures).
    pub warnings: Vec<String>,
}

impl BatchReport {
    fn new(operation: BatchOperation, requested: usize) -> Self {
        Self {
            operation,
            requested,
            succeeded: 0,
            missing_url: 0,
            notice: None,
            warnings: Vec::new(),
        }
    }

    pub fn nothing_selected(operation: BatchOperation) -> Self {
        Self {
            notice: Some(NOTHING_SELECTED.to_string()),
            ..Self::new(operation, 0)
        }
    }
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("{operation} failed for {document} after {completed} succeeded: {source}")]
    Remote {
        operation: BatchOperation,
        document: String,
        completed: usize,
        #[source]
        source: StoreError,
    },
}

// ═══════════════════════════════════════════════════════════
// URL opening
// ═══════════════════════════════════════════════════════════

/// Hands a download link to whatever renders it.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens links with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Records links instead of opening them.
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl UrlOpener for RecordingOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        self.opened
            .lock()
            .map_err(|_| std::io::Error::other("recording opener lock poisoned"))?
            .push(url.to_string());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Local operations
// ═══════════════════════════════════════════════════════════

pub fn download(opener: &dyn UrlOpener, selected: &[Document]) -> BatchReport {
    if selected.is_empty() {
        return BatchReport::nothing_selected(BatchOperation::Download);
    }
    let mut report = BatchReport::new(BatchOperation::Download, selected.len());
    for doc in selected {
        let Some(url) = doc.download_url.as_deref().filter(|u| !u.is_empty()) else {
            report.missing_url += 1;
            continue;
        };
        match opener.open(url) {
            Ok(()) => report.succeeded += 1,
            Err(e) => tracing::warn!(id = %doc.id, error = %e, "Could not open download link"),
        }
    }
    if report.missing_url > 0 {
        report.notice = Some(format!(
            "{} of {} documents have no download link",
            report.missing_url, report.requested
        ));
    }
    tracing::info!(
        requested = report.requested,
        opened = report.succeeded,
        missing_url = report.missing_url,
        "Download batch finished"
    );
    report
}

pub fn archive(index: &mut DocumentIndex, ids: &HashSet<String>) -> BatchReport {
    if ids.is_empty() {
        return BatchReport::nothing_selected(BatchOperation::Archive);
    }
    let mut report = BatchReport::new(BatchOperation::Archive, ids.len());
    report.succeeded = index.archive(ids);
    tracing::info!(count = report.succeeded, "Documents archived locally");
    report
}

pub fn delete(index: &mut DocumentIndex, ids: &HashSet<String>) -> BatchReport {
    if ids.is_empty() {
        return BatchReport::nothing_selected(BatchOperation::Delete);
    }
    let mut report = BatchReport::new(BatchOperation::Delete, ids.len());
    report.succeeded = index.remove(ids);
    tracing::info!(count = report.succeeded, "Documents removed from local index");
    report
}

// ═══════════════════════════════════════════════════════════
// Remote operations
// ═══════════════════════════════════════════════════════════

/// Result of a remote batch: what landed, and the failure that stopped it.
#[derive(Debug)]
pub struct RemoteBatch {
    pub report: BatchReport,
    /// `(original id, resulting document)` for every completed item.
    pub completed: Vec<(String, Document)>,
    pub failure: Option<BatchError>,
}

impl RemoteBatch {
    fn empty(operation: BatchOperation) -> Self {
        Self {
            report: BatchReport::nothing_selected(operation),
            completed: Vec::new(),
            failure: None,
        }
    }
}

pub async fn move_documents(
    adapter: &RemoteStoreAdapter,
    selected: &[Document],
    destination: &str,
) -> RemoteBatch {
    run_remote(BatchOperation::Move, selected, |doc| {
        adapter.move_document(doc, destination)
    })
    .await
}

pub async fn copy_documents(
    adapter: &RemoteStoreAdapter,
    selected: &[Document],
    destination: Option<&str>,
) -> RemoteBatch {
    run_remote(BatchOperation::Copy, selected, |doc| {
        adapter.copy_document(doc, destination)
    })
    .await
}

async fn run_remote<'a, F, Fut>(
    operation: BatchOperation,
    selected: &'a [Document],
    mut step: F,
) -> RemoteBatch
where
    F: FnMut(&'a Document) -> Fut,
    Fut: std::future::Future<Output = Result<RelocateOutcome, StoreError>>,
{
    if selected.is_empty() {
        return RemoteBatch::empty(operation);
    }
    let mut batch = RemoteBatch {
        report: BatchReport::new(operation, selected.len()),
        completed: Vec::with_capacity(selected.len()),
        failure: None,
    };
    for doc in selected {
        match step(doc).await {
            Ok(outcome) => {
                batch.report.succeeded += 1;
                if let Some(reason) = outcome.cleanup_error {
                    batch.report.warnings.push(format!("{}: {reason}", doc.name));
                }
                batch.completed.push((doc.id.clone(), outcome.document));
            }
            Err(e) => {
                tracing::error!(
                    operation = %operation,
                    id = %doc.id,
                    error = %e,
                    "Batch aborted"
                );
                batch.failure = Some(BatchError::Remote {
                    operation,
                    document: doc.name.clone(),
                    completed: batch.report.succeeded,
                    source: e,
                });
                break;
            }
        }
    }
    tracing::info!(
        operation = %operation,
        requested = batch.report.requested,
        succeeded = batch.report.succeeded,
        warnings = batch.report.warnings.len(),
        "Remote batch finished"
    );
    batch
}
