//! Shared application state for a document vault.
//!
//! `VaultState` ties the store adapter, the index, and the view state
//! (filter, sort, selection) together and is the one type callers drive.
//! Sync state sits behind `std::sync::RwLock` and is never held across an
//! await; the upload queue uses a tokio `Mutex` because uploads await
//! while holding it.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use thiserror::Error;

use crate::batch::{self, BatchError, BatchReport, SystemOpener, UrlOpener};
use crate::config::{StoreConfig, UPLOAD_DIR};
use crate::credentials::SqliteTokenStore;
use crate::filter::FilterState;
use crate::index::{DocumentIndex, FacetOptions, TabCounts};
use crate::models::{Document, UploadFile};
use crate::selection::Selection;
use crate::sort::{SortField, SortState};
use crate::store::{paths, GitHubStore, PutOutcome, RemoteStoreAdapter, StoreError};
use crate::upload::{self, AddFilesReport, QueuedFile, UploadError, UploadForm, UploadQueue, UploadReport};

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Object store error: {0}")]
    Store(#[from] StoreError),
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
}

/// Caller-controlled view over the index.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub filter: FilterState,
    pub sort: SortState,
    pub selection: Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    /// `false` when a newer refresh had already landed.
    pub applied: bool,
    pub documents: usize,
}

pub struct VaultState {
    adapter: RemoteStoreAdapter,
    listing_path: String,
    index: RwLock<DocumentIndex>,
    view: RwLock<ViewState>,
    queue: tokio::sync::Mutex<UploadQueue>,
    opener: Box<dyn UrlOpener>,
}

impl VaultState {
    pub fn new(adapter: RemoteStoreAdapter, opener: Box<dyn UrlOpener>) -> Self {
        Self {
            adapter,
            listing_path: UPLOAD_DIR.to_string(),
            index: RwLock::new(DocumentIndex::new()),
            view: RwLock::new(ViewState::default()),
            queue: tokio::sync::Mutex::new(UploadQueue::new()),
            opener,
        }
    }

    /// Vault over a GitHub repository, authenticated with the token kept in
    /// the local settings database. Links open in the system browser.
    pub fn connect(config: StoreConfig) -> Result<Self, VaultError> {
        let tokens = SqliteTokenStore::default_location().map_err(StoreError::from)?;
        let uploader = config.owner.clone();
        let store = GitHubStore::new(config, Arc::new(tokens))?;
        tracing::info!(
            owner = %store.config().owner,
            repo = %store.config().repo,
            branch = %store.config().branch,
            "Vault connected"
        );
        Ok(Self::new(
            RemoteStoreAdapter::new(Arc::new(store), &uploader),
            Box::new(SystemOpener),
        ))
    }

    /// List from `path` instead of the upload folder. Move and copy
    /// destinations are placed under it.
    pub fn with_listing_path(mut self, path: &str) -> Result<Self, VaultError> {
        self.listing_path = paths::normalize_folder(path)?;
        Ok(self)
    }

    pub fn listing_path(&self) -> &str {
        &self.listing_path
    }

    pub fn adapter(&self) -> &RemoteStoreAdapter {
        &self.adapter
    }

    fn read_index(&self) -> Result<RwLockReadGuard<'_, DocumentIndex>, VaultError> {
        self.index.read().map_err(|_| VaultError::LockPoisoned)
    }

    fn write_index(&self) -> Result<RwLockWriteGuard<'_, DocumentIndex>, VaultError> {
        self.index.write().map_err(|_| VaultError::LockPoisoned)
    }

    fn read_view(&self) -> Result<RwLockReadGuard<'_, ViewState>, VaultError> {
        self.view.read().map_err(|_| VaultError::LockPoisoned)
    }

    fn write_view(&self) -> Result<RwLockWriteGuard<'_, ViewState>, VaultError> {
        self.view.write().map_err(|_| VaultError::LockPoisoned)
    }

    // ═══════════════════════════════════════════════════════════
    // Index refresh
    // ═══════════════════════════════════════════════════════════

    /// Re-list the store and replace the index (last response wins).
    pub async fn refresh(&self) -> Result<RefreshOutcome, VaultError> {
        let ticket = self.write_index()?.begin_refresh();
        let documents = self.adapter.list_and_merge(&self.listing_path).await?;
        let count = documents.len();
        let applied = self.write_index()?.apply_refresh(ticket, documents);
        if applied {
            self.prune_selection()?;
        }
        tracing::info!(applied, documents = count, "Index refresh finished");
        Ok(RefreshOutcome {
            applied,
            documents: count,
        })
    }

    // ═══════════════════════════════════════════════════════════
    // View: filter → sort
    // ═══════════════════════════════════════════════════════════

    /// Filtered and sorted documents for the current view state.
    pub fn view(&self) -> Result<Vec<Document>, VaultError> {
        let snapshot = self.read_index()?.snapshot();
        let view = self.read_view()?;
        let mut visible = view.filter.apply(&snapshot);
        view.sort.apply(&mut visible);
        Ok(visible.into_iter().cloned().collect())
    }

    pub fn view_state(&self) -> Result<ViewState, VaultError> {
        Ok(self.read_view()?.clone())
    }

    /// Change the filter; selected ids that drop out of view are deselected.
    pub fn update_filter<F>(&self, change: F) -> Result<(), VaultError>
    where
        F: FnOnce(&mut FilterState),
    {
        change(&mut self.write_view()?.filter);
        self.prune_selection()
    }

    pub fn select_sort(&self, field: SortField) -> Result<SortState, VaultError> {
        let mut view = self.write_view()?;
        view.sort.select(field);
        Ok(view.sort)
    }

    pub fn tab_counts(&self) -> Result<TabCounts, VaultError> {
        Ok(self.read_index()?.tab_counts())
    }

    pub fn facet_options(&self) -> Result<FacetOptions, VaultError> {
        Ok(self.read_index()?.facet_options())
    }

    // ─── Selection ────────────────────────────────────────

    pub fn toggle_selected(&self, id: &str) -> Result<(), VaultError> {
        self.write_view()?.selection.toggle(id);
        Ok(())
    }

    pub fn toggle_select_all(&self) -> Result<usize, VaultError> {
        let snapshot = self.read_index()?.snapshot();
        let mut view = self.write_view()?;
        let visible = view.filter.apply(&snapshot);
        view.selection.toggle_all(&visible);
        Ok(view.selection.len())
    }

    fn prune_selection(&self) -> Result<(), VaultError> {
        let snapshot = self.read_index()?.snapshot();
        let mut view = self.write_view()?;
        let visible = view.filter.apply(&snapshot);
        view.selection.retain_visible(&visible);
        Ok(())
    }

    /// Selected documents in the current view, in view order. The
    /// selection is cleared as part of taking it.
    fn take_selected(&self) -> Result<Vec<Document>, VaultError> {
        let snapshot = self.read_index()?.snapshot();
        let mut view = self.write_view()?;
        let mut visible = view.filter.apply(&snapshot);
        view.sort.apply(&mut visible);
        let selected = view
            .selection
            .selected_in(&visible)
            .into_iter()
            .cloned()
            .collect();
        view.selection.clear();
        Ok(selected)
    }

    // ═══════════════════════════════════════════════════════════
    // Upload
    // ═══════════════════════════════════════════════════════════

    pub async fn add_files(&self, files: Vec<UploadFile>) -> AddFilesReport {
        self.queue.lock().await.add_files(files)
    }

    /// Queue files straight from disk.
    pub async fn add_paths(&self, paths: &[PathBuf]) -> Result<AddFilesReport, VaultError> {
        Ok(self.queue.lock().await.add_paths(paths).await?)
    }

    pub async fn queued_files(&self) -> Vec<QueuedFile> {
        self.queue.lock().await.files().to_vec()
    }

    /// Validate the form, upload the queue in order, and refresh the index
    /// once every file is persisted.
    ///
    /// Once the files are stored the upload has succeeded: a failed refresh
    /// is reported in `UploadReport::refresh_error` instead.
    pub async fn upload<F>(&self, form: &UploadForm, on_complete: F) -> Result<UploadReport, VaultError>
    where
        F: FnMut(&QueuedFile, &PutOutcome),
    {
        let metadata = form.validate()?;
        let mut report = {
            let mut queue = self.queue.lock().await;
            upload::run_upload(&self.adapter, &mut queue, &metadata, on_complete).await?
        };
        if let Err(e) = self.refresh().await {
            tracing::warn!(
                uploaded = report.uploaded,
                error = %e,
                "Upload stored but index refresh failed"
            );
            report.refresh_error = Some(e.to_string());
        }
        Ok(report)
    }

    // ═══════════════════════════════════════════════════════════
    // Batch operations (selection is cleared on completion)
    // ═══════════════════════════════════════════════════════════

    pub fn download_selected(&self) -> Result<BatchReport, VaultError> {
        let selected = self.take_selected()?;
        Ok(batch::download(self.opener.as_ref(), &selected))
    }

    pub fn archive_selected(&self) -> Result<BatchReport, VaultError> {
        let ids = self.take_selected_ids()?;
        Ok(batch::archive(&mut *self.write_index()?, &ids))
    }

    pub fn delete_selected(&self) -> Result<BatchReport, VaultError> {
        let ids = self.take_selected_ids()?;
        Ok(batch::delete(&mut *self.write_index()?, &ids))
    }

    fn take_selected_ids(&self) -> Result<HashSet<String>, VaultError> {
        Ok(self.take_selected()?.into_iter().map(|d| d.id).collect())
    }

    /// Folder under the listing path for a caller-supplied destination, so
    /// relocated documents stay visible to the next refresh.
    fn resolve_destination(&self, destination: &str) -> Result<String, VaultError> {
        let folder = paths::normalize_folder(destination)?;
        let root = &self.listing_path;
        if folder == *root || folder.starts_with(&format!("{root}/")) {
            Ok(folder)
        } else {
            Ok(format!("{root}/{folder}"))
        }
    }

    /// Relocate the selection remotely. Documents moved before a failure
    /// are reflected in the index before the error is returned.
    pub async fn move_selected(&self, destination: &str) -> Result<BatchReport, VaultError> {
        let destination = self.resolve_destination(destination)?;
        let selected = self.take_selected()?;
        let result = batch::move_documents(&self.adapter, &selected, &destination).await;
        {
            let mut index = self.write_index()?;
            for (old_id, moved) in result.completed {
                index.replace(&old_id, moved);
            }
        }
        match result.failure {
            Some(e) => Err(e.into()),
            None => Ok(result.report),
        }
    }

    /// Duplicate the selection remotely, into `destination` or in place.
    pub async fn copy_selected(&self, destination: Option<&str>) -> Result<BatchReport, VaultError> {
        let destination = destination
            .map(|d| self.resolve_destination(d))
            .transpose()?;
        let selected = self.take_selected()?;
        let result =
            batch::copy_documents(&self.adapter, &selected, destination.as_deref()).await;
        {
            let mut index = self.write_index()?;
            for (_, copy) in result.completed {
                index.insert(copy);
            }
        }
        match result.failure {
            Some(e) => Err(e.into()),
            None => Ok(result.report),
        }
    }

    pub async fn read_content(&self, id: &str) -> Result<Vec<u8>, VaultError> {
        let document = self
            .read_index()?
            .get(id)
            .cloned()
            .ok_or_else(|| VaultError::DocumentNotFound(id.to_string()))?;
        Ok(self.adapter.read_content(&document).await?)
    }
}
