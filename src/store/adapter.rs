//! Document-level protocol over a raw object store.
//!
//! Writes are two separate object puts (content, then sidecar) with no
//! transaction between them. A failed sidecar write leaves an orphaned
//! content object behind; listings tolerate that by falling back to the
//! name convention.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::merge::{self, SidecarError};
use super::paths;
use super::{ObjectStore, RemoteEntry, StoreError};
use crate::models::{Document, Sidecar, UploadFile, UploadMetadata};

/// Result of the two-phase write for one file.
#[derive(Debug, Clone, Serialize)]
pub struct PutOutcome {
    pub content: RemoteEntry,
    pub sidecar_path: String,
    pub sidecar: Option<RemoteEntry>,
    /// Why the sidecar write failed; the content object stays in place.
    pub sidecar_error: Option<String>,
}

impl PutOutcome {
    /// Content persisted without metadata.
    pub fn is_orphaned(&self) -> bool {
        self.sidecar.is_none()
    }
}

/// A document written to its new location by a copy or move.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocateOutcome {
    pub document: Document,
    /// Set when a move could not remove the originals. The new copy is
    /// complete; the old objects stay behind until deleted by hand.
    pub cleanup_error: Option<String>,
}

/// Copy-name suffixes tried before giving up on a destination.
const MAX_COPY_SUFFIX: u32 = 99;

pub struct RemoteStoreAdapter {
    store: Arc<dyn ObjectStore>,
    /// Reported as `uploadedBy` when a sidecar does not name the uploader.
    default_uploader: String,
}

impl RemoteStoreAdapter {
    pub fn new(store: Arc<dyn ObjectStore>, default_uploader: &str) -> Self {
        Self {
            store,
            default_uploader: default_uploader.to_string(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Write one file and its sidecar, dated now.
    pub async fn put(
        &self,
        file: &UploadFile,
        metadata: &UploadMetadata,
    ) -> Result<PutOutcome, StoreError> {
        self.put_at(file, metadata, Utc::now()).await
    }

    /// Write one file and its sidecar with an explicit upload timestamp.
    pub async fn put_at(
        &self,
        file: &UploadFile,
        metadata: &UploadMetadata,
        uploaded_at: DateTime<Utc>,
    ) -> Result<PutOutcome, StoreError> {
        let path = paths::content_path(uploaded_at, metadata.category, &file.name);
        let sidecar_path = paths::sidecar_path(&path);

        let sidecar = Sidecar {
            jurisdiction: metadata.jurisdiction.clone(),
            service_line: metadata.service_line.clone(),
            entity: metadata.entity.clone(),
            client_approved: metadata.client_approved,
            client: metadata.client.clone(),
            client_number: metadata.client_number.clone(),
            category: metadata.category,
            original_name: file.name.clone(),
            upload_date: uploaded_at,
            size: file.size_bytes(),
            mime_type: file.effective_mime_type(),
        };
        let sidecar_bytes =
            serde_json::to_vec_pretty(&sidecar).map_err(|e| StoreError::Encoding(e.to_string()))?;

        // Phase 1: content. Failure here leaves nothing behind.
        let content = self
            .store
            .put(&path, &file.bytes, &format!("Upload {}", file.name))
            .await?;

        // Phase 2: sidecar. Failure here is logged, never rolled back.
        let (sidecar_entry, sidecar_error) = match self
            .store
            .put(&sidecar_path, &sidecar_bytes, &format!("Add metadata for {}", file.name))
            .await
        {
            Ok(entry) => (Some(entry), None),
            Err(e) => {
                tracing::warn!(
                    path = %path,
                    error = %e,
                    "Sidecar write failed; content object left without metadata"
                );
                (None, Some(e.to_string()))
            }
        };

        tracing::info!(path = %path, sha = %content.sha, "Document written to object store");

        Ok(PutOutcome {
            content,
            sidecar_path,
            sidecar: sidecar_entry,
            sidecar_error,
        })
    }

    /// List `path` and every folder below it, pair content with sidecars,
    /// and return Documents newest first.
    ///
    /// Failing to list `path` itself aborts the whole call. A subfolder
    /// that cannot be listed is skipped, as is any single entry that cannot
    /// become a Document (unreadable or malformed sidecar, unconventional
    /// name).
    pub async fn list_and_merge(&self, path: &str) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut skipped = 0usize;
        let mut pending = VecDeque::new();

        let root = merge::partition(self.store.list(path).await?);
        pending.extend(root.folders.iter().map(|f| f.path.clone()));
        self.merge_listing(&root, &mut documents, &mut skipped).await;

        while let Some(folder) = pending.pop_front() {
            let listing = match self.store.list(&folder).await {
                Ok(entries) => merge::partition(entries),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!(path = %folder, error = %e, "Skipping unlistable folder");
                    continue;
                }
            };
            pending.extend(listing.folders.iter().map(|f| f.path.clone()));
            self.merge_listing(&listing, &mut documents, &mut skipped).await;
        }

        merge::sort_newest_first(&mut documents);

        tracing::info!(
            path,
            documents = documents.len(),
            skipped,
            "Remote listing merged"
        );
        Ok(documents)
    }

    async fn merge_listing(
        &self,
        listing: &merge::PartitionedListing,
        documents: &mut Vec<Document>,
        skipped: &mut usize,
    ) {
        for content in &listing.contents {
            match self.merge_one(listing, content).await {
                Ok(doc) => documents.push(doc),
                Err(e) => {
                    *skipped += 1;
                    tracing::warn!(path = %content.path, error = %e, "Skipping remote object");
                }
            }
        }
    }

    async fn merge_one(
        &self,
        listing: &merge::PartitionedListing,
        content: &RemoteEntry,
    ) -> Result<Document, SidecarError> {
        match listing.sidecar_for(content) {
            Some(sidecar) => {
                let bytes = self
                    .store
                    .read(&sidecar.path, sidecar.download_url.as_deref())
                    .await
                    .map_err(|e| SidecarError::Unreadable(e.to_string()))?;
                merge::document_from_sidecar(content, sidecar, &bytes, &self.default_uploader)
            }
            None => merge::document_from_name(content, &self.default_uploader),
        }
    }

    /// Fetch a document's content bytes.
    pub async fn read_content(&self, document: &Document) -> Result<Vec<u8>, StoreError> {
        self.store
            .read(&document.path, document.download_url.as_deref())
            .await
    }

    /// Duplicate content and sidecar into `folder`, or next to the original
    /// when no folder is given. A name already taken at the destination
    /// gets a `_copy`, `_copy_2`, ... suffix.
    pub async fn copy_document(
        &self,
        document: &Document,
        folder: Option<&str>,
    ) -> Result<RelocateOutcome, StoreError> {
        let desired = match folder {
            Some(folder) => paths::relocated_path(&document.path, &paths::normalize_folder(folder)?),
            None => document.path.clone(),
        };
        let target = self.free_target(&desired).await?;

        let mut copy = self
            .write_copy(document, &target, &format!("Copy {} to {}", document.name, target))
            .await?;
        copy.is_archived = false;
        Ok(RelocateOutcome {
            document: copy,
            cleanup_error: None,
        })
    }

    /// Relocate content and sidecar into `folder`.
    ///
    /// The originals are removed only after both copies are written. Once
    /// the copies exist the move counts as done: a failed removal is
    /// reported in `cleanup_error`, never as an error.
    pub async fn move_document(
        &self,
        document: &Document,
        folder: &str,
    ) -> Result<RelocateOutcome, StoreError> {
        let folder = paths::normalize_folder(folder)?;
        if paths::parent_folder(&document.path) == folder {
            return Err(StoreError::InvalidPath(format!(
                "{} is already in {folder}",
                document.path
            )));
        }
        let target = self
            .free_target(&paths::relocated_path(&document.path, &folder))
            .await?;
        let moved = self
            .write_copy(document, &target, &format!("Move {} to {}", document.name, folder))
            .await?;

        let removal = format!("Remove {} after move", document.path);
        let mut failures = Vec::new();
        if let Err(e) = self.store.delete(&document.path, &document.id, &removal).await {
            failures.push(format!("{}: {e}", document.path));
        }
        if let Some(sidecar_sha) = &document.sidecar_sha {
            let sidecar = paths::sidecar_path(&document.path);
            if let Err(e) = self.store.delete(&sidecar, sidecar_sha, &removal).await {
                failures.push(format!("{sidecar}: {e}"));
            }
        }

        let cleanup_error = if failures.is_empty() {
            tracing::info!(from = %document.path, to = %moved.path, "Document moved");
            None
        } else {
            let reason = failures.join("; ");
            tracing::warn!(
                from = %document.path,
                to = %moved.path,
                error = %reason,
                "Document moved but originals were not removed"
            );
            Some(reason)
        };

        Ok(RelocateOutcome {
            document: moved,
            cleanup_error,
        })
    }

    /// `desired` if neither it nor its sidecar exists yet, else the first
    /// free `_copy` variant of it.
    async fn free_target(&self, desired: &str) -> Result<String, StoreError> {
        let folder = paths::parent_folder(desired);
        let taken: HashSet<String> = match self.store.list(folder).await {
            Ok(entries) => entries.into_iter().map(|e| e.path).collect(),
            Err(StoreError::NotFound(_)) | Err(StoreError::RemoteStatus { status: 404, .. }) => {
                HashSet::new()
            }
            Err(e) => return Err(e),
        };
        let is_free = |p: &str| !taken.contains(p) && !taken.contains(&paths::sidecar_path(p));

        if is_free(desired) {
            return Ok(desired.to_string());
        }
        (1..=MAX_COPY_SUFFIX)
            .map(|n| paths::numbered_copy_path(desired, n))
            .find(|p| is_free(p.as_str()))
            .ok_or_else(|| StoreError::InvalidPath(format!("no free name for {desired}")))
    }

    async fn write_copy(
        &self,
        document: &Document,
        target: &str,
        message: &str,
    ) -> Result<Document, StoreError> {
        let bytes = self.read_content(document).await?;
        let content = self.store.put(target, &bytes, message).await?;

        let sidecar_sha = match &document.sidecar_sha {
            Some(_) => {
                let sidecar_bytes = self
                    .store
                    .read(&paths::sidecar_path(&document.path), None)
                    .await?;
                let entry = self
                    .store
                    .put(&paths::sidecar_path(target), &sidecar_bytes, message)
                    .await?;
                Some(entry.sha)
            }
            None => None,
        };

        Ok(Document {
            id: content.sha,
            url: content.html_url.unwrap_or_default(),
            download_url: content.download_url,
            path: content.path,
            sidecar_sha,
            ..document.clone()
        })
    }
}
