//! Sequential upload of a queue through the store adapter.

use serde::Serialize;

use super::{FileState, QueuedFile, UploadError, UploadQueue};
use crate::models::UploadMetadata;
use crate::store::{PutOutcome, RemoteStoreAdapter};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub uploaded: usize,
    /// Content paths whose sidecar write failed.
    pub orphaned_sidecars: Vec<String>,
    /// The files landed but re-listing the store afterwards failed; the
    /// index still shows the pre-upload listing.
    pub refresh_error: Option<String>,
}

/// Upload every queued file in order, one at a time.
///
/// The first failure stops the loop: files after it stay `Pending`, files
/// before it stay persisted. `on_complete` fires once per persisted file.
/// Succeeded files leave the queue either way, so a retry resumes at the
/// failed file.
pub async fn run_upload<F>(
    adapter: &RemoteStoreAdapter,
    queue: &mut UploadQueue,
    metadata: &UploadMetadata,
    mut on_complete: F,
) -> Result<UploadReport, UploadError>
where
    F: FnMut(&QueuedFile, &PutOutcome),
{
    if !queue.files().iter().any(QueuedFile::needs_upload) {
        return Err(UploadError::NothingToUpload);
    }

    let mut report = UploadReport::default();
    let mut failure = None;

    for (position, queued) in queue.files_mut().iter_mut().enumerate() {
        if !queued.needs_upload() {
            continue;
        }
        queued.state = FileState::Uploading;
        tracing::info!(file = %queued.file.name, position = position + 1, "Uploading");

        match adapter.put(&queued.file, metadata).await {
            Ok(outcome) => {
                if outcome.is_orphaned() {
                    report.orphaned_sidecars.push(outcome.content.path.clone());
                }
                queued.state = FileState::Succeeded {
                    path: outcome.content.path.clone(),
                };
                report.uploaded += 1;
                on_complete(queued, &outcome);
            }
            Err(e) => {
                tracing::error!(file = %queued.file.name, error = %e, "Upload failed; stopping");
                queued.state = FileState::Failed {
                    reason: e.to_string(),
                };
                failure = Some(UploadError::Write {
                    file_name: queued.file.name.clone(),
                    position: position + 1,
                    source: e,
                });
                break;
            }
        }
    }

    queue.drain_succeeded();
    tracing::info!(
        uploaded = report.uploaded,
        orphaned = report.orphaned_sidecars.len(),
        remaining = queue.len(),
        "Upload batch finished"
    );

    match failure {
        Some(e) => Err(e),
        None => Ok(report),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{Category, UploadFile};
    use crate::store::MemoryStore;

    fn metadata() -> UploadMetadata {
        UploadMetadata {
            category: Category::Financial,
            jurisdiction: "United States".into(),
            service_line: "Audit".into(),
            entity: String::new(),
            client: "Acme".into(),
            client_number: String::new(),
            client_approved: false,
        }
    }

    fn setup() -> (Arc<MemoryStore>, RemoteStoreAdapter) {
        let store = Arc::new(MemoryStore::new());
        let adapter = RemoteStoreAdapter::new(store.clone(), "owner");
        (store, adapter)
    }

    #[tokio::test]
    async fn second_failure_stops_the_batch() {
        let (store, adapter) = setup();
        store.fail_puts_containing("second");
        let mut queue = UploadQueue::new();
        queue.add_files(vec![
            UploadFile::new("first.pdf", b"1".to_vec()),
            UploadFile::new("second.pdf", b"2".to_vec()),
            UploadFile::new("third.pdf", b"3".to_vec()),
        ]);

        let mut completed = Vec::new();
        let err = run_upload(&adapter, &mut queue, &metadata(), |queued, _| {
            completed.push(queued.file.name.clone())
        })
        .await
        .unwrap_err();

        assert_eq!(completed, vec!["first.pdf".to_string()]);
        match err {
            UploadError::Write { file_name, position, .. } => {
                assert_eq!(file_name, "second.pdf");
                assert_eq!(position, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(store.put_log().iter().all(|p| !p.contains("third")));
        assert!(store.paths().iter().any(|p| p.ends_with("_first.pdf")));

        // First file left the queue; the failed and untouched ones remain.
        assert_eq!(queue.len(), 2);
        assert!(matches!(queue.files()[0].state, FileState::Failed { .. }));
        assert_eq!(queue.files()[1].state, FileState::Pending);
    }

    #[tokio::test]
    async fn retry_resumes_at_failed_file() {
        let (store, adapter) = setup();
        let mut queue = UploadQueue::new();
        queue.add_files(vec![UploadFile::new("a.pdf", b"a".to_vec())]);
        queue.files_mut()[0].state = FileState::Failed {
            reason: "earlier".into(),
        };

        let report = run_upload(&adapter, &mut queue, &metadata(), |_, _| {}).await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert!(queue.is_empty());
        assert_eq!(store.put_log().len(), 2);
    }

    #[tokio::test]
    async fn orphaned_sidecars_are_reported() {
        let (store, adapter) = setup();
        store.fail_puts_containing(".metadata.json");
        let mut queue = UploadQueue::new();
        queue.add_files(vec![UploadFile::new("a.pdf", b"a".to_vec())]);

        let report = run_upload(&adapter, &mut queue, &metadata(), |_, _| {}).await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.orphaned_sidecars.len(), 1);
        assert!(report.orphaned_sidecars[0].ends_with("_financial_a.pdf"));
    }

    #[tokio::test]
    async fn empty_queue_is_an_error() {
        let (_store, adapter) = setup();
        let mut queue = UploadQueue::new();
        assert!(matches!(
            run_upload(&adapter, &mut queue, &metadata(), |_, _| {}).await,
            Err(UploadError::NothingToUpload)
        ));
    }

    #[tokio::test]
    async fn oversize_rejected_and_nine_mib_uploaded() {
        let (store, adapter) = setup();
        let mut queue = UploadQueue::new();
        let added = queue.add_files(vec![
            UploadFile::new("huge.pdf", vec![0; 11 * 1024 * 1024]),
            UploadFile::new("fits.pdf", vec![0; 9 * 1024 * 1024]),
        ]);
        assert_eq!(added.rejected_oversize, 1);

        let report = run_upload(&adapter, &mut queue, &metadata(), |_, _| {}).await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert!(store.put_log().iter().all(|p| !p.contains("huge")));
    }
}
