use std::path::PathBuf;

use serde::Serialize;

use super::UploadError;
use crate::config::MAX_UPLOAD_BYTES;
use crate::models::{format_size, UploadFile};

/// Per-file progress: `Pending → Uploading → Succeeded | Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FileState {
    Pending,
    Uploading,
    Succeeded { path: String },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct QueuedFile {
    pub file: UploadFile,
    pub state: FileState,
}

impl QueuedFile {
    /// Pending, or failed on an earlier attempt.
    pub fn needs_upload(&self) -> bool {
        matches!(self.state, FileState::Pending | FileState::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFilesReport {
    pub added: usize,
    pub rejected_oversize: usize,
    pub rejected_names: Vec<String>,
}

impl AddFilesReport {
    fn reject_oversize(&mut self, name: String, size: u64) {
        tracing::warn!(
            file = %name,
            size,
            limit = MAX_UPLOAD_BYTES,
            "File rejected before upload: too large"
        );
        self.rejected_oversize += 1;
        self.rejected_names.push(name);
    }

    /// Notice to show when files were turned away.
    pub fn notice(&self) -> Option<String> {
        (self.rejected_oversize > 0).then(|| {
            format!(
                "{} file(s) exceed the {} limit and were not added",
                self.rejected_oversize,
                format_size(MAX_UPLOAD_BYTES)
            )
        })
    }
}

/// Files waiting to be uploaded with one shared metadata form.
#[derive(Debug, Default)]
pub struct UploadQueue {
    files: Vec<QueuedFile>,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue files, turning away anything over the size limit.
    pub fn add_files(&mut self, files: Vec<UploadFile>) -> AddFilesReport {
        let mut report = AddFilesReport::default();
        for file in files {
            let size = file.size_bytes();
            if size > MAX_UPLOAD_BYTES {
                report.reject_oversize(file.name, size);
                continue;
            }
            self.files.push(QueuedFile {
                file,
                state: FileState::Pending,
            });
            report.added += 1;
        }
        report
    }

    /// Read files from disk and queue them.
    ///
    /// Oversize files are turned away from their metadata without being
    /// read. Any I/O failure queues nothing from this call.
    pub async fn add_paths(&mut self, paths: &[PathBuf]) -> Result<AddFilesReport, UploadError> {
        let mut rejected = AddFilesReport::default();
        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            let size = tokio::fs::metadata(path).await?.len();
            if size > MAX_UPLOAD_BYTES {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                rejected.reject_oversize(name, size);
                continue;
            }
            loaded.push(UploadFile::from_path(path).await?);
        }

        let mut report = self.add_files(loaded);
        report.rejected_oversize += rejected.rejected_oversize;
        report.rejected_names.extend(rejected.rejected_names);
        Ok(report)
    }

    pub fn remove(&mut self, position: usize) -> Option<UploadFile> {
        (position < self.files.len()).then(|| self.files.remove(position).file)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[QueuedFile] {
        &self.files
    }

    pub(crate) fn files_mut(&mut self) -> &mut [QueuedFile] {
        &mut self.files
    }

    /// Drop files that already reached the store.
    pub(crate) fn drain_succeeded(&mut self) {
        self.files
            .retain(|f| !matches!(f.state, FileState::Succeeded { .. }));
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
