pub mod form;
pub mod pipeline;
pub mod queue;

pub use form::*;
pub use pipeline::*;
pub use queue::*;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("No files queued for upload")]
    NothingToUpload,

    #[error("Upload of {file_name} (file {position}) failed: {source}")]
    Write {
        file_name: String,
        position: usize,
        #[source]
        source: StoreError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
