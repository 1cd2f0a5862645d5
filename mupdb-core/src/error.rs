//! Error types for mupdb

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MupdbError {
    #[error("Upload not found: {0}")]
    UploadNotFound(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Replication error: {0}")]
    Replication(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MupdbError {
    /// True when the failure is the expected missing-upload outcome rather
    /// than a fault (a replicated command targeting a missing upload is a
    /// normal result, not an error in the transport sense).
    pub fn is_not_found(&self) -> bool {
        matches!(self, MupdbError::UploadNotFound(_))
    }
}
