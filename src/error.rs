use std::path::PathBuf;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("invalid assembly accession: {0}")]
    InvalidAccession(String),

    #[error("unknown assembly level: {0}")]
    InvalidAssemblyLevel(String),

    #[error("assembly summary not found at {0}")]
    CatalogMissing(PathBuf),

    #[error("failed to parse assembly summary: {0}")]
    CatalogParse(String),

    #[error("failed to read species list at {0}")]
    SpeciesListRead(PathBuf),

    #[error("transient transfer failure: {0}")]
    TransientTransfer(String),

    #[error("remote resource missing: {0}")]
    MissingRemoteResource(String),

    #[error("remote request failed: {0}")]
    RemoteHttp(String),

    #[error("remote returned status {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("failed to decompress {path}: {reason}")]
    Decompression { path: Utf8PathBuf, reason: String },

    #[error("rename target {0} already exists with different content")]
    RenameConflict(Utf8PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl SyncError {
    /// Whether the failure poisons only one organism or file, not the run.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SyncError::TransientTransfer(_)
                | SyncError::MissingRemoteResource(_)
                | SyncError::RemoteHttp(_)
                | SyncError::RemoteStatus { .. }
                | SyncError::Decompression { .. }
                | SyncError::RenameConflict(_)
        )
    }
}
