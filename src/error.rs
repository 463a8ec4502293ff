//! Errors from the ledger boundary. The billing engine itself never fails.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to read ledger {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger is not a valid record list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate record id: {0}")]
    DuplicateId(String),

    #[error("no record with id: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
