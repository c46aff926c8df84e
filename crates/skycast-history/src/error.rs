//! History persistence errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read history: {0}")]
    Read(String),

    #[error("Failed to write history: {0}")]
    Write(String),

    #[error("Stored history is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<StorageError> for skycast_core::AppError {
    fn from(e: StorageError) -> Self {
        use skycast_core::StorageError as Core;
        let mapped = match e {
            StorageError::Read(msg) => Core::ReadFailed(msg),
            StorageError::Write(msg) => Core::WriteFailed(msg),
            StorageError::Corrupt(e) => Core::Corruption(e.to_string()),
            StorageError::Sqlite(e) => Core::WriteFailed(e.to_string()),
        };
        skycast_core::AppError::Storage(mapped)
    }
}
