use realty_shared::ValidationError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested row does not exist, or is not visible to the caller.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Input rejected by a form rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The receiver has blacklisted the sender.
    #[error("Recipient does not accept messages from this user")]
    Blocked,

    /// Credentials or ownership check failed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Argon2 hashing failure.
    #[error("Password hash error: {0}")]
    PasswordHash(String),
}

impl StoreError {
    /// Map `QueryReturnedNoRows` to [`StoreError::NotFound`].
    pub(crate) fn from_query(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Sqlite(other),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
