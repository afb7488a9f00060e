use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A thread panicked while holding the connection.
    #[error("archive connection poisoned")]
    Poisoned,

    #[error("invalid stored timestamp: {0}")]
    Timestamp(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
