//! Error types for the SQLite triple store.

use thiserror::Error;

/// Errors that can occur during SQLite store operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    Migration(String),

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPrefix(String),

    /// A triple scheduled for removal is not attached to the item.
    #[error("triple '{triple}' not found on item '{item}'")]
    MissingTriple { item: String, triple: String },
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
