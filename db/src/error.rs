//! Error types for registry operations.

use thiserror::Error;

/// Errors that can occur while loading or configuring a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A source file or bundle is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A source parsed as JSON but does not describe a valid schema.
    #[error("schema error: {0}")]
    Schema(#[from] mdschema_core::Error),

    /// All configured loader sources failed.
    #[error("no schema sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;
