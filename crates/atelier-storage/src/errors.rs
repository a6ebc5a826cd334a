//! Error types for persistence.

/// Errors that can occur loading or saving a store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error touching the backing file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but does not parse.
    #[error("malformed store file: {0}")]
    Malformed(#[from] serde_json::Error),

    /// No user config directory could be resolved.
    #[error("no config directory available")]
    NoConfigDir,
}
