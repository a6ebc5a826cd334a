//! Error types for session and workspace operations.

use std::path::PathBuf;

/// Errors that can occur managing the session workspace.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// I/O error during filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No user cache directory could be resolved for the workspace root.
    #[error("no cache directory available for the session workspace")]
    NoCacheDir,

    /// The imported path does not exist or is not a regular file.
    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    /// No file with the given id exists in the session.
    #[error("file not found: {0}")]
    FileNotFound(String),
}
