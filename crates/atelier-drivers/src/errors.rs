//! Error types for transformation backends.

/// Errors produced by a [`Driver`](crate::Driver) invocation.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// I/O error touching the input or output path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The skill's executor shape does not fit this driver.
    #[error("{0}")]
    Unsupported(String),

    /// The skill does not declare a permission this driver requires.
    #[error("skill missing required permission: {0}")]
    MissingPermission(String),

    /// A community skill tried to run a command outside the allowlist.
    #[error("community skill requires {permission} to run {command:?}")]
    CommandNotAllowed {
        /// The elevated permission that would allow it.
        permission: String,
        /// The rejected command base name.
        command: String,
    },

    /// The external process failed; the message carries its output.
    #[error("cli skill failed: {0}")]
    CommandFailed(String),

    /// The external process exceeded its declared timeout.
    #[error("cli skill timed out after {timeout_ms} ms")]
    Timeout {
        /// The declared timeout.
        timeout_ms: u64,
    },

    /// The skill id is not one this driver knows how to handle.
    #[error("unsupported skill: {0}")]
    UnknownSkill(String),

    /// A parameter value is out of range or malformed.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
}
