//! Error types for the skills system.

/// Errors that can occur during skill loading and watching.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    /// I/O error during filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to set up the file-system watcher.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// A single malformed or invalid skill definition, collected during a load.
///
/// Definition errors are reported, never fatal: one bad file must not take
/// down the whole registry.
#[derive(Debug, Clone)]
pub struct DefinitionError {
    /// Path (or embedded name) of the problematic definition.
    pub path: String,
    /// Description of what was wrong.
    pub message: String,
}

impl std::fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}
