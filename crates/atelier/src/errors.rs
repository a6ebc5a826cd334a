//! Host-facade error type.

/// Errors surfaced to the host application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Persistence failure in one of the stores.
    #[error(transparent)]
    Storage(#[from] atelier_storage::StorageError),

    /// Session/workspace failure.
    #[error(transparent)]
    Session(#[from] atelier_session::SessionError),

    /// Skill execution failure.
    #[error(transparent)]
    Execute(#[from] atelier_executor::ExecuteError),

    /// Registry/watcher failure.
    #[error(transparent)]
    Skills(#[from] atelier_skills::errors::SkillError),

    /// No skill with the given id is loaded.
    #[error("unknown skill: {0}")]
    UnknownSkill(String),

    /// A meta skill id the host does not implement.
    #[error("unknown meta skill: {0}")]
    UnknownMetaSkill(String),

    /// An invalid mode name was requested.
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// I/O failure exporting files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
