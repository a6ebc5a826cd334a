//! Wire result of a skill execution.

use serde::Serialize;

use atelier_session::{SessionSnapshot, WorkingFile};

/// One file of a batch that failed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedFile {
    /// The failed file's id.
    pub file_id: String,
    /// Human-readable failure reason.
    pub error: String,
}

/// What a skill execution did, per file plus session state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResult {
    /// Files whose state was updated.
    pub updated_files: Vec<WorkingFile>,
    /// Files whose task failed (their siblings above still persisted).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FailedFile>,
    /// Session settings after the execution.
    pub session: SessionSnapshot,
    /// Optional human-readable message (meta skills).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl SkillResult {
    /// Result carrying only the session state.
    pub fn session_only(session: SessionSnapshot) -> Self {
        Self {
            updated_files: Vec::new(),
            failed_files: Vec::new(),
            session,
            message: String::new(),
        }
    }

    /// Result carrying the session state and a message.
    pub fn with_message(session: SessionSnapshot, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::session_only(session)
        }
    }
}
