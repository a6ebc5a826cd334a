//! Error types for skill execution.

use atelier_drivers::DriverError;
use atelier_session::SessionError;

/// Errors failing a single apply / remove operation.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// No skill with the given id is loaded.
    #[error("unknown skill: {0}")]
    UnknownSkill(String),

    /// Meta skills are host-application-only and never run against a file.
    #[error("meta skill cannot be executed on files: {0}")]
    MetaNotExecutable(String),

    /// A pipeline nested past the fixed bound — user-authored skill graphs
    /// are not validated for cycles, so runaway nesting is cut off.
    #[error("pipeline depth exceeded in skill {skill_id} (bound {bound})")]
    PipelineDepthExceeded {
        /// The pipeline skill that crossed the bound.
        skill_id: String,
        /// The fixed depth bound.
        bound: usize,
    },

    /// A pipeline referenced a skill already being expanded on this call
    /// stack.
    #[error("pipeline cycle detected at skill {skill_id}")]
    PipelineCycle {
        /// The skill id that closed the cycle.
        skill_id: String,
    },

    /// No driver is registered for the skill's driver tag.
    #[error("missing driver: {0}")]
    DriverMissing(String),

    /// A community skill declares elevated capabilities the user has not
    /// granted trust for. Raised before any file I/O.
    #[error("skill {skill_id} requires trust; elevated permissions: {}", .elevated.join(", "))]
    TrustRequired {
        /// The gated skill.
        skill_id: String,
        /// The elevated capabilities that need the grant.
        elevated: Vec<String>,
    },

    /// No file with the given id exists in the session.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// History index out of range for a remove.
    #[error("invalid skill index {index} (history length {len})")]
    InvalidHistoryIndex {
        /// The requested index.
        index: usize,
        /// The history length at the time.
        len: usize,
    },

    /// A file task aborted without producing a result.
    #[error("file task failed: {0}")]
    TaskFailed(String),

    /// Backend failure, surfaced verbatim.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Session/workspace failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// I/O failure materializing outputs or snapshots.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
