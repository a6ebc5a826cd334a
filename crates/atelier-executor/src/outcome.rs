//! Per-file apply outcomes.
//!
//! A multi-file apply reports each file's result individually: a failed
//! file never hides a sibling that already succeeded (whose on-disk state
//! is persisted either way).

use atelier_session::WorkingFile;

use crate::errors::ExecuteError;

/// Result of applying a skill to one file of a batch.
#[derive(Debug)]
pub struct ApplyOutcome {
    /// The target file's id.
    pub file_id: String,
    /// The updated file state, or why this file's task failed.
    pub result: Result<WorkingFile, ExecuteError>,
}

impl ApplyOutcome {
    /// The updated state when the task succeeded.
    pub fn updated(&self) -> Option<&WorkingFile> {
        self.result.as_ref().ok()
    }
}
