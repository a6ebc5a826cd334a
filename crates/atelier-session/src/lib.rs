//! # atelier-session
//!
//! Per-run scratch workspace and the mutable state of every imported file.
//!
//! Each imported file gets its own subdirectory under the session's
//! workspace root, holding an immutable `base` copy, the evolving `current`
//! materialization, and one numbered snapshot per applied-skill history
//! entry. The session exclusively owns everything under a file's
//! subdirectory; other components go through [`FileState`] accessors.
//!
//! ## Module Overview
//!
//! - [`types`] — wire types (`WorkingFile`, `AppliedSkill`, session snapshot)
//! - [`workspace`] — scratch directory tree and path conventions
//! - [`state`] — `Session` and per-file `FileState`
//!
//! ## Crate Position
//!
//! Depends on atelier-skills (param types only).
//! Depended on by: atelier-executor, atelier.

#![deny(unsafe_code)]

pub mod errors;
pub mod state;
pub mod types;
pub mod workspace;

pub use errors::SessionError;
pub use state::{FileState, Session, SharedFileState};
pub use types::{
    AppliedSkill, ExportResult, Mode, SessionSettings, SessionSnapshot, WorkingFile, export_name,
};
pub use workspace::{Workspace, copy_file};
