//! # atelier
//!
//! Host facade over the atelier core: wires the persisted stores, the skill
//! registry, the session, and the executor into the caller-facing surface —
//! search skills, import files, apply a skill to a file set, edit a file's
//! history, export, clear.
//!
//! The windowing shell of a desktop host is out of scope; the bundled
//! binary drives the same [`App`] from the command line.

#![deny(unsafe_code)]

pub mod app;
pub mod errors;
pub mod result;

pub use app::{App, AppPaths};
pub use errors::AppError;
pub use result::{FailedFile, SkillResult};
