//! # atelier-drivers
//!
//! Pluggable transformation backends behind the [`Driver`] capability
//! interface. The executor dispatches skills to a fixed, statically
//! registered set of drivers keyed by tag — skills are data, drivers are
//! the behavior they dispatch to.
//!
//! ## Module Overview
//!
//! - [`cli`] — external-process skills with templated arguments
//! - [`imaging`] — native image transformations on the `image` crate
//! - [`preview`] — best-effort thumbnail data URLs
//!
//! ## Crate Position
//!
//! Depends on atelier-skills.
//! Depended on by: atelier-executor, atelier.

#![deny(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use atelier_skills::types::{ParamMap, Skill};

pub mod cli;
pub mod errors;
pub mod imaging;
pub mod preview;

pub use errors::DriverError;

/// Progress callback: monotonically increasing values in `[0, 1]`.
/// Drivers are not required to call it.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// A transformation backend.
///
/// Given an input path, a desired output path, the skill definition, and
/// resolved params, a driver performs the transformation and reports
/// success or a descriptive failure. Drivers must never mutate the input
/// path.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Tag this driver is registered under.
    fn id(&self) -> &'static str;

    /// Whether this driver can execute the given skill.
    fn supports(&self, skill: &Skill) -> bool;

    /// Perform the transformation from `input` to `output`.
    async fn execute(
        &self,
        input: &Path,
        output: &Path,
        skill: &Skill,
        params: &ParamMap,
        progress: Option<ProgressFn>,
    ) -> Result<(), DriverError>;
}

/// Read a numeric param, falling back when absent or non-numeric.
pub(crate) fn read_f64(params: &ParamMap, key: &str, default: f64) -> f64 {
    params.get(key).and_then(serde_json::Value::as_f64).unwrap_or(default)
}
