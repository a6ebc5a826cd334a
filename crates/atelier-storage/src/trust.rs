//! Persisted user trust decisions for community skills.
//!
//! Core skills are implicitly trusted and never appear here.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use atelier_skills::stores::TrustDecisions;

use crate::errors::StorageError;
use crate::paths::app_config_dir;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrustState {
    #[serde(default)]
    trusted_skills: HashMap<String, bool>,
}

/// JSON-file-backed trust store.
pub struct TrustStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TrustStore {
    /// Store under the app config dir.
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::at(app_config_dir()?.join("trust.json")))
    }

    /// Store at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<TrustState, StorageError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TrustState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, state: &TrustState) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(state)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Whether the user has granted trust to a skill, surfacing store errors.
    pub fn query(&self, skill_id: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.trusted_skills.get(skill_id).copied().unwrap_or(false))
    }

    /// Record or revoke a trust grant, surfacing store errors.
    ///
    /// Revoking removes the entry rather than storing `false`.
    pub fn update(&self, skill_id: &str, trusted: bool) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut state = self.load()?;
        if trusted {
            let _ = state.trusted_skills.insert(skill_id.to_string(), true);
        } else {
            let _ = state.trusted_skills.remove(skill_id);
        }
        self.save(&state)
    }
}

impl TrustDecisions for TrustStore {
    fn is_trusted(&self, skill_id: &str) -> bool {
        self.query(skill_id).unwrap_or(false)
    }

    fn set_trusted(&self, skill_id: &str, trusted: bool) {
        if let Err(e) = self.update(skill_id, trusted) {
            warn!(skill_id, error = %e, "Failed to persist trust decision");
        }
    }
}
