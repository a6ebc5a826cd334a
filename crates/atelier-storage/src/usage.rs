//! Persisted per-skill usage statistics.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::warn;

use atelier_skills::ranker::UsageStats;
use atelier_skills::stores::UsageSink;

use crate::errors::StorageError;
use crate::paths::app_config_dir;

/// JSON-file-backed usage counter store.
pub struct UsageStore {
    path: PathBuf,
    data: Mutex<HashMap<String, UsageStats>>,
}

impl UsageStore {
    /// Store under the app config dir, pre-loaded from disk.
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::at(app_config_dir()?.join("usage_stats.json")))
    }

    /// Store at an explicit path, pre-loaded from disk when present.
    pub fn at(path: PathBuf) -> Self {
        let data = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring malformed usage stats");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    fn persist(&self, data: &HashMap<String, UsageStats>) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(data)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl UsageSink for UsageStore {
    fn all(&self) -> HashMap<String, UsageStats> {
        self.data.lock().clone()
    }

    fn increment(&self, skill_id: &str) {
        let mut data = self.data.lock();
        let entry = data.entry(skill_id.to_string()).or_insert(UsageStats {
            count: 0,
            last_used: Utc::now(),
        });
        entry.count += 1;
        entry.last_used = Utc::now();
        // A failed bump must never fail the skill application it accounts
        // for.
        if let Err(e) = self.persist(&data) {
            warn!(skill_id, error = %e, "Failed to persist usage stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_increment_creates_and_bumps() {
        let tmp = TempDir::new().unwrap();
        let store = UsageStore::at(tmp.path().join("usage.json"));

        store.increment("resize");
        store.increment("resize");
        store.increment("blur");

        let all = store.all();
        assert_eq!(all["resize"].count, 2);
        assert_eq!(all["blur"].count, 1);
    }

    #[test]
    fn test_stats_survive_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("usage.json");

        let store = UsageStore::at(path.clone());
        store.increment("resize");
        drop(store);

        let reloaded = UsageStore::at(path);
        assert_eq!(reloaded.all()["resize"].count, 1);
    }

    #[test]
    fn test_malformed_file_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("usage.json");
        std::fs::write(&path, "{broken").unwrap();
        let store = UsageStore::at(path);
        assert!(store.all().is_empty());
    }
}
