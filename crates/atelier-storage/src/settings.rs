//! Persisted app settings.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::paths::app_config_dir;

const DEFAULT_NAMING_PATTERN: &str = "{name}_{skill}.{ext}";
const DEFAULT_ACCENT_COLOR: &str = "99,102,241";

/// Settings surviving across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Export destination folder; empty means "next to the original".
    #[serde(default)]
    pub output_folder: String,
    /// Export file-name template.
    #[serde(default)]
    pub naming_pattern: String,
    /// Interface accent color as `r,g,b`.
    #[serde(default)]
    pub accent_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_folder: String::new(),
            naming_pattern: DEFAULT_NAMING_PATTERN.to_string(),
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

impl Settings {
    fn fill_defaults(mut self) -> Self {
        if self.naming_pattern.is_empty() {
            self.naming_pattern = DEFAULT_NAMING_PATTERN.to_string();
        }
        if self.accent_color.is_empty() {
            self.accent_color = DEFAULT_ACCENT_COLOR.to_string();
        }
        self
    }
}

/// JSON-file-backed settings store.
pub struct SettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SettingsStore {
    /// Store under the app config dir.
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::at(app_config_dir()?.join("settings.json")))
    }

    /// Store at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Load settings; a missing file yields defaults, empty fields are
    /// filled in.
    pub fn load(&self) -> Result<Settings, StorageError> {
        let _guard = self.lock.lock();
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let settings: Settings = serde_json::from_slice(&bytes)?;
                Ok(settings.fill_defaults())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist settings, re-applying defaults to empty fields.
    pub fn save(&self, settings: Settings) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let settings = settings.fill_defaults();
        let json = serde_json::to_vec_pretty(&settings)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}
