//! App directory resolution.

use std::path::PathBuf;

use crate::errors::StorageError;

/// The app config directory, created on demand.
pub fn app_config_dir() -> Result<PathBuf, StorageError> {
    let base = dirs::config_dir().ok_or(StorageError::NoConfigDir)?;
    let dir = base.join("atelier");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// The on-disk directory for community skills and packs, created on demand.
///
/// User-specific and portable across installs.
pub fn skills_dir() -> Result<PathBuf, StorageError> {
    let dir = app_config_dir()?.join("skills");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
