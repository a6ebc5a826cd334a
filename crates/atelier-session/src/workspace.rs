//! Scratch directory tree for a session run.
//!
//! Layout: `<root>/<file id>/base<ext>`, `current<ext>`,
//! `snapshot-NNN<ext>`. The default root is a timestamped directory under
//! the user cache dir; tests inject their own root.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::errors::SessionError;

/// Root of a session's scratch tree.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a fresh workspace under the user cache directory.
    pub fn new() -> Result<Self, SessionError> {
        let base = dirs::cache_dir().ok_or(SessionError::NoCacheDir)?;
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let root = base.join("atelier").join("workspace").join(stamp.to_string());
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Use an explicit root (created if missing).
    pub fn at(root: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for one file's materializations, created on demand.
    pub fn ensure_file_dir(&self, file_id: &str) -> Result<PathBuf, SessionError> {
        let dir = self.root.join(file_id);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Path of the numbered snapshot for a file's history entry.
    pub fn snapshot_path(&self, file_id: &str, index: usize, ext: &str) -> PathBuf {
        self.root.join(file_id).join(format!("snapshot-{index:03}{ext}"))
    }

    /// Remove the entire scratch tree.
    pub fn reset(&self) -> Result<(), SessionError> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

/// Copy `src` to `dst`, syncing the destination to disk.
pub fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = File::open(src)?;
    let mut output = File::create(dst)?;
    let _ = io::copy(&mut input, &mut output)?;
    output.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_dir_and_snapshot_paths() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::at(tmp.path().join("ws")).unwrap();

        let dir = ws.ensure_file_dir("abc").unwrap();
        assert!(dir.is_dir());
        assert!(dir.ends_with("abc"));

        let snap = ws.snapshot_path("abc", 7, ".png");
        assert!(snap.ends_with("abc/snapshot-007.png"));
    }

    #[test]
    fn test_reset_removes_tree() {
        let tmp = TempDir::new().unwrap();
        let ws = Workspace::at(tmp.path().join("ws")).unwrap();
        let _ = ws.ensure_file_dir("abc").unwrap();
        ws.reset().unwrap();
        assert!(!ws.root().exists());
    }

    #[test]
    fn test_copy_file_copies_bytes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.bin");
        let dst = tmp.path().join("dst.bin");
        std::fs::write(&src, b"payload").unwrap();
        copy_file(&src, &dst).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"payload");
    }
}
