//! Session state: the imported file set and per-file mutable state.
//!
//! Each file's mutable state lives behind its own `tokio::sync::Mutex`,
//! handed out as an [`Arc`] handle. Tasks operating on disjoint files never
//! contend; the outer map is only touched briefly to clone handles out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::SessionError;
use crate::types::{AppliedSkill, Mode, SessionSettings, SessionSnapshot, WorkingFile};
use crate::workspace::{Workspace, copy_file};

/// Shared handle to one file's mutable state.
pub type SharedFileState = Arc<AsyncMutex<FileState>>;

/// Mutable state of one imported file: wire data, the immutable base copy,
/// and the snapshot list parallel to the applied-skill history.
#[derive(Debug)]
pub struct FileState {
    data: WorkingFile,
    base_path: PathBuf,
    file_dir: PathBuf,
    snapshots: Vec<PathBuf>,
}

impl FileState {
    /// Clone of the externally visible state.
    pub fn data(&self) -> WorkingFile {
        self.data.clone()
    }

    /// The file's id.
    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Path of the immutable base copy.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The file's directory inside the workspace.
    pub fn file_dir(&self) -> &Path {
        &self.file_dir
    }

    /// Current materialized path.
    pub fn working_path(&self) -> &Path {
        &self.data.working_path
    }

    /// Current extension, including the leading dot.
    pub fn current_extension(&self) -> &str {
        &self.data.current_extension
    }

    /// Update the current materialization after a transformation.
    pub fn set_current(&mut self, path: PathBuf, ext: String, size: u64) {
        self.data.working_path = path;
        self.data.current_extension = ext;
        self.data.size = size;
    }

    /// Replace the preview data URL.
    pub fn set_preview(&mut self, preview: String) {
        self.data.preview_data_url = preview;
    }

    /// The applied-skill history.
    pub fn applied_skills(&self) -> &[AppliedSkill] {
        &self.data.applied_skills
    }

    /// Append a history entry.
    pub fn append_applied(&mut self, applied: AppliedSkill) {
        self.data.applied_skills.push(applied);
    }

    /// Replace the entire history (used when an entry is removed).
    pub fn replace_applied(&mut self, applied: Vec<AppliedSkill>) {
        self.data.applied_skills = applied;
    }

    /// Snapshot path for a history index, if recorded.
    pub fn snapshot_at(&self, index: usize) -> Option<&Path> {
        self.snapshots.get(index).map(PathBuf::as_path)
    }

    /// Number of recorded snapshots.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Record the snapshot for a history index, extending the list if the
    /// index is past the end.
    pub fn set_snapshot(&mut self, index: usize, path: PathBuf) {
        if index < self.snapshots.len() {
            self.snapshots[index] = path;
            return;
        }
        while self.snapshots.len() < index {
            self.snapshots.push(PathBuf::new());
        }
        self.snapshots.push(path);
    }

    /// Drop snapshots at and beyond `index` (paired with a history
    /// truncation).
    pub fn truncate_snapshots(&mut self, index: usize) {
        self.snapshots.truncate(index);
    }
}

/// The imported file set and session settings for one run.
pub struct Session {
    files: DashMap<String, SharedFileState>,
    order: Mutex<Vec<String>>,
    workspace: Workspace,
    settings: RwLock<SessionSettings>,
}

impl Session {
    /// Create a session with a fresh workspace under the user cache dir.
    pub fn new(settings: SessionSettings) -> Result<Self, SessionError> {
        Ok(Self::with_workspace(Workspace::new()?, settings))
    }

    /// Create a session over an explicit workspace.
    pub fn with_workspace(workspace: Workspace, settings: SessionSettings) -> Self {
        Self {
            files: DashMap::new(),
            order: Mutex::new(Vec::new()),
            workspace,
            settings: RwLock::new(settings),
        }
    }

    /// The session's workspace.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Import a file: materialize base and current copies and register it.
    pub fn add_file(&self, path: &Path) -> Result<WorkingFile, SessionError> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(SessionError::NotAFile(path.to_path_buf()));
        }

        let id = Uuid::now_v7().to_string();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        let file_dir = self.workspace.ensure_file_dir(&id)?;
        let base_path = file_dir.join(format!("base{ext}"));
        let current_path = file_dir.join(format!("current{ext}"));
        copy_file(path, &base_path)?;
        copy_file(path, &current_path)?;

        let data = WorkingFile {
            id: id.clone(),
            name,
            extension: ext.clone(),
            current_extension: ext,
            original_path: path.to_path_buf(),
            working_path: current_path,
            size: meta.len(),
            preview_data_url: String::new(),
            applied_skills: Vec::new(),
        };
        debug!(id = %id, path = %path.display(), "Imported file");

        let state = FileState {
            data: data.clone(),
            base_path,
            file_dir,
            snapshots: Vec::new(),
        };
        let _ = self.files.insert(id.clone(), Arc::new(AsyncMutex::new(state)));
        self.order.lock().push(id);
        Ok(data)
    }

    /// Handle to one file's state.
    pub fn file(&self, id: &str) -> Option<SharedFileState> {
        self.files.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshots of every imported file, in import order.
    pub async fn list_files(&self) -> Vec<WorkingFile> {
        let order = self.order.lock().clone();
        let mut files = Vec::with_capacity(order.len());
        for id in order {
            let handle = self.files.get(&id).map(|entry| Arc::clone(entry.value()));
            if let Some(handle) = handle {
                files.push(handle.lock().await.data());
            }
        }
        files
    }

    /// Number of imported files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Current targeting mode.
    pub fn mode(&self) -> Mode {
        self.settings.read().mode
    }

    /// Switch the targeting mode.
    pub fn set_mode(&self, mode: Mode) {
        self.settings.write().mode = mode;
    }

    /// Export destination folder ("" = next to the original).
    pub fn output_folder(&self) -> String {
        self.settings.read().output_folder.clone()
    }

    /// Set the export destination folder.
    pub fn set_output_folder(&self, folder: impl Into<String>) {
        self.settings.write().output_folder = folder.into();
    }

    /// Export file-name template.
    pub fn naming_pattern(&self) -> String {
        self.settings.read().naming_pattern.clone()
    }

    /// Set the export file-name template; blank input is ignored.
    pub fn set_naming_pattern(&self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        if pattern.trim().is_empty() {
            return;
        }
        self.settings.write().naming_pattern = pattern;
    }

    /// Interface accent color.
    pub fn accent_color(&self) -> String {
        self.settings.read().accent_color.clone()
    }

    /// Set the accent color; blank input is ignored.
    pub fn set_accent_color(&self, color: impl Into<String>) {
        let color = color.into();
        if color.trim().is_empty() {
            return;
        }
        self.settings.write().accent_color = color;
    }

    /// Point-in-time view of the session settings.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.settings.read().clone()
    }

    /// Drop every imported file, reset settings to defaults, and remove the
    /// workspace tree.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.files.clear();
        self.order.lock().clear();
        *self.settings.write() = SessionSettings::default();
        self.workspace.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(tmp: &TempDir) -> Session {
        let ws = Workspace::at(tmp.path().join("ws")).unwrap();
        Session::with_workspace(ws, SessionSettings::default())
    }

    fn import(tmp: &TempDir, session: &Session, name: &str, bytes: &[u8]) -> WorkingFile {
        let src = tmp.path().join(name);
        std::fs::write(&src, bytes).unwrap();
        session.add_file(&src).unwrap()
    }

    #[test]
    fn test_add_file_materializes_base_and_current() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp);
        let wf = import(&tmp, &session, "photo.PNG", b"image-bytes");

        assert_eq!(wf.name, "photo");
        assert_eq!(wf.extension, ".png");
        assert_eq!(wf.current_extension, ".png");
        assert_eq!(wf.size, 11);
        assert!(wf.applied_skills.is_empty());
        assert!(wf.working_path.ends_with("current.png"));
        assert_eq!(std::fs::read(&wf.working_path).unwrap(), b"image-bytes");

        let handle = session.file(&wf.id).unwrap();
        let state = handle.blocking_lock();
        assert!(state.base_path().ends_with("base.png"));
        assert_eq!(std::fs::read(state.base_path()).unwrap(), b"image-bytes");
        assert_eq!(state.snapshot_count(), 0);
    }

    #[test]
    fn test_add_file_missing_source_fails() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp);
        assert!(session.add_file(Path::new("/nonexistent/x.png")).is_err());
    }

    #[tokio::test]
    async fn test_list_files_keeps_import_order() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp);
        let a = import(&tmp, &session, "a.png", b"a");
        let b = import(&tmp, &session, "b.png", b"b");

        let listed = session.list_files().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[1].id, b.id);
    }

    #[test]
    fn test_snapshot_set_and_truncate() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp);
        let wf = import(&tmp, &session, "a.png", b"a");

        let handle = session.file(&wf.id).unwrap();
        let mut state = handle.blocking_lock();
        state.set_snapshot(0, PathBuf::from("/s/0"));
        state.set_snapshot(1, PathBuf::from("/s/1"));
        assert_eq!(state.snapshot_count(), 2);
        assert_eq!(state.snapshot_at(1), Some(Path::new("/s/1")));

        state.truncate_snapshots(1);
        assert_eq!(state.snapshot_count(), 1);
        assert!(state.snapshot_at(1).is_none());
    }

    #[test]
    fn test_clear_removes_files_and_workspace() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp);
        let wf = import(&tmp, &session, "a.png", b"a");
        session.set_mode(Mode::PerFile);

        session.clear().unwrap();
        assert_eq!(session.file_count(), 0);
        assert!(session.file(&wf.id).is_none());
        assert_eq!(session.mode(), Mode::Batch);
        assert!(!session.workspace().root().exists());
    }

    #[test]
    fn test_blank_settings_updates_ignored() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp);
        session.set_naming_pattern("   ");
        session.set_accent_color("");
        assert_eq!(session.naming_pattern(), "{name}_{skill}.{ext}");
        assert_eq!(session.accent_color(), "99,102,241");
    }
}
