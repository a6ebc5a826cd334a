//! The caller-facing application facade.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use atelier_drivers::preview;
use atelier_executor::Executor;
use atelier_session::{
    ExportResult, Mode, Session, SessionSettings, SessionSnapshot, Workspace, WorkingFile,
    copy_file, export_name,
};
use atelier_skills::loader::LoadOptions;
use atelier_skills::registry::Registry;
use atelier_skills::stores::{TrustDecisions, UsageSink};
use atelier_skills::types::{ParamMap, Skill};
use atelier_storage::{Settings, SettingsStore, TrustStore, UsageStore, paths};

use crate::errors::AppError;
use crate::result::{FailedFile, SkillResult};

/// Preview thumbnail width for imports.
const PREVIEW_WIDTH: u32 = 520;

/// Filesystem roots an [`App`] runs against. Defaults resolve to the user
/// config/cache dirs; tests point everything into a temp tree.
#[derive(Debug, Clone, Default)]
pub struct AppPaths {
    /// Directory for the persisted stores (settings, usage, trust).
    pub config_dir: Option<PathBuf>,
    /// On-disk core override tier for skill development.
    pub disk_core_root: Option<PathBuf>,
    /// Community skill directory.
    pub community_root: Option<PathBuf>,
    /// Session workspace root.
    pub workspace_root: Option<PathBuf>,
}

/// Wired-together application state.
pub struct App {
    registry: Arc<Registry>,
    session: Arc<Session>,
    executor: Arc<Executor>,
    settings_store: SettingsStore,
    usage_store: Arc<UsageStore>,
    trust_store: Arc<TrustStore>,
}

impl App {
    /// App over the default user directories.
    pub fn new() -> Result<Self, AppError> {
        Self::with_paths(AppPaths::default())
    }

    /// App over explicit roots.
    pub fn with_paths(paths: AppPaths) -> Result<Self, AppError> {
        let config_dir = match paths.config_dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                dir
            }
            None => paths::app_config_dir()?,
        };
        let settings_store = SettingsStore::at(config_dir.join("settings.json"));
        let usage_store = Arc::new(UsageStore::at(config_dir.join("usage_stats.json")));
        let trust_store = Arc::new(TrustStore::at(config_dir.join("trust.json")));

        let settings = settings_store.load().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default settings");
            Settings::default()
        });
        let workspace = match paths.workspace_root {
            Some(root) => Workspace::at(root)?,
            None => Workspace::new()?,
        };
        let session = Arc::new(Session::with_workspace(
            workspace,
            SessionSettings {
                mode: Mode::Batch,
                output_folder: settings.output_folder,
                naming_pattern: settings.naming_pattern,
                accent_color: settings.accent_color,
            },
        ));

        let community_root = match paths.community_root {
            Some(root) => root,
            None => paths::skills_dir()?,
        };
        let registry = Arc::new(Registry::new(LoadOptions {
            disk_core_root: paths.disk_core_root,
            community_root: Some(community_root),
            ..LoadOptions::default()
        }));

        let executor = Arc::new(Executor::new(
            Arc::clone(&registry),
            Arc::clone(&session),
            Arc::clone(&usage_store) as Arc<dyn UsageSink>,
            Arc::clone(&trust_store) as Arc<dyn TrustDecisions>,
        ));

        Ok(Self {
            registry,
            session,
            executor,
            settings_store,
            usage_store,
            trust_store,
        })
    }

    /// Ranked skill search over the current registry and usage history.
    pub fn skills(&self, query: &str, input_types: &[String]) -> Vec<Skill> {
        self.registry.search(query, input_types, &self.usage_store.all())
    }

    /// Start hot reloading community/dev skills for the process lifetime.
    pub fn start_hot_reload(&self) -> Result<JoinHandle<()>, AppError> {
        Ok(self.registry.start_hot_reload()?)
    }

    /// Wait for the next registry change (coalesced).
    pub async fn skills_changed(&self) {
        self.registry.changed().await;
    }

    /// Import files into the session. Unreadable paths are skipped.
    pub fn add_files(&self, source_paths: &[PathBuf]) -> Vec<WorkingFile> {
        let mut added = Vec::with_capacity(source_paths.len());
        for path in source_paths {
            match self.session.add_file(path) {
                Ok(mut file) => {
                    if let Ok(url) = preview::image_preview(&file.working_path, PREVIEW_WIDTH) {
                        self.set_preview(&file.id, &url);
                        file.preview_data_url = url;
                    }
                    added.push(file);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping import"),
            }
        }
        added
    }

    fn set_preview(&self, file_id: &str, url: &str) {
        if let Some(handle) = self.session.file(file_id) {
            if let Ok(mut state) = handle.try_lock() {
                state.set_preview(url.to_string());
            }
        }
    }

    /// Execute a skill: meta skills are handled here, file skills are
    /// delegated to the executor with per-file outcomes.
    pub async fn execute_skill(
        &self,
        file_ids: &[String],
        skill_id: &str,
        params: &ParamMap,
    ) -> Result<SkillResult, AppError> {
        let skill = self
            .registry
            .get_by_id(skill_id)
            .ok_or_else(|| AppError::UnknownSkill(skill_id.to_string()))?;

        if skill.is_meta {
            return self.execute_meta_skill(&skill.id, params, file_ids).await;
        }
        if file_ids.is_empty() {
            return Ok(SkillResult::session_only(self.session.snapshot()));
        }

        let outcomes = self.executor.apply_skill(file_ids, skill_id, params).await?;
        let mut updated_files = Vec::new();
        let mut failed_files = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(file) => updated_files.push(file),
                Err(e) => failed_files.push(FailedFile {
                    file_id: outcome.file_id,
                    error: e.to_string(),
                }),
            }
        }
        Ok(SkillResult {
            updated_files,
            failed_files,
            session: self.session.snapshot(),
            message: String::new(),
        })
    }

    /// Remove a history entry from a file and return its rebuilt state.
    pub async fn remove_skill(&self, file_id: &str, index: usize) -> Result<WorkingFile, AppError> {
        Ok(self.executor.remove_skill(file_id, index).await?)
    }

    /// All imported files, in import order.
    pub async fn list_files(&self) -> Vec<WorkingFile> {
        self.session.list_files().await
    }

    /// Current session settings.
    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Whether the user granted trust to a skill.
    pub fn get_skill_trust(&self, skill_id: &str) -> Result<bool, AppError> {
        Ok(self.trust_store.query(skill_id)?)
    }

    /// Grant or revoke trust for a skill.
    pub fn set_skill_trust(&self, skill_id: &str, trusted: bool) -> Result<(), AppError> {
        Ok(self.trust_store.update(skill_id, trusted)?)
    }

    /// Switch the session mode by wire name.
    pub fn set_mode(&self, mode: &str) -> Result<SessionSnapshot, AppError> {
        match mode {
            "batch" => self.session.set_mode(Mode::Batch),
            "per_file" => self.session.set_mode(Mode::PerFile),
            other => return Err(AppError::InvalidMode(other.to_string())),
        }
        Ok(self.session.snapshot())
    }

    /// Export files (all of them when `file_ids` is empty) using the naming
    /// pattern, avoiding collisions with a numeric suffix.
    pub async fn export_files(&self, file_ids: &[String]) -> Result<Vec<ExportResult>, AppError> {
        let ids: Vec<String> = if file_ids.is_empty() {
            self.list_files().await.into_iter().map(|f| f.id).collect()
        } else {
            file_ids.to_vec()
        };

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(handle) = self.session.file(&id) else {
                continue;
            };
            let data = handle.lock().await.data();

            let output_folder = {
                let configured = self.session.output_folder();
                if configured.is_empty() {
                    data.original_path
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from("."))
                } else {
                    PathBuf::from(configured)
                }
            };
            let skill_name = data
                .applied_skills
                .last()
                .map_or("atelier", |a| a.skill_id.as_str());
            let base_name = export_name(
                &self.session.naming_pattern(),
                &data.name,
                &data.current_extension,
                skill_name,
            );
            let output_path = resolve_output_path(&output_folder, &base_name);
            copy_file(&data.working_path, &output_path)?;
            debug!(file_id = %id, output = %output_path.display(), "Exported file");
            results.push(ExportResult {
                file_id: id,
                output_path,
            });
        }
        Ok(results)
    }

    /// Clear the session and release its workspace.
    pub fn clear_all(&self) -> Result<(), AppError> {
        Ok(self.session.clear()?)
    }

    async fn execute_meta_skill(
        &self,
        skill_id: &str,
        params: &ParamMap,
        file_ids: &[String],
    ) -> Result<SkillResult, AppError> {
        match skill_id {
            "switch_to_batch" => self.session.set_mode(Mode::Batch),
            "switch_to_per_file" => self.session.set_mode(Mode::PerFile),
            "set_output_folder" => {
                if let Some(folder) = string_param(params, "folder") {
                    self.session.set_output_folder(folder);
                    self.persist_settings();
                }
            }
            "set_naming_pattern" => {
                if let Some(pattern) = string_param(params, "pattern") {
                    self.session.set_naming_pattern(pattern);
                    self.persist_settings();
                }
            }
            "set_accent_color" => {
                if let Some(color) = string_param(params, "color") {
                    self.session.set_accent_color(color);
                    self.persist_settings();
                    return Ok(SkillResult::with_message(
                        self.session.snapshot(),
                        "Accent updated",
                    ));
                }
            }
            "export" => {
                let outputs = self.export_files(file_ids).await?;
                return Ok(SkillResult::with_message(
                    self.session.snapshot(),
                    format!("Exported {} files", outputs.len()),
                ));
            }
            "clear_all" => {
                self.clear_all()?;
                return Ok(SkillResult::with_message(
                    self.session.snapshot(),
                    "Cleared all files",
                ));
            }
            other => return Err(AppError::UnknownMetaSkill(other.to_string())),
        }
        Ok(SkillResult::session_only(self.session.snapshot()))
    }

    /// Snapshot of per-skill usage statistics.
    pub fn usage(&self) -> HashMap<String, atelier_skills::ranker::UsageStats> {
        self.usage_store.all()
    }

    /// Settings persistence is best-effort; the in-memory session is the
    /// source of truth for the run.
    fn persist_settings(&self) {
        let snapshot = self.session.snapshot();
        let result = self.settings_store.save(Settings {
            output_folder: snapshot.output_folder,
            naming_pattern: snapshot.naming_pattern,
            accent_color: snapshot.accent_color,
        });
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist settings");
        }
    }
}

fn string_param(params: &ParamMap, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// First non-existing path for a file name in a folder, suffixing `-N`.
fn resolve_output_path(folder: &Path, filename: &str) -> PathBuf {
    let candidate = folder.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (base, ext) = match filename.rsplit_once('.') {
        Some((base, ext)) => (base.to_string(), format!(".{ext}")),
        None => (filename.to_string(), String::new()),
    };
    for i in 1..1000 {
        let next = folder.join(format!("{base}-{i}{ext}"));
        if !next.exists() {
            return next;
        }
    }
    candidate
}
