//! Skill application and history rebuilds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use atelier_drivers::cli::CliDriver;
use atelier_drivers::imaging::ImageDriver;
use atelier_drivers::{Driver, preview};
use atelier_session::{AppliedSkill, FileState, Session, WorkingFile};
use atelier_skills::permissions::elevated_permissions;
use atelier_skills::registry::Registry;
use atelier_skills::stores::{TrustDecisions, UsageSink};
use atelier_skills::types::{ExecutorSpec, ParamMap, Skill};

use crate::errors::ExecuteError;
use crate::outcome::ApplyOutcome;

/// Nesting bound for pipeline skills. Skill graphs are user-authored and
/// unvalidated for cycles; this cuts off runaway nesting that the explicit
/// cycle check cannot see.
pub const MAX_PIPELINE_DEPTH: usize = 6;

/// Preview thumbnail width.
const PREVIEW_WIDTH: u32 = 520;

/// Applies skills to session files and rebuilds histories after edits.
pub struct Executor {
    registry: Arc<Registry>,
    session: Arc<Session>,
    drivers: HashMap<String, Arc<dyn Driver>>,
    usage: Arc<dyn UsageSink>,
    trust: Arc<dyn TrustDecisions>,
}

impl Executor {
    /// Executor with the statically registered driver set (`image`, `cli`).
    pub fn new(
        registry: Arc<Registry>,
        session: Arc<Session>,
        usage: Arc<dyn UsageSink>,
        trust: Arc<dyn TrustDecisions>,
    ) -> Self {
        Self::with_drivers(
            registry,
            session,
            usage,
            trust,
            vec![Arc::new(ImageDriver), Arc::new(CliDriver::default())],
        )
    }

    /// Executor with an explicit driver set, keyed by each driver's tag.
    pub fn with_drivers(
        registry: Arc<Registry>,
        session: Arc<Session>,
        usage: Arc<dyn UsageSink>,
        trust: Arc<dyn TrustDecisions>,
        drivers: Vec<Arc<dyn Driver>>,
    ) -> Self {
        let drivers = drivers.into_iter().map(|d| (d.id().to_string(), d)).collect();
        Self {
            registry,
            session,
            drivers,
            usage,
            trust,
        }
    }

    /// The session this executor operates on.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Apply a skill to a set of files, one concurrent task per file.
    ///
    /// The skill is resolved and authorized once, before any file I/O: a
    /// community skill declaring elevated capabilities fails here unless the
    /// user granted trust. Per-file results are reported individually, in
    /// input order — a failed file does not discard siblings that already
    /// succeeded. The per-skill usage counter is bumped once per call when
    /// at least one file succeeded.
    pub async fn apply_skill(
        self: &Arc<Self>,
        file_ids: &[String],
        skill_id: &str,
        params: &ParamMap,
    ) -> Result<Vec<ApplyOutcome>, ExecuteError> {
        let skill = self
            .registry
            .get_by_id(skill_id)
            .ok_or_else(|| ExecuteError::UnknownSkill(skill_id.to_string()))?;
        if skill.is_meta {
            return Err(ExecuteError::MetaNotExecutable(skill.id));
        }
        if skill.is_trust_gated() && !self.trust.is_trusted(&skill.id) {
            return Err(ExecuteError::TrustRequired {
                skill_id: skill.id.clone(),
                elevated: elevated_permissions(&skill.permissions),
            });
        }
        // Early failure: resolve the concrete driver up front when the skill
        // is not a pipeline.
        if !matches!(skill.executor, ExecutorSpec::Pipeline { .. }) {
            let _ = self.resolve_driver(&skill)?;
        }

        let tasks = file_ids.iter().map(|file_id| {
            let executor = Arc::clone(self);
            let skill = skill.clone();
            let params = params.clone();
            let file_id = file_id.clone();
            tokio::spawn(async move {
                let result = executor.apply_to_file(&file_id, &skill, &params).await;
                ApplyOutcome { file_id, result }
            })
        });

        let outcomes: Vec<ApplyOutcome> = join_all(tasks)
            .await
            .into_iter()
            .zip(file_ids)
            .map(|(joined, file_id)| {
                joined.unwrap_or_else(|e| ApplyOutcome {
                    file_id: file_id.clone(),
                    result: Err(ExecuteError::TaskFailed(e.to_string())),
                })
            })
            .collect();

        if outcomes.iter().any(|o| o.result.is_ok()) {
            self.usage.increment(skill_id);
        }
        Ok(outcomes)
    }

    /// Remove one history entry and rebuild the file's derived state by
    /// replaying the edited history from the divergence point.
    ///
    /// The new seed is the immutable base for `index == 0`, else the
    /// snapshot of the now-prior entry. A replay failure leaves the file
    /// valid up to the last successfully replayed step, with the history
    /// already truncated to the edit.
    pub async fn remove_skill(
        &self,
        file_id: &str,
        index: usize,
    ) -> Result<WorkingFile, ExecuteError> {
        let handle = self
            .session
            .file(file_id)
            .ok_or_else(|| ExecuteError::FileNotFound(file_id.to_string()))?;
        let mut state = handle.lock().await;

        let len = state.applied_skills().len();
        if index >= len {
            return Err(ExecuteError::InvalidHistoryIndex { index, len });
        }
        let mut updated = state.applied_skills().to_vec();
        let removed = updated.remove(index);
        state.replace_applied(updated);
        debug!(file_id, index, skill = %removed.skill_id, "Removed history entry");

        self.rebuild_from(&mut state, index).await?;
        Ok(state.data())
    }

    async fn apply_to_file(
        &self,
        file_id: &str,
        skill: &Skill,
        params: &ParamMap,
    ) -> Result<WorkingFile, ExecuteError> {
        let handle = self
            .session
            .file(file_id)
            .ok_or_else(|| ExecuteError::FileNotFound(file_id.to_string()))?;
        let mut state = handle.lock().await;

        let input = state.working_path().to_path_buf();
        let input_ext = state.current_extension().to_string();
        let file_dir = state.file_dir().to_path_buf();

        let mut visited = Vec::new();
        let (out_path, out_ext) = self
            .execute_to_output(&input, &input_ext, &file_dir, skill, params, 0, &mut visited)
            .await?;

        let size = tokio::fs::metadata(&out_path).await?.len();
        state.set_current(out_path.clone(), out_ext.clone(), size);

        let snapshot_index = state.applied_skills().len();
        let snapshot_path = self
            .session
            .workspace()
            .snapshot_path(state.id(), snapshot_index, &out_ext);
        let _ = tokio::fs::copy(&out_path, &snapshot_path).await?;
        state.set_snapshot(snapshot_index, snapshot_path);

        state.append_applied(AppliedSkill::new(&skill.id, params.clone()));
        refresh_preview(&mut state);
        Ok(state.data())
    }

    async fn rebuild_from(
        &self,
        state: &mut FileState,
        start_index: usize,
    ) -> Result<(), ExecuteError> {
        let file_dir = state.file_dir().to_path_buf();
        let applied = state.applied_skills().to_vec();

        let seed = if start_index == 0 {
            state.base_path().to_path_buf()
        } else {
            state
                .snapshot_at(start_index - 1)
                .map_or_else(|| state.base_path().to_path_buf(), Path::to_path_buf)
        };

        let ext = ext_of(&seed);
        let current = file_dir.join(format!("current{ext}"));
        let _ = tokio::fs::copy(&seed, &current).await?;
        let size = tokio::fs::metadata(&current).await?.len();
        state.set_current(current, ext, size);
        state.truncate_snapshots(start_index);

        for (i, entry) in applied.iter().enumerate().skip(start_index) {
            let skill = self
                .registry
                .get_by_id(&entry.skill_id)
                .ok_or_else(|| ExecuteError::UnknownSkill(entry.skill_id.clone()))?;

            let input = state.working_path().to_path_buf();
            let input_ext = state.current_extension().to_string();
            let mut visited = Vec::new();
            let (out_path, out_ext) = self
                .execute_to_output(&input, &input_ext, &file_dir, &skill, &entry.params, 0, &mut visited)
                .await?;

            let size = tokio::fs::metadata(&out_path).await?.len();
            state.set_current(out_path.clone(), out_ext.clone(), size);

            let snapshot_path = self.session.workspace().snapshot_path(state.id(), i, &out_ext);
            let _ = tokio::fs::copy(&out_path, &snapshot_path).await?;
            state.set_snapshot(i, snapshot_path);
        }

        refresh_preview(state);
        Ok(())
    }

    /// Resolve a skill to backend invocations and run them against `input`,
    /// returning the final output path and extension.
    ///
    /// Pipelines thread the evolving output into the next step; `visited`
    /// tracks pipeline ids on the call stack to fail cycles fast.
    async fn execute_to_output(
        &self,
        input: &Path,
        input_ext: &str,
        file_dir: &Path,
        skill: &Skill,
        params: &ParamMap,
        depth: usize,
        visited: &mut Vec<String>,
    ) -> Result<(PathBuf, String), ExecuteError> {
        if skill.is_meta {
            return Err(ExecuteError::MetaNotExecutable(skill.id.clone()));
        }

        if let ExecutorSpec::Pipeline { steps } = &skill.executor {
            if depth > MAX_PIPELINE_DEPTH {
                return Err(ExecuteError::PipelineDepthExceeded {
                    skill_id: skill.id.clone(),
                    bound: MAX_PIPELINE_DEPTH,
                });
            }
            if visited.iter().any(|id| id == &skill.id) {
                return Err(ExecuteError::PipelineCycle {
                    skill_id: skill.id.clone(),
                });
            }
            visited.push(skill.id.clone());

            let mut current = input.to_path_buf();
            let mut current_ext = input_ext.to_string();
            for step in steps {
                let step_skill = self
                    .registry
                    .get_by_id(&step.skill_id)
                    .ok_or_else(|| ExecuteError::UnknownSkill(step.skill_id.clone()))?;
                if step_skill.is_meta {
                    return Err(ExecuteError::MetaNotExecutable(step.skill_id.clone()));
                }
                let merged = merge_params(params, &step.params);
                (current, current_ext) = Box::pin(self.execute_to_output(
                    &current,
                    &current_ext,
                    file_dir,
                    &step_skill,
                    &merged,
                    depth + 1,
                    visited,
                ))
                .await?;
            }

            let _ = visited.pop();
            return Ok((current, current_ext));
        }

        let driver = self.resolve_driver(skill)?;
        let output_ext = effective_output_ext(skill, input_ext);
        let output = file_dir.join(format!("current{output_ext}"));
        driver
            .execute(input, &output, skill, params, None)
            .await
            .map_err(ExecuteError::Driver)?;
        Ok((output, output_ext))
    }

    fn resolve_driver(&self, skill: &Skill) -> Result<Arc<dyn Driver>, ExecuteError> {
        let mut tag = skill.driver.as_str();
        if tag.is_empty() && matches!(skill.executor, ExecutorSpec::Cli { .. }) {
            tag = "cli";
        }
        self.drivers
            .get(tag)
            .cloned()
            .ok_or_else(|| ExecuteError::DriverMissing(tag.to_string()))
    }
}

/// Merge pipeline params under step overrides; the step wins on collision.
fn merge_params(base: &ParamMap, overrides: &ParamMap) -> ParamMap {
    let mut merged = base.clone();
    for (key, value) in overrides {
        let _ = merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Output extension for one backend invocation: the skill's declared output
/// type wins, else a cli executor's forced extension (dot-normalized,
/// lower-cased), else the extension is unchanged.
fn effective_output_ext(skill: &Skill, current_ext: &str) -> String {
    if !skill.output_type.is_empty() && skill.output_type != "none" {
        return skill.output_type.clone();
    }
    if let ExecutorSpec::Cli {
        output_extension: Some(ext),
        ..
    } = &skill.executor
    {
        let ext = ext.trim();
        if !ext.is_empty() {
            let dotted = if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{ext}")
            };
            return dotted.to_lowercase();
        }
    }
    current_ext.to_string()
}

fn ext_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Previews are best-effort: failures keep the old preview.
fn refresh_preview(state: &mut FileState) {
    let path = state.working_path().to_path_buf();
    match preview::image_preview(&path, PREVIEW_WIDTH) {
        Ok(url) => state.set_preview(url),
        Err(e) => debug!(path = %path.display(), error = %e, "Preview generation skipped"),
    }
}
