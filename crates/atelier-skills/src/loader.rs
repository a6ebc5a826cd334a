//! Multi-tier skill discovery and the swappable registry snapshot.
//!
//! Tiers load in precedence order (`embedded < disk core < community`); a
//! later tier replaces an earlier definition with the same id entirely — no
//! field-level merge. Per-file failures are collected into a load report and
//! never abort the load. The merged map is published atomically, so readers
//! never observe a half-built registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::constants::{METADATA_PREFIX, RESERVED_FILENAMES};
use crate::errors::DefinitionError;
use crate::types::{Skill, SkillSource};

/// Source tier configuration for a [`Loader`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Compiled-in definitions as `(name, json)` pairs.
    pub embedded: &'static [(&'static str, &'static str)],
    /// Optional on-disk core override, hot-reloadable during development.
    pub disk_core_root: Option<PathBuf>,
    /// User-managed community skill directory.
    pub community_root: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            embedded: crate::embedded::CORE_SKILLS,
            disk_core_root: None,
            community_root: None,
        }
    }
}

/// Loads skill definitions from all tiers and owns the current snapshot.
pub struct Loader {
    opts: LoadOptions,
    skills: RwLock<Arc<HashMap<String, Skill>>>,
    report: Mutex<Vec<DefinitionError>>,
    changed: Notify,
}

impl Loader {
    /// Create a loader with an empty snapshot; call [`load_all`](Self::load_all)
    /// to populate it.
    pub fn new(opts: LoadOptions) -> Self {
        Self {
            opts,
            skills: RwLock::new(Arc::new(HashMap::new())),
            report: Mutex::new(Vec::new()),
            changed: Notify::new(),
        }
    }

    /// Load every tier, merge with precedence, and publish the new snapshot.
    ///
    /// Returns the definition errors collected along the way (also kept for
    /// [`last_report`](Self::last_report)). A single malformed definition
    /// never takes down the load.
    pub fn load_all(&self) -> Vec<DefinitionError> {
        let mut merged: HashMap<String, Skill> = HashMap::new();
        let mut issues = Vec::new();

        for (name, json) in self.opts.embedded {
            if !is_skill_json_filename(file_name(name)) {
                continue;
            }
            match parse_definition(json, SkillSource::CoreEmbedded, None) {
                Ok(skill) => {
                    let _ = merged.insert(skill.id.clone(), skill);
                }
                Err(message) => issues.push(DefinitionError {
                    path: (*name).to_string(),
                    message,
                }),
            }
        }

        if let Some(root) = &self.opts.disk_core_root {
            if root.is_dir() {
                self.collect_from_disk(root, SkillSource::CoreDisk, &mut merged, &mut issues);
            }
        }

        if let Some(root) = &self.opts.community_root {
            if root.is_dir() {
                self.collect_from_disk(root, SkillSource::Community, &mut merged, &mut issues);
            }
        }

        for issue in &issues {
            warn!(path = %issue.path, message = %issue.message, "Skipping skill definition");
        }
        debug!(count = merged.len(), issues = issues.len(), "Skill load complete");

        *self.skills.write() = Arc::new(merged);
        *self.report.lock() = issues.clone();

        // At most one pending permit: a burst of loads with no consumer in
        // between is observed as a single change.
        self.changed.notify_one();

        issues
    }

    fn collect_from_disk(
        &self,
        root: &Path,
        source: SkillSource,
        merged: &mut HashMap<String, Skill>,
        issues: &mut Vec<DefinitionError>,
    ) {
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    issues.push(DefinitionError {
                        path: root.display().to_string(),
                        message: format!("walk failed: {e}"),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !is_skill_json_filename(name) {
                continue;
            }
            let path = entry.path();
            let json = match std::fs::read_to_string(path) {
                Ok(json) => json,
                Err(e) => {
                    issues.push(DefinitionError {
                        path: path.display().to_string(),
                        message: format!("read failed: {e}"),
                    });
                    continue;
                }
            };
            match parse_definition(&json, source, Some(path.to_path_buf())) {
                Ok(skill) => {
                    debug!(id = %skill.id, source = %source, path = %path.display(), "Loaded skill");
                    let _ = merged.insert(skill.id.clone(), skill);
                }
                Err(message) => issues.push(DefinitionError {
                    path: path.display().to_string(),
                    message,
                }),
            }
        }
    }

    /// Look up a skill by id in the current snapshot.
    pub fn get_by_id(&self, id: &str) -> Option<Skill> {
        self.skills.read().get(id).cloned()
    }

    /// All skills in the current snapshot, sorted by name.
    pub fn list(&self) -> Vec<Skill> {
        let mut skills: Vec<Skill> = self.skills.read().values().cloned().collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    /// The current snapshot as a shared map (stable for the holder's
    /// lifetime even across reloads).
    pub fn snapshot(&self) -> Arc<HashMap<String, Skill>> {
        Arc::clone(&self.skills.read())
    }

    /// Definition errors from the most recent load.
    pub fn last_report(&self) -> Vec<DefinitionError> {
        self.report.lock().clone()
    }

    /// Wait for the next (coalesced) snapshot change.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }

    /// On-disk roots the watcher should observe. The community root is
    /// created if missing so new installs hot-reload from the start.
    pub(crate) fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(root) = &self.opts.disk_core_root {
            if root.is_dir() {
                roots.push(root.clone());
            }
        }
        if let Some(root) = &self.opts.community_root {
            if std::fs::create_dir_all(root).is_ok() {
                roots.push(root.clone());
            }
        }
        roots
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether a file name is eligible as a skill definition: `*.json`, not a
/// dotfile, not a reserved pack manifest, not `_`-prefixed metadata.
pub fn is_skill_json_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    if !lower.ends_with(".json") || lower.starts_with('.') {
        return false;
    }
    if RESERVED_FILENAMES.contains(&lower.as_str()) {
        return false;
    }
    !lower.starts_with(METADATA_PREFIX)
}

/// Whether a path should trigger a reload when it changes on disk.
pub(crate) fn is_watchable_json(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_lowercase();
    lower.ends_with(".json") && !lower.starts_with('.')
}

fn parse_definition(
    json: &str,
    source: SkillSource,
    definition_path: Option<PathBuf>,
) -> Result<Skill, String> {
    let mut skill: Skill = serde_json::from_str(json).map_err(|e| format!("parse failed: {e}"))?;
    skill.source = source;
    skill.definition_path = definition_path;
    normalize_skill(skill)
}

/// Validate required fields, infer a missing driver tag from the executor
/// type, and normalize the permission set.
pub fn normalize_skill(mut skill: Skill) -> Result<Skill, String> {
    if skill.id.trim().is_empty() {
        return Err("missing id".to_string());
    }
    if skill.name.trim().is_empty() {
        return Err("missing name".to_string());
    }
    if skill.version.trim().is_empty() {
        return Err("missing version".to_string());
    }
    if skill.driver.is_empty() {
        skill.driver = match skill.executor.kind() {
            "cli" => "cli".to_string(),
            "pipeline" => "pipeline".to_string(),
            _ => "meta".to_string(),
        };
    }
    skill.permissions = crate::permissions::normalize_permissions(&skill.permissions);
    Ok(skill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_skill(dir: &Path, file: &str, id: &str, name: &str) {
        let json = format!(r#"{{"id":"{id}","name":"{name}","version":"1.0.0"}}"#);
        fs::write(dir.join(file), json).unwrap();
    }

    #[test]
    fn test_filename_rules() {
        assert!(is_skill_json_filename("resize.json"));
        assert!(is_skill_json_filename("RESIZE.JSON"));
        assert!(!is_skill_json_filename("resize.yaml"));
        assert!(!is_skill_json_filename(".hidden.json"));
        assert!(!is_skill_json_filename("manifest.json"));
        assert!(!is_skill_json_filename("pack.json"));
        assert!(!is_skill_json_filename("_meta.json"));
    }

    #[test]
    fn test_load_from_disk_tier() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "a.json", "a", "Alpha");
        write_skill(tmp.path(), "b.json", "b", "Beta");

        let loader = Loader::new(LoadOptions {
            embedded: &[],
            disk_core_root: None,
            community_root: Some(tmp.path().to_path_buf()),
        });
        let issues = loader.load_all();
        assert!(issues.is_empty());
        assert_eq!(loader.list().len(), 2);
        assert_eq!(loader.get_by_id("a").unwrap().source, SkillSource::Community);
    }

    #[test]
    fn test_nested_directories_are_walked() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("pack").join("deep");
        fs::create_dir_all(&nested).unwrap();
        write_skill(&nested, "deep.json", "deep", "Deep");

        let loader = Loader::new(LoadOptions {
            embedded: &[],
            disk_core_root: None,
            community_root: Some(tmp.path().to_path_buf()),
        });
        let _ = loader.load_all();
        assert!(loader.get_by_id("deep").is_some());
    }

    #[test]
    fn test_excluded_files_skipped() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "manifest.json", "manifest", "Manifest");
        write_skill(tmp.path(), "_notes.json", "notes", "Notes");
        write_skill(tmp.path(), "keep.json", "keep", "Keep");

        let loader = Loader::new(LoadOptions {
            embedded: &[],
            disk_core_root: None,
            community_root: Some(tmp.path().to_path_buf()),
        });
        let issues = loader.load_all();
        assert!(issues.is_empty());
        assert_eq!(loader.list().len(), 1);
        assert!(loader.get_by_id("keep").is_some());
    }

    #[test]
    fn test_malformed_definition_is_collected_not_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.json"), "{not json").unwrap();
        fs::write(tmp.path().join("incomplete.json"), r#"{"id":"x","name":"X"}"#).unwrap();
        write_skill(tmp.path(), "good.json", "good", "Good");

        let loader = Loader::new(LoadOptions {
            embedded: &[],
            disk_core_root: None,
            community_root: Some(tmp.path().to_path_buf()),
        });
        let issues = loader.load_all();
        assert_eq!(issues.len(), 2);
        assert_eq!(loader.list().len(), 1);
        assert_eq!(loader.last_report().len(), 2);
        assert!(issues.iter().any(|i| i.message.contains("missing version")));
    }

    #[test]
    fn test_community_tier_wins_entirely() {
        static EMBEDDED: &[(&str, &str)] = &[(
            "core/dup.json",
            r#"{"id":"dup","name":"Core Name","version":"1.0.0","description":"core"}"#,
        )];
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("dup.json"),
            r#"{"id":"dup","name":"Community Name","version":"2.0.0","description":"community"}"#,
        )
        .unwrap();

        let loader = Loader::new(LoadOptions {
            embedded: EMBEDDED,
            disk_core_root: None,
            community_root: Some(tmp.path().to_path_buf()),
        });
        let _ = loader.load_all();

        let skill = loader.get_by_id("dup").unwrap();
        // No field-level merge: the community definition replaces the
        // embedded one entirely.
        assert_eq!(skill.name, "Community Name");
        assert_eq!(skill.version, "2.0.0");
        assert_eq!(skill.description, "community");
        assert_eq!(skill.source, SkillSource::Community);
    }

    #[test]
    fn test_driver_inference() {
        let cli = r#"{"id":"c","name":"C","version":"1","executor":{"type":"cli","command":"x"}}"#;
        let skill = parse_definition(cli, SkillSource::CoreEmbedded, None).unwrap();
        assert_eq!(skill.driver, "cli");

        let pipe = r#"{"id":"p","name":"P","version":"1","executor":{"type":"pipeline","steps":[]}}"#;
        let skill = parse_definition(pipe, SkillSource::CoreEmbedded, None).unwrap();
        assert_eq!(skill.driver, "pipeline");

        let bare = r#"{"id":"m","name":"M","version":"1"}"#;
        let skill = parse_definition(bare, SkillSource::CoreEmbedded, None).unwrap();
        assert_eq!(skill.driver, "meta");

        let explicit =
            r#"{"id":"n","name":"N","version":"1","driver":"image","executor":{"type":"native","handler":"n"}}"#;
        let skill = parse_definition(explicit, SkillSource::CoreEmbedded, None).unwrap();
        assert_eq!(skill.driver, "image");
    }

    #[test]
    fn test_permissions_normalized_on_load() {
        let json = r#"{"id":"s","name":"S","version":"1","permissions":["network","files.read","network",""]}"#;
        let skill = parse_definition(json, SkillSource::CoreEmbedded, None).unwrap();
        assert_eq!(skill.permissions, vec!["files.read", "network"]);
    }

    #[tokio::test]
    async fn test_change_notification_coalesced() {
        let loader = Loader::new(LoadOptions {
            embedded: &[],
            disk_core_root: None,
            community_root: None,
        });
        // Two loads with no consumer in between leave one pending permit.
        let _ = loader.load_all();
        let _ = loader.load_all();

        loader.changed().await;
        let second = tokio::time::timeout(Duration::from_millis(50), loader.changed()).await;
        assert!(second.is_err(), "second notification should not be pending");
    }

    #[tokio::test]
    async fn test_snapshot_stable_across_reload() {
        let tmp = TempDir::new().unwrap();
        write_skill(tmp.path(), "a.json", "a", "Alpha");
        let loader = Loader::new(LoadOptions {
            embedded: &[],
            disk_core_root: None,
            community_root: Some(tmp.path().to_path_buf()),
        });
        let _ = loader.load_all();

        let before = loader.snapshot();
        fs::remove_file(tmp.path().join("a.json")).unwrap();
        let _ = loader.load_all();

        // The held snapshot still sees the old world; fresh reads see the new.
        assert!(before.contains_key("a"));
        assert!(loader.get_by_id("a").is_none());
    }
}
