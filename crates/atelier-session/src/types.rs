//! Session wire types.
//!
//! All types use `camelCase` serde renaming for host-application
//! compatibility.

use std::path::PathBuf;

use atelier_skills::types::ParamMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// How skill applications target the imported file set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Apply to every imported file at once.
    #[default]
    Batch,
    /// Apply to one file at a time.
    PerFile,
}

/// One entry of a file's applied-skill history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedSkill {
    /// Id of the applied skill.
    pub skill_id: String,
    /// Resolved parameters the skill was applied with.
    pub params: ParamMap,
    /// RFC 3339 timestamp of the application.
    pub applied_at: String,
}

impl AppliedSkill {
    /// New entry stamped with the current time.
    pub fn new(skill_id: impl Into<String>, params: ParamMap) -> Self {
        Self {
            skill_id: skill_id.into(),
            params,
            applied_at: Utc::now().to_rfc3339(),
        }
    }
}

/// The externally visible state of one imported file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingFile {
    /// Generated unique id.
    pub id: String,
    /// Display name (original file name without extension).
    pub name: String,
    /// Extension the file was imported with, including the leading dot.
    pub extension: String,
    /// Current extension; may change after transformations.
    pub current_extension: String,
    /// Original source path; read-only, never mutated.
    pub original_path: PathBuf,
    /// Current materialized path inside the workspace.
    pub working_path: PathBuf,
    /// Current byte size.
    pub size: u64,
    /// Best-effort preview as a data URL (empty when unavailable).
    pub preview_data_url: String,
    /// Ordered applied-skill history; entry `i` was applied to the state
    /// produced by entries `0..i`.
    pub applied_skills: Vec<AppliedSkill>,
}

/// Session-level settings surfaced to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    /// Targeting mode.
    pub mode: Mode,
    /// Export destination; empty means "next to the original".
    pub output_folder: String,
    /// Export file-name template.
    pub naming_pattern: String,
    /// Interface accent color as `r,g,b`.
    pub accent_color: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Batch,
            output_folder: String::new(),
            naming_pattern: DEFAULT_NAMING_PATTERN.to_string(),
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

/// Default export file-name template.
pub const DEFAULT_NAMING_PATTERN: &str = "{name}_{skill}.{ext}";
/// Default accent color.
pub const DEFAULT_ACCENT_COLOR: &str = "99,102,241";

/// A point-in-time view of the session settings.
pub type SessionSnapshot = SessionSettings;

/// Result of exporting one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    /// Id of the exported file.
    pub file_id: String,
    /// Where the export was written.
    pub output_path: PathBuf,
}

/// Expand an export naming pattern.
///
/// `{name}`, `{ext}` (without dot) and `{skill}` are substituted; the skill
/// name is sanitized for file systems. When the result carries no extension
/// at all, the current one is appended.
pub fn export_name(pattern: &str, name: &str, ext: &str, skill: &str) -> String {
    let pattern = if pattern.trim().is_empty() {
        DEFAULT_NAMING_PATTERN
    } else {
        pattern
    };
    let sanitized_skill = skill.replace([' ', '-'], "_");
    let bare_ext = ext.trim_start_matches('.');
    let out = pattern
        .replace("{name}", name)
        .replace("{ext}", bare_ext)
        .replace("{skill}", &sanitized_skill);
    if out.contains('.') {
        out
    } else {
        format!("{out}.{bare_ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_name_substitution() {
        assert_eq!(
            export_name("{name}_{skill}.{ext}", "photo", ".jpg", "Resize"),
            "photo_Resize.jpg"
        );
    }

    #[test]
    fn test_export_name_sanitizes_skill() {
        assert_eq!(
            export_name("{name}-{skill}.{ext}", "a", ".png", "convert to png"),
            "a-convert_to_png.png"
        );
    }

    #[test]
    fn test_export_name_appends_missing_extension() {
        assert_eq!(export_name("{name}_{skill}", "a", ".png", "blur"), "a_blur.png");
    }

    #[test]
    fn test_export_name_empty_pattern_uses_default() {
        assert_eq!(export_name("  ", "a", ".png", "blur"), "a_blur.png");
    }

    #[test]
    fn test_working_file_serializes_camel_case() {
        let wf = WorkingFile {
            id: "i".into(),
            name: "n".into(),
            extension: ".png".into(),
            current_extension: ".png".into(),
            original_path: PathBuf::from("/src/n.png"),
            working_path: PathBuf::from("/ws/i/current.png"),
            size: 1,
            preview_data_url: String::new(),
            applied_skills: vec![],
        };
        let json = serde_json::to_value(&wf).unwrap();
        assert!(json.get("currentExtension").is_some());
        assert!(json.get("appliedSkills").is_some());
        assert!(json.get("previewDataUrl").is_some());
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Mode::PerFile).unwrap(), r#""per_file""#);
        assert_eq!(serde_json::to_string(&Mode::Batch).unwrap(), r#""batch""#);
    }
}
