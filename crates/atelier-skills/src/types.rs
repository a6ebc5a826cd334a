//! Core types for the skills system.
//!
//! All wire types use `camelCase` serde renaming, matching the JSON skill
//! definition format that community packs are authored in.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Resolved parameter values passed to a skill application.
pub type ParamMap = serde_json::Map<String, serde_json::Value>;

/// Where a skill definition was loaded from.
///
/// Ordering is precedence: a higher tier shadows a lower one entirely when
/// the same id appears in both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillSource {
    /// Compiled into the binary with the shipped core set.
    #[default]
    #[serde(rename = "core:embedded")]
    CoreEmbedded,
    /// On-disk core override used during development.
    #[serde(rename = "core:disk")]
    CoreDisk,
    /// User-managed community directory.
    #[serde(rename = "community")]
    Community,
}

impl std::fmt::Display for SkillSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CoreEmbedded => write!(f, "core:embedded"),
            Self::CoreDisk => write!(f, "core:disk"),
            Self::Community => write!(f, "community"),
        }
    }
}

/// One step of a pipeline executor: a skill reference plus param overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStep {
    /// Id of the skill this step applies.
    pub skill_id: String,
    /// Overrides merged over the pipeline invocation's own params
    /// (step wins on key collision).
    #[serde(default)]
    pub params: ParamMap,
}

/// How a skill executes, as declared in its definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ExecutorSpec {
    /// Opaque handler name resolved by the skill's driver.
    Native {
        /// Handler id the driver dispatches on.
        handler: String,
    },
    /// External process with argument templates.
    Cli {
        /// Command name or path.
        command: String,
        /// Argument templates; `{{input}}`, `{{output}}` and `{{<param>}}`
        /// placeholders are rendered at invocation time.
        #[serde(default)]
        args: Vec<String>,
        /// Forced output extension (normalized to a leading dot, lower-cased).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_extension: Option<String>,
        /// Per-invocation timeout; the child is killed when it elapses.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Ordered list of steps referencing other skills by id.
    Pipeline {
        /// Steps, applied in order; each threads its output to the next.
        steps: Vec<PipelineStep>,
    },
    /// Not file-oriented; handled entirely by the host application.
    #[default]
    Meta,
}

impl ExecutorSpec {
    /// Lower-case tag of the variant, as used for driver inference.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Native { .. } => "native",
            Self::Cli { .. } => "cli",
            Self::Pipeline { .. } => "pipeline",
            Self::Meta => "meta",
        }
    }
}

/// Declared parameter of a skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDef {
    /// Parameter name as referenced in templates and param maps.
    pub name: String,
    /// Value type tag (`number`, `text`, `select`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable label.
    #[serde(default)]
    pub label: String,
    /// Default value when the caller omits the parameter.
    #[serde(default)]
    pub default: serde_json::Value,
    /// Suggested preset values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<serde_json::Value>,
    /// Allowed values for `select` parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Lower bound for numeric parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for numeric parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Display unit (`%`, `px`, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
}

/// A loaded skill definition, immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Definition version string.
    #[serde(default)]
    pub version: String,
    /// Author attribution.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    /// Globally unique id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Alternative names matched during search.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Category tag (`convert`, `transform`, `compress`, `filter`, `meta`).
    #[serde(default)]
    pub category: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Accepted input extensions; `"*"` accepts anything.
    #[serde(default)]
    pub input_types: Vec<String>,
    /// Produced extension; empty or `"none"` leaves the extension unchanged.
    #[serde(default)]
    pub output_type: String,
    /// Declared parameters.
    #[serde(default)]
    pub params: Vec<ParamDef>,
    /// Driver tag this skill dispatches to.
    #[serde(default)]
    pub driver: String,
    /// Whether the skill is host-application-only.
    #[serde(default)]
    pub is_meta: bool,
    /// Execution descriptor.
    #[serde(default)]
    pub executor: ExecutorSpec,
    /// Declared capability strings, de-duplicated and sorted after load.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Author-declared danger level, for display purposes.
    #[serde(default)]
    pub danger_level: u8,

    /// Source tier — runtime metadata, not part of the JSON schema.
    #[serde(skip)]
    pub source: SkillSource,
    /// On-disk definition path, when loaded from disk.
    #[serde(skip)]
    pub definition_path: Option<PathBuf>,
}
