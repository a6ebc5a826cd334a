//! Capability classification for skill permissions.
//!
//! Permission strings are part of the skill JSON format and stay strings so
//! skills can be authored without recompiling. Each known capability is
//! statically classified *base* (implicitly granted to any skill) or
//! *elevated* (requires an explicit user trust decision when the skill comes
//! from the community tier).

use std::collections::BTreeSet;

use crate::types::{Skill, SkillSource};

/// Read input files.
pub const PERM_FILES_READ: &str = "files.read";
/// Write output files.
pub const PERM_FILES_WRITE: &str = "files.write";
/// Create temp files.
pub const PERM_FILES_TEMP: &str = "files.temp";
/// Access paths outside input/output/temp.
pub const PERM_FILES_ANYWHERE: &str = "files.anywhere";
/// Network access.
pub const PERM_NETWORK: &str = "network";
/// Run managed tools (ffmpeg, magick, ...).
pub const PERM_TOOLS_EXEC: &str = "tools.exec";
/// Run arbitrary executables.
pub const PERM_TOOLS_EXEC_ANY: &str = "tools.exec.any";
/// System/environment access.
pub const PERM_SYSTEM: &str = "system";

/// Whether a capability is implicitly granted to any skill.
pub fn is_base_permission(perm: &str) -> bool {
    matches!(
        perm,
        PERM_FILES_READ | PERM_FILES_WRITE | PERM_FILES_TEMP | PERM_TOOLS_EXEC
    )
}

/// Whether a capability requires an explicit trust grant for community skills.
pub fn is_elevated_permission(perm: &str) -> bool {
    matches!(
        perm,
        PERM_FILES_ANYWHERE | PERM_NETWORK | PERM_TOOLS_EXEC_ANY | PERM_SYSTEM
    )
}

/// De-duplicate and sort a declared permission set, dropping empty entries.
pub fn normalize_permissions(perms: &[String]) -> Vec<String> {
    perms
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The elevated subset of a declared permission set, normalized.
pub fn elevated_permissions(perms: &[String]) -> Vec<String> {
    normalize_permissions(perms)
        .into_iter()
        .filter(|p| is_elevated_permission(p))
        .collect()
}

impl Skill {
    /// Whether applying this skill requires an explicit trust grant.
    ///
    /// True iff the skill declares at least one elevated capability. Note
    /// that trust is a property of provenance: callers gate on this only for
    /// [`SkillSource::Community`] skills — core skills are implicitly
    /// trusted regardless of what they declare.
    pub fn requires_trust(&self) -> bool {
        !elevated_permissions(&self.permissions).is_empty()
    }

    /// Whether this skill is subject to the trust gate at all.
    pub fn is_trust_gated(&self) -> bool {
        self.source == SkillSource::Community && self.requires_trust()
    }
}
