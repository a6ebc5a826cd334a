//! Traits for the persistence collaborators the core consumes but does not
//! own. Implementations live in `atelier-storage`; tests substitute
//! in-memory fakes.

use std::collections::HashMap;

use crate::ranker::UsageStats;

/// Usage-statistics store: read by the ranker, bumped by the executor.
pub trait UsageSink: Send + Sync {
    /// Snapshot of all per-skill usage statistics.
    fn all(&self) -> HashMap<String, UsageStats>;

    /// Record one invocation of a skill.
    ///
    /// Persistence failures are the implementation's concern (log and
    /// continue); a failed bump must never fail the skill application it
    /// accounts for.
    fn increment(&self, skill_id: &str);
}

/// User trust decisions for community skills.
pub trait TrustDecisions: Send + Sync {
    /// Whether the user has granted trust to a skill id.
    fn is_trusted(&self, skill_id: &str) -> bool;

    /// Record or revoke a trust grant.
    fn set_trusted(&self, skill_id: &str, trusted: bool);
}
