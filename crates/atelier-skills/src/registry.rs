//! Registry façade: loader plus ranker, with fuzzy search.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::errors::SkillError;
use crate::loader::{LoadOptions, Loader};
use crate::ranker::{Ranker, UsageStats, input_matches, levenshtein};
use crate::types::Skill;
use crate::watch;

/// Read-mostly skill registry with hot reload and ranked search.
pub struct Registry {
    loader: Arc<Loader>,
    ranker: Ranker,
}

impl Registry {
    /// Build a registry and perform the initial load.
    pub fn new(opts: LoadOptions) -> Self {
        let loader = Arc::new(Loader::new(opts));
        let issues = loader.load_all();
        if !issues.is_empty() {
            warn!(count = issues.len(), "Some skill definitions failed to load");
        }
        Self {
            loader,
            ranker: Ranker::default(),
        }
    }

    /// All loaded skills, sorted by name.
    pub fn list(&self) -> Vec<Skill> {
        self.loader.list()
    }

    /// Look up a skill by id.
    pub fn get_by_id(&self, id: &str) -> Option<Skill> {
        self.loader.get_by_id(id)
    }

    /// The current snapshot as a shared map, stable across reloads for the
    /// holder's lifetime.
    pub fn snapshot(&self) -> Arc<HashMap<String, Skill>> {
        self.loader.snapshot()
    }

    /// Start hot reloading the on-disk tiers for the process lifetime.
    pub fn start_hot_reload(&self) -> Result<JoinHandle<()>, SkillError> {
        watch::spawn_watcher(Arc::clone(&self.loader))
    }

    /// Wait for the next (coalesced) registry change.
    pub async fn changed(&self) {
        self.loader.changed().await;
    }

    /// Search the registry.
    ///
    /// An empty query returns every skill passing the input-type predicate
    /// (meta skills and type-agnostic callers always pass), ranked. A
    /// non-empty query first filters by a looser text match, then ranks the
    /// survivors.
    pub fn search(
        &self,
        query: &str,
        input_types: &[String],
        usage: &HashMap<String, UsageStats>,
    ) -> Vec<Skill> {
        let candidates = self.list();
        let trimmed = query.trim();

        let compatible = |skill: &Skill| {
            skill.is_meta || input_matches(skill, input_types) || input_types.is_empty()
        };

        if trimmed.is_empty() {
            let filtered: Vec<Skill> = candidates.into_iter().filter(|s| compatible(s)).collect();
            return self.ranker.rank(filtered, "", input_types, usage);
        }

        let q = trimmed.to_lowercase();
        let filtered: Vec<Skill> = candidates
            .into_iter()
            .filter(|s| matches_query(s, &q) && compatible(s))
            .collect();
        self.ranker.rank(filtered, trimmed, input_types, usage)
    }
}

/// Loose text-match filter used by [`Registry::search`] before ranking.
fn matches_query(skill: &Skill, query: &str) -> bool {
    let name = skill.name.to_lowercase();
    if name.contains(query) {
        return true;
    }

    if skill
        .aliases
        .iter()
        .map(|a| a.to_lowercase())
        .any(|a| a.contains(query) || a.starts_with(query))
    {
        return true;
    }

    if skill.description.to_lowercase().contains(query) {
        return true;
    }

    // Per-word prefix: "gray im" matches "Grayscale Image".
    let name_words: Vec<&str> = name.split_whitespace().collect();
    if query
        .split_whitespace()
        .any(|qw| name_words.iter().any(|nw| nw.starts_with(qw)))
    {
        return true;
    }

    // Typo tolerance for queries of a useful length.
    query.len() >= 3 && levenshtein(&name, query) <= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    static EMBEDDED: &[(&str, &str)] = &[
        (
            "core/resize.json",
            r#"{"id":"resize","name":"Resize","version":"1.0.0","category":"transform",
                "aliases":["scale"],"inputTypes":["png","jpg"],"driver":"image",
                "executor":{"type":"native","handler":"resize"}}"#,
        ),
        (
            "core/grayscale.json",
            r#"{"id":"grayscale","name":"Grayscale","version":"1.0.0","category":"filter",
                "description":"Convert to shades of gray","inputTypes":["png","jpg"],
                "driver":"image","executor":{"type":"native","handler":"grayscale"}}"#,
        ),
        (
            "core/export.json",
            r#"{"id":"export","name":"Export","version":"1.0.0","category":"meta",
                "isMeta":true,"inputTypes":["*"],"executor":{"type":"meta"}}"#,
        ),
        (
            "core/to_webp.json",
            r#"{"id":"to_webp","name":"To WebP","version":"1.0.0","category":"convert",
                "inputTypes":["gif"],"driver":"image",
                "executor":{"type":"native","handler":"to_webp"}}"#,
        ),
    ];

    fn registry() -> Registry {
        Registry::new(LoadOptions {
            embedded: EMBEDDED,
            disk_core_root: None,
            community_root: None,
        })
    }

    #[test]
    fn test_empty_query_filters_by_input_type() {
        let reg = registry();
        let results = reg.search("", &["png".to_string()], &HashMap::new());
        let ids: Vec<&str> = results.iter().map(|s| s.id.as_str()).collect();
        // to_webp only accepts gif; everything returned is compatible or meta.
        assert!(ids.contains(&"resize"));
        assert!(ids.contains(&"grayscale"));
        assert!(ids.contains(&"export"));
        assert!(!ids.contains(&"to_webp"));
    }

    #[test]
    fn test_empty_query_no_input_types_returns_all() {
        let reg = registry();
        let results = reg.search("", &[], &HashMap::new());
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_query_matches_name_substring() {
        let reg = registry();
        let results = reg.search("gray", &[], &HashMap::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "grayscale");
    }

    #[test]
    fn test_query_matches_alias() {
        let reg = registry();
        let results = reg.search("scale", &[], &HashMap::new());
        let ids: Vec<&str> = results.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"resize"));
    }

    #[test]
    fn test_query_matches_description() {
        let reg = registry();
        let results = reg.search("shades", &[], &HashMap::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "grayscale");
    }

    #[test]
    fn test_query_typo_tolerated() {
        let reg = registry();
        let results = reg.search("resiz", &[], &HashMap::new());
        assert!(results.iter().any(|s| s.id == "resize"));
    }

    #[test]
    fn test_short_query_no_typo_match() {
        let reg = registry();
        // Two chars: substring rules only, no edit-distance fallback.
        let results = reg.search("zz", &[], &HashMap::new());
        assert!(results.is_empty());
    }

    #[test]
    fn test_query_respects_input_types() {
        let reg = registry();
        let results = reg.search("webp", &["png".to_string()], &HashMap::new());
        assert!(results.is_empty());
    }

    #[test]
    fn test_usage_promotes_skill() {
        let reg = registry();
        let usage = HashMap::from([(
            "grayscale".to_string(),
            UsageStats {
                count: 20,
                last_used: chrono::Utc::now(),
            },
        )]);
        let results = reg.search("", &[], &usage);
        assert_eq!(results[0].id, "grayscale");
    }
}
