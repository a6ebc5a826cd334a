//! Category / match / frecency scoring for skill search results.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Skill;

/// Per-skill invocation statistics, read by the ranker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Total invocation count.
    pub count: u64,
    /// Timestamp of the most recent invocation.
    pub last_used: DateTime<Utc>,
}

/// Scores and orders candidate skills against a query, the caller's declared
/// input types, and historical usage.
#[derive(Debug, Clone)]
pub struct Ranker {
    /// Frecency decay half-life, in days.
    pub half_life_days: f64,
    /// Flat bonus for skills used within the last day.
    pub recent_boost: f64,
    /// Weight applied to the decayed usage count.
    pub frecency_weight: f64,
    /// Bonus for input-type compatibility.
    pub input_match_boost: f64,
    /// Bonus for an alias exact-or-prefix match.
    pub alias_match_boost: f64,
    /// Base weight per category tag.
    pub category_boost: HashMap<String, f64>,
}

impl Default for Ranker {
    fn default() -> Self {
        Self {
            half_life_days: 14.0,
            recent_boost: 250.0,
            frecency_weight: 400.0,
            input_match_boost: 600.0,
            alias_match_boost: 500.0,
            category_boost: HashMap::from([
                ("convert".to_string(), 800.0),
                ("transform".to_string(), 700.0),
                ("compress".to_string(), 650.0),
                ("filter".to_string(), 600.0),
                ("meta".to_string(), 400.0),
            ]),
        }
    }
}

impl Ranker {
    /// Order candidates by descending score; ties break by name, ascending.
    ///
    /// The sort is stable, so equal-score equal-name candidates keep their
    /// input order.
    pub fn rank(
        &self,
        candidates: Vec<Skill>,
        query: &str,
        input_types: &[String],
        usage: &HashMap<String, UsageStats>,
    ) -> Vec<Skill> {
        let mut scored: Vec<(Skill, f64)> = candidates
            .into_iter()
            .map(|skill| {
                let score = self.score(&skill, query, input_types, usage);
                (skill, score)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.name.cmp(&b.0.name))
        });
        scored.into_iter().map(|(skill, _)| skill).collect()
    }

    fn score(
        &self,
        skill: &Skill,
        query: &str,
        input_types: &[String],
        usage: &HashMap<String, UsageStats>,
    ) -> f64 {
        let mut base = self.category_boost.get(&skill.category).copied().unwrap_or(0.0);
        if skill.is_meta {
            base += 150.0;
        }

        let mut match_score = 0.0;
        if !query.trim().is_empty() {
            match_score = fuzzy_score(&skill.name, query);
            if alias_match(&skill.aliases, query) {
                match_score += self.alias_match_boost;
            }
        }

        if input_matches(skill, input_types) {
            match_score += self.input_match_boost;
        }

        base + match_score + self.frecency_boost(&skill.id, usage)
    }

    fn frecency_boost(&self, skill_id: &str, usage: &HashMap<String, UsageStats>) -> f64 {
        let Some(stats) = usage.get(skill_id) else {
            return 0.0;
        };
        if stats.count == 0 {
            return 0.0;
        }
        // Negative ages (clock skew) clamp to zero.
        let age_days = ((Utc::now() - stats.last_used).num_seconds() as f64 / 86_400.0).max(0.0);
        let lambda = std::f64::consts::LN_2 / self.half_life_days;
        let decay = (-lambda * age_days).exp();
        let recent = if age_days < 1.0 { self.recent_boost } else { 0.0 };
        (stats.count as f64) * self.frecency_weight * decay + recent
    }
}

/// Input-type compatibility predicate.
///
/// A skill declaring `"*"` accepts anything. A skill with no declared input
/// types is compatible only when the caller also declares none. Otherwise
/// the sets must intersect, case-insensitively.
pub fn input_matches(skill: &Skill, input_types: &[String]) -> bool {
    if skill.input_types.is_empty() {
        return input_types.is_empty();
    }
    if skill.input_types.iter().any(|t| t == "*") {
        return true;
    }
    if input_types.is_empty() {
        return false;
    }
    input_types.iter().any(|t| {
        skill
            .input_types
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(t))
    })
}

fn alias_match(aliases: &[String], query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return false;
    }
    aliases.iter().any(|alias| {
        let a = alias.to_lowercase();
        a == q || a.starts_with(&q)
    })
}

fn fuzzy_score(text: &str, query: &str) -> f64 {
    if text.is_empty() || query.is_empty() {
        return 0.0;
    }
    let t = text.to_lowercase();
    let q = query.to_lowercase();
    if t == q {
        return 900.0;
    }
    if t.starts_with(&q) {
        return 700.0;
    }
    if t.contains(&q) {
        return 450.0;
    }
    let dist = levenshtein(&t, &q);
    let max_len = t.chars().count().max(q.chars().count());
    if max_len == 0 {
        return 0.0;
    }
    let similarity = (1.0 - dist as f64 / max_len as f64).max(0.0);
    similarity * 400.0
}

/// Two-row Levenshtein distance over chars.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (curr[j] + 1).min(prev[j + 1] + 1).min(prev[j] + cost);
        }
        prev.copy_from_slice(&curr);
    }
    prev[b.len()]
}
