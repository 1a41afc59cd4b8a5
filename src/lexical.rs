//! Token-overlap matching over the in-memory catalogue.
//!
//! Used whenever the semantic index is unavailable. Every row is scored by
//! how many of the query's skill tokens appear in its tech stack, rows are
//! stable-sorted by score, and the first links with a non-empty value win.

use std::collections::HashSet;

use serde::Serialize;

use crate::{catalogue::Catalogue, skills::SkillSet};

/// Number of links a query returns.
pub const RESULT_COUNT: usize = 2;

/// How rows without any overlap are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Score-0 rows still fill the result, in catalogue order.
    #[default]
    BestAvailable,
    /// Only rows sharing at least one token with the skills are returned.
    StrictOverlap,
}

/// A catalogue row with the score it received for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredEntry {
    /// Position of the row in the catalogue.
    pub row: usize,
    pub score: usize,
    pub link: String,
    /// Overlapping tokens, sorted.
    pub matched: Vec<String>,
}

/// Split a tech-stack description into its lower-cased token set.
///
/// `/` and `,` are both separators.
///
/// # Examples
///
/// ```
/// use folio::lexical::tech_tokens;
///
/// let tokens = tech_tokens("React/Node.js, MongoDB");
/// assert_eq!(tokens.len(), 3);
/// assert!(tokens.contains("node.js"));
/// ```
pub fn tech_tokens(tech_stack: &str) -> HashSet<String> {
    tech_stack
        .split([',', '/'])
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct LexicalMatcher<'a> {
    catalogue: &'a Catalogue,
    mode: MatchMode,
}

impl<'a> LexicalMatcher<'a> {
    pub fn new(catalogue: &'a Catalogue, mode: MatchMode) -> Self {
        Self { catalogue, mode }
    }

    /// Score every row and return them best first.
    ///
    /// The sort is stable, so rows with equal scores keep catalogue order.
    pub fn rank(&self, skills: &SkillSet) -> Vec<ScoredEntry> {
        let skill_tokens = skills.lexical_tokens();

        let mut scored: Vec<ScoredEntry> = self
            .catalogue
            .entries()
            .iter()
            .enumerate()
            .map(|(row, entry)| {
                let mut matched: Vec<String> = tech_tokens(&entry.tech_stack)
                    .intersection(&skill_tokens)
                    .cloned()
                    .collect();
                matched.sort();
                ScoredEntry {
                    row,
                    score: matched.len(),
                    link: entry.link.clone(),
                    matched,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    /// The top links for `skills`, at most [`RESULT_COUNT`].
    pub fn query(&self, skills: &SkillSet) -> Vec<String> {
        self.rank(skills)
            .into_iter()
            .filter(|e| self.mode == MatchMode::BestAvailable || e.score > 0)
            .filter(|e| !e.link.is_empty())
            .take(RESULT_COUNT)
            .map(|e| e.link)
            .collect()
    }
}
