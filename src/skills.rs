use std::collections::HashSet;

use serde_json::Value;

/// Normalized skills for one query.
///
/// Terms are trimmed, non-empty and unique, in first-seen order. Case is
/// preserved: the semantic backend sends the terms as query text, while the
/// lexical backend lower-cases them through [`SkillSet::lexical_tokens`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillSet {
    terms: Vec<String>,
}

impl SkillSet {
    /// Split a comma-separated skills string.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio::SkillSet;
    ///
    /// let skills = SkillSet::parse(" Python, , Django ,Python");
    /// assert_eq!(skills.terms(), &["Python", "Django"]);
    /// ```
    pub fn parse(raw: &str) -> Self {
        Self::from_terms(raw.split(','))
    }

    /// Build from a list. Elements are stringified as-is and never split.
    pub fn from_terms<I, T>(terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        let mut seen = HashSet::new();
        let terms = terms
            .into_iter()
            .filter_map(|t| {
                let term = t.to_string().trim().to_string();
                (!term.is_empty() && seen.insert(term.clone())).then_some(term)
            })
            .collect();
        Self { terms }
    }

    /// Interpret the `skills` value produced by job extraction.
    ///
    /// A string is split on commas, an array has each element stringified
    /// (strings without their quotes), anything else yields no skills.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Array(items) => Self::from_terms(items.iter().map(|item| {
                match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                }
            })),
            _ => Self::default(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Lower-cased token set used for overlap scoring.
    pub fn lexical_tokens(&self) -> HashSet<String> {
        self.terms.iter().map(|t| t.to_lowercase()).collect()
    }
}

impl From<&str> for SkillSet {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for SkillSet {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Vec<String>> for SkillSet {
    fn from(terms: Vec<String>) -> Self {
        Self::from_terms(terms)
    }
}

impl From<&[&str]> for SkillSet {
    fn from(terms: &[&str]) -> Self {
        Self::from_terms(terms.iter())
    }
}

impl<const N: usize> From<[&str; N]> for SkillSet {
    fn from(terms: [&str; N]) -> Self {
        Self::from_terms(terms)
    }
}
