//! Terminal and JSON rendering for CLI results.

use serde::Serialize;

use crate::{
    error::Result,
    jobs::JobEvidence,
    lexical::{MatchMode, ScoredEntry},
    retriever::{BackendKind, RetrieverStatus},
    skills::SkillSet,
};

/// What a single skills query produced.
#[derive(Debug, Serialize)]
pub struct QueryReport<'a> {
    pub skills: &'a [String],
    pub backend: BackendKind,
    pub links: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<&'a [ScoredEntry]>,
}

impl<'a> QueryReport<'a> {
    pub fn new(
        skills: &'a SkillSet,
        backend: BackendKind,
        links: &'a [String],
    ) -> Self {
        Self {
            skills: skills.terms(),
            backend,
            links,
            ranking: None,
        }
    }

    pub fn with_ranking(mut self, ranking: &'a [ScoredEntry]) -> Self {
        self.ranking = Some(ranking);
        self
    }
}

pub fn format_query_human(report: &QueryReport<'_>) {
    if report.links.is_empty() {
        println!("No evidence found.");
    } else {
        for (i, link) in report.links.iter().enumerate() {
            println!("{:>3}. {link}", i + 1);
        }
    }

    if let Some(ranking) = report.ranking {
        println!("\nLexical ranking:");
        for entry in ranking {
            let link = if entry.link.is_empty() {
                "(no link)"
            } else {
                entry.link.as_str()
            };
            println!(
                "  row {:>3}  score {}  {link}  [{}]",
                entry.row,
                entry.score,
                entry.matched.join(", ")
            );
        }
    }
}

pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub fn format_status_human(status: &RetrieverStatus) {
    println!("Backend: {}", status.backend);
    if let Some(path) = &status.path {
        println!("Location: {}", path.display());
    }
    match status.entries {
        Some(n) => println!("Entries: {n}"),
        None => println!("Entries: unknown"),
    }
    println!("Mode: {}", mode_label(status));
}

pub fn format_jobs_human(evidence: &[JobEvidence]) {
    if evidence.is_empty() {
        println!("No jobs found.");
        return;
    }

    for job in evidence {
        println!("{}", job.title);
        if job.skills.is_empty() {
            println!("  (no skills listed)");
            continue;
        }
        println!("  Skills: {}", job.skills.join(", "));
        if job.links.is_empty() {
            println!("  No evidence found.");
        }
        for link in &job.links {
            println!("  - {link}");
        }
    }
}

fn mode_label(status: &RetrieverStatus) -> &'static str {
    match status.mode {
        MatchMode::BestAvailable => "best available",
        MatchMode::StrictOverlap => "strict overlap",
    }
}
