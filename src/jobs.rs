//! Evidence lookup for the jobs produced by the extraction step.
//!
//! Extraction emits either one JSON object or an array of them, with keys
//! such as `role`, `experience`, `skills` and `description`.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::{error::Result, retriever::Retriever, skills::SkillSet};

/// Title used when a job has neither `title` nor `role`.
pub const UNTITLED_ROLE: &str = "Untitled Role";

/// Evidence found for one extracted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobEvidence {
    pub title: String,
    pub skills: Vec<String>,
    pub links: Vec<String>,
}

/// Read extraction output from a JSON file.
pub fn load_jobs(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// The display title of a job: `title`, then `role`, then a placeholder.
pub fn job_title(job: &Value) -> String {
    ["title", "role"]
        .iter()
        .find_map(|key| {
            job.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(UNTITLED_ROLE)
        .to_string()
}

/// Look up evidence links for every extracted job.
///
/// Jobs without skills are not queried and get no links.
pub fn match_jobs(retriever: &mut Retriever, extracted: &Value) -> Vec<JobEvidence> {
    let jobs: Vec<&Value> = match extracted {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    jobs.into_iter()
        .map(|job| {
            let title = job_title(job);
            let skills = job
                .get("skills")
                .map(SkillSet::from_json)
                .unwrap_or_default();

            let links = if skills.is_empty() {
                tracing::warn!(title = %title, "no skills found for job");
                Vec::new()
            } else {
                retriever.query_links(skills.clone())
            };

            JobEvidence {
                title,
                skills: skills.terms().to_vec(),
                links,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalogue::{Catalogue, CatalogueEntry};

    fn retriever() -> Retriever {
        Retriever::lexical(Catalogue::from_entries(vec![
            CatalogueEntry::new("React/Node.js, MongoDB", "https://mern"),
            CatalogueEntry::new("Python, Django", "https://django"),
            CatalogueEntry::new("Java, Spring", "https://spring"),
        ]))
    }

    #[test]
    fn title_falls_back_to_role_then_placeholder() {
        assert_eq!(job_title(&json!({"title": "SRE", "role": "Ops"})), "SRE");
        assert_eq!(job_title(&json!({"title": "", "role": "Ops"})), "Ops");
        assert_eq!(job_title(&json!({"role": null})), UNTITLED_ROLE);
        assert_eq!(job_title(&json!("not an object")), UNTITLED_ROLE);
    }

    #[test]
    fn single_object_is_one_job() {
        let evidence = match_jobs(
            &mut retriever(),
            &json!({"role": "Backend Engineer", "skills": "Python, Django"}),
        );

        assert_eq!(
            evidence,
            vec![JobEvidence {
                title: "Backend Engineer".to_string(),
                skills: vec!["Python".to_string(), "Django".to_string()],
                links: vec![
                    "https://django".to_string(),
                    "https://mern".to_string()
                ],
            }]
        );
    }

    #[test]
    fn array_of_jobs_with_list_skills() {
        let evidence = match_jobs(
            &mut retriever(),
            &json!([
                {"role": "Frontend", "skills": ["React", "MongoDB"]},
                {"role": "Platform", "skills": ["Spring"]},
            ]),
        );

        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[0].links[0], "https://mern");
        assert_eq!(evidence[1].links[0], "https://spring");
    }

    #[test]
    fn jobs_without_skills_get_no_links() {
        let evidence = match_jobs(
            &mut retriever(),
            &json!([
                {"role": "Mystery"},
                {"role": "Blank", "skills": " , "},
                {"role": "Odd", "skills": 7},
            ]),
        );

        assert!(evidence.iter().all(|e| e.links.is_empty()));
        assert!(evidence.iter().all(|e| e.skills.is_empty()));
    }

    #[test]
    fn load_jobs_reads_json_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("jobs.json");
        std::fs::write(&path, r#"[{"role": "SRE", "skills": "Go"}]"#).unwrap();

        let value = load_jobs(&path).unwrap();
        assert_eq!(value[0]["role"], "SRE");
    }
}
