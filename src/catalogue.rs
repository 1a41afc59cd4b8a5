use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Error, Result};

/// Header of the column holding the tech-stack description.
pub const TECHSTACK_COLUMN: &str = "Techstack";
/// Header of the column holding the evidence link.
pub const LINKS_COLUMN: &str = "Links";

/// One portfolio row. Identity is the row position in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogueEntry {
    pub tech_stack: String,
    pub link: String,
}

impl CatalogueEntry {
    pub fn new(tech_stack: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            tech_stack: tech_stack.into(),
            link: link.into(),
        }
    }
}

/// The in-memory portfolio table, loaded once per retriever.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    entries: Vec<CatalogueEntry>,
    source: Option<PathBuf>,
}

impl Catalogue {
    /// Build a catalogue from rows that are already in memory.
    pub fn from_entries(entries: Vec<CatalogueEntry>) -> Self {
        Self {
            entries,
            source: None,
        }
    }

    /// Read a CSV file with `Techstack` and `Links` columns.
    ///
    /// Other columns are ignored and column order does not matter. Header
    /// names must match exactly. Cell values are kept exactly as read,
    /// including empty ones; a row that stops short of a column has an
    /// empty value there. A row with more cells than the header is an error.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// # let path = tmp.path().join("portfolio.csv");
    /// # std::fs::write(&path, "Techstack,Links\n\"Rust, Tokio\",https://a\n").unwrap();
    /// use folio::Catalogue;
    ///
    /// let catalogue = Catalogue::load(&path).unwrap();
    /// assert_eq!(catalogue.len(), 1);
    /// assert_eq!(catalogue.entries()[0].link, "https://a");
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let load_error = |reason: String| Error::CatalogueLoad {
            path: path.to_path_buf(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| load_error(e.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|e| load_error(e.to_string()))?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| load_error(format!("missing column '{name}'")))
        };
        let techstack_idx = column(TECHSTACK_COLUMN)?;
        let links_idx = column(LINKS_COLUMN)?;

        let mut entries = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let row = record
                .map_err(|e| load_error(format!("row {}: {e}", idx + 1)))?;
            if row.len() > headers.len() {
                return Err(load_error(format!(
                    "row {}: expected at most {} fields, found {}",
                    idx + 1,
                    headers.len(),
                    row.len()
                )));
            }
            entries.push(CatalogueEntry {
                tech_stack: row.get(techstack_idx).unwrap_or_default().into(),
                link: row.get(links_idx).unwrap_or_default().into(),
            });
        }

        tracing::debug!(
            path = %path.display(),
            rows = entries.len(),
            "loaded portfolio catalogue"
        );

        Ok(Self {
            entries,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn entries(&self) -> &[CatalogueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The file this catalogue was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("my_portfolio.csv");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn load_reads_rows_in_order() {
        let (_tmp, path) = write_csv(
            "Techstack,Links\n\
             \"React, Node.js, MongoDB\",https://example.com/react\n\
             \"Python, Django\",https://example.com/python\n",
        );

        let catalogue = Catalogue::load(&path).unwrap();

        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.source(), Some(path.as_path()));
        assert_eq!(
            catalogue.entries()[0],
            CatalogueEntry::new(
                "React, Node.js, MongoDB",
                "https://example.com/react"
            )
        );
        assert_eq!(catalogue.entries()[1].link, "https://example.com/python");
    }

    #[test]
    fn load_ignores_extra_columns_and_order() {
        let (_tmp, path) = write_csv(
            "Links,Owner,Techstack\nhttps://a,alice,Rust\nhttps://b,bob,Go\n",
        );

        let catalogue = Catalogue::load(&path).unwrap();

        assert_eq!(
            catalogue.entries(),
            &[
                CatalogueEntry::new("Rust", "https://a"),
                CatalogueEntry::new("Go", "https://b"),
            ]
        );
    }

    #[test]
    fn load_keeps_empty_cells() {
        let (_tmp, path) =
            write_csv("Techstack,Links\n,https://a\n\"Rust, Axum\",\n");

        let catalogue = Catalogue::load(&path).unwrap();

        assert_eq!(catalogue.len(), 2);
        assert_eq!(catalogue.entries()[0].tech_stack, "");
        assert_eq!(catalogue.entries()[1].link, "");
    }

    #[test]
    fn load_short_row_keeps_empty_link() {
        let (_tmp, path) =
            write_csv("Techstack,Links
Rust
Go,https://go
");

        let catalogue = Catalogue::load(&path).unwrap();

        assert_eq!(
            catalogue.entries(),
            &[
                CatalogueEntry::new("Rust", ""),
                CatalogueEntry::new("Go", "https://go"),
            ]
        );
    }

    #[test]
    fn load_header_names_match_exactly() {
        let (_tmp, path) = write_csv("Techstack, Links
Rust,https://a
");

        let err = Catalogue::load(&path).unwrap_err();
        assert!(matches!(err, Error::CatalogueLoad { .. }));
    }

    #[test]
    fn load_header_only_is_empty() {
        let (_tmp, path) = write_csv("Techstack,Links\n");
        let catalogue = Catalogue::load(&path).unwrap();
        assert!(catalogue.is_empty());
    }

    #[test]
    fn load_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Catalogue::load(&tmp.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::CatalogueLoad { .. }));
    }

    #[test]
    fn load_missing_column_fails() {
        let (_tmp, path) = write_csv("Techstack,Url\nRust,https://a\n");

        let err = Catalogue::load(&path).unwrap_err();

        match err {
            Error::CatalogueLoad { reason, .. } => {
                assert!(reason.contains("Links"), "reason: {reason}");
            }
            other => panic!("expected CatalogueLoad, got {other:?}"),
        }
    }

    #[test]
    fn load_ragged_row_fails() {
        let (_tmp, path) =
            write_csv("Techstack,Links\nRust,https://a,extra\n");
        let err = Catalogue::load(&path).unwrap_err();
        assert!(matches!(err, Error::CatalogueLoad { .. }));
    }
}
