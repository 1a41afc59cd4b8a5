use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    catalogue::Catalogue,
    error::Result,
    lexical::{LexicalMatcher, MatchMode, ScoredEntry},
    semantic::{
        COLLECTION_NAME,
        IndexedEntry,
        NEIGHBORS_PER_QUERY,
        SemanticStore,
    },
    skills::SkillSet,
};

/// Which backend answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Semantic,
    Lexical,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic => f.write_str("semantic"),
            Self::Lexical => f.write_str("lexical"),
        }
    }
}

/// Whether to try the semantic index at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendPreference {
    /// Use the semantic index when it opens, otherwise fall back.
    #[default]
    Auto,
    /// Skip the semantic index.
    Lexical,
}

/// Everything needed to build a [`Retriever`].
#[derive(Debug, Clone)]
pub struct RetrieverOptions {
    pub catalogue_path: PathBuf,
    pub store_dir: PathBuf,
    /// Embedding model override; `None` uses the environment or default.
    pub model_id: Option<String>,
    pub backend: BackendPreference,
    pub mode: MatchMode,
}

/// Snapshot of what the retriever is running on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrieverStatus {
    pub backend: BackendKind,
    /// Store directory for the semantic backend, catalogue file otherwise.
    pub path: Option<PathBuf>,
    /// Index entries (semantic) or catalogue rows (lexical). `None` when
    /// the index could not be counted.
    pub entries: Option<u64>,
    pub mode: MatchMode,
}

enum Backend {
    Semantic(Box<dyn SemanticStore>),
    Lexical,
}

/// Maps skills to portfolio evidence links.
///
/// The backend is chosen once at construction. Queries never fail: a
/// semantic query error is logged and yields no links.
///
/// A retriever is not synchronized internally. Share one between threads
/// only behind a lock.
pub struct Retriever {
    catalogue: Catalogue,
    backend: Backend,
    mode: MatchMode,
}

impl Retriever {
    /// Load the catalogue and select a backend according to `options`.
    ///
    /// Only a catalogue failure is returned; any semantic backend failure
    /// results in a lexical retriever.
    pub fn open(options: &RetrieverOptions) -> Result<Self> {
        let catalogue = Catalogue::load(&options.catalogue_path)?;

        let retriever = match options.backend {
            BackendPreference::Lexical => Self::lexical(catalogue),
            BackendPreference::Auto => {
                Self::with_probe(catalogue, &options.store_dir, || {
                    open_semantic_store(
                        &options.store_dir,
                        options.model_id.as_deref(),
                    )
                })
            }
        };

        Ok(retriever.with_mode(options.mode))
    }

    /// Select a backend for an already loaded catalogue, using the default
    /// embedding model.
    pub fn initialize(catalogue: Catalogue, store_dir: &Path) -> Self {
        Self::with_probe(catalogue, store_dir, || {
            open_semantic_store(store_dir, None)
        })
    }

    /// Select a backend using `probe` to open the semantic store.
    ///
    /// A probe error selects the lexical backend.
    pub fn with_probe<F>(catalogue: Catalogue, store_dir: &Path, probe: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn SemanticStore>>,
    {
        let backend = match probe() {
            Ok(store) => {
                tracing::info!(
                    store = %store_dir.display(),
                    "using semantic index"
                );
                Backend::Semantic(store)
            }
            Err(e) => {
                tracing::warn!(
                    store = %store_dir.display(),
                    error = %e,
                    "semantic index unavailable, using lexical matcher"
                );
                Backend::Lexical
            }
        };

        Self {
            catalogue,
            backend,
            mode: MatchMode::default(),
        }
    }

    /// A retriever that only ever uses the lexical matcher.
    pub fn lexical(catalogue: Catalogue) -> Self {
        Self {
            catalogue,
            backend: Backend::Lexical,
            mode: MatchMode::default(),
        }
    }

    /// Set how the lexical matcher treats rows without overlap.
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn backend(&self) -> BackendKind {
        match self.backend {
            Backend::Semantic(_) => BackendKind::Semantic,
            Backend::Lexical => BackendKind::Lexical,
        }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Materialize the catalogue into the semantic index if it is empty.
    ///
    /// Returns the number of entries inserted. A non-empty index is left
    /// untouched even if it no longer matches the catalogue; use
    /// [`Retriever::reindex`] for that. The lexical backend has nothing to
    /// populate.
    pub fn ensure_populated(&mut self) -> Result<usize> {
        let Backend::Semantic(store) = &mut self.backend else {
            return Ok(0);
        };

        let existing = store.count()?;
        if existing > 0 {
            tracing::debug!(entries = existing, "semantic index already populated");
            return Ok(0);
        }

        populate(store.as_mut(), &self.catalogue)
    }

    /// Drop the semantic index contents and repopulate from the catalogue.
    ///
    /// Returns the number of entries inserted; 0 for the lexical backend.
    pub fn reindex(&mut self) -> Result<usize> {
        let Backend::Semantic(store) = &mut self.backend else {
            return Ok(0);
        };

        store.clear()?;
        populate(store.as_mut(), &self.catalogue)
    }

    /// Links that best evidence `skills`, most relevant first.
    ///
    /// Lexical: at most 2 links. Semantic: at most 2 per skill, grouped
    /// by skill in input order. Never fails; backend errors yield an empty
    /// list.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio::{Catalogue, CatalogueEntry, Retriever};
    ///
    /// let catalogue = Catalogue::from_entries(vec![
    ///     CatalogueEntry::new("Python, Django", "L1"),
    ///     CatalogueEntry::new("Java, Spring", "L2"),
    /// ]);
    /// let mut retriever = Retriever::lexical(catalogue);
    ///
    /// assert_eq!(retriever.query_links("Python"), vec!["L1", "L2"]);
    /// ```
    pub fn query_links(&mut self, skills: impl Into<SkillSet>) -> Vec<String> {
        let skills = skills.into();

        match &mut self.backend {
            Backend::Semantic(store) => {
                query_semantic(store.as_mut(), &skills).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "semantic query failed");
                    Vec::new()
                })
            }
            Backend::Lexical => {
                LexicalMatcher::new(&self.catalogue, self.mode).query(&skills)
            }
        }
    }

    /// The full lexical ranking of the catalogue for `skills`.
    ///
    /// Available whatever the active backend, since it only reads the
    /// in-memory catalogue.
    pub fn explain(&self, skills: impl Into<SkillSet>) -> Vec<ScoredEntry> {
        LexicalMatcher::new(&self.catalogue, self.mode).rank(&skills.into())
    }

    pub fn status(&self) -> RetrieverStatus {
        match &self.backend {
            Backend::Semantic(store) => RetrieverStatus {
                backend: BackendKind::Semantic,
                path: Some(store.location().to_path_buf()),
                entries: store.count().ok(),
                mode: self.mode,
            },
            Backend::Lexical => RetrieverStatus {
                backend: BackendKind::Lexical,
                path: self.catalogue.source().map(Path::to_path_buf),
                entries: Some(self.catalogue.len() as u64),
                mode: self.mode,
            },
        }
    }
}

impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever")
            .field("backend", &self.backend())
            .field("catalogue_rows", &self.catalogue.len())
            .field("mode", &self.mode)
            .finish()
    }
}

fn populate(store: &mut dyn SemanticStore, catalogue: &Catalogue) -> Result<usize> {
    let entries: Vec<IndexedEntry> = catalogue
        .entries()
        .iter()
        .map(IndexedEntry::from_catalogue)
        .collect();

    store.insert(&entries)?;
    tracing::info!(entries = entries.len(), "populated semantic index");
    Ok(entries.len())
}

fn query_semantic(
    store: &mut dyn SemanticStore,
    skills: &SkillSet,
) -> Result<Vec<String>> {
    if skills.is_empty() {
        return Ok(Vec::new());
    }

    let groups = store.query(skills.terms(), NEIGHBORS_PER_QUERY)?;

    Ok(groups
        .iter()
        .flatten()
        .filter_map(|hit| hit.link().map(str::to_string))
        .collect())
}

#[cfg(feature = "colbert")]
fn open_semantic_store(
    store_dir: &Path,
    model_id: Option<&str>,
) -> Result<Box<dyn SemanticStore>> {
    use crate::{model_manager::ModelManager, semantic::SemanticIndex};

    let embedder = match model_id {
        Some(id) => ModelManager::with_model_id(id.to_string()),
        None => ModelManager::new(),
    };
    let index =
        SemanticIndex::open(store_dir, COLLECTION_NAME, Box::new(embedder))?;
    Ok(Box::new(index))
}

#[cfg(not(feature = "colbert"))]
fn open_semantic_store(
    _store_dir: &Path,
    _model_id: Option<&str>,
) -> Result<Box<dyn SemanticStore>> {
    Err(crate::error::Error::BackendUnavailable(format!(
        "built without the `colbert` feature, cannot open collection '{COLLECTION_NAME}'"
    )))
}
