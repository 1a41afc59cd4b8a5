use std::{collections::BTreeMap, path::Path};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    catalogue::CatalogueEntry,
    embedding::Embedder,
    error::{Error, Result},
    similarity,
    vector_store::{Collection, StoredDocument},
};

/// Name of the collection holding portfolio entries.
pub const COLLECTION_NAME: &str = "portfolio";

/// Metadata key under which an entry's evidence link is stored.
pub const LINKS_KEY: &str = "links";

/// Neighbors requested per query text.
pub const NEIGHBORS_PER_QUERY: usize = 2;

/// Text encoded once at open time to check that the embedder works.
const READINESS_QUERY: &str = "portfolio";

/// A catalogue row as materialized in the semantic index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedEntry {
    pub id: Uuid,
    pub document: String,
    pub metadata: BTreeMap<String, String>,
}

impl IndexedEntry {
    /// Materialize a catalogue row under a freshly generated id.
    pub fn from_catalogue(entry: &CatalogueEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            document: entry.tech_stack.clone(),
            metadata: BTreeMap::from([(
                LINKS_KEY.to_string(),
                entry.link.clone(),
            )]),
        }
    }
}

/// One nearest-neighbor result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
    pub id: Uuid,
    pub document: String,
    pub metadata: BTreeMap<String, String>,
    pub score: f32,
}

impl QueryHit {
    /// The hit's link, if it has a non-empty one.
    pub fn link(&self) -> Option<&str> {
        self.metadata
            .get(LINKS_KEY)
            .map(String::as_str)
            .filter(|l| !l.is_empty())
    }
}

/// The narrow interface the retriever needs from a nearest-neighbor index.
///
/// The index is an external resource: other processes may write to the
/// same store, so implementations must not assume exclusive ownership.
pub trait SemanticStore: Send {
    /// Number of entries currently stored.
    fn count(&self) -> Result<u64>;

    /// Store entries, keeping their ids.
    fn insert(&mut self, entries: &[IndexedEntry]) -> Result<()>;

    /// For each text, the `k` most similar entries, nearest first.
    ///
    /// Returns one group per input text, in input order.
    fn query(&mut self, texts: &[String], k: usize)
    -> Result<Vec<Vec<QueryHit>>>;

    /// Drop every entry.
    fn clear(&mut self) -> Result<()>;

    /// Where the index lives.
    fn location(&self) -> &Path;
}

/// A persistent [`SemanticStore`] scoring with ColBERT MaxSim.
pub struct SemanticIndex {
    collection: Collection,
    embedder: Box<dyn Embedder>,
}

impl SemanticIndex {
    /// Open (or create) the collection `name` in the store under `dir`.
    ///
    /// The embedder must encode a query before the index is returned; a
    /// model that cannot be loaded fails with [`Error::BackendUnavailable`].
    pub fn open(
        dir: &Path,
        name: &str,
        mut embedder: Box<dyn Embedder>,
    ) -> Result<Self> {
        let collection = Collection::open(dir, name)?;
        embedder.embed_query(READINESS_QUERY).map_err(|e| {
            Error::BackendUnavailable(format!(
                "embedder {} is not usable: {e}",
                embedder.model_id()
            ))
        })?;
        tracing::debug!(
            dir = %dir.display(),
            collection = name,
            model = embedder.model_id(),
            "opened semantic index"
        );
        Ok(Self {
            collection,
            embedder,
        })
    }
}

impl SemanticStore for SemanticIndex {
    fn count(&self) -> Result<u64> {
        self.collection.count()
    }

    fn insert(&mut self, entries: &[IndexedEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> =
            entries.iter().map(|e| e.document.clone()).collect();
        let matrices = self.embedder.embed_documents(&texts)?;

        let records: Vec<(StoredDocument, _)> = entries
            .iter()
            .zip(matrices)
            .map(|(entry, matrix)| {
                let document = StoredDocument {
                    id: entry.id,
                    document: entry.document.clone(),
                    metadata: entry.metadata.clone(),
                };
                (document, matrix)
            })
            .collect();

        self.collection.insert(&records)
    }

    fn query(
        &mut self,
        texts: &[String],
        k: usize,
    ) -> Result<Vec<Vec<QueryHit>>> {
        let stored = self.collection.load_all()?;
        if stored.is_empty() {
            return Ok(vec![Vec::new(); texts.len()]);
        }

        let candidates: Vec<_> = stored.iter().map(|(_, m)| m).collect();

        let mut groups = Vec::with_capacity(texts.len());
        for text in texts {
            let query = self.embedder.embed_query(text)?;
            let neighbors = similarity::nearest(&query, &candidates, k)?;

            let hits = neighbors
                .into_iter()
                .map(|n| {
                    let (document, _) = &stored[n.position];
                    QueryHit {
                        id: document.id,
                        document: document.document.clone(),
                        metadata: document.metadata.clone(),
                        score: n.score,
                    }
                })
                .collect();
            groups.push(hits);
        }

        Ok(groups)
    }

    fn clear(&mut self) -> Result<()> {
        self.collection.clear()
    }

    fn location(&self) -> &Path {
        self.collection.dir()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embedding::EmbeddingMatrix;

    /// Fixed vocabulary used by [`KeywordEmbedder`].
    const VOCAB: &[&str] =
        &["rust", "python", "django", "java", "spring", "go", "react"];

    /// Embeds each comma/slash separated token as a one-hot vector over
    /// [`VOCAB`]. Unknown tokens map to the zero vector.
    #[derive(Debug, Default)]
    pub(crate) struct KeywordEmbedder;

    impl KeywordEmbedder {
        fn embed(text: &str) -> EmbeddingMatrix {
            let tokens: Vec<String> = text
                .split([',', '/', ' '])
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            let dim = VOCAB.len();
            let rows = tokens.len().max(1);
            let mut data = vec![0.0; rows * dim];
            for (row, token) in tokens.iter().enumerate() {
                if let Some(col) = VOCAB.iter().position(|v| v == token) {
                    data[row * dim + col] = 1.0;
                }
            }
            EmbeddingMatrix::new(rows as u32, dim as u32, data).unwrap()
        }
    }

    impl Embedder for KeywordEmbedder {
        fn model_id(&self) -> &str {
            "keyword-test"
        }

        fn embed_documents(
            &mut self,
            texts: &[String],
        ) -> Result<Vec<EmbeddingMatrix>> {
            Ok(texts.iter().map(|t| Self::embed(t)).collect())
        }

        fn embed_query(&mut self, text: &str) -> Result<EmbeddingMatrix> {
            Ok(Self::embed(text))
        }
    }

    /// An embedder whose model never loads.
    #[derive(Debug, Default)]
    pub(crate) struct UnloadableEmbedder;

    impl Embedder for UnloadableEmbedder {
        fn model_id(&self) -> &str {
            "missing/model"
        }

        fn embed_documents(
            &mut self,
            _texts: &[String],
        ) -> Result<Vec<EmbeddingMatrix>> {
            Err(Error::Model("failed to load missing/model".into()))
        }

        fn embed_query(&mut self, _text: &str) -> Result<EmbeddingMatrix> {
            Err(Error::Model("failed to load missing/model".into()))
        }
    }

    pub(crate) fn open_index(dir: &Path) -> SemanticIndex {
        SemanticIndex::open(
            dir,
            COLLECTION_NAME,
            Box::new(KeywordEmbedder),
        )
        .unwrap()
    }

    fn entries(rows: &[(&str, &str)]) -> Vec<IndexedEntry> {
        rows.iter()
            .map(|(tech, link)| {
                IndexedEntry::from_catalogue(&CatalogueEntry::new(*tech, *link))
            })
            .collect()
    }

    #[test]
    fn from_catalogue_assigns_unique_ids() {
        let row = CatalogueEntry::new("Rust", "https://rust");
        let a = IndexedEntry::from_catalogue(&row);
        let b = IndexedEntry::from_catalogue(&row);

        assert_ne!(a.id, b.id);
        assert_eq!(a.document, "Rust");
        assert_eq!(a.metadata.get(LINKS_KEY).unwrap(), "https://rust");
    }

    #[test]
    fn open_fails_when_embedder_is_unusable() {
        let tmp = tempfile::tempdir().unwrap();

        let err = SemanticIndex::open(
            tmp.path(),
            COLLECTION_NAME,
            Box::new(UnloadableEmbedder),
        )
        .err()
        .unwrap();

        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[test]
    fn insert_updates_count() {
        let tmp = tempfile::tempdir().unwrap();
        let mut index = open_index(tmp.path());

        index
            .insert(&entries(&[("Rust", "L1"), ("Python", "L2")]))
            .unwrap();

        assert_eq!(index.count().unwrap(), 2);
    }

    #[test]
    fn query_returns_nearest_per_text() {
        let tmp = tempfile::tempdir().unwrap();
        let mut index = open_index(tmp.path());
        index
            .insert(&entries(&[
                ("Java, Spring", "L1"),
                ("Python, Django", "L2"),
                ("Rust", "L3"),
            ]))
            .unwrap();

        let groups = index
            .query(&["Python".to_string(), "Rust".to_string()], 2)
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][0].link(), Some("L2"));
        assert_eq!(groups[1][0].link(), Some("L3"));
        assert!(groups.iter().all(|g| g.len() <= 2));
    }

    #[test]
    fn query_empty_index_returns_empty_groups() {
        let tmp = tempfile::tempdir().unwrap();
        let mut index = open_index(tmp.path());

        let groups = index.query(&["Rust".to_string()], 2).unwrap();

        assert_eq!(groups, vec![Vec::<QueryHit>::new()]);
    }

    #[test]
    fn clear_removes_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let mut index = open_index(tmp.path());
        index.insert(&entries(&[("Rust", "L1")])).unwrap();

        index.clear().unwrap();

        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn hit_without_link_has_none() {
        let hit = QueryHit {
            id: Uuid::new_v4(),
            document: "Rust".to_string(),
            metadata: BTreeMap::from([(LINKS_KEY.to_string(), String::new())]),
            score: 1.0,
        };
        assert_eq!(hit.link(), None);
    }
}
