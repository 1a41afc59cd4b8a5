use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use redb::{
    Database,
    DatabaseError,
    ReadableDatabase,
    ReadableTable,
    ReadableTableMetadata,
    TableDefinition,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    embedding::EmbeddingMatrix,
    error::{Error, Result},
};

/// Database file inside the store directory.
pub const STORE_FILE: &str = "index.redb";

/// Bumped whenever the on-disk layout changes.
pub const SCHEMA_VERSION: &str = "1";

const STORE_META: TableDefinition<&str, &str> =
    TableDefinition::new("store_meta");
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Header size: 4 bytes token count + 4 bytes dimension.
const HEADER_SIZE: usize = 8;

/// A document as persisted in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: Uuid,
    pub document: String,
    pub metadata: BTreeMap<String, String>,
}

/// A named collection inside a persistent redb store.
///
/// Each collection owns two tables keyed by insertion sequence:
/// - `<name>.documents`: JSON-encoded [`StoredDocument`]
/// - `<name>.embeddings`: token matrix, 4 bytes token count T (u32 LE),
///   4 bytes dimension D (u32 LE), then T * D f32 LE values
///
/// redb holds an exclusive lock on the store file while a collection is
/// open, so only one process (and one open `Collection`) can use a store at
/// a time. A second open fails with [`Error::BackendUnavailable`].
pub struct Collection {
    db: Database,
    dir: PathBuf,
    name: String,
    documents: String,
    embeddings: String,
}

impl Collection {
    /// Open the store under `dir` (created if missing) and get or create
    /// the collection `name`.
    ///
    /// Fails with [`Error::IncompatibleStore`] when the store was written
    /// with a different schema version, and with
    /// [`Error::BackendUnavailable`] when another process holds the store.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use folio::vector_store::Collection;
    ///
    /// let collection = Collection::open(tmp.path(), "portfolio").unwrap();
    /// assert_eq!(collection.count().unwrap(), 0);
    /// ```
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(STORE_FILE);
        let db = Database::create(&path).map_err(|e| match e {
            DatabaseError::DatabaseAlreadyOpen => {
                tracing::warn!(
                    store = %path.display(),
                    "store locked by another process"
                );
                Error::BackendUnavailable(format!(
                    "store {} is locked by another process",
                    path.display()
                ))
            }
            other => Error::from(other),
        })?;

        let collection = Self {
            db,
            dir: dir.to_path_buf(),
            name: name.to_string(),
            documents: format!("{name}.documents"),
            embeddings: format!("{name}.embeddings"),
        };

        let txn = collection.db.begin_write()?;
        {
            let mut meta = txn.open_table(STORE_META)?;
            let existing =
                meta.get(SCHEMA_VERSION_KEY)?.map(|v| v.value().to_string());
            match existing {
                Some(version) if version != SCHEMA_VERSION => {
                    return Err(Error::IncompatibleStore(format!(
                        "schema version {version}, expected {SCHEMA_VERSION}"
                    )));
                }
                Some(_) => {}
                None => {
                    meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION)?;
                }
            }
        }
        txn.open_table(collection.documents_table())?;
        txn.open_table(collection.embeddings_table())?;
        txn.commit()?;

        Ok(collection)
    }

    /// Directory holding the store file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn documents_table(&self) -> TableDefinition<'_, u64, &'static [u8]> {
        TableDefinition::new(&self.documents)
    }

    fn embeddings_table(&self) -> TableDefinition<'_, u64, &'static [u8]> {
        TableDefinition::new(&self.embeddings)
    }

    /// Number of documents in the collection.
    pub fn count(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(self.documents_table())?;
        Ok(table.len()?)
    }

    /// Append documents with their embeddings in a single transaction.
    pub fn insert(
        &self,
        entries: &[(StoredDocument, EmbeddingMatrix)],
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin_write()?;
        {
            let mut documents = txn.open_table(self.documents_table())?;
            let mut embeddings = txn.open_table(self.embeddings_table())?;

            let mut seq = match documents.last()? {
                Some((key, _)) => key.value() + 1,
                None => 0,
            };

            for (document, matrix) in entries {
                let bytes = serde_json::to_vec(document)?;
                documents.insert(seq, bytes.as_slice())?;
                embeddings.insert(seq, encode_matrix(matrix).as_slice())?;
                seq += 1;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// All documents with their embeddings, in insertion order.
    ///
    /// Documents whose embedding is missing or malformed are skipped.
    pub fn load_all(&self) -> Result<Vec<(StoredDocument, EmbeddingMatrix)>> {
        let txn = self.db.begin_read()?;
        let documents = txn.open_table(self.documents_table())?;
        let embeddings = txn.open_table(self.embeddings_table())?;

        let mut result = Vec::new();
        for entry in documents.iter()? {
            let (key, value) = entry?;
            let document: StoredDocument =
                serde_json::from_slice(value.value())?;

            let Some(guard) = embeddings.get(key.value())? else {
                tracing::debug!(id = %document.id, "document has no embedding");
                continue;
            };
            let Some(matrix) = decode_matrix(guard.value()) else {
                tracing::debug!(id = %document.id, "malformed embedding");
                continue;
            };
            result.push((document, matrix));
        }

        Ok(result)
    }

    /// Remove every document and embedding from the collection.
    pub fn clear(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(self.documents_table())?;
        txn.delete_table(self.embeddings_table())?;
        txn.open_table(self.documents_table())?;
        txn.open_table(self.embeddings_table())?;
        txn.commit()?;
        Ok(())
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("dir", &self.dir)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn encode_matrix(matrix: &EmbeddingMatrix) -> Vec<u8> {
    let mut bytes =
        Vec::with_capacity(HEADER_SIZE + std::mem::size_of_val(&matrix.data[..]));
    bytes.extend_from_slice(&matrix.num_tokens.to_le_bytes());
    bytes.extend_from_slice(&matrix.dimension.to_le_bytes());
    bytes.extend_from_slice(bytemuck::cast_slice(&matrix.data));
    bytes
}

fn decode_matrix(bytes: &[u8]) -> Option<EmbeddingMatrix> {
    if bytes.len() < HEADER_SIZE {
        return None;
    }

    let num_tokens = u32::from_le_bytes(bytes[0..4].try_into().ok()?);
    let dimension = u32::from_le_bytes(bytes[4..8].try_into().ok()?);

    let expected_len =
        HEADER_SIZE + (num_tokens as usize) * (dimension as usize) * 4;
    if bytes.len() != expected_len {
        return None;
    }

    // The value slice is not guaranteed to be 4-byte aligned.
    let data: Vec<f32> = bytes[HEADER_SIZE..]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Some(EmbeddingMatrix {
        num_tokens,
        dimension,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(text: &str, link: &str) -> StoredDocument {
        StoredDocument {
            id: Uuid::new_v4(),
            document: text.to_string(),
            metadata: BTreeMap::from([("links".to_string(), link.to_string())]),
        }
    }

    fn matrix(values: &[f32]) -> EmbeddingMatrix {
        EmbeddingMatrix::new(1, values.len() as u32, values.to_vec()).unwrap()
    }

    #[test]
    fn insert_and_load_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let collection = Collection::open(tmp.path(), "portfolio").unwrap();

        let a = document("Rust, Tokio", "https://a");
        let b = document("Python", "https://b");
        collection
            .insert(&[
                (a.clone(), matrix(&[1.0, 0.0])),
                (b.clone(), matrix(&[0.0, 1.0])),
            ])
            .unwrap();

        assert_eq!(collection.count().unwrap(), 2);

        let loaded = collection.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].0, a);
        assert_eq!(loaded[0].1.data, vec![1.0, 0.0]);
        assert_eq!(loaded[1].0, b);
    }

    #[test]
    fn successive_inserts_append() {
        let tmp = tempfile::tempdir().unwrap();
        let collection = Collection::open(tmp.path(), "portfolio").unwrap();

        collection
            .insert(&[(document("Go", "https://go"), matrix(&[1.0]))])
            .unwrap();
        collection
            .insert(&[(document("Rust", "https://rust"), matrix(&[2.0]))])
            .unwrap();

        let loaded = collection.load_all().unwrap();
        let docs: Vec<&str> =
            loaded.iter().map(|(d, _)| d.document.as_str()).collect();
        assert_eq!(docs, vec!["Go", "Rust"]);
    }

    #[test]
    fn reopen_preserves_data() {
        let tmp = tempfile::tempdir().unwrap();

        {
            let collection = Collection::open(tmp.path(), "portfolio").unwrap();
            collection
                .insert(&[(document("Go", "https://go"), matrix(&[1.0]))])
                .unwrap();
        }

        let collection = Collection::open(tmp.path(), "portfolio").unwrap();
        assert_eq!(collection.count().unwrap(), 1);
    }

    #[test]
    fn collections_are_isolated() {
        let tmp = tempfile::tempdir().unwrap();

        {
            let portfolio = Collection::open(tmp.path(), "portfolio").unwrap();
            portfolio
                .insert(&[(document("Go", "https://go"), matrix(&[1.0]))])
                .unwrap();
        }

        let other = Collection::open(tmp.path(), "archive").unwrap();
        assert_eq!(other.count().unwrap(), 0);
    }

    #[test]
    fn clear_empties_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let collection = Collection::open(tmp.path(), "portfolio").unwrap();
        collection
            .insert(&[(document("Go", "https://go"), matrix(&[1.0]))])
            .unwrap();

        collection.clear().unwrap();

        assert_eq!(collection.count().unwrap(), 0);
        assert!(collection.load_all().unwrap().is_empty());
    }

    #[test]
    fn second_open_of_locked_store_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let _first = Collection::open(tmp.path(), "portfolio").unwrap();

        let err = Collection::open(tmp.path(), "portfolio").unwrap_err();

        assert!(matches!(err, Error::BackendUnavailable(_)));
    }

    #[test]
    fn corrupt_store_file_fails_to_open() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(STORE_FILE), vec![0xAB; 4096]).unwrap();

        assert!(Collection::open(tmp.path(), "portfolio").is_err());
    }

    #[test]
    fn store_path_that_is_a_file_fails_to_open() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "plain file").unwrap();

        assert!(Collection::open(&file, "portfolio").is_err());
    }

    #[test]
    fn schema_version_mismatch_is_incompatible() {
        let tmp = tempfile::tempdir().unwrap();

        {
            let db = Database::create(tmp.path().join(STORE_FILE)).unwrap();
            let txn = db.begin_write().unwrap();
            {
                let mut meta = txn.open_table(STORE_META).unwrap();
                meta.insert(SCHEMA_VERSION_KEY, "0").unwrap();
            }
            txn.commit().unwrap();
        }

        let err = Collection::open(tmp.path(), "portfolio").unwrap_err();
        assert!(matches!(err, Error::IncompatibleStore(_)));
    }

    #[test]
    fn matrix_encoding_round_trips() {
        let original = EmbeddingMatrix::new(2, 2, vec![0.5, -1.0, 3.25, 0.0])
            .unwrap();
        let decoded = decode_matrix(&encode_matrix(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_truncated_bytes() {
        let original = EmbeddingMatrix::new(1, 3, vec![1.0, 2.0, 3.0]).unwrap();
        let bytes = encode_matrix(&original);
        assert!(decode_matrix(&bytes[..bytes.len() - 1]).is_none());
        assert!(decode_matrix(&bytes[..4]).is_none());
    }
}
