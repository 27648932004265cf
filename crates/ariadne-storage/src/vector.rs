//! Companion similarity-search store.
//!
//! A SQLite file inside the vector directory holds three named collections
//! (summaries, glossary, constraints). Embeddings are stored as f32
//! little-endian BLOBs; search is brute-force cosine over the collection
//! with optional metadata filters. IDs are strings equal to the owning SQL
//! row's primary identifier, so one join key binds both stores.
//!
//! Failures are raised to the caller; recovery policy belongs to the
//! dual-write coordinator.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use ariadne_core::StorageError;

use crate::pragmas::configure_connection;
use crate::sqe;

/// Database file name inside the vector directory.
const VECTOR_DB_FILE: &str = "vectors.db";

/// The three logical collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Summaries,
    Glossary,
    Constraints,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summaries => "summaries",
            Self::Glossary => "glossary",
            Self::Constraints => "constraints",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "summaries" => Some(Self::Summaries),
            "glossary" => Some(Self::Glossary),
            "constraints" => Some(Self::Constraints),
            _ => None,
        }
    }

    pub const ALL: [Collection; 3] =
        [Self::Summaries, Self::Glossary, Self::Constraints];
}

/// One stored vector record.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub document: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<serde_json::Value>,
}

/// One ranked search hit. Distance is cosine distance (`1 - similarity`).
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub distance: f32,
    pub document: String,
    pub metadata: Option<serde_json::Value>,
}

/// Persistent vector store over a companion directory.
pub struct VectorStore {
    conn: Mutex<Connection>,
    dir: PathBuf,
}

impl VectorStore {
    /// Open (creating if needed) the store under `dir`.
    pub fn open(dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join(VECTOR_DB_FILE)).map_err(sqe)?;
        configure_connection(&conn)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vector_records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                document TEXT NOT NULL DEFAULT '',
                embedding BLOB,
                metadata TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, id)
            );
            CREATE INDEX IF NOT EXISTS idx_vector_records_collection
                ON vector_records(collection);",
        )
        .map_err(sqe)?;

        info!(dir = %dir.display(), "Opened vector store");
        Ok(Self {
            conn: Mutex::new(conn),
            dir: dir.to_path_buf(),
        })
    }

    /// Open an in-memory store (tests).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(sqe)?;
        configure_connection(&conn)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vector_records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                document TEXT NOT NULL DEFAULT '',
                embedding BLOB,
                metadata TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, id)
            );",
        )
        .map_err(sqe)?;
        Ok(Self {
            conn: Mutex::new(conn),
            dir: PathBuf::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::vector(format!("lock poisoned: {e}")))?;
        f(&conn)
    }

    /// Insert a record. Fails if the id already exists in the collection.
    pub fn add(
        &self,
        collection: Collection,
        id: &str,
        document: &str,
        embedding: Option<&[f32]>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO vector_records (collection, id, document, embedding, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    collection.as_str(),
                    id,
                    document,
                    embedding.map(embedding_to_bytes),
                    metadata.map(|m| m.to_string()),
                ],
            )
            .map_err(|e| StorageError::vector(format!("add {id}: {e}")))?;
            Ok(())
        })
    }

    /// Fetch a record by id.
    pub fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<VectorRecord>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, document, embedding, metadata FROM vector_records
                 WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
                map_vector_row,
            )
            .optional()
            .map_err(|e| StorageError::vector(e))
        })
    }

    /// Update fields of an existing record; `None` leaves a field unchanged.
    pub fn update(
        &self,
        collection: Collection,
        id: &str,
        document: Option<&str>,
        embedding: Option<&[f32]>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            let n = conn
                .execute(
                    "UPDATE vector_records SET
                     document = COALESCE(?3, document),
                     embedding = COALESCE(?4, embedding),
                     metadata = COALESCE(?5, metadata)
                     WHERE collection = ?1 AND id = ?2",
                    params![
                        collection.as_str(),
                        id,
                        document,
                        embedding.map(embedding_to_bytes),
                        metadata.map(|m| m.to_string()),
                    ],
                )
                .map_err(|e| StorageError::vector(e))?;
            if n == 0 {
                return Err(StorageError::vector(format!(
                    "update {id}: no such record in {}",
                    collection.as_str()
                )));
            }
            Ok(())
        })
    }

    /// Delete records by id. Missing ids are ignored.
    pub fn delete(&self, collection: Collection, ids: &[String]) -> Result<usize, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            let mut removed = 0;
            let mut stmt = conn
                .prepare_cached(
                    "DELETE FROM vector_records WHERE collection = ?1 AND id = ?2",
                )
                .map_err(|e| StorageError::vector(e))?;
            for id in ids {
                removed += stmt
                    .execute(params![collection.as_str(), id])
                    .map_err(|e| StorageError::vector(e))?;
            }
            Ok(removed)
        })
    }

    /// Number of records in a collection.
    pub fn count(&self, collection: Collection) -> Result<i64, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM vector_records WHERE collection = ?1",
                params![collection.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| StorageError::vector(e))
        })
    }

    /// All ids in a collection (orphan reconciliation).
    pub fn list_ids(&self, collection: Collection) -> Result<Vec<String>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached("SELECT id FROM vector_records WHERE collection = ?1")
                .map_err(|e| StorageError::vector(e))?;
            let rows = stmt
                .query_map(params![collection.as_str()], |row| row.get(0))
                .map_err(|e| StorageError::vector(e))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row.map_err(|e| StorageError::vector(e))?);
            }
            Ok(ids)
        })
    }

    /// Ranked cosine search: the `k` nearest records whose metadata
    /// contains every filter key with an equal value. Records without an
    /// embedding, with mismatched dimensions, or with zero norm never match.
    pub fn search(
        &self,
        collection: Collection,
        query_embedding: &[f32],
        k: usize,
        filters: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Vec<VectorMatch>, StorageError> {
        let candidates = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, document, embedding, metadata FROM vector_records
                     WHERE collection = ?1 AND embedding IS NOT NULL",
                )
                .map_err(|e| StorageError::vector(e))?;
            let rows = stmt
                .query_map(params![collection.as_str()], map_vector_row)
                .map_err(|e| StorageError::vector(e))?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row.map_err(|e| StorageError::vector(e))?);
            }
            Ok(records)
        })?;

        let mut matches: Vec<VectorMatch> = candidates
            .into_iter()
            .filter(|record| metadata_matches(record.metadata.as_ref(), filters))
            .filter_map(|record| {
                let embedding = record.embedding.as_deref()?;
                let similarity = cosine_similarity(query_embedding, embedding)?;
                Some(VectorMatch {
                    id: record.id,
                    distance: 1.0 - similarity,
                    document: record.document,
                    metadata: record.metadata,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(k);
        Ok(matches)
    }

    /// Per-collection record counts.
    pub fn stats(&self) -> Result<Vec<(Collection, i64)>, StorageError> {
        Collection::ALL
            .iter()
            .map(|&c| self.count(c).map(|n| (c, n)))
            .collect()
    }

    /// Remove every record in every collection.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM vector_records", [])
                .map_err(|e| StorageError::vector(e))?;
            Ok(())
        })
    }
}

fn map_vector_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VectorRecord> {
    let embedding: Option<Vec<u8>> = row.get(2)?;
    let metadata: Option<String> = row.get(3)?;
    Ok(VectorRecord {
        id: row.get(0)?,
        document: row.get(1)?,
        embedding: embedding.as_deref().map(bytes_to_embedding),
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
    })
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// None for dimension mismatch or zero-norm inputs.
fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Every filter key must be present and equal in the record's metadata.
fn metadata_matches(
    metadata: Option<&serde_json::Value>,
    filters: Option<&serde_json::Map<String, serde_json::Value>>,
) -> bool {
    let Some(filters) = filters else {
        return true;
    };
    if filters.is_empty() {
        return true;
    }
    let Some(serde_json::Value::Object(fields)) = metadata else {
        return false;
    };
    filters.iter().all(|(key, expected)| fields.get(key) == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_bytes_round_trip() {
        let original = vec![1.0f32, -0.5, 0.25, 1e-7];
        let bytes = embedding_to_bytes(&original);
        assert_eq!(bytes_to_embedding(&bytes), original);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
        let sim = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn search_ranks_by_similarity() {
        let store = VectorStore::open_in_memory().unwrap();
        store
            .add(Collection::Summaries, "1", "exact", Some(&[1.0, 0.0, 0.0]), None)
            .unwrap();
        store
            .add(Collection::Summaries, "2", "close", Some(&[0.9, 0.1, 0.0]), None)
            .unwrap();
        store
            .add(Collection::Summaries, "3", "far", Some(&[0.0, 0.0, 1.0]), None)
            .unwrap();

        let matches = store
            .search(Collection::Summaries, &[1.0, 0.0, 0.0], 2, None)
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "1");
        assert_eq!(matches[1].id, "2");
        assert!(matches[0].distance < matches[1].distance);
    }

    #[test]
    fn metadata_filters_restrict_matches() {
        let store = VectorStore::open_in_memory().unwrap();
        let class_meta = serde_json::json!({"level": "class"});
        let method_meta = serde_json::json!({"level": "method"});
        store
            .add(Collection::Summaries, "c", "class doc", Some(&[1.0, 0.0]), Some(&class_meta))
            .unwrap();
        store
            .add(Collection::Summaries, "m", "method doc", Some(&[1.0, 0.0]), Some(&method_meta))
            .unwrap();

        let mut filters = serde_json::Map::new();
        filters.insert("level".into(), serde_json::json!("class"));
        let matches = store
            .search(Collection::Summaries, &[1.0, 0.0], 10, Some(&filters))
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "c");
    }

    #[test]
    fn collections_are_isolated() {
        let store = VectorStore::open_in_memory().unwrap();
        store
            .add(Collection::Summaries, "1", "a", Some(&[1.0]), None)
            .unwrap();
        store
            .add(Collection::Glossary, "1", "b", Some(&[1.0]), None)
            .unwrap();

        assert_eq!(store.count(Collection::Summaries).unwrap(), 1);
        assert_eq!(store.count(Collection::Glossary).unwrap(), 1);
        assert_eq!(store.count(Collection::Constraints).unwrap(), 0);

        store.delete(Collection::Summaries, &["1".to_string()]).unwrap();
        assert_eq!(store.count(Collection::Summaries).unwrap(), 0);
        assert_eq!(store.count(Collection::Glossary).unwrap(), 1);
    }

    #[test]
    fn duplicate_add_fails() {
        let store = VectorStore::open_in_memory().unwrap();
        store.add(Collection::Glossary, "x", "a", None, None).unwrap();
        assert!(store.add(Collection::Glossary, "x", "b", None, None).is_err());
    }
}
