//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large datasets, consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{
    check_compatible, cosine_similarity, rank, CollectionInfo, IndexEntry, SearchResult,
    VectorStore,
};
use crate::error::{DocqaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        embedding_model TEXT NOT NULL,
        dimensions INTEGER NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS entries (
        id TEXT PRIMARY KEY,
        collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
        source TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_collection ON entries(collection);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(&conn)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DocqaError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<IndexEntry> {
        let id_str: String = row.get(0)?;
        let chunk_index: i64 = row.get(3)?;
        let embedding_bytes: Vec<u8> = row.get(5)?;
        let indexed_at_str: String = row.get(6)?;

        Ok(IndexEntry {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            collection: row.get(1)?,
            source: row.get(2)?,
            chunk_index: chunk_index as usize,
            content: row.get(4)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: Self::parse_time(&indexed_at_str),
        })
    }

    fn query_info(conn: &Connection, collection: &str) -> Result<Option<CollectionInfo>> {
        let info = conn
            .query_row(
                r#"
                SELECT c.name, c.embedding_model, c.dimensions, c.created_at,
                       (SELECT COUNT(*) FROM entries e WHERE e.collection = c.name)
                FROM collections c
                WHERE c.name = ?1
                "#,
                params![collection],
                Self::row_to_info,
            )
            .optional()?;
        Ok(info)
    }

    fn row_to_info(row: &Row<'_>) -> rusqlite::Result<CollectionInfo> {
        let dimensions: i64 = row.get(2)?;
        let created_at: String = row.get(3)?;
        let entry_count: i64 = row.get(4)?;
        Ok(CollectionInfo {
            name: row.get(0)?,
            embedding_model: row.get(1)?,
            dimensions: dimensions as usize,
            entry_count: entry_count as usize,
            created_at: Self::parse_time(&created_at),
        })
    }

    fn write_entry(conn: &Connection, entry: &IndexEntry) -> Result<()> {
        let dimensions: Option<i64> = conn
            .query_row(
                "SELECT dimensions FROM collections WHERE name = ?1",
                params![entry.collection],
                |row| row.get(0),
            )
            .optional()?;

        match dimensions {
            None => {
                return Err(DocqaError::VectorStore(format!(
                    "collection '{}' is not registered",
                    entry.collection
                )))
            }
            Some(dims) if dims as usize != entry.embedding.len() => {
                return Err(DocqaError::VectorStore(format!(
                    "collection '{}' holds {}-dimensional vectors, got {}",
                    entry.collection,
                    dims,
                    entry.embedding.len()
                )))
            }
            Some(_) => {}
        }

        conn.execute(
            r#"
            INSERT OR REPLACE INTO entries
            (id, collection, source, chunk_index, content, embedding, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.id.to_string(),
                entry.collection,
                entry.source,
                entry.chunk_index as i64,
                entry.content,
                Self::embedding_to_bytes(&entry.embedding),
                entry.indexed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self))]
    async fn register_collection(
        &self,
        collection: &str,
        embedding_model: &str,
        dimensions: usize,
    ) -> Result<CollectionInfo> {
        let conn = self.lock()?;

        if let Some(existing) = Self::query_info(&conn, collection)? {
            check_compatible(&existing, embedding_model, dimensions)?;
            return Ok(existing);
        }

        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO collections (name, embedding_model, dimensions, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![collection, embedding_model, dimensions as i64, created_at.to_rfc3339()],
        )?;

        info!("Registered collection '{}' ({}, {} dims)", collection, embedding_model, dimensions);
        Ok(CollectionInfo {
            name: collection.to_string(),
            embedding_model: embedding_model.to_string(),
            dimensions,
            entry_count: 0,
            created_at,
        })
    }

    async fn collection_info(&self, collection: &str) -> Result<Option<CollectionInfo>> {
        let conn = self.lock()?;
        Self::query_info(&conn, collection)
    }

    #[instrument(skip(self, entry))]
    async fn upsert(&self, entry: &IndexEntry) -> Result<()> {
        let conn = self.lock()?;
        Self::write_entry(&conn, entry)?;
        debug!("Upserted entry {}", entry.id);
        Ok(())
    }

    #[instrument(skip(self, entries))]
    async fn upsert_batch(&self, entries: &[IndexEntry]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for entry in entries {
            Self::write_entry(&tx, entry)?;
        }

        tx.commit()?;
        debug!("Batch upserted {} entries", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(collection, query_embedding, limit, f32::MIN)
            .await
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_with_threshold(
        &self,
        collection: &str,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, collection, source, chunk_index, content, embedding, indexed_at
            FROM entries
            WHERE collection = ?1
            "#,
        )?;

        let entries = stmt
            .query_map(params![collection], Self::row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let results: Vec<SearchResult> = entries
            .into_iter()
            .map(|entry| SearchResult {
                score: cosine_similarity(query_embedding, &entry.embedding),
                entry,
            })
            .filter(|r| r.score >= min_score)
            .collect();

        let results = rank(results, limit);
        debug!("Found {} matching entries", results.len());
        Ok(results)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    #[instrument(skip(self))]
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT c.name, c.embedding_model, c.dimensions, c.created_at,
                   (SELECT COUNT(*) FROM entries e WHERE e.collection = c.name)
            FROM collections c
            ORDER BY c.name
            "#,
        )?;

        let collections = stmt
            .query_map([], Self::row_to_info)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(collections)
    }

    #[instrument(skip(self))]
    async fn delete_collection(&self, collection: &str) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let deleted = tx.execute("DELETE FROM entries WHERE collection = ?1", params![collection])?;
        tx.execute("DELETE FROM collections WHERE name = ?1", params![collection])?;
        tx.commit()?;

        info!("Deleted {} entries from collection {}", deleted, collection);
        Ok(deleted)
    }
}
