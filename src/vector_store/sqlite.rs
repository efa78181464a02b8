//! SQLite-based document store implementation.
//!
//! Embeddings are stored as JSON text and similarity is computed in Rust by the
//! search engine over the candidates returned here.

use super::{
    summarize_video, CollectionStats, DocumentMetadata, DocumentStore, IndexedDocument,
    IndexedVideo,
};
use crate::error::{FinnError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        collection TEXT NOT NULL,
        video_id TEXT NOT NULL,
        video_title TEXT NOT NULL,
        video_url TEXT NOT NULL,
        content TEXT NOT NULL,
        start_seconds REAL NOT NULL,
        end_seconds REAL NOT NULL,
        embedding TEXT,
        chunk_order INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_video_id ON documents(video_id);
    CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
"#;

const SELECT_COLUMNS: &str = "id, collection, video_id, video_title, video_url, content, \
     start_seconds, end_seconds, embedding, chunk_order, indexed_at";

/// SQLite-based document store.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

/// A row as stored, before the embedding JSON and timestamps are decoded.
struct StoredRow {
    id: String,
    embedding_json: Option<String>,
    indexed_at: String,
    text: String,
    metadata: DocumentMetadata,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            metadata: DocumentMetadata {
                collection: row.get(1)?,
                video_id: row.get(2)?,
                video_title: row.get(3)?,
                video_url: row.get(4)?,
                start_seconds: row.get(6)?,
                end_seconds: row.get(7)?,
                chunk_order: row.get(9)?,
            },
            text: row.get(5)?,
            embedding_json: row.get(8)?,
            indexed_at: row.get(10)?,
        })
    }

    fn decode(self) -> Result<IndexedDocument> {
        let id = uuid::Uuid::parse_str(&self.id).map_err(|e| {
            FinnError::VectorStore(format!("invalid document id {}: {}", self.id, e))
        })?;

        let embedding = match self.embedding_json.as_deref() {
            None | Some("") => None,
            Some(json) => Some(serde_json::from_str::<Vec<f32>>(json).map_err(|e| {
                FinnError::MalformedEmbedding {
                    id: self.id.clone(),
                    reason: e.to_string(),
                }
            })?),
        };

        let indexed_at = DateTime::parse_from_rfc3339(&self.indexed_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(IndexedDocument {
            id,
            text: self.text,
            embedding,
            metadata: self.metadata,
            indexed_at,
        })
    }
}

impl SqliteDocumentStore {
    /// Open or create a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite document store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FinnError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Run a SELECT over documents and decode rows, skipping undecodable ones.
    fn query_documents(
        conn: &Connection,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<IndexedDocument>> {
        let sql = format!(
            "SELECT {} FROM documents {} ORDER BY video_id, chunk_order",
            SELECT_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, StoredRow::from_row)?;

        let mut docs = Vec::new();
        for row in rows {
            match row.map_err(FinnError::from).and_then(StoredRow::decode) {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!("Skipping unreadable document: {}", e),
            }
        }
        Ok(docs)
    }

    fn insert_documents(conn: &Connection, docs: &[IndexedDocument]) -> Result<()> {
        for doc in docs {
            let embedding_json = doc
                .embedding
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            conn.execute(
                r#"
                INSERT OR REPLACE INTO documents
                (id, collection, video_id, video_title, video_url, content,
                 start_seconds, end_seconds, embedding, chunk_order, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    doc.id.to_string(),
                    doc.metadata.collection,
                    doc.metadata.video_id,
                    doc.metadata.video_title,
                    doc.metadata.video_url,
                    doc.text,
                    doc.metadata.start_seconds,
                    doc.metadata.end_seconds,
                    embedding_json,
                    doc.metadata.chunk_order,
                    doc.indexed_at.to_rfc3339(),
                ],
            )?;
        }
        Ok(())
    }

    fn scoped_documents(conn: &Connection, scope: Option<&str>) -> Result<Vec<IndexedDocument>> {
        match scope {
            Some(collection) => {
                Self::query_documents(conn, "WHERE collection = ?1", &[&collection])
            }
            None => Self::query_documents(conn, "", &[]),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn add(&self, docs: &[IndexedDocument]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        Self::insert_documents(&tx, docs)?;
        tx.commit()?;

        info!("Stored {} documents", docs.len());
        Ok(docs.len())
    }

    #[instrument(skip(self))]
    async fn candidates(&self, scope: Option<&str>) -> Result<Vec<IndexedDocument>> {
        let conn = self.lock()?;
        let docs = Self::scoped_documents(&conn, scope)?;
        debug!("Loaded {} candidate documents", docs.len());
        Ok(docs)
    }

    async fn count(&self, scope: Option<&str>) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = match scope {
            Some(collection) => conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn replace_video(&self, video_id: &str, docs: &[IndexedDocument]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let deleted = tx.execute(
            "DELETE FROM documents WHERE video_id = ?1",
            params![video_id],
        )?;
        Self::insert_documents(&tx, docs)?;

        tx.commit()?;
        info!(
            "Replaced {} documents with {} for video {}",
            deleted,
            docs.len(),
            video_id
        );
        Ok(docs.len())
    }

    #[instrument(skip(self))]
    async fn delete_by_video_id(&self, video_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM documents WHERE video_id = ?1",
            params![video_id],
        )?;

        info!("Deleted {} documents for video {}", deleted, video_id);
        Ok(deleted)
    }

    async fn is_video_indexed(&self, video_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn get_by_video_id(&self, video_id: &str) -> Result<Vec<IndexedDocument>> {
        let conn = self.lock()?;
        let docs = Self::query_documents(&conn, "WHERE video_id = ?1", &[&video_id])?;
        debug!("Found {} documents for video {}", docs.len(), video_id);
        Ok(docs)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self, scope: Option<&str>) -> Result<Vec<IndexedVideo>> {
        let conn = self.lock()?;
        let docs = Self::scoped_documents(&conn, scope)?;

        let mut by_video: BTreeMap<&str, Vec<&IndexedDocument>> = BTreeMap::new();
        for doc in &docs {
            by_video.entry(doc.metadata.video_id.as_str()).or_default().push(doc);
        }

        let mut videos: Vec<IndexedVideo> = by_video
            .values()
            .filter_map(|group| summarize_video(group))
            .collect();
        videos.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(videos)
    }

    async fn collections(&self) -> Result<Vec<CollectionStats>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT collection,
                   COUNT(DISTINCT video_id),
                   COUNT(*),
                   SUM(CASE WHEN embedding IS NOT NULL AND embedding != '' THEN 1 ELSE 0 END)
            FROM documents
            GROUP BY collection
            ORDER BY collection
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let videos: i64 = row.get(1)?;
            let documents: i64 = row.get(2)?;
            let embedded: i64 = row.get(3)?;
            Ok(CollectionStats {
                collection: row.get(0)?,
                videos: videos as usize,
                documents: documents as usize,
                embedded_documents: embedded as usize,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn close(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        debug!("Checkpointed SQLite store");
        Ok(())
    }
}
