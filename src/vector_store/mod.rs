//! Document store abstraction for finn.
//!
//! Provides a trait-based interface over the backends that hold indexed
//! transcript chunks and their embeddings.

mod memory;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use crate::config::Settings;
use crate::error::{FinnError, Result};
use crate::transcript::format_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Where a stored chunk came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Collection (playlist, course, channel) the video was ingested into.
    pub collection: String,
    pub video_id: String,
    pub video_title: String,
    pub video_url: String,
    /// Start time in the video (seconds).
    pub start_seconds: f64,
    /// End time in the video (seconds).
    pub end_seconds: f64,
    /// Order of this chunk in the video.
    pub chunk_order: i32,
}

/// A chunk stored in the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Unique document ID.
    pub id: Uuid,
    /// Text content of this chunk.
    pub text: String,
    /// Embedding vector, absent when the provider was unavailable at ingest time.
    pub embedding: Option<Vec<f32>>,
    pub metadata: DocumentMetadata,
    /// When this document was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexedDocument {
    /// Create a new document with a fresh ID.
    pub fn new(text: String, embedding: Option<Vec<f32>>, metadata: DocumentMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            embedding,
            metadata,
            indexed_at: Utc::now(),
        }
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Format the start timestamp for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.metadata.start_seconds)
    }
}

/// Summary information about an indexed video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedVideo {
    pub collection: String,
    pub video_id: String,
    pub video_title: String,
    pub video_url: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// Chunks that carry an embedding.
    pub embedded_chunks: u32,
    /// Total duration in seconds.
    pub total_duration_seconds: f64,
    /// When the video was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Per-collection counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub collection: String,
    pub videos: usize,
    pub documents: usize,
    pub embedded_documents: usize,
}

/// Trait for document store implementations.
///
/// `scope` restricts an operation to one collection; `None` means all.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert documents, replacing any with the same ID.
    async fn add(&self, docs: &[IndexedDocument]) -> Result<usize>;

    /// All documents eligible for a query in the given scope.
    async fn candidates(&self, scope: Option<&str>) -> Result<Vec<IndexedDocument>>;

    /// Number of documents in the given scope.
    async fn count(&self, scope: Option<&str>) -> Result<usize>;

    /// Replace every document of a video with `docs` in one atomic write.
    ///
    /// On error the previously stored documents are left untouched.
    async fn replace_video(&self, video_id: &str, docs: &[IndexedDocument]) -> Result<usize>;

    /// Delete documents by video ID.
    async fn delete_by_video_id(&self, video_id: &str) -> Result<usize>;

    /// Check if a video is indexed.
    async fn is_video_indexed(&self, video_id: &str) -> Result<bool>;

    /// Get all documents for a video, in chunk order.
    async fn get_by_video_id(&self, video_id: &str) -> Result<Vec<IndexedDocument>>;

    /// List indexed videos, most recently indexed first.
    async fn list_videos(&self, scope: Option<&str>) -> Result<Vec<IndexedVideo>>;

    /// Counts for every collection.
    async fn collections(&self) -> Result<Vec<CollectionStats>>;

    /// Flush and release the backend.
    async fn close(&self) -> Result<()>;
}

/// Build the configured store.
pub fn create_store(settings: &Settings) -> Result<Arc<dyn DocumentStore>> {
    match settings.vector_store.provider.to_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteDocumentStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryDocumentStore::new())),
        other => Err(FinnError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Summarise a video's documents, which must be non-empty and share a video ID.
fn summarize_video(docs: &[&IndexedDocument]) -> Option<IndexedVideo> {
    let first = docs.first()?;
    Some(IndexedVideo {
        collection: first.metadata.collection.clone(),
        video_id: first.metadata.video_id.clone(),
        video_title: first.metadata.video_title.clone(),
        video_url: first.metadata.video_url.clone(),
        chunk_count: docs.len() as u32,
        embedded_chunks: docs.iter().filter(|d| d.has_embedding()).count() as u32,
        total_duration_seconds: docs
            .iter()
            .map(|d| d.metadata.end_seconds)
            .fold(0.0, f64::max),
        indexed_at: docs.iter().map(|d| d.indexed_at).max().unwrap_or(first.indexed_at),
    })
}

#[cfg(test)]
pub(crate) fn test_document(
    collection: &str,
    video_id: &str,
    text: &str,
    start: f64,
    embedding: Option<Vec<f32>>,
) -> IndexedDocument {
    IndexedDocument::new(
        text.to_string(),
        embedding,
        DocumentMetadata {
            collection: collection.to_string(),
            video_id: video_id.to_string(),
            video_title: format!("Video {}", video_id),
            video_url: format!("https://www.youtube.com/watch?v={}", video_id),
            start_seconds: start,
            end_seconds: start + 10.0,
            chunk_order: (start / 10.0) as i32,
        },
    )
}
