//! In-memory document store implementation.
//!
//! Useful for testing and small datasets.

use super::{summarize_video, CollectionStats, DocumentStore, IndexedDocument, IndexedVideo};
use crate::error::{FinnError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory document store. Keeps insertion order.
pub struct MemoryDocumentStore {
    documents: RwLock<Vec<IndexedDocument>>,
}

impl MemoryDocumentStore {
    /// Create a new in-memory document store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<IndexedDocument>>> {
        self.documents
            .read()
            .map_err(|e| FinnError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<IndexedDocument>>> {
        self.documents
            .write()
            .map_err(|e| FinnError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn in_scope(doc: &IndexedDocument, scope: Option<&str>) -> bool {
    match scope {
        Some(s) => doc.metadata.collection == s,
        None => true,
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, docs: &[IndexedDocument]) -> Result<usize> {
        let mut store = self.write()?;
        for doc in docs {
            match store.iter_mut().find(|d| d.id == doc.id) {
                Some(existing) => *existing = doc.clone(),
                None => store.push(doc.clone()),
            }
        }
        Ok(docs.len())
    }

    async fn candidates(&self, scope: Option<&str>) -> Result<Vec<IndexedDocument>> {
        let docs = self.read()?;
        Ok(docs.iter().filter(|d| in_scope(d, scope)).cloned().collect())
    }

    async fn count(&self, scope: Option<&str>) -> Result<usize> {
        let docs = self.read()?;
        Ok(docs.iter().filter(|d| in_scope(d, scope)).count())
    }

    async fn replace_video(&self, video_id: &str, docs: &[IndexedDocument]) -> Result<usize> {
        let mut store = self.write()?;
        store.retain(|doc| doc.metadata.video_id != video_id);
        store.extend(docs.iter().cloned());
        Ok(docs.len())
    }

    async fn delete_by_video_id(&self, video_id: &str) -> Result<usize> {
        let mut docs = self.write()?;
        let initial_len = docs.len();
        docs.retain(|doc| doc.metadata.video_id != video_id);
        Ok(initial_len - docs.len())
    }

    async fn is_video_indexed(&self, video_id: &str) -> Result<bool> {
        let docs = self.read()?;
        Ok(docs.iter().any(|d| d.metadata.video_id == video_id))
    }

    async fn get_by_video_id(&self, video_id: &str) -> Result<Vec<IndexedDocument>> {
        let docs = self.read()?;
        let mut result: Vec<IndexedDocument> = docs
            .iter()
            .filter(|d| d.metadata.video_id == video_id)
            .cloned()
            .collect();
        result.sort_by_key(|d| d.metadata.chunk_order);
        Ok(result)
    }

    async fn list_videos(&self, scope: Option<&str>) -> Result<Vec<IndexedVideo>> {
        let docs = self.read()?;

        let mut by_video: BTreeMap<&str, Vec<&IndexedDocument>> = BTreeMap::new();
        for doc in docs.iter().filter(|d| in_scope(d, scope)) {
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
        let docs = self.read()?;

        let mut stats: BTreeMap<&str, (std::collections::BTreeSet<&str>, usize, usize)> =
            BTreeMap::new();
        for doc in docs.iter() {
            let entry = stats.entry(doc.metadata.collection.as_str()).or_default();
            entry.0.insert(doc.metadata.video_id.as_str());
            entry.1 += 1;
            if doc.has_embedding() {
                entry.2 += 1;
            }
        }

        Ok(stats
            .into_iter()
            .map(|(collection, (videos, documents, embedded))| CollectionStats {
                collection: collection.to_string(),
                videos: videos.len(),
                documents,
                embedded_documents: embedded,
            })
            .collect())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
