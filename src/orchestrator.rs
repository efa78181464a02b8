//! Pipeline orchestrator for finn.
//!
//! Coordinates caption fetching, parsing, chunking, embedding and indexing, and
//! hands out a search engine over the same store.

use crate::captions::{
    detect_format, parse_captions, CaptionSource, DefaultCaptionSource, FetchedCaptions, VideoRef,
};
use crate::chunking::{create_chunker, metadata_chunks, Chunk, Chunker};
use crate::config::Settings;
use crate::embedding::{create_embedder, Embedder};
use crate::error::Result;
use crate::search::{SearchEngine, SearchRequest, SearchResponse};
use crate::transcript::Transcript;
use crate::vector_store::{create_store, DocumentMetadata, DocumentStore, IndexedDocument};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One video to ingest.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// YouTube URL, video ID, or path to a `.vtt`/`.srt` file.
    pub input: String,
    /// Collection the video is indexed into.
    pub collection: String,
    /// Title to use instead of the one reported by the caption source.
    pub title: Option<String>,
    /// Re-index even when the video is already present.
    pub force: bool,
}

impl IngestRequest {
    pub fn new(input: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            collection: collection.into(),
            title: None,
            force: false,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// What happened to one ingested video.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Indexed {
        video_id: String,
        title: String,
        chunks: usize,
        /// Whether the chunks were stored with embeddings.
        embedded: bool,
    },
    /// No subtitles; title and description were indexed instead.
    MetadataOnly {
        video_id: String,
        title: String,
        chunks: usize,
        embedded: bool,
    },
    AlreadyIndexed {
        video_id: String,
    },
    NoCaptions {
        video_id: String,
    },
}

impl IngestOutcome {
    pub fn video_id(&self) -> &str {
        match self {
            IngestOutcome::Indexed { video_id, .. }
            | IngestOutcome::MetadataOnly { video_id, .. }
            | IngestOutcome::AlreadyIndexed { video_id }
            | IngestOutcome::NoCaptions { video_id } => video_id,
        }
    }
}

/// Per-item counts for a batch ingestion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub without_captions: usize,
    /// Videos indexed from title and description only.
    pub metadata_only: usize,
    /// Inputs that failed, with the reason.
    pub failed: Vec<(String, String)>,
    pub chunks_indexed: usize,
    /// Videos stored without embeddings.
    pub unembedded: usize,
}

impl IngestReport {
    fn record(&mut self, input: &str, result: Result<IngestOutcome>) {
        match result {
            Ok(IngestOutcome::Indexed {
                chunks, embedded, ..
            }) => {
                self.succeeded += 1;
                self.chunks_indexed += chunks;
                if !embedded {
                    self.unembedded += 1;
                }
            }
            Ok(IngestOutcome::MetadataOnly {
                chunks, embedded, ..
            }) => {
                self.metadata_only += 1;
                self.chunks_indexed += chunks;
                if !embedded {
                    self.unembedded += 1;
                }
            }
            Ok(IngestOutcome::AlreadyIndexed { .. }) => self.skipped += 1,
            Ok(IngestOutcome::NoCaptions { .. }) => self.without_captions += 1,
            Err(e) => self.failed.push((input.to_string(), e.to_string())),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded
            + self.metadata_only
            + self.skipped
            + self.without_captions
            + self.failed.len()
    }
}

/// The main orchestrator for the finn pipeline.
pub struct Orchestrator {
    settings: Settings,
    store: Arc<dyn DocumentStore>,
    embedder: Option<Arc<dyn Embedder>>,
    source: Arc<dyn CaptionSource>,
    chunker: Box<dyn Chunker>,
}

impl Orchestrator {
    /// Create an orchestrator from settings, opening the configured store.
    pub fn new(settings: Settings) -> Result<Self> {
        let store = create_store(&settings)?;
        let embedder = create_embedder(&settings.embedding)?;
        let source: Arc<dyn CaptionSource> =
            Arc::new(DefaultCaptionSource::from_settings(&settings.captions));

        Self::with_components(settings, store, embedder, source)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        embedder: Option<Arc<dyn Embedder>>,
        source: Arc<dyn CaptionSource>,
    ) -> Result<Self> {
        let chunker = create_chunker(&settings.chunking)?;

        if embedder.is_none() {
            info!("No embedding provider; documents are indexed for keyword search only");
        }

        Ok(Self {
            settings,
            store,
            embedder,
            source,
            chunker,
        })
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn embedder(&self) -> Option<Arc<dyn Embedder>> {
        self.embedder.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// A search engine over this orchestrator's store and embedder.
    pub fn search_engine(&self) -> SearchEngine {
        SearchEngine::new(
            self.store.clone(),
            self.embedder.clone(),
            self.settings.search.clone(),
            self.settings.scoring.clone(),
        )
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.search_engine().search(request).await
    }

    /// Fetch and parse captions for an input without indexing them.
    ///
    /// Returns `None` when the source has no captions for the video.
    #[instrument(skip(self))]
    pub async fn fetch_transcript(
        &self,
        input: &str,
        title: Option<&str>,
    ) -> Result<Option<(VideoRef, Transcript)>> {
        let (video, fetched) = self.fetch_captions(input, title).await?;
        let transcript = fetched.and_then(|f| parse_transcript(&video, &f));
        Ok(transcript.map(|t| (video, t)))
    }

    /// Resolve an input and fetch whatever the source has for it.
    async fn fetch_captions(
        &self,
        input: &str,
        title: Option<&str>,
    ) -> Result<(VideoRef, Option<FetchedCaptions>)> {
        let mut video = VideoRef::resolve(input, title)?;
        let fetched = self.source.fetch(&video).await?;

        if title.is_none() {
            if let Some(fetched_title) = fetched.as_ref().and_then(|f| f.title.clone()) {
                video.title = fetched_title;
            }
        }

        Ok((video, fetched))
    }

    /// Ingest one video: fetch, parse, chunk, embed and store.
    #[instrument(skip(self, request), fields(input = %request.input, collection = %request.collection))]
    pub async fn ingest(&self, request: &IngestRequest) -> Result<IngestOutcome> {
        let video = VideoRef::resolve(&request.input, request.title.as_deref())?;

        if !request.force && self.store.is_video_indexed(&video.video_id).await? {
            info!("Video {} is already indexed, skipping", video.video_id);
            return Ok(IngestOutcome::AlreadyIndexed {
                video_id: video.video_id,
            });
        }

        let (video, fetched) = self
            .fetch_captions(&request.input, request.title.as_deref())
            .await?;

        let Some(fetched) = fetched else {
            info!("No captions for {}", video.video_id);
            return Ok(IngestOutcome::NoCaptions {
                video_id: video.video_id,
            });
        };

        let (chunks, metadata_only) = match parse_transcript(&video, &fetched) {
            Some(transcript) => (self.chunk_transcript(transcript), false),
            None => {
                let chunks = if self.settings.ingest.metadata_fallback {
                    let title = request.title.as_deref().or(fetched.title.as_deref());
                    metadata_chunks(title, fetched.description.as_deref())
                } else {
                    Vec::new()
                };
                if chunks.is_empty() {
                    info!("No captions for {}", video.video_id);
                    return Ok(IngestOutcome::NoCaptions {
                        video_id: video.video_id,
                    });
                }
                info!(
                    "No captions for {}; indexing title and description",
                    video.video_id
                );
                (chunks, true)
            }
        };

        let (documents, embedded) = self.build_documents(&video, &request.collection, chunks).await;

        let stored = self.store.replace_video(&video.video_id, &documents).await?;

        info!("Indexed {} chunks for '{}'", stored, video.title);

        let (video_id, title) = (video.video_id, video.title);
        Ok(if metadata_only {
            IngestOutcome::MetadataOnly {
                video_id,
                title,
                chunks: stored,
                embedded,
            }
        } else {
            IngestOutcome::Indexed {
                video_id,
                title,
                chunks: stored,
                embedded,
            }
        })
    }

    /// Cap the transcript at the configured segment count and chunk it.
    fn chunk_transcript(&self, mut transcript: Transcript) -> Vec<Chunk> {
        let max_segments = self.settings.ingest.max_segments_per_video;
        if transcript.segments.len() > max_segments {
            info!(
                "Keeping first {} of {} segments for {}",
                max_segments,
                transcript.segments.len(),
                transcript.video_id
            );
            transcript.truncate(max_segments);
        }

        let chunks = self.chunker.chunk(&transcript.segments);
        debug!("Created {} chunks from {} segments", chunks.len(), transcript.segments.len());
        chunks
    }

    /// Embed chunk texts and wrap them as documents.
    ///
    /// Embedding failures are not fatal: documents are then stored without
    /// embeddings and remain reachable through keyword search.
    async fn build_documents(
        &self,
        video: &VideoRef,
        collection: &str,
        chunks: Vec<Chunk>,
    ) -> (Vec<IndexedDocument>, bool) {
        let embeddings = match &self.embedder {
            Some(embedder) if !chunks.is_empty() => {
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                match embedder.embed_batch(&texts).await {
                    Ok(embeddings) if embeddings.len() == chunks.len() => Some(embeddings),
                    Ok(embeddings) => {
                        warn!(
                            "Got {} embeddings for {} chunks of {}; storing without embeddings",
                            embeddings.len(),
                            chunks.len(),
                            video.video_id
                        );
                        None
                    }
                    Err(e) => {
                        warn!(
                            "Embedding failed for {}: {}; storing without embeddings",
                            video.video_id, e
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        let embedded = embeddings.is_some();
        let mut embeddings = embeddings.map(Vec::into_iter);

        let documents = chunks
            .into_iter()
            .map(|chunk| {
                let embedding = embeddings.as_mut().and_then(|it| it.next());
                let end_seconds = chunk.end_seconds();
                IndexedDocument::new(
                    chunk.text,
                    embedding,
                    DocumentMetadata {
                        collection: collection.to_string(),
                        video_id: video.video_id.clone(),
                        video_title: video.title.clone(),
                        video_url: video.url.clone(),
                        start_seconds: chunk.start_seconds,
                        end_seconds,
                        chunk_order: chunk.order,
                    },
                )
            })
            .collect();

        (documents, embedded)
    }

    /// Ingest many inputs with bounded concurrency. Never stops at the first failure.
    pub async fn ingest_many<F>(
        &self,
        inputs: &[String],
        collection: &str,
        force: bool,
        mut on_done: F,
    ) -> IngestReport
    where
        F: FnMut(&str, &Result<IngestOutcome>),
    {
        let concurrency = self.settings.ingest.max_concurrent.max(1);

        let mut results = stream::iter(inputs.iter())
            .map(|input| async move {
                let request = IngestRequest::new(input.as_str(), collection).with_force(force);
                (input, self.ingest(&request).await)
            })
            .buffer_unordered(concurrency);

        let mut report = IngestReport::default();
        while let Some((input, result)) = results.next().await {
            if let Err(e) = &result {
                warn!("Failed to ingest {}: {}", input, e);
            }
            on_done(input, &result);
            report.record(input, result);
        }
        report
    }

    /// Flush and release the store.
    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}

/// Parse fetched caption text; `None` when it holds no usable cues.
fn parse_transcript(video: &VideoRef, fetched: &FetchedCaptions) -> Option<Transcript> {
    if !fetched.has_captions() {
        return None;
    }

    let segments = parse_captions(&fetched.content);
    if segments.is_empty() {
        warn!("Captions for {} contained no usable cues", video.video_id);
        return None;
    }

    debug!(
        "Parsed {} {:?} cues for {}",
        segments.len(),
        detect_format(&fetched.content),
        video.video_id
    );
    Some(Transcript::new(video.video_id.clone(), segments))
}
