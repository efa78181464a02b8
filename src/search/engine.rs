//! End-to-end query execution.

use super::lexical::keyword_overlap;
use super::scoring::{round2, Confidence, ScoredResult, ScoringPolicy};
use super::similarity::cosine_similarity;
use crate::chunking::{DESCRIPTION_LABEL, TITLE_LABEL};
use crate::config::SearchSettings;
use crate::embedding::Embedder;
use crate::error::{FinnError, Result};
use crate::transcript::format_timestamp;
use crate::vector_store::{DocumentStore, IndexedDocument};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

fn default_limit() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.3
}

/// A validated search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Restrict the search to one collection.
    #[serde(default)]
    pub scope: Option<String>,
    /// Minimum cosine similarity for embedded candidates.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: default_limit(),
            scope: None,
            min_similarity: default_min_similarity(),
        }
    }

    /// A request using the configured defaults.
    pub fn from_settings(query: impl Into<String>, settings: &SearchSettings) -> Self {
        Self {
            limit: settings.default_limit,
            min_similarity: settings.min_similarity,
            ..Self::new(query)
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(FinnError::InvalidQuery("query must not be empty".to_string()));
        }
        if self.limit == 0 {
            return Err(FinnError::InvalidQuery("limit must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(FinnError::InvalidQuery(format!(
                "min_similarity must be within 0..=1, got {}",
                self.min_similarity
            )));
        }
        Ok(())
    }
}

/// How results were scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Semantic,
    Lexical,
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchType::Semantic => write!(f, "semantic"),
            SearchType::Lexical => write!(f, "lexical"),
        }
    }
}

/// Counters describing one query execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub total_candidates: usize,
    /// Candidates that passed scoring and filtering.
    pub scored: usize,
    /// Candidates dropped because their embedding could not be compared.
    pub excluded_malformed: usize,
    pub returned: usize,
}

/// One formatted result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub video_id: String,
    pub video_title: String,
    pub text: String,
    /// `M:SS` or `H:MM:SS`.
    pub timestamp: String,
    pub timestamp_seconds: f64,
    pub duration: f64,
    pub video_url: String,
    /// Deep link to the start of the chunk.
    pub watch_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub relevance_score: f32,
    pub similarity: f32,
    pub confidence: Confidence,
}

impl SearchHit {
    pub fn from_scored(result: &ScoredResult) -> Self {
        let doc = &result.document;
        let meta = &doc.metadata;
        let start = meta.start_seconds.max(0.0);

        Self {
            video_id: meta.video_id.clone(),
            video_title: meta.video_title.clone(),
            text: strip_labels(&doc.text).to_string(),
            timestamp: format_timestamp(start),
            timestamp_seconds: start,
            duration: (meta.end_seconds - meta.start_seconds).max(0.0),
            video_url: meta.video_url.clone(),
            watch_url: deep_link(&meta.video_url, start),
            thumbnail_url: thumbnail_url(&meta.video_url, &meta.video_id),
            relevance_score: result.relevance,
            similarity: round2(result.similarity),
            confidence: result.confidence,
        }
    }
}

/// Link to `url` at `start_seconds`.
pub fn deep_link(url: &str, start_seconds: f64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}s", url, separator, start_seconds.floor() as u64)
}

fn thumbnail_url(video_url: &str, video_id: &str) -> Option<String> {
    video_url
        .contains("youtube.com")
        .then(|| format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id))
}

/// Remove the labels carried by metadata-fallback documents.
fn strip_labels(text: &str) -> &str {
    let trimmed = text.trim_start();
    [TITLE_LABEL, DESCRIPTION_LABEL]
        .iter()
        .find_map(|label| trimmed.strip_prefix(label))
        .unwrap_or(trimmed)
}

/// Response to one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub total_results: usize,
    pub search_type: SearchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub stats: SearchStats,
}

impl SearchResponse {
    /// A response with no results and an explanation.
    pub fn empty(query: &str, search_type: SearchType, message: impl Into<String>) -> Self {
        Self {
            query: query.to_string(),
            results: Vec::new(),
            total_results: 0,
            search_type,
            message: Some(message.into()),
            stats: SearchStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Executes queries against a document store, optionally with an embedder.
pub struct SearchEngine {
    store: Arc<dyn DocumentStore>,
    embedder: Option<Arc<dyn Embedder>>,
    settings: SearchSettings,
    policy: ScoringPolicy,
}

impl SearchEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Option<Arc<dyn Embedder>>,
        settings: SearchSettings,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            store,
            embedder,
            settings,
            policy,
        }
    }

    /// Whether semantic scoring will be attempted.
    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    #[instrument(skip(self, request), fields(query = %request.query, scope = ?request.scope))]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        request.validate()?;

        let preferred = if self.embedder.is_some() {
            SearchType::Semantic
        } else {
            SearchType::Lexical
        };

        let candidates = self.store.candidates(request.scope.as_deref()).await?;
        if candidates.is_empty() {
            let location = match &request.scope {
                Some(scope) => format!("collection '{}'", scope),
                None => "the index".to_string(),
            };
            let empty = FinnError::EmptyCorpus(location);
            info!("{}", empty);
            return Ok(SearchResponse::empty(&request.query, preferred, empty.to_string()));
        }

        let (query_embedding, fallback_reason) = self.embed_query(&request.query).await;

        let (search_type, scored, stats) = match &query_embedding {
            Some(embedding) => {
                let (scored, stats) = score_semantic(
                    &request.query,
                    embedding,
                    candidates,
                    request.min_similarity,
                    &self.policy,
                );
                (SearchType::Semantic, scored, stats)
            }
            None => {
                let (scored, stats) = score_lexical(&request.query, candidates);
                (SearchType::Lexical, scored, stats)
            }
        };

        let results: Vec<SearchHit> = scored
            .iter()
            .take(request.limit)
            .map(SearchHit::from_scored)
            .collect();

        let stats = SearchStats {
            returned: results.len(),
            ..stats
        };

        let message = if results.is_empty() {
            Some(format!("No results found for '{}'", request.query))
        } else {
            fallback_reason
        };

        debug!(
            "{} search returned {} of {} candidates",
            search_type, stats.returned, stats.total_candidates
        );

        Ok(SearchResponse {
            query: request.query.clone(),
            total_results: results.len(),
            results,
            search_type,
            message,
            stats,
        })
    }

    /// Embed the query under the configured timeout.
    ///
    /// Returns the embedding, or `None` with a reason when lexical scoring
    /// must be used instead.
    async fn embed_query(&self, query: &str) -> (Option<Vec<f32>>, Option<String>) {
        let Some(embedder) = &self.embedder else {
            return (None, None);
        };

        let timeout = Duration::from_millis(self.settings.embedding_timeout_ms);
        let reason = match tokio::time::timeout(timeout, embedder.embed(query)).await {
            Ok(Ok(embedding)) if !embedding.is_empty() => return (Some(embedding), None),
            Ok(Ok(_)) => {
                warn!("Embedding provider returned an empty vector; using keyword search");
                "Semantic search unavailable (empty embedding)"
            }
            Ok(Err(e)) if e.is_provider_failure() => {
                warn!("Embedding provider failed: {}; using keyword search", e);
                "Semantic search unavailable"
            }
            Ok(Err(e)) => {
                warn!("Query could not be embedded: {}; using keyword search", e);
                "Query could not be embedded"
            }
            Err(_) => {
                warn!("Query embedding timed out after {:?}; using keyword search", timeout);
                "Semantic search timed out"
            }
        };
        (None, Some(format!("{}; showing keyword matches", reason)))
    }
}

fn rank(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal))
            .then_with(|| {
                a.document
                    .metadata
                    .start_seconds
                    .partial_cmp(&b.document.metadata.start_seconds)
                    .unwrap_or(Ordering::Equal)
            })
    });
}

/// Score candidates against a query embedding, blending in lexical matches.
pub fn score_semantic(
    query: &str,
    query_embedding: &[f32],
    candidates: Vec<IndexedDocument>,
    min_similarity: f32,
    policy: &ScoringPolicy,
) -> (Vec<ScoredResult>, SearchStats) {
    let mut stats = SearchStats {
        total_candidates: candidates.len(),
        ..Default::default()
    };
    let mut results = Vec::new();
    let matcher = policy.matcher(query);

    for document in candidates {
        let lexical = matcher.match_text(&document.text);

        let similarity = match document.embedding.as_deref() {
            Some(embedding) if !embedding.is_empty() => {
                match cosine_similarity(query_embedding, embedding) {
                    Some(sim) => {
                        if sim < min_similarity {
                            continue;
                        }
                        sim
                    }
                    None => {
                        let error = FinnError::MalformedEmbedding {
                            id: document.id.to_string(),
                            reason: format!(
                                "{} dimensions against a {}-dimension query",
                                embedding.len(),
                                query_embedding.len()
                            ),
                        };
                        debug!("Excluding document: {}", error);
                        stats.excluded_malformed += 1;
                        continue;
                    }
                }
            }
            _ => {
                if !lexical.has_any() {
                    continue;
                }
                0.0
            }
        };

        let semantic = similarity.max(0.0);
        results.push(ScoredResult {
            relevance: policy.blend(semantic, &lexical),
            confidence: Confidence::from_similarity(similarity),
            similarity: semantic,
            document,
        });
    }

    if stats.excluded_malformed > 0 {
        warn!(
            "Excluded {} documents with incomparable embeddings",
            stats.excluded_malformed
        );
    }

    rank(&mut results);
    stats.scored = results.len();
    (results, stats)
}

/// Score candidates by keyword overlap alone.
pub fn score_lexical(query: &str, candidates: Vec<IndexedDocument>) -> (Vec<ScoredResult>, SearchStats) {
    let mut stats = SearchStats {
        total_candidates: candidates.len(),
        ..Default::default()
    };

    let mut results: Vec<ScoredResult> = candidates
        .into_iter()
        .filter_map(|document| {
            let overlap = keyword_overlap(query, &document.text);
            (overlap > 0.0).then(|| ScoredResult {
                relevance: round2(overlap),
                similarity: overlap,
                confidence: Confidence::from_similarity(overlap),
                document,
            })
        })
        .collect();

    rank(&mut results);
    stats.scored = results.len();
    (results, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{test_document, MemoryDocumentStore};
    use async_trait::async_trait;

    /// Maps known phrases to fixed vectors.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let t = text.to_lowercase();
            Ok(vec![
                if t.contains("math") || t.contains("polynomial") { 1.0 } else { 0.0 },
                if t.contains("cook") || t.contains("recipe") { 1.0 } else { 0.0 },
                0.1,
            ])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(FinnError::ProviderUnavailable("offline".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(FinnError::ProviderUnavailable("offline".to_string()))
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    async fn store_with(docs: Vec<IndexedDocument>) -> Arc<dyn DocumentStore> {
        let store = MemoryDocumentStore::new();
        store.add(&docs).await.unwrap();
        Arc::new(store)
    }

    fn engine(store: Arc<dyn DocumentStore>, embedder: Option<Arc<dyn Embedder>>) -> SearchEngine {
        SearchEngine::new(store, embedder, SearchSettings::default(), ScoringPolicy::default())
    }

    #[test]
    fn test_request_validation() {
        assert!(SearchRequest::new("  ").validate().is_err());
        assert!(SearchRequest::new("ok").with_limit(0).validate().is_err());
        assert!(SearchRequest::new("ok").with_min_similarity(1.5).validate().is_err());
        assert!(SearchRequest::new("ok").validate().is_ok());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: SearchRequest = serde_json::from_str(r#"{"query": "matrices"}"#).unwrap();
        assert_eq!(request.limit, 5);
        assert_eq!(request.min_similarity, 0.3);
        assert!(request.scope.is_none());
    }

    #[test]
    fn test_hit_formatting() {
        let mut doc = test_document("c", "dQw4w9WgXcQ", "Video Title: Intro to sets", 3725.9, None);
        doc.metadata.end_seconds = 3735.9;
        let hit = SearchHit::from_scored(&ScoredResult {
            document: doc,
            similarity: 0.912,
            relevance: 0.95,
            confidence: Confidence::High,
        });

        assert_eq!(hit.text, "Intro to sets");
        assert_eq!(hit.timestamp, "1:02:05");
        assert_eq!(hit.watch_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=3725s");
        assert_eq!(
            hit.thumbnail_url.as_deref(),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg")
        );
        assert_eq!(hit.similarity, 0.91);
        assert!((hit.duration - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_deep_link_without_query_string() {
        assert_eq!(deep_link("file:///tmp/a.vtt", 61.7), "file:///tmp/a.vtt?t=61s");
    }

    #[tokio::test]
    async fn test_polynomial_ranks_above_unrelated() {
        let store = store_with(vec![
            test_document("c", "v1", "Cooking recipes", 0.0, Some(vec![0.0, 1.0, 0.1])),
            test_document("c", "v2", "We discuss polynomials today", 0.0, Some(vec![1.0, 0.0, 0.1])),
        ])
        .await;

        let response = engine(store, Some(Arc::new(KeywordEmbedder)))
            .search(&SearchRequest::new("polynomial"))
            .await
            .unwrap();

        assert_eq!(response.search_type, SearchType::Semantic);
        assert_eq!(response.results[0].text, "We discuss polynomials today");
        assert!(response
            .results
            .iter()
            .all(|hit| hit.text != "Cooking recipes" || hit.relevance_score < response.results[0].relevance_score));
    }

    #[tokio::test]
    async fn test_lexical_mode_without_embedder() {
        let store = store_with(vec![
            test_document("c", "v1", "Cooking recipes", 0.0, None),
            test_document("c", "v2", "We discuss polynomials today", 0.0, None),
        ])
        .await;

        let response = engine(store, None)
            .search(&SearchRequest::new("polynomial"))
            .await
            .unwrap();

        assert_eq!(response.search_type, SearchType::Lexical);
        assert_eq!(response.total_results, 1);
        assert_eq!(response.results[0].relevance_score, 1.0);
        assert!(response.message.is_none());
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let store = store_with(vec![test_document("c", "v1", "matrix algebra", 0.0, Some(vec![1.0, 0.0, 0.0]))]).await;

        let response = engine(store, Some(Arc::new(FailingEmbedder)))
            .search(&SearchRequest::new("matrix"))
            .await
            .unwrap();

        assert_eq!(response.search_type, SearchType::Lexical);
        assert_eq!(response.total_results, 1);
        assert_eq!(
            response.message.as_deref(),
            Some("Semantic search unavailable; showing keyword matches")
        );
    }

    #[tokio::test]
    async fn test_mismatched_dimensions_excluded() {
        let store = store_with(vec![
            test_document("c", "v1", "math basics", 0.0, Some(vec![1.0, 0.0])),
            test_document("c", "v2", "math advanced", 10.0, Some(vec![1.0, 0.0, 0.1])),
        ])
        .await;

        let response = engine(store, Some(Arc::new(KeywordEmbedder)))
            .search(&SearchRequest::new("math"))
            .await
            .unwrap();

        assert_eq!(response.stats.excluded_malformed, 1);
        assert_eq!(response.total_results, 1);
        assert_eq!(response.results[0].video_id, "v2");
    }

    #[tokio::test]
    async fn test_unembedded_documents_need_lexical_hits() {
        let store = store_with(vec![
            test_document("c", "v1", "math lecture notes", 0.0, None),
            test_document("c", "v2", "gardening tips", 0.0, None),
        ])
        .await;

        let response = engine(store, Some(Arc::new(KeywordEmbedder)))
            .search(&SearchRequest::new("math lecture"))
            .await
            .unwrap();

        assert_eq!(response.search_type, SearchType::Semantic);
        assert_eq!(response.total_results, 1);
        assert_eq!(response.results[0].similarity, 0.0);
        assert_eq!(response.results[0].confidence, Confidence::Low);
    }

    #[tokio::test]
    async fn test_min_similarity_filters() {
        let store = store_with(vec![test_document("c", "v1", "recipe book", 0.0, Some(vec![0.0, 1.0, 0.1]))]).await;

        let response = engine(store, Some(Arc::new(KeywordEmbedder)))
            .search(&SearchRequest::new("math").with_min_similarity(0.5))
            .await
            .unwrap();

        assert!(response.is_empty());
        assert!(response.message.is_some());
    }

    #[tokio::test]
    async fn test_scope_and_empty_corpus() {
        let store = store_with(vec![test_document("math", "v1", "algebra", 0.0, None)]).await;
        let engine = engine(store, None);

        let response = engine
            .search(&SearchRequest::new("algebra").with_scope(Some("cooking".to_string())))
            .await
            .unwrap();
        assert!(response.is_empty());
        assert!(response.message.as_deref().unwrap_or_default().contains("cooking"));

        let response = engine
            .search(&SearchRequest::new("algebra").with_scope(Some("math".to_string())))
            .await
            .unwrap();
        assert_eq!(response.total_results, 1);
    }

    #[tokio::test]
    async fn test_ties_break_by_start_time() {
        let store = store_with(vec![
            test_document("c", "v1", "topic", 30.0, None),
            test_document("c", "v1", "topic", 10.0, None),
        ])
        .await;

        let response = engine(store, None)
            .search(&SearchRequest::new("topic"))
            .await
            .unwrap();

        assert_eq!(response.results[0].timestamp_seconds, 10.0);
        assert_eq!(response.results[1].timestamp_seconds, 30.0);
    }
}
