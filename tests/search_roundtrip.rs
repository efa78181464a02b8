//! End-to-end tests: local caption files through ingestion, storage and search.

use async_trait::async_trait;
use finn::captions::{parse_captions, DefaultCaptionSource};
use finn::config::Settings;
use finn::embedding::Embedder;
use finn::orchestrator::{IngestOutcome, IngestRequest, Orchestrator};
use finn::search::{SearchRequest, SearchType};
use finn::transcript::TranscriptSegment;
use finn::vector_store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore};
use finn::FinnError;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const LECTURE: &str = "WEBVTT\n\n\
00:00:00.000 --> 00:00:04.000\nwelcome back to the course\n\n\
00:00:04.000 --> 00:00:08.000\ntoday we look at roots\n\n\
00:00:08.000 --> 00:00:12.000\nof a polynomial equation\n\n\
00:00:12.000 --> 00:00:16.000\nand how many there are\n\n\
00:00:16.000 --> 00:00:20.000\nthis is answered by the\n\n\
00:00:20.000 --> 00:00:24.000\nfundamental theorem of algebra\n\n\
00:00:24.000 --> 00:00:28.000\nwhich Gauss proved in his thesis\n\n\
00:00:28.000 --> 00:00:32.000\nsee you next time\n";

const COOKING: &str = "1\n00:00:02,000 --> 00:00:06,000\nfirst we chop the onions\n\n\
2\n00:00:06,000 --> 00:00:10,000\nthen fry them in butter\n";

/// Maps text onto (mentions polynomials, mentions cooking, bias).
struct TopicEmbedder {
    query_delay: Duration,
}

impl TopicEmbedder {
    fn new() -> Self {
        Self {
            query_delay: Duration::ZERO,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self { query_delay: delay }
    }

    fn vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let math = if text.contains("polynomial") || text.contains("algebra") {
            1.0
        } else {
            0.0
        };
        let food = if text.contains("onion") || text.contains("butter") {
            1.0
        } else {
            0.0
        };
        vec![math, food, 0.1]
    }
}

#[async_trait]
impl Embedder for TopicEmbedder {
    async fn embed(&self, text: &str) -> finn::Result<Vec<f32>> {
        tokio::time::sleep(self.query_delay).await;
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> finn::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        3
    }
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path.to_string_lossy().into_owned()
}

fn orchestrator(
    settings: Settings,
    store: Arc<dyn DocumentStore>,
    embedder: Option<Arc<dyn Embedder>>,
) -> Orchestrator {
    let source = Arc::new(DefaultCaptionSource::from_settings(&settings.captions));
    Orchestrator::with_components(settings, store, embedder, source).unwrap()
}

#[tokio::test]
async fn verbatim_phrase_is_found_with_timestamp() {
    let dir = TempDir::new().unwrap();
    let lecture = write_file(&dir, "lecture.vtt", LECTURE);

    let orchestrator = orchestrator(Settings::default(), Arc::new(MemoryDocumentStore::new()), None);
    let outcome = orchestrator
        .ingest(&IngestRequest::new(&lecture, "math").with_title(Some("Algebra 101".into())))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        IngestOutcome::Indexed {
            video_id: "local_lecture".into(),
            title: "Algebra 101".into(),
            chunks: 2,
            embedded: false,
        }
    );

    let response = orchestrator
        .search(&SearchRequest::new("fundamental theorem of algebra"))
        .await
        .unwrap();

    assert_eq!(response.search_type, SearchType::Lexical);
    let top = &response.results[0];
    assert_eq!(top.video_title, "Algebra 101");
    assert!(top.text.contains("fundamental theorem of algebra"));
    assert_eq!(top.timestamp, "0:16");
    assert!(top.watch_url.starts_with("file://"));
    assert!(top.watch_url.ends_with("?t=16s"));
    assert!(top.thumbnail_url.is_none());
}

#[tokio::test]
async fn semantic_search_prefers_matching_topic() {
    let dir = TempDir::new().unwrap();
    let lecture = write_file(&dir, "lecture.vtt", LECTURE);
    let cooking = write_file(&dir, "cooking.srt", COOKING);

    let orchestrator = orchestrator(
        Settings::default(),
        Arc::new(MemoryDocumentStore::new()),
        Some(Arc::new(TopicEmbedder::new())),
    );
    let report = orchestrator
        .ingest_many(&[lecture, cooking], "mixed", false, |_, _| {})
        .await;
    assert_eq!(report.succeeded, 2);
    assert!(report.failed.is_empty());

    let response = orchestrator
        .search(&SearchRequest::new("polynomial"))
        .await
        .unwrap();

    assert_eq!(response.search_type, SearchType::Semantic);
    assert!(!response.results.is_empty());
    assert!(response.results.iter().all(|hit| hit.video_id == "local_lecture"));
    assert!(response.results[0].relevance_score > 0.5);
}

#[tokio::test]
async fn empty_corpus_returns_message() {
    let orchestrator = orchestrator(Settings::default(), Arc::new(MemoryDocumentStore::new()), None);

    let response = orchestrator
        .search(&SearchRequest::new("anything").with_scope(Some("nowhere".into())))
        .await
        .unwrap();

    assert!(response.is_empty());
    assert_eq!(response.total_results, 0);
    assert!(response.message.unwrap().contains("nowhere"));
}

#[tokio::test]
async fn slow_embedder_falls_back_to_keywords() {
    let dir = TempDir::new().unwrap();
    let lecture = write_file(&dir, "lecture.vtt", LECTURE);

    let mut settings = Settings::default();
    settings.search.embedding_timeout_ms = 20;

    let orchestrator = orchestrator(
        settings,
        Arc::new(MemoryDocumentStore::new()),
        Some(Arc::new(TopicEmbedder::slow(Duration::from_millis(500)))),
    );
    orchestrator
        .ingest(&IngestRequest::new(&lecture, "math"))
        .await
        .unwrap();

    let response = orchestrator
        .search(&SearchRequest::new("Gauss thesis"))
        .await
        .unwrap();

    assert_eq!(response.search_type, SearchType::Lexical);
    assert!(!response.is_empty());
    assert!(response.message.unwrap().contains("keyword"));
}

#[tokio::test]
async fn invalid_queries_are_rejected() {
    let orchestrator = orchestrator(Settings::default(), Arc::new(MemoryDocumentStore::new()), None);

    let err = orchestrator
        .search(&SearchRequest::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, FinnError::InvalidQuery(_)));

    let err = orchestrator
        .search(&SearchRequest::new("roots").with_limit(0))
        .await
        .unwrap_err();
    assert!(matches!(err, FinnError::InvalidQuery(_)));
}

#[tokio::test]
async fn index_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let lecture = write_file(&dir, "lecture.vtt", LECTURE);
    let db = dir.path().join("index.db");

    {
        let store = Arc::new(SqliteDocumentStore::new(&db).unwrap());
        let orchestrator = orchestrator(Settings::default(), store, None);
        orchestrator
            .ingest(&IngestRequest::new(&lecture, "math"))
            .await
            .unwrap();
        orchestrator.close().await.unwrap();
    }

    let store = Arc::new(SqliteDocumentStore::new(&db).unwrap());
    let orchestrator = orchestrator(Settings::default(), store, None);

    let outcome = orchestrator
        .ingest(&IngestRequest::new(&lecture, "math"))
        .await
        .unwrap();
    assert!(matches!(outcome, IngestOutcome::AlreadyIndexed { .. }));

    let response = orchestrator
        .search(&SearchRequest::new("onions"))
        .await
        .unwrap();
    assert!(response.is_empty());
    assert!(response.message.unwrap().starts_with("No results found"));
}

#[test]
fn single_cue_parses() {
    let segments = parse_captions("00:00:01.000 --> 00:00:04.000\nhello world");
    assert_eq!(segments, vec![TranscriptSegment::new("hello world", 1.0, 3.0)]);
}
