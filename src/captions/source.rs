//! Caption sources: where raw caption text comes from.

use super::parser::CaptionFormat;
use crate::config::CaptionSettings;
use crate::error::{FinnError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Default upper bound for one yt-dlp invocation.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    // Matches various YouTube URL formats and bare video IDs
    Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:[^\s\#]*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex")
});

/// Extract an 11-character video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Canonical watch URL for a video ID.
pub fn canonical_video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Identity of a video whose captions should be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRef {
    /// Stable identifier (YouTube ID, or a `local_` id derived from a file name).
    pub video_id: String,
    /// Display title.
    pub title: String,
    /// Canonical URL used for deep links.
    pub url: String,
    /// Local caption file, when the captions are already on disk.
    pub caption_path: Option<PathBuf>,
}

impl VideoRef {
    /// Resolve user input into a video reference.
    ///
    /// Existing `.vtt`/`.srt` files become local references; anything else must
    /// be a YouTube URL or bare video ID.
    pub fn resolve(input: &str, title: Option<&str>) -> Result<Self> {
        let path = Path::new(input);
        if is_caption_file(path) {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("captions")
                .to_string();

            // yt-dlp names files `<id>.<lang>.vtt`; reuse the id when present.
            let youtube_id = stem
                .split_once('.')
                .and_then(|(base, _lang)| extract_video_id(base));
            let (video_id, url) = match youtube_id {
                Some(id) => (id.clone(), canonical_video_url(&id)),
                None => {
                    let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                    (format!("local_{}", stem), format!("file://{}", abs.display()))
                }
            };

            return Ok(Self {
                video_id,
                title: title.map(str::to_string).unwrap_or(stem),
                url,
                caption_path: Some(path.to_path_buf()),
            });
        }

        let video_id = extract_video_id(input).ok_or_else(|| {
            FinnError::InvalidInput(format!(
                "Not a YouTube URL, video ID, or caption file: {}",
                input
            ))
        })?;

        Ok(Self {
            title: title.map(str::to_string).unwrap_or_else(|| video_id.clone()),
            url: canonical_video_url(&video_id),
            video_id,
            caption_path: None,
        })
    }

    /// Whether this reference points at a local file.
    pub fn is_local(&self) -> bool {
        self.caption_path.is_some()
    }
}

fn is_caption_file(path: &Path) -> bool {
    let has_caption_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("vtt") || e.eq_ignore_ascii_case("srt"))
        .unwrap_or(false);
    has_caption_ext && path.is_file()
}

/// Raw caption text plus the video metadata reported by the source, if any.
#[derive(Debug, Clone, Default)]
pub struct FetchedCaptions {
    /// Raw WebVTT/SRT text; empty when the source only found metadata.
    pub content: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl FetchedCaptions {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Metadata for a video that has no subtitles.
    pub fn metadata_only(title: Option<String>, description: Option<String>) -> Self {
        Self {
            content: String::new(),
            title,
            description,
        }
    }

    pub fn has_captions(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Trait for caption providers.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetch raw caption text for a video. `Ok(None)` means the video has no captions.
    async fn fetch(&self, video: &VideoRef) -> Result<Option<FetchedCaptions>>;
}

/// Reads captions from a local `.vtt` or `.srt` file.
#[derive(Debug, Default)]
pub struct FileCaptionSource;

#[async_trait]
impl CaptionSource for FileCaptionSource {
    #[instrument(skip(self), fields(video_id = %video.video_id))]
    async fn fetch(&self, video: &VideoRef) -> Result<Option<FetchedCaptions>> {
        let path = video.caption_path.as_ref().ok_or_else(|| {
            FinnError::CaptionSource(format!("{} has no local caption file", video.video_id))
        })?;

        let content = tokio::fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(FetchedCaptions::new(content)))
    }
}

/// Fetches auto-generated or uploaded subtitles with yt-dlp.
pub struct YtDlpCaptionSource {
    language: String,
    binary: String,
    timeout: Duration,
}

impl YtDlpCaptionSource {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            binary: "yt-dlp".to_string(),
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Abort a fetch that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a different yt-dlp executable.
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    /// Find the subtitle file yt-dlp wrote, preferring WebVTT.
    fn find_subtitle_file(dir: &Path, video_id: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                let ext = p.extension().and_then(|e| e.to_str()).unwrap_or_default();
                name.starts_with(video_id)
                    && (ext == CaptionFormat::Vtt.extension() || ext == CaptionFormat::Srt.extension())
            })
            .collect();

        candidates.sort_by_key(|p| p.extension().and_then(|e| e.to_str()) != Some("vtt"));
        candidates.into_iter().next()
    }

    /// Read title and description from the info JSON yt-dlp writes next to the subtitles.
    fn read_info(dir: &Path, video_id: &str) -> (Option<String>, Option<String>) {
        let info_path = dir.join(format!("{}.info.json", video_id));
        let json: Option<serde_json::Value> = std::fs::read_to_string(info_path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok());

        let field = |name: &str| {
            json.as_ref()
                .and_then(|j| j[name].as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        (field("title"), field("description"))
    }
}

impl Default for YtDlpCaptionSource {
    fn default() -> Self {
        Self::new("en")
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionSource {
    #[instrument(skip(self), fields(video_id = %video.video_id))]
    async fn fetch(&self, video: &VideoRef) -> Result<Option<FetchedCaptions>> {
        let temp_dir = tempfile::tempdir()?;
        let template = temp_dir.path().join(format!("{}.%(ext)s", video.video_id));

        info!("Fetching captions for {}", video.video_id);

        let child = Command::new(&self.binary)
            .args([
                "--write-sub",
                "--write-auto-sub",
                "--sub-lang",
                self.language.as_str(),
                "--sub-format",
                "vtt/srt/best",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--write-info-json",
                "--output",
                template.to_str().unwrap_or_default(),
                video.url.as_str(),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| FinnError::Timeout(self.timeout))?;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FinnError::ToolNotFound(self.binary.clone()));
            }
            Err(e) => {
                return Err(FinnError::CaptionSource(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FinnError::ToolFailed(format!("yt-dlp failed: {}", stderr.trim())));
        }

        let (title, description) = Self::read_info(temp_dir.path(), &video.video_id);

        let Some(path) = Self::find_subtitle_file(temp_dir.path(), &video.video_id) else {
            warn!("No {} captions available for {}", self.language, video.video_id);
            if title.is_none() && description.is_none() {
                return Ok(None);
            }
            return Ok(Some(FetchedCaptions::metadata_only(title, description)));
        };

        debug!("Reading subtitle file {:?}", path);
        let content = tokio::fs::read_to_string(&path).await?;

        Ok(Some(FetchedCaptions {
            content,
            title,
            description,
        }))
    }
}

/// Routes local references to the file source and everything else to yt-dlp.
pub struct DefaultCaptionSource {
    file: FileCaptionSource,
    remote: YtDlpCaptionSource,
}

impl DefaultCaptionSource {
    pub fn new(language: &str) -> Self {
        Self {
            file: FileCaptionSource,
            remote: YtDlpCaptionSource::new(language),
        }
    }

    pub fn from_settings(settings: &CaptionSettings) -> Self {
        let remote = YtDlpCaptionSource::new(&settings.language)
            .with_binary(&settings.ytdlp_path)
            .with_timeout(Duration::from_secs(settings.fetch_timeout_secs));
        Self {
            file: FileCaptionSource,
            remote,
        }
    }
}

#[async_trait]
impl CaptionSource for DefaultCaptionSource {
    async fn fetch(&self, video: &VideoRef) -> Result<Option<FetchedCaptions>> {
        if video.is_local() {
            self.file.fetch(video).await
        } else {
            self.remote.fetch(video).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?list=PL123&v=tpIctyqH29Q&index=2"),
            Some("tpIctyqH29Q".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("dQw4w9WgXcQ"), Some("dQw4w9WgXcQ".to_string()));

        assert_eq!(extract_video_id("not-a-video-id"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_resolve_remote() {
        let video = VideoRef::resolve("https://youtu.be/dQw4w9WgXcQ", Some("Intro")).unwrap();
        assert_eq!(video.video_id, "dQw4w9WgXcQ");
        assert_eq!(video.title, "Intro");
        assert_eq!(video.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(!video.is_local());

        assert!(VideoRef::resolve("/no/such/file.mp4", None).is_err());
    }

    #[tokio::test]
    async fn test_file_source_reads_local_captions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture-notes-week1.srt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "1\n00:00:01,000 --> 00:00:02,000\nhello").unwrap();

        let video = VideoRef::resolve(path.to_str().unwrap(), None).unwrap();
        assert_eq!(video.video_id, "local_lecture-notes-week1");
        assert_eq!(video.title, "lecture-notes-week1");
        assert!(video.url.starts_with("file://"));

        let fetched = FileCaptionSource.fetch(&video).await.unwrap().unwrap();
        assert!(fetched.content.contains("hello"));
    }

    #[tokio::test]
    async fn test_file_source_reuses_youtube_id_from_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dQw4w9WgXcQ.en.vtt");
        std::fs::write(&path, "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhi\n").unwrap();

        let video = VideoRef::resolve(path.to_str().unwrap(), None).unwrap();
        assert_eq!(video.video_id, "dQw4w9WgXcQ");
        assert_eq!(video.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_read_info_and_subtitle_lookup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("dQw4w9WgXcQ.info.json"),
            r#"{"title": "Linear Algebra", "description": "  "}"#,
        )
        .unwrap();

        let (title, description) = YtDlpCaptionSource::read_info(dir.path(), "dQw4w9WgXcQ");
        assert_eq!(title.as_deref(), Some("Linear Algebra"));
        assert_eq!(description, None);
        assert_eq!(YtDlpCaptionSource::read_info(dir.path(), "tpIctyqH29Q"), (None, None));

        assert!(YtDlpCaptionSource::find_subtitle_file(dir.path(), "dQw4w9WgXcQ").is_none());
        std::fs::write(dir.path().join("dQw4w9WgXcQ.en.srt"), "").unwrap();
        std::fs::write(dir.path().join("dQw4w9WgXcQ.en.vtt"), "").unwrap();
        let found = YtDlpCaptionSource::find_subtitle_file(dir.path(), "dQw4w9WgXcQ").unwrap();
        assert_eq!(found.extension().unwrap(), "vtt");
    }

    #[test]
    fn test_metadata_only_has_no_captions() {
        assert!(FetchedCaptions::new("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhi").has_captions());
        assert!(!FetchedCaptions::metadata_only(Some("t".into()), None).has_captions());
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let source = YtDlpCaptionSource::new("en").with_binary("definitely-not-yt-dlp-binary");
        let video = VideoRef::resolve("dQw4w9WgXcQ", None).unwrap();
        let err = source.fetch(&video).await.unwrap_err();
        assert!(matches!(err, FinnError::ToolNotFound(_)));
    }
}
