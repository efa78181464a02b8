//! Configuration settings for finn.

use crate::search::ScoringPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub search: SearchSettings,
    pub scoring: ScoringPolicy,
    pub ingest: IngestSettings,
    pub captions: CaptionSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level used when neither `-v` nor `RUST_LOG` is given.
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.finn".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, none).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Inputs longer than this many characters are truncated.
    pub max_input_chars: usize,
    /// Retries after a failed provider call.
    pub max_retries: u32,
    /// HTTP timeout for one provider call.
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            max_input_chars: 8000,
            max_retries: 1,
            request_timeout_secs: 60,
        }
    }
}

impl EmbeddingSettings {
    /// Whether an embedding provider is configured at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self.provider.to_lowercase().as_str(), "" | "none" | "off")
    }
}

/// Content chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Chunking strategy (group, temporal).
    pub strategy: String,
    /// Segments per chunk for the group strategy.
    pub group_size: usize,
    /// Window length in seconds for the temporal strategy.
    pub window_seconds: u32,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            strategy: "group".to_string(),
            group_size: 4,
            window_seconds: 60,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.finn/index.db".to_string(),
        }
    }
}

/// Query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Results returned when a request does not ask for a limit.
    pub default_limit: usize,
    /// Minimum cosine similarity for embedded candidates.
    pub min_similarity: f32,
    /// Upper bound on the query embedding call before falling back to lexical search.
    pub embedding_timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_limit: 5,
            min_similarity: 0.3,
            embedding_timeout_ms: 10_000,
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Collection used when none is given.
    pub default_collection: String,
    /// Videos processed concurrently by batch ingestion.
    pub max_concurrent: usize,
    /// Caption segments kept per video.
    pub max_segments_per_video: usize,
    /// Index title and description when a video has no subtitles.
    pub metadata_fallback: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            default_collection: "default".to_string(),
            max_concurrent: 2,
            max_segments_per_video: 300,
            metadata_fallback: true,
        }
    }
}

/// Caption fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionSettings {
    /// Preferred subtitle language.
    pub language: String,
    /// yt-dlp executable.
    pub ytdlp_path: String,
    /// Upper bound for one caption download.
    pub fetch_timeout_secs: u64,
}

impl Default for CaptionSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            fetch_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Settings::default())
        }
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> crate::error::Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::FinnError;

        if self.chunking.group_size == 0 {
            return Err(FinnError::Config("chunking.group_size must be at least 1".into()));
        }
        if self.ingest.max_concurrent == 0 {
            return Err(FinnError::Config("ingest.max_concurrent must be at least 1".into()));
        }
        if self.ingest.max_segments_per_video == 0 {
            return Err(FinnError::Config(
                "ingest.max_segments_per_video must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.search.min_similarity) {
            return Err(FinnError::Config("search.min_similarity must be within 0..=1".into()));
        }
        if self.search.default_limit == 0 {
            return Err(FinnError::Config("search.default_limit must be at least 1".into()));
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::FinnError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("finn")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}
