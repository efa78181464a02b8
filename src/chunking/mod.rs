//! Chunking strategies for turning caption segments into retrievable units.
//!
//! Individual caption cues carry too little context for semantic search, so
//! consecutive cues are merged before embedding.

mod group;
mod metadata;
mod temporal;

pub use group::GroupChunker;
pub use metadata::{metadata_chunks, DESCRIPTION_LABEL, TITLE_LABEL};
pub use temporal::TemporalChunker;

use crate::config::ChunkingSettings;
use crate::error::{FinnError, Result};
use crate::transcript::{format_timestamp, TranscriptSegment};
use serde::{Deserialize, Serialize};

/// A group of consecutive transcript segments merged into one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Space-joined text of the constituent segments.
    pub text: String,
    /// Start time of the first segment, in seconds.
    pub start_seconds: f64,
    /// Span from the first segment's start to the last segment's end.
    pub duration: f64,
    /// Number of segments merged into this chunk.
    pub segment_count: usize,
    /// Position of this chunk in the video.
    pub order: i32,
}

impl Chunk {
    /// Build a chunk from a non-empty run of segments.
    pub fn from_segments(segments: &[TranscriptSegment], order: i32) -> Option<Self> {
        let first = segments.first()?;
        let last = segments.last()?;

        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let start_seconds = first.start_seconds;
        let duration = (last.start_seconds + last.duration - start_seconds).max(0.0);

        Some(Self {
            text,
            start_seconds,
            duration,
            segment_count: segments.len(),
            order,
        })
    }

    /// End time in seconds.
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration
    }

    /// Format the start time for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.start_seconds)
    }
}

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Fixed number of segments per chunk.
    Group,
    /// Fixed time window per chunk.
    Temporal,
}

impl std::str::FromStr for ChunkingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "group" | "count" => Ok(ChunkingStrategy::Group),
            "temporal" | "time" => Ok(ChunkingStrategy::Temporal),
            _ => Err(format!("Unknown chunking strategy: {}", s)),
        }
    }
}

/// Trait for chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split an ordered run of segments into chunks.
    fn chunk(&self, segments: &[TranscriptSegment]) -> Vec<Chunk>;
}

/// Create a chunker from settings.
pub fn create_chunker(settings: &ChunkingSettings) -> Result<Box<dyn Chunker>> {
    let strategy: ChunkingStrategy = settings
        .strategy
        .parse()
        .map_err(FinnError::Config)?;

    match strategy {
        ChunkingStrategy::Group => Ok(Box::new(GroupChunker::new(settings.group_size)?)),
        ChunkingStrategy::Temporal => {
            Ok(Box::new(TemporalChunker::new(settings.window_seconds as f64)?))
        }
    }
}
