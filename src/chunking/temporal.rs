//! Time-based chunking implementation.
//!
//! Groups consecutive segments until the chunk spans a target window.

use super::{Chunk, Chunker};
use crate::error::{FinnError, Result};
use crate::transcript::TranscriptSegment;

/// Time-window chunker.
///
/// A chunk is closed as soon as the segments collected so far span at least
/// `window_seconds`; segments are never split or shared between chunks.
pub struct TemporalChunker {
    window_seconds: f64,
}

impl TemporalChunker {
    pub fn new(window_seconds: f64) -> Result<Self> {
        if !(window_seconds > 0.0) {
            return Err(FinnError::InvalidInput(format!(
                "chunk window must be positive, got {}",
                window_seconds
            )));
        }
        Ok(Self { window_seconds })
    }
}

impl Chunker for TemporalChunker {
    fn chunk(&self, segments: &[TranscriptSegment]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut run_start = 0;

        for (i, segment) in segments.iter().enumerate() {
            let span = segment.end_seconds() - segments[run_start].start_seconds;
            if span >= self.window_seconds {
                if let Some(chunk) = Chunk::from_segments(&segments[run_start..=i], chunks.len() as i32) {
                    chunks.push(chunk);
                }
                run_start = i + 1;
            }
        }

        if run_start < segments.len() {
            if let Some(chunk) = Chunk::from_segments(&segments[run_start..], chunks.len() as i32) {
                chunks.push(chunk);
            }
        }

        chunks
    }
}
