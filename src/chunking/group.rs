//! Count-based chunking.

use super::{Chunk, Chunker};
use crate::error::{FinnError, Result};
use crate::transcript::TranscriptSegment;

/// Default number of caption segments merged into one chunk.
pub const DEFAULT_GROUP_SIZE: usize = 4;

/// Merges every `group_size` consecutive segments into one chunk.
///
/// A trailing partial group is kept as a shorter chunk.
#[derive(Debug, Clone)]
pub struct GroupChunker {
    group_size: usize,
}

impl GroupChunker {
    pub fn new(group_size: usize) -> Result<Self> {
        if group_size == 0 {
            return Err(FinnError::InvalidInput(
                "chunk group size must be at least 1".to_string(),
            ));
        }
        Ok(Self { group_size })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }
}

impl Default for GroupChunker {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
        }
    }
}

impl Chunker for GroupChunker {
    fn chunk(&self, segments: &[TranscriptSegment]) -> Vec<Chunk> {
        segments
            .chunks(self.group_size)
            .enumerate()
            .filter_map(|(order, group)| Chunk::from_segments(group, order as i32))
            .collect()
    }
}
