//! Timed transcript model and export formats.

mod format;
mod models;

pub use format::{format_transcript, OutputFormat, SegmentExport, TranscriptExport};
pub use models::{format_timestamp, Transcript, TranscriptSegment};
