//! Data models for timed transcripts.

use serde::{Deserialize, Serialize};

/// A complete transcript for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Video ID this transcript belongs to.
    pub video_id: String,
    /// Individual caption segments in playback order.
    pub segments: Vec<TranscriptSegment>,
    /// Full transcript text (concatenated segments).
    pub full_text: String,
    /// End of the last segment, in seconds.
    pub duration_seconds: f64,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(video_id: String, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let duration_seconds = segments
            .iter()
            .map(|s| s.end_seconds())
            .fold(0.0f64, f64::max);

        Self {
            video_id,
            segments,
            full_text,
            duration_seconds,
        }
    }

    /// Whether the transcript has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Keep at most `max` segments, dropping the tail.
    pub fn truncate(&mut self, max: usize) {
        if self.segments.len() > max {
            self.segments.truncate(max);
            *self = Transcript::new(std::mem::take(&mut self.video_id), std::mem::take(&mut self.segments));
        }
    }

    /// Format the transcript with timestamps for display.
    pub fn format_with_timestamps(&self) -> String {
        self.segments
            .iter()
            .map(|s| {
                format!(
                    "[{} - {}] {}",
                    format_timestamp(s.start_seconds),
                    format_timestamp(s.end_seconds()),
                    s.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single timed caption segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Caption text with markup removed.
    pub text: String,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(text: impl Into<String>, start_seconds: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start_seconds,
            duration,
        }
    }

    /// Create a segment from start and end times.
    pub fn from_range(text: impl Into<String>, start_seconds: f64, end_seconds: f64) -> Self {
        Self::new(text, start_seconds, end_seconds - start_seconds)
    }

    /// End time in seconds.
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration
    }
}

/// Format seconds as M:SS, or H:MM:SS past the hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0).floor() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_creation() {
        let segments = vec![
            TranscriptSegment::new("Hello world", 0.0, 5.0),
            TranscriptSegment::new("This is a test", 5.0, 5.0),
        ];

        let transcript = Transcript::new("test_video".to_string(), segments);

        assert_eq!(transcript.video_id, "test_video");
        assert_eq!(transcript.full_text, "Hello world This is a test");
        assert_eq!(transcript.duration_seconds, 10.0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(65.9), "1:05");
        assert_eq!(format_timestamp(3665.0), "1:01:05");
    }

    #[test]
    fn test_truncate_recomputes_totals() {
        let mut transcript = Transcript::new(
            "v".to_string(),
            vec![
                TranscriptSegment::new("one", 0.0, 1.0),
                TranscriptSegment::new("two", 1.0, 1.0),
                TranscriptSegment::new("three", 2.0, 1.0),
            ],
        );
        transcript.truncate(2);
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.full_text, "one two");
        assert_eq!(transcript.duration_seconds, 2.0);
        assert_eq!(transcript.video_id, "v");
    }
}
