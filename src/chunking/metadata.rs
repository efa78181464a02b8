//! Fallback chunks for videos without subtitles, built from title and description.

use super::Chunk;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix of the chunk carrying the video title.
pub const TITLE_LABEL: &str = "Video Title: ";
/// Prefix of chunks carrying description text.
pub const DESCRIPTION_LABEL: &str = "Video Description: ";

/// Descriptions this short are link lists or boilerplate, not content.
const MIN_DESCRIPTION_CHARS: usize = 50;
const DESCRIPTION_CHUNK_CHARS: usize = 500;
const TITLE_SPAN_SECONDS: f64 = 30.0;
/// Nominal spacing of description chunks; descriptions carry no timing.
const DESCRIPTION_SPAN_SECONDS: f64 = 60.0;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("sentence regex"));

/// Build labelled chunks from video metadata.
///
/// The title chunk comes first at 0:00; description chunks follow, one per
/// minute of nominal time. Returns nothing when there is no metadata.
pub fn metadata_chunks(title: Option<&str>, description: Option<&str>) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        chunks.push(Chunk {
            text: format!("{}{}", TITLE_LABEL, title),
            start_seconds: 0.0,
            duration: TITLE_SPAN_SECONDS,
            segment_count: 1,
            order: 0,
        });
    }

    let description = description
        .map(str::trim)
        .filter(|d| d.chars().count() > MIN_DESCRIPTION_CHARS);

    if let Some(description) = description {
        for (i, part) in split_sentences(description, DESCRIPTION_CHUNK_CHARS)
            .into_iter()
            .enumerate()
        {
            chunks.push(Chunk {
                text: format!("{}{}", DESCRIPTION_LABEL, part),
                start_seconds: i as f64 * DESCRIPTION_SPAN_SECONDS,
                duration: DESCRIPTION_SPAN_SECONDS,
                segment_count: 1,
                order: chunks.len() as i32,
            });
        }
    }

    chunks
}

/// Pack whole sentences into pieces of at most `max_chars` characters.
///
/// A single sentence longer than `max_chars` becomes its own piece.
fn split_sentences(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for sentence in SENTENCE_END
        .split(text)
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
    {
        let added = sentence.chars().count() + 2;
        if !current.is_empty() && current.chars().count() + added > max_chars {
            pieces.push(std::mem::take(&mut current).trim_end().to_string());
        }
        current.push_str(&sentence);
        current.push_str(". ");
    }

    if !current.trim().is_empty() {
        pieces.push(current.trim_end().to_string());
    }
    pieces
}
