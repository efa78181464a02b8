//! WebVTT and SRT caption parsing.
//!
//! Both formats are cue blocks separated by blank lines. Each block holds an
//! optional identifier line, a `start --> end` timing line, and one or more
//! text lines. Blocks without a usable timing line are skipped.

use crate::error::FinnError;
use crate::transcript::TranscriptSegment;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{1,3})\s*-->\s*((?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{1,3})",
    )
    .expect("timing regex")
});

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>|\{\\[^}]*\}").expect("markup regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Caption file flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    Vtt,
    Srt,
}

impl CaptionFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            CaptionFormat::Vtt => "vtt",
            CaptionFormat::Srt => "srt",
        }
    }
}

/// Guess the caption format from its content.
pub fn detect_format(content: &str) -> CaptionFormat {
    if content.trim_start_matches('\u{feff}').trim_start().starts_with("WEBVTT") {
        CaptionFormat::Vtt
    } else {
        CaptionFormat::Srt
    }
}

/// Parse a cue timestamp (`HH:MM:SS.mmm`, `HH:MM:SS,mmm` or `MM:SS.mmm`) into seconds.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let value = value.trim();
    let (clock, fraction) = value.split_once(['.', ','])?;

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        [m, s] => (0, m.parse::<u64>().ok()?, s.parse::<u64>().ok()?),
        _ => return None,
    };

    if minutes >= 60 || seconds >= 60 || fraction.is_empty() || fraction.len() > 3 {
        return None;
    }

    // "5" means 500ms, as in a fixed-width field padded on the right.
    let millis: u64 = format!("{:0<3}", fraction).parse().ok()?;

    Some((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Strip markup tags and decode the common HTML entities found in captions.
pub fn clean_cue_text(raw: &str) -> String {
    let stripped = MARKUP_TAG.replace_all(raw, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Parse WebVTT or SRT content into timed segments.
///
/// Malformed blocks are skipped; an input with no valid cues yields an empty list.
pub fn parse_captions(content: &str) -> Vec<TranscriptSegment> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut segments = Vec::new();
    let mut skipped = 0usize;

    for block in normalized.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }

        match parse_block(block) {
            Ok(Some(segment)) => segments.push(segment),
            Ok(None) => {}
            Err(e) => {
                skipped += 1;
                debug!("Skipping caption block: {}", e);
            }
        }
    }

    debug!(
        "Parsed {} caption segments ({} malformed blocks skipped)",
        segments.len(),
        skipped
    );
    segments
}

/// Parse one cue block. `Ok(None)` means the block carries no cue (header, note, empty text).
fn parse_block(block: &str) -> Result<Option<TranscriptSegment>, FinnError> {
    let lines: Vec<&str> = block.lines().collect();

    let Some(timing_idx) = lines.iter().position(|line| line.contains("-->")) else {
        return Ok(None);
    };

    let caps = TIMING_LINE
        .captures(lines[timing_idx])
        .ok_or_else(|| FinnError::ParseFailure(format!("invalid timing line: {}", lines[timing_idx])))?;

    let start = parse_timestamp(&caps[1])
        .ok_or_else(|| FinnError::ParseFailure(format!("invalid start time: {}", &caps[1])))?;
    let end = parse_timestamp(&caps[2])
        .ok_or_else(|| FinnError::ParseFailure(format!("invalid end time: {}", &caps[2])))?;

    if end < start {
        return Err(FinnError::ParseFailure(format!(
            "cue ends before it starts ({} < {})",
            end, start
        )));
    }

    let text = clean_cue_text(&lines[timing_idx + 1..].join(" "));
    if text.is_empty() {
        return Ok(None);
    }

    Ok(Some(TranscriptSegment::from_range(text, start, end)))
}
