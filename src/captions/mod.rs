//! Caption ingestion: fetching raw subtitle text and parsing it into timed segments.
//!
//! Two cue formats are supported, WebVTT (as written by yt-dlp for auto-generated
//! captions) and SubRip (SRT).

mod parser;
mod source;

pub use parser::{clean_cue_text, detect_format, parse_captions, parse_timestamp, CaptionFormat};
pub use source::{
    canonical_video_url, extract_video_id, CaptionSource, DefaultCaptionSource, FetchedCaptions,
    FileCaptionSource, VideoRef, YtDlpCaptionSource,
};
