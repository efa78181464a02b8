//! CLI output formatting utilities.

use crate::search::{SearchHit, SearchResponse};
use crate::vector_store::IndexedVideo;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one indexed video.
    pub fn video_info(video: &IndexedVideo) {
        let embedded = if video.embedded_chunks == video.chunk_count {
            String::new()
        } else {
            format!(", {} embedded", video.embedded_chunks)
        };
        println!(
            "  {} {} ({}, {} chunks{}, {})",
            style("*").cyan(),
            style(&video.video_title).bold(),
            style(&video.video_id).dim(),
            video.chunk_count,
            embedded,
            format_duration(video.total_duration_seconds)
        );
    }

    /// Print one search hit.
    pub fn search_hit(rank: usize, hit: &SearchHit) {
        println!(
            "\n{} {} {} @ {} (relevance: {:.2}, {} confidence)",
            style(format!("{}.", rank)).green(),
            style(&hit.video_title).bold(),
            style(&hit.video_id).dim(),
            style(&hit.timestamp).cyan(),
            hit.relevance_score,
            hit.confidence
        );
        println!("   {}", content_preview(&hit.text, 200));
        println!("   {}", style(&hit.watch_url).dim());
    }

    /// Print a whole search response.
    pub fn search_response(response: &SearchResponse) {
        if let Some(message) = &response.message {
            if response.is_empty() {
                Output::warning(message);
            } else {
                Output::info(message);
            }
        }

        if response.is_empty() {
            return;
        }

        Output::success(&format!(
            "Found {} results ({} search over {} chunks)",
            response.total_results, response.search_type, response.stats.total_candidates
        ));
        for (i, hit) in response.results.iter().enumerate() {
            Output::search_hit(i + 1, hit);
        }
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42.0), "42s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
    }

    #[test]
    fn test_content_preview_respects_char_boundaries() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("ääää", 2), "ää...");
        assert_eq!(content_preview("a\nb", 10), "a b");
    }
}
