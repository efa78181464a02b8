//! Export command implementation.

use crate::captions::VideoRef;
use crate::cli::Output;
use crate::orchestrator::Orchestrator;
use crate::transcript::{format_transcript, OutputFormat, Transcript, TranscriptSegment};
use anyhow::{anyhow, Result};

/// Run the export command.
pub async fn run_export(
    orchestrator: &Orchestrator,
    video: &str,
    output: Option<String>,
    format: &str,
    fetch: bool,
) -> Result<()> {
    let output_format: OutputFormat = format.parse().map_err(|e: String| anyhow!(e))?;

    let transcript = if fetch {
        match orchestrator.fetch_transcript(video, None).await? {
            Some((_, transcript)) => transcript,
            None => {
                Output::error(&format!("No captions available for {}", video));
                return Ok(());
            }
        }
    } else {
        match indexed_transcript(orchestrator, video).await? {
            Some(transcript) => transcript,
            None => {
                Output::error(&format!("No indexed content found for: {}", video));
                Output::info("Use 'finn list' to see indexed videos, or pass --fetch.");
                return Ok(());
            }
        }
    };

    let output_str = format_transcript(&transcript, output_format);

    match output {
        Some(path) if path != "-" => {
            std::fs::write(&path, &output_str)?;
            Output::success(&format!(
                "Exported {} to {} ({} segments)",
                transcript.video_id,
                path,
                transcript.segments.len()
            ));
        }
        _ => println!("{}", output_str),
    }

    Ok(())
}

/// Rebuild a transcript from the stored chunks of a video, one segment per chunk.
async fn indexed_transcript(orchestrator: &Orchestrator, video: &str) -> Result<Option<Transcript>> {
    // Local ids such as `local_talk` are not resolvable inputs; use them verbatim.
    let video_id = VideoRef::resolve(video, None)
        .map(|v| v.video_id)
        .unwrap_or_else(|_| video.to_string());

    let mut documents = orchestrator.store().get_by_video_id(&video_id).await?;
    if documents.is_empty() {
        return Ok(None);
    }

    documents.sort_by(|a, b| {
        a.metadata
            .start_seconds
            .total_cmp(&b.metadata.start_seconds)
            .then(a.metadata.chunk_order.cmp(&b.metadata.chunk_order))
    });

    let segments = documents
        .into_iter()
        .map(|d| TranscriptSegment::from_range(d.text, d.metadata.start_seconds, d.metadata.end_seconds))
        .collect();

    Ok(Some(Transcript::new(video_id, segments)))
}
