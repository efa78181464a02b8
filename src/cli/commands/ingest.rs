//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::error::Result as FinnResult;
use crate::orchestrator::{IngestOutcome, IngestRequest, Orchestrator};
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(
    orchestrator: &Orchestrator,
    inputs: &[String],
    collection: Option<String>,
    title: Option<String>,
    force: bool,
    from_file: Option<&str>,
) -> Result<()> {
    let settings = orchestrator.settings();
    let collection = collection.unwrap_or_else(|| settings.ingest.default_collection.clone());

    let mut inputs = inputs.to_vec();
    if let Some(path) = from_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input list {}", path))?;
        inputs.extend(read_input_list(&content));
    }

    if inputs.is_empty() {
        bail!("No inputs to ingest");
    }

    let operation = if inputs.iter().all(|i| Path::new(i).is_file()) {
        Operation::IngestLocal
    } else {
        Operation::IngestRemote
    };
    preflight::check(operation, &settings.captions.ytdlp_path)?;
    for warning in preflight::warnings(operation) {
        Output::warning(&warning);
    }

    if inputs.len() == 1 {
        return ingest_one(orchestrator, &inputs[0], &collection, title, force).await;
    }

    if title.is_some() {
        Output::warning("--title is ignored when ingesting more than one input");
    }

    Output::info(&format!(
        "Ingesting {} inputs into collection '{}'",
        inputs.len(),
        collection
    ));

    let pb = Output::progress_bar(inputs.len() as u64, "Ingesting");
    let report = orchestrator
        .ingest_many(&inputs, &collection, force, |input, result| {
            pb.set_message(input.to_string());
            if let Err(e) = result {
                pb.println(format!("  failed {}: {}", input, e));
            }
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();

    Output::header("Ingest summary");
    Output::kv("Indexed", &report.succeeded.to_string());
    Output::kv("Title/description only", &report.metadata_only.to_string());
    Output::kv("Already indexed", &report.skipped.to_string());
    Output::kv("Without captions", &report.without_captions.to_string());
    Output::kv("Failed", &report.failed.len().to_string());
    Output::kv("Chunks", &report.chunks_indexed.to_string());
    if report.unembedded > 0 {
        Output::warning(&format!(
            "{} videos were stored without embeddings and only match keyword searches",
            report.unembedded
        ));
    }

    if !report.failed.is_empty() && report.failed.len() == report.total() {
        bail!("All {} inputs failed", report.total());
    }

    Ok(())
}

async fn ingest_one(
    orchestrator: &Orchestrator,
    input: &str,
    collection: &str,
    title: Option<String>,
    force: bool,
) -> Result<()> {
    let request = IngestRequest::new(input, collection)
        .with_title(title)
        .with_force(force);

    let spinner = Output::spinner(&format!("Ingesting {}...", input));
    let result: FinnResult<IngestOutcome> = orchestrator.ingest(&request).await;
    spinner.finish_and_clear();

    match result? {
        IngestOutcome::Indexed {
            video_id,
            title,
            chunks,
            embedded,
        } => {
            Output::success(&format!("Indexed '{}' ({})", title, video_id));
            Output::kv("Collection", collection);
            Output::kv("Chunks", &chunks.to_string());
            if !embedded {
                Output::warning("Stored without embeddings; only keyword search will match");
            }
        }
        IngestOutcome::MetadataOnly {
            video_id,
            title,
            chunks,
            ..
        } => {
            Output::warning(&format!(
                "No captions for '{}' ({}); indexed title and description ({} chunks)",
                title, video_id, chunks
            ));
            Output::kv("Collection", collection);
        }
        IngestOutcome::AlreadyIndexed { video_id } => {
            Output::info(&format!(
                "{} is already indexed (use --force to re-index)",
                video_id
            ));
        }
        IngestOutcome::NoCaptions { video_id } => {
            Output::warning(&format!("No captions available for {}", video_id));
        }
    }

    Ok(())
}

/// Parse an input list: one input per line, blank lines and `#` comments ignored.
fn read_input_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_input_list() {
        let content = "# lectures\nabcdefghijk\n\n  https://youtu.be/ABCDEFGHIJK  \n";
        assert_eq!(
            read_input_list(content),
            vec!["abcdefghijk", "https://youtu.be/ABCDEFGHIJK"]
        );
    }
}
