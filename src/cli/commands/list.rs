//! List command implementation.

use crate::cli::Output;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(
    orchestrator: &Orchestrator,
    collection: Option<&str>,
    collections: bool,
) -> Result<()> {
    let store = orchestrator.store();

    if collections {
        let stats = store.collections().await?;
        if stats.is_empty() {
            Output::info("No collections yet.");
            Output::info("Use 'finn ingest <url>' to index a video.");
            return Ok(());
        }

        Output::header("Collections");
        for stat in &stats {
            Output::kv(
                &stat.collection,
                &format!(
                    "{} videos, {} chunks ({} embedded)",
                    stat.videos, stat.documents, stat.embedded_documents
                ),
            );
        }
        return Ok(());
    }

    let videos = store.list_videos(collection).await?;

    if videos.is_empty() {
        match collection {
            Some(name) => Output::info(&format!("No videos indexed in collection '{}'.", name)),
            None => {
                Output::info("No videos indexed yet.");
                Output::info("Use 'finn ingest <url>' to index a video.");
            }
        }
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for video in &videos {
        if current != Some(video.collection.as_str()) {
            Output::header(&format!("Collection: {}", video.collection));
            current = Some(video.collection.as_str());
        }
        Output::video_info(video);
    }

    let total_chunks: u32 = videos.iter().map(|v| v.chunk_count).sum();
    println!();
    Output::info(&format!(
        "Total: {} videos, {} chunks",
        videos.len(),
        total_chunks
    ));

    Ok(())
}
