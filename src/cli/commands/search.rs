//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::orchestrator::Orchestrator;
use crate::search::SearchRequest;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    orchestrator: &Orchestrator,
    query: &str,
    limit: Option<usize>,
    min_score: Option<f32>,
    collection: Option<String>,
    json: bool,
) -> Result<()> {
    let settings = orchestrator.settings();

    let mut request = SearchRequest::from_settings(query, &settings.search).with_scope(collection);
    if let Some(limit) = limit {
        request = request.with_limit(limit);
    }
    if let Some(min_score) = min_score {
        request = request.with_min_similarity(min_score);
    }

    if !json {
        for warning in preflight::warnings(Operation::Search) {
            Output::warning(&warning);
        }
    }

    let response = orchestrator.search(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        Output::search_response(&response);
    }

    Ok(())
}
