//! Finn - search what was said in captioned videos
//!
//! A local-first tool that ingests YouTube captions (or local WebVTT/SRT files),
//! indexes them as timed chunks, and answers queries with ranked, timestamped
//! deep links.
//!
//! # Architecture
//!
//! - `captions` - Caption fetching (yt-dlp, local files) and cue parsing
//! - `transcript` - Timed transcript model and export formats
//! - `chunking` - Grouping segments into searchable chunks
//! - `embedding` - Embedding generation
//! - `vector_store` - Document storage (SQLite, in-memory)
//! - `search` - Similarity, lexical matching, blending and ranking
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use finn::config::Settings;
//! use finn::orchestrator::{IngestRequest, Orchestrator};
//! use finn::search::SearchRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     orchestrator
//!         .ingest(&IngestRequest::new("dQw4w9WgXcQ", "music"))
//!         .await?;
//!
//!     let response = orchestrator.search(&SearchRequest::new("never gonna")).await?;
//!     for hit in response.results {
//!         println!("{} {}", hit.timestamp, hit.watch_url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod captions;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod search;
pub mod transcript;
pub mod vector_store;

pub use error::{FinnError, Result};
