//! CLI module for finn.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// finn - search what was said in captioned videos
///
/// Ingests YouTube captions or local WebVTT/SRT files into a local index and
/// answers keyword and semantic queries with timestamped links.
#[derive(Parser, Debug)]
#[command(name = "finn")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch captions and index them
    Ingest {
        /// YouTube URLs/IDs or .vtt/.srt files
        #[arg(required_unless_present = "from_file")]
        inputs: Vec<String>,

        /// Collection to index into
        #[arg(short = 'C', long)]
        collection: Option<String>,

        /// Title to store (single input only)
        #[arg(short, long)]
        title: Option<String>,

        /// Re-index even if already indexed
        #[arg(short, long)]
        force: bool,

        /// Read additional inputs from a file, one per line
        #[arg(long)]
        from_file: Option<String>,
    },

    /// Search indexed transcripts
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Minimum similarity score (0.0-1.0)
        #[arg(short, long)]
        min_score: Option<f32>,

        /// Restrict to one collection
        #[arg(short = 'C', long)]
        collection: Option<String>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// List indexed videos
    List {
        /// Restrict to one collection
        #[arg(short = 'C', long)]
        collection: Option<String>,

        /// Show per-collection counts instead of videos
        #[arg(long)]
        collections: bool,
    },

    /// Export a transcript
    Export {
        /// Video ID, YouTube URL, or caption file
        video: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (json, srt, vtt)
        #[arg(long, default_value = "json")]
        format: String,

        /// Fetch captions from the source instead of reading the index
        #[arg(long)]
        fetch: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
