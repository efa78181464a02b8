//! finn CLI entry point.

use anyhow::Result;
use clap::Parser;
use finn::cli::{commands, Cli, Commands};
use finn::config::Settings;
use finn::orchestrator::Orchestrator;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);

    // Config subcommands must work even when the file is broken.
    if let Commands::Config { action } = &cli.command {
        init_logging(cli.verbose, "warn");
        let settings = Settings::load_from(Some(&config_path)).unwrap_or_default();
        return commands::run_config(action, &settings, &config_path);
    }

    let settings = Settings::load_from(Some(&config_path))?;
    init_logging(cli.verbose, &settings.general.log_level);

    std::fs::create_dir_all(settings.data_dir())?;

    let orchestrator = Orchestrator::new(settings)?;

    let result = match cli.command {
        Commands::Ingest {
            inputs,
            collection,
            title,
            force,
            from_file,
        } => {
            commands::run_ingest(
                &orchestrator,
                &inputs,
                collection,
                title,
                force,
                from_file.as_deref(),
            )
            .await
        }

        Commands::Search {
            query,
            limit,
            min_score,
            collection,
            json,
        } => commands::run_search(&orchestrator, &query, limit, min_score, collection, json).await,

        Commands::List {
            collection,
            collections,
        } => commands::run_list(&orchestrator, collection.as_deref(), collections).await,

        Commands::Export {
            video,
            output,
            format,
            fetch,
        } => commands::run_export(&orchestrator, &video, output, &format, fetch).await,

        Commands::Config { .. } => Ok(()),
    };

    orchestrator.close().await?;
    result
}

fn init_logging(verbose: u8, configured: &str) {
    let log_level = match verbose {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("finn={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
