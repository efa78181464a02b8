//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: &Settings, config_path: &PathBuf) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str =
                toml::to_string_pretty(settings).context("Failed to serialize config")?;
            println!("{}", toml_str);
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                ));
                return Ok(());
            }
            Settings::default().save_to(config_path)?;
            Output::success(&format!("Wrote default config to {}", config_path.display()));
        }

        ConfigAction::Edit => {
            if !config_path.exists() {
                settings.save_to(config_path)?;
                Output::info(&format!("Created config at {}", config_path.display()));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
            Output::info(&format!("Opening config in {}...", editor));

            match std::process::Command::new(&editor).arg(config_path).status() {
                Ok(s) if s.success() => {
                    // Surface mistakes now rather than on the next run.
                    match Settings::load_from(Some(config_path)) {
                        Ok(_) => Output::success("Config saved."),
                        Err(e) => Output::error(&format!("Config is invalid: {}", e)),
                    }
                }
                Ok(_) => Output::warning("Editor exited with non-zero status."),
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {}", config_path.display()));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
    }

    Ok(())
}
