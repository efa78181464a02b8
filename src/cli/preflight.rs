//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools are available before starting work that
//! would otherwise fail midway.

use crate::error::{FinnError, Result};
use crate::openai::{api_key_present, API_KEY_ENV};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Fetching remote captions requires yt-dlp.
    IngestRemote,
    /// Local caption files need nothing external.
    IngestLocal,
    /// Search runs against the local index.
    Search,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, ytdlp: &str) -> Result<()> {
    match operation {
        Operation::IngestRemote => check_tool(ytdlp)?,
        Operation::IngestLocal | Operation::Search => {}
    }
    Ok(())
}

/// Non-fatal problems worth telling the user about.
pub fn warnings(operation: Operation) -> Vec<String> {
    let mut warnings = Vec::new();
    if !api_key_present() {
        let msg = match operation {
            Operation::Search => format!("{} not set; using keyword search only", API_KEY_ENV),
            _ => format!(
                "{} not set; transcripts will be indexed without embeddings",
                API_KEY_ENV
            ),
        };
        warnings.push(msg);
    }
    warnings
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(FinnError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(FinnError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(FinnError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
