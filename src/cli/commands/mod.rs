//! CLI command implementations.

mod config;
mod export;
mod ingest;
mod list;
mod search;

pub use config::run_config;
pub use export::run_export;
pub use ingest::run_ingest;
pub use list::run_list;
pub use search::run_search;
