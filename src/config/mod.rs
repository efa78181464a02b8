//! Configuration module for finn.
//!
//! Handles loading and validating application settings from TOML.

mod settings;

pub use settings::{
    CaptionSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, IngestSettings,
    SearchSettings, Settings, VectorStoreSettings,
};
