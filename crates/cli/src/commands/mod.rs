//! CLI commands for the settlement scenario engine.

pub mod analyze;
pub mod history;
pub mod predict;
pub mod review;

pub use analyze::{run_analyze, AnalyzeArgs};
pub use history::{run_history, HistoryArgs};
pub use predict::{run_predict, PredictArgs};
pub use review::{run_review, ReviewArgs};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use settlement_core::{ConfigLoader, EngineConfig};
use std::path::Path;

/// Default directory for stored predictions.
pub const DEFAULT_STORE_DIR: &str = "data/predictions";

/// Output rendering for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Loads engine configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => ConfigLoader::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => ConfigLoader::load().context("Failed to load default config"),
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
