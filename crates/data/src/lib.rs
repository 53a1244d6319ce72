//! Persistence and ingestion around the settlement engine.
//!
//! The engine itself performs no I/O. This crate turns tabular files into
//! validated [`OptionsSnapshot`](settlement_core::OptionsSnapshot) values,
//! stores predictions behind the [`PredictionStore`] trait, and keeps the
//! append-only learning log.

pub mod ingest;
pub mod learning;
pub mod store;

pub use ingest::{load_csv, load_json, load_price_context, load_series, read_csv, IngestError, SnapshotMeta};
pub use learning::{AnalysisRecord, ExperienceLevel, HistoricalContext, LearningLog, SimilarSituation};
pub use store::{InMemoryStore, JsonFileStore, PredictionKey, PredictionRecord, PredictionStore, StoreError};
