//! Core types and configuration for the options settlement scenario engine.

pub mod config;
pub mod config_loader;
pub mod metrics;
pub mod metrics_formatter;
pub mod prediction;
pub mod prediction_formatter;
pub mod scenario;
pub mod signal;
pub mod snapshot;

pub use config::{EngineConfig, PositioningConfig, RiskConfig, ScenarioConfig, TrendConfig};
pub use config_loader::ConfigLoader;
pub use metrics::{DealerPosition, KeyLevels, OiBias, PositioningMetrics, Sentiment};
pub use metrics_formatter::MetricsFormatter;
pub use prediction::{KeyMetrics, RiskFlag, SettlementPrediction};
pub use prediction_formatter::PredictionFormatter;
pub use scenario::{Scenario, ScenarioKind};
pub use signal::{Direction, SignalSource, TrendSignal, MAX_STRENGTH, MIN_STRENGTH};
pub use snapshot::{ContractKind, OptionsSnapshot, SnapshotError, StrikeRow};
