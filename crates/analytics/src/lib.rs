//! Positioning analytics and settlement scenario engine.
//!
//! Every component is a pure function of its inputs. Degenerate input (empty
//! ladders, missing closes, no snapshots at all) degrades to defined defaults
//! instead of errors.

pub mod critical;
pub mod positioning;
pub mod predictor;
pub mod review;
pub mod risk;
pub mod scenario;
pub mod trend;

pub use critical::CriticalStrikeSelector;
pub use positioning::{dealer_position, key_levels, oi_bias, pain_at, put_call_ratio, PositioningAnalyzer};
pub use predictor::{PredictionRequest, SettlementPredictor};
pub use review::{review, Grade, PredictionReview};
pub use risk::RiskAnnotator;
pub use scenario::{price_anchor, ScenarioGenerator};
pub use trend::{overall_trend, OverallTrend, TrendSignalEngine};
