//! Settlement prediction aggregate and risk flags.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::ratio_format;
use crate::scenario::Scenario;
use crate::signal::{Direction, TrendSignal};
use crate::snapshot::ContractKind;

/// Advisory risk condition. Flags never abort a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskFlag {
    /// Underlying far from Max Pain; strong pull expected into settlement
    MaxPainMagnetism { distance: f64 },
    /// Put/Call ratio outside the normal band
    SentimentExtreme {
        #[serde(with = "ratio_format")]
        ratio: f64,
    },
    /// Mean OI change large enough to indicate major repositioning
    LargePositionShift { call_delta: f64, put_delta: f64 },
    /// Every signal points a different way
    DirectionalAmbiguity,
    /// Fewer than two snapshots available
    DataInsufficient,
    /// No snapshots available at all
    NoData,
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxPainMagnetism { distance } => write!(
                f,
                "price is {distance:.0} points from Max Pain, magnetism risk is high"
            ),
            Self::SentimentExtreme { ratio } if *ratio < 1.0 => write!(
                f,
                "Put/Call ratio extremely low ({ratio:.2}), market over-optimistic"
            ),
            Self::SentimentExtreme { ratio } => write!(
                f,
                "Put/Call ratio extremely high ({ratio:.2}), market over-pessimistic"
            ),
            Self::LargePositionShift {
                call_delta,
                put_delta,
            } => write!(
                f,
                "large open-interest shifts (call {call_delta:+.0}, put {put_delta:+.0}), watch for major repositioning"
            ),
            Self::DirectionalAmbiguity => {
                write!(f, "trend signals disagree, direction unclear")
            }
            Self::DataInsufficient => {
                write!(f, "data insufficient, prediction accuracy reduced")
            }
            Self::NoData => write!(f, "data insufficient, no snapshots could be loaded"),
        }
    }
}

/// Headline numbers behind a prediction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyMetrics {
    /// Latest underlying close, or Max Pain when no close was recorded
    pub current_price: f64,
    /// Latest Max Pain strike
    pub max_pain: i64,
    #[serde(with = "ratio_format")]
    pub avg_pc_ratio: f64,
    #[serde(with = "ratio_format")]
    pub latest_pc_ratio: f64,
    pub total_call_oi: u64,
    pub total_put_oi: u64,
    /// Mean of per-snapshot net call OI change
    pub avg_call_oi_change: f64,
    /// Mean of per-snapshot net put OI change
    pub avg_put_oi_change: f64,
    /// Critical strikes of the latest snapshot, ascending
    pub critical_strikes: Vec<i64>,
    pub resistance_strikes: Vec<i64>,
    pub support_strikes: Vec<i64>,
}

/// Aggregate result of one prediction run. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementPrediction {
    pub contract_code: String,
    pub contract_kind: Option<ContractKind>,
    pub settlement_date: Option<NaiveDate>,
    /// Trade dates of the snapshots used, oldest first
    pub analysis_dates: Vec<NaiveDate>,
    pub current_price: f64,
    pub trend_signals: Vec<TrendSignal>,
    pub overall_trend: Direction,
    /// 2-5 for a real prediction, 0 for the no-data fallback
    pub trend_strength: u8,
    /// Primary predicted settlement range (low, high)
    pub predicted_range: (i64, i64),
    /// Ranked scenarios, at most three
    pub scenarios: Vec<Scenario>,
    pub key_metrics: KeyMetrics,
    pub risks: Vec<RiskFlag>,
    pub generated_at: DateTime<Utc>,
}

impl SettlementPrediction {
    /// Fallback prediction when no snapshot could be loaded.
    #[must_use]
    pub fn insufficient_data(
        contract_code: impl Into<String>,
        contract_kind: Option<ContractKind>,
        settlement_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            contract_code: contract_code.into(),
            contract_kind,
            settlement_date,
            analysis_dates: Vec::new(),
            current_price: 0.0,
            trend_signals: Vec::new(),
            overall_trend: Direction::Neutral,
            trend_strength: 0,
            predicted_range: (0, 0),
            scenarios: Vec::new(),
            key_metrics: KeyMetrics::default(),
            risks: vec![RiskFlag::NoData],
            generated_at: Utc::now(),
        }
    }

    /// Returns true for the no-data fallback.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.trend_strength == 0 && self.analysis_dates.is_empty()
    }

    /// Midpoint of the primary range, used as the point forecast.
    #[must_use]
    pub fn predicted_price(&self) -> f64 {
        (self.predicted_range.0 + self.predicted_range.1) as f64 / 2.0
    }

    /// Highest-probability scenario, if any.
    #[must_use]
    pub fn primary_scenario(&self) -> Option<&Scenario> {
        self.scenarios.first()
    }
}
