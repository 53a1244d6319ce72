//! Positioning metrics derived from a single snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::Direction;

/// Sentiment band over the open-interest Put/Call ratio.
///
/// Boundaries are fixed: `<0.7`, `[0.7, 0.9)`, `[0.9, 1.1)`, `[1.1, 1.3)`, `>=1.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    ExtremelyBullish,
    Bullish,
    Neutral,
    Bearish,
    ExtremelyBearish,
}

impl Sentiment {
    /// Classifies a Put/Call ratio. `+inf` falls in the extremely bearish band.
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.7 {
            Self::ExtremelyBullish
        } else if ratio < 0.9 {
            Self::Bullish
        } else if ratio < 1.1 {
            Self::Neutral
        } else if ratio < 1.3 {
            Self::Bearish
        } else {
            Self::ExtremelyBearish
        }
    }

    /// Direction implied by the band.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::ExtremelyBullish | Self::Bullish => Direction::Bullish,
            Self::Neutral => Direction::Neutral,
            Self::Bearish | Self::ExtremelyBearish => Direction::Bearish,
        }
    }

    /// Returns true for the two outer bands.
    #[must_use]
    pub const fn is_extreme(self) -> bool {
        matches!(self, Self::ExtremelyBullish | Self::ExtremelyBearish)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtremelyBullish => "extremely_bullish",
            Self::Bullish => "bullish",
            Self::Neutral => "neutral",
            Self::Bearish => "bearish",
            Self::ExtremelyBearish => "extremely_bearish",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where the heaviest call and put open interest sit relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OiBias {
    /// Call wall above put wall: resistance overhead
    Bearish,
    /// Put wall at or above call wall
    Bullish,
}

/// Inferred option-writer activity from aggregate OI changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealerPosition {
    /// Put open interest growing much faster than calls (supportive)
    WritingPuts,
    /// Call open interest growing much faster than puts (capping)
    WritingCalls,
    /// Both sides growing (range expectation)
    TwoSided,
    /// Open interest shrinking or flat
    Unwinding,
}

impl fmt::Display for DealerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WritingPuts => write!(f, "put writing dominates (supportive)"),
            Self::WritingCalls => write!(f, "call writing dominates (capping)"),
            Self::TwoSided => write!(f, "two-sided writing (range expectation)"),
            Self::Unwinding => write!(f, "positions unwinding"),
        }
    }
}

/// Metrics computed once per snapshot. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositioningMetrics {
    /// Aggregate put OI over call OI (4 dp, `+inf` when no call OI)
    #[serde(with = "ratio_format")]
    pub put_call_ratio_oi: f64,
    /// Aggregate put volume over call volume (4 dp, `+inf` when no call volume)
    #[serde(with = "ratio_format")]
    pub put_call_ratio_volume: f64,
    /// Strike minimizing aggregate holder payout at expiry
    pub max_pain_strike: i64,
    /// Aggregate holder payout at the Max Pain strike, in currency
    pub max_pain_cost: Decimal,
    /// Top strikes by call OI, OI descending
    pub resistance_strikes: Vec<i64>,
    /// Top strikes by put OI, OI descending
    pub support_strikes: Vec<i64>,
    pub total_call_oi: u64,
    pub total_put_oi: u64,
    /// Net call OI change across the ladder
    pub call_oi_change: i64,
    /// Net put OI change across the ladder
    pub put_oi_change: i64,
    pub max_call_oi_strike: i64,
    pub max_put_oi_strike: i64,
    pub max_call_oi: u64,
    pub max_put_oi: u64,
    /// Band of `put_call_ratio_oi`
    pub sentiment: Sentiment,
}

impl PositioningMetrics {
    /// Metrics for an empty strike ladder.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            put_call_ratio_oi: 0.0,
            put_call_ratio_volume: 0.0,
            max_pain_strike: 0,
            max_pain_cost: Decimal::ZERO,
            resistance_strikes: Vec::new(),
            support_strikes: Vec::new(),
            total_call_oi: 0,
            total_put_oi: 0,
            call_oi_change: 0,
            put_oi_change: 0,
            max_call_oi_strike: 0,
            max_put_oi_strike: 0,
            max_call_oi: 0,
            max_put_oi: 0,
            sentiment: Sentiment::from_ratio(0.0),
        }
    }

    /// Returns true when computed from an empty ladder.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_call_oi == 0 && self.total_put_oi == 0 && self.max_pain_strike == 0
    }
}

/// Summary of the price levels implied by positioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLevels {
    pub max_pain: i64,
    pub resistance: Vec<i64>,
    pub support: Vec<i64>,
    /// Heaviest call strike
    pub upper: Option<i64>,
    /// Heaviest put strike
    pub lower: Option<i64>,
}

/// Serializes ratios so that `+inf` survives a JSON round trip.
///
/// JSON has no infinity literal; `serde_json` would write `null`. Infinite
/// ratios are written as the string `"inf"` instead.
pub mod ratio_format {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(t) if t == "inf" => Ok(f64::INFINITY),
            Repr::Text(other) => Err(D::Error::custom(format!("invalid ratio: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_band_boundaries() {
        assert_eq!(Sentiment::from_ratio(0.0), Sentiment::ExtremelyBullish);
        assert_eq!(Sentiment::from_ratio(0.6999), Sentiment::ExtremelyBullish);
        assert_eq!(Sentiment::from_ratio(0.7), Sentiment::Bullish);
        assert_eq!(Sentiment::from_ratio(0.8999), Sentiment::Bullish);
        assert_eq!(Sentiment::from_ratio(0.9), Sentiment::Neutral);
        assert_eq!(Sentiment::from_ratio(1.0999), Sentiment::Neutral);
        assert_eq!(Sentiment::from_ratio(1.1), Sentiment::Bearish);
        assert_eq!(Sentiment::from_ratio(1.2999), Sentiment::Bearish);
        assert_eq!(Sentiment::from_ratio(1.3), Sentiment::ExtremelyBearish);
        assert_eq!(Sentiment::from_ratio(f64::INFINITY), Sentiment::ExtremelyBearish);
    }

    #[test]
    fn sentiment_direction() {
        assert_eq!(Sentiment::ExtremelyBullish.direction(), Direction::Bullish);
        assert_eq!(Sentiment::Neutral.direction(), Direction::Neutral);
        assert_eq!(Sentiment::Bearish.direction(), Direction::Bearish);
        assert!(Sentiment::ExtremelyBearish.is_extreme());
        assert!(!Sentiment::Bullish.is_extreme());
    }

    #[test]
    fn infinite_ratio_survives_json() {
        let mut metrics = PositioningMetrics::empty();
        metrics.put_call_ratio_oi = f64::INFINITY;
        metrics.put_call_ratio_volume = 0.8123;

        let json = serde_json::to_string(&metrics).unwrap();
        assert!(json.contains("\"put_call_ratio_oi\":\"inf\""));

        let back: PositioningMetrics = serde_json::from_str(&json).unwrap();
        assert!(back.put_call_ratio_oi.is_infinite());
        assert!((back.put_call_ratio_volume - 0.8123).abs() < 1e-12);
    }

    #[test]
    fn empty_metrics_are_zeroed() {
        let metrics = PositioningMetrics::empty();
        assert!(metrics.is_empty());
        assert_eq!(metrics.max_pain_strike, 0);
        assert!(metrics.resistance_strikes.is_empty());
    }
}
