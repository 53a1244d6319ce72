//! Directional trend signals derived from one or more snapshots.
//!
//! Each detector in the trend engine produces at most one [`TrendSignal`] per
//! run. Signals carry a heuristic integer strength on a 1-5 scale; they are
//! produced fresh for every prediction and have no persisted identity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lowest strength a signal can carry.
pub const MIN_STRENGTH: u8 = 1;
/// Highest strength a signal can carry.
pub const MAX_STRENGTH: u8 = 5;

/// Market direction implied by a signal or an aggregate trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Expect settlement above the current level
    Bullish,
    /// Expect settlement below the current level
    Bearish,
    /// No directional bias
    Neutral,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Bullish => Self::Bearish,
            Self::Bearish => Self::Bullish,
            Self::Neutral => Self::Neutral,
        }
    }

    /// Returns true if this direction has a directional bias.
    #[must_use]
    pub const fn is_directional(self) -> bool {
        !matches!(self, Self::Neutral)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Detector that produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Call vs put open-interest flow
    OiFlow,
    /// Put/Call ratio level and trend
    PutCallRatio,
    /// Underlying price momentum
    PriceMomentum,
    /// Distance between the underlying and Max Pain
    MaxPainDistance,
}

impl SignalSource {
    /// Default labels attached to signals from this source.
    #[must_use]
    pub const fn labels(self) -> &'static [&'static str] {
        match self {
            Self::OiFlow => &["oi_change", "positioning"],
            Self::PutCallRatio => &["put_call_ratio", "sentiment"],
            Self::PriceMomentum => &["price_momentum", "trend"],
            Self::MaxPainDistance => &["max_pain", "magnetism"],
        }
    }
}

/// One directional signal from one detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSignal {
    /// Detector that produced this signal
    pub source: SignalSource,
    /// Implied direction
    pub direction: Direction,
    /// Heuristic strength in [1, 5]
    pub strength: u8,
    /// Labels describing the evidence behind the signal
    pub sources: BTreeSet<String>,
    /// Human-readable explanation
    pub rationale: String,
}

impl TrendSignal {
    /// Creates a signal, clamping strength into [1, 5] and attaching the
    /// source's default labels.
    #[must_use]
    pub fn new(
        source: SignalSource,
        direction: Direction,
        strength: u8,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            source,
            direction,
            strength: strength.clamp(MIN_STRENGTH, MAX_STRENGTH),
            sources: source.labels().iter().map(|s| (*s).to_string()).collect(),
            rationale: rationale.into(),
        }
    }

    /// Adds an evidence label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.sources.insert(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_is_clamped() {
        let high = TrendSignal::new(SignalSource::OiFlow, Direction::Bullish, 9, "x");
        assert_eq!(high.strength, 5);

        let low = TrendSignal::new(SignalSource::OiFlow, Direction::Bullish, 0, "x");
        assert_eq!(low.strength, 1);
    }

    #[test]
    fn default_labels_attached() {
        let signal = TrendSignal::new(SignalSource::MaxPainDistance, Direction::Neutral, 3, "near")
            .with_label("settlement_week");

        assert!(signal.sources.contains("max_pain"));
        assert!(signal.sources.contains("magnetism"));
        assert!(signal.sources.contains("settlement_week"));
    }

    #[test]
    fn opposite_direction() {
        assert_eq!(Direction::Bullish.opposite(), Direction::Bearish);
        assert_eq!(Direction::Bearish.opposite(), Direction::Bullish);
        assert_eq!(Direction::Neutral.opposite(), Direction::Neutral);
        assert!(!Direction::Neutral.is_directional());
    }

    #[test]
    fn direction_serializes_snake_case() {
        let json = serde_json::to_string(&Direction::Bearish).unwrap();
        assert_eq!(json, "\"bearish\"");
    }
}
