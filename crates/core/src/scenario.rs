//! Settlement scenarios.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::Direction;

/// Scenario archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Settlement above the primary range
    StrongBreakout,
    /// Settlement inside the primary range
    RangeBound,
    /// Settlement below the primary range
    PullbackCorrection,
    /// Settlement pulled to the Max Pain strike
    MaxPainMagnet,
}

impl ScenarioKind {
    /// Signal direction whose strength mass drives this scenario's probability.
    /// The magnet scenario is driven by distance instead.
    #[must_use]
    pub const fn driving_direction(self) -> Option<Direction> {
        match self {
            Self::StrongBreakout => Some(Direction::Bullish),
            Self::RangeBound => Some(Direction::Neutral),
            Self::PullbackCorrection => Some(Direction::Bearish),
            Self::MaxPainMagnet => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StrongBreakout => "Strong breakout",
            Self::RangeBound => "Range-bound",
            Self::PullbackCorrection => "Pullback correction",
            Self::MaxPainMagnet => "Max Pain magnet",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// One possible settlement outcome.
///
/// Probabilities across scenarios are independent estimates and are not
/// expected to sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub name: String,
    /// Likelihood estimate in [0, 100]
    pub probability: f64,
    /// Settlement range (low, high)
    pub price_range: (i64, i64),
    /// Levels to watch, ascending
    pub key_levels: Vec<i64>,
    /// Conditions under which the scenario plays out
    pub preconditions: Vec<String>,
    /// Suggested posture
    pub recommended_action: String,
}

impl Scenario {
    /// Midpoint of the price range.
    #[must_use]
    pub fn midpoint(&self) -> i64 {
        (self.price_range.0 + self.price_range.1) / 2
    }
}
