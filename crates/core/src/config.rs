//! Engine configuration sections and their reference defaults.

use serde::{Deserialize, Serialize};

/// Engine configuration. Every threshold is a heuristic calibration; the
/// defaults are the reference values for the index options market.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub positioning: PositioningConfig,
    pub trend: TrendConfig,
    pub scenario: ScenarioConfig,
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositioningConfig {
    /// Currency value of one index point per contract
    pub contract_multiplier: i64,
    /// Number of resistance / support strikes to report
    pub top_n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Dominant OI flow must exceed the other side by this factor
    pub oi_flow_ratio: f64,
    /// Each multiple of this OI change adds one strength point
    pub oi_strength_step: f64,
    /// Ratio change (latest - earliest) that overrides the band reading
    pub ratio_trend_threshold: f64,
    /// Close-to-close move, in points, that counts as momentum
    pub momentum_points: f64,
    /// Each multiple of this percentage move adds one strength point
    pub momentum_pct_step: f64,
    /// Single-snapshot gap to Max Pain that signals control by one side
    pub single_day_gap: f64,
    /// Distance from Max Pain beyond which reversion is expected
    pub reversion_distance: f64,
    /// Distance from Max Pain inside which magnetism is strong
    pub magnet_distance: f64,
    /// Winning direction must exceed the runner-up by this factor
    pub winner_margin: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Half-width of the primary range at zero strength
    pub base_half_width: f64,
    /// Half-width growth per strength point (fraction of the base)
    pub width_per_strength: f64,
    /// Weight given to the level consistent with the bias
    pub center_weight: f64,
    /// Range bounds are rounded to this many points
    pub rounding: i64,
    pub min_probability: f64,
    pub max_probability: f64,
    /// Probability used when no signal is available
    pub fallback_probability: f64,
    /// Distance from Max Pain that adds the magnet scenario
    pub magnet_trigger: f64,
    /// Half-width of the magnet window
    pub magnet_half_width: i64,
    pub magnet_max_probability: f64,
    /// Number of scenarios returned
    pub max_scenarios: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub magnetism_distance: f64,
    pub ratio_low: f64,
    pub ratio_high: f64,
    pub large_shift: f64,
    /// Minimum signal count before disagreement is flagged
    pub ambiguity_min_signals: usize,
    /// Minimum snapshots for a well-supported prediction
    pub min_snapshots: usize,
}

impl Default for PositioningConfig {
    fn default() -> Self {
        Self {
            contract_multiplier: 50,
            top_n: 3,
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            oi_flow_ratio: 1.3,
            oi_strength_step: 3000.0,
            ratio_trend_threshold: 0.1,
            momentum_points: 200.0,
            momentum_pct_step: 0.5,
            single_day_gap: 200.0,
            reversion_distance: 400.0,
            magnet_distance: 150.0,
            winner_margin: 1.3,
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            base_half_width: 300.0,
            width_per_strength: 0.2,
            center_weight: 0.6,
            rounding: 100,
            min_probability: 15.0,
            max_probability: 60.0,
            fallback_probability: 33.3,
            magnet_trigger: 200.0,
            magnet_half_width: 100,
            magnet_max_probability: 40.0,
            max_scenarios: 3,
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            magnetism_distance: 500.0,
            ratio_low: 0.6,
            ratio_high: 1.5,
            large_shift: 10_000.0,
            ambiguity_min_signals: 3,
            min_snapshots: 2,
        }
    }
}
