//! Settlement scenario generation.
//!
//! The primary range is centered between the current price and Max Pain,
//! leaning toward whichever agrees with the overall trend, and widens with
//! trend strength. Breakout, range-bound and pullback scenarios hang off that
//! range; a Max Pain magnet scenario is added when price has drifted far from
//! Max Pain. Probabilities are independent estimates and are not normalized.

use settlement_core::{
    Direction, OptionsSnapshot, PositioningMetrics, Scenario, ScenarioConfig, ScenarioKind,
    TrendConfig, TrendSignal,
};

use crate::trend::{latest_close, latest_max_pain, overall_trend, OverallTrend};

#[derive(Debug, Clone, Default)]
pub struct ScenarioGenerator {
    config: ScenarioConfig,
    trend: TrendConfig,
}

impl ScenarioGenerator {
    #[must_use]
    pub const fn new(config: ScenarioConfig, trend: TrendConfig) -> Self {
        Self { config, trend }
    }

    /// Ranked scenarios, at most `max_scenarios`. Returns an empty list when
    /// neither a close nor a strike ladder is available.
    #[must_use]
    pub fn generate(
        &self,
        snapshots: &[OptionsSnapshot],
        metrics: &[PositioningMetrics],
        signals: &[TrendSignal],
    ) -> Vec<Scenario> {
        let Some((current, max_pain)) = price_anchor(snapshots, metrics) else {
            return Vec::new();
        };

        let trend = overall_trend(signals, &self.trend);
        let (lower, upper) = self.predicted_range(current, max_pain, trend);

        let mut scenarios = vec![
            self.breakout(upper, signals),
            self.range_bound(lower, upper, max_pain, signals),
            self.pullback(lower, signals),
        ];

        let distance = (current - max_pain as f64).abs();
        if distance > self.config.magnet_trigger {
            scenarios.push(self.magnet(max_pain, distance));
        }

        scenarios.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        scenarios.truncate(self.config.max_scenarios);

        tracing::debug!(
            current,
            max_pain,
            lower,
            upper,
            scenarios = scenarios.len(),
            "Scenarios generated"
        );

        scenarios
    }

    /// Primary settlement range for a given trend.
    #[must_use]
    pub fn predicted_range(&self, current: f64, max_pain: i64, trend: OverallTrend) -> (i64, i64) {
        let max_pain = max_pain as f64;
        let weight = self.config.center_weight;

        let center = match trend.direction {
            Direction::Neutral => max_pain,
            Direction::Bullish => {
                weight * current.max(max_pain) + (1.0 - weight) * current.min(max_pain)
            }
            Direction::Bearish => {
                weight * current.min(max_pain) + (1.0 - weight) * current.max(max_pain)
            }
        };

        let half_width = self.config.base_half_width
            * (1.0 + self.config.width_per_strength * f64::from(trend.strength));

        (
            self.round_level(center - half_width),
            self.round_level(center + half_width),
        )
    }

    fn round_level(&self, price: f64) -> i64 {
        let step = self.config.rounding.max(1) as f64;
        ((price / step).round() * step) as i64
    }

    /// Share of total signal strength pointing the way that drives `kind`,
    /// clamped.
    fn probability(&self, signals: &[TrendSignal], kind: ScenarioKind) -> f64 {
        let total: u32 = signals.iter().map(|s| u32::from(s.strength)).sum();
        let Some(direction) = kind.driving_direction().filter(|_| total > 0) else {
            return self.config.fallback_probability;
        };
        let aligned: u32 = signals
            .iter()
            .filter(|s| s.direction == direction)
            .map(|s| u32::from(s.strength))
            .sum();
        (100.0 * f64::from(aligned) / f64::from(total))
            .clamp(self.config.min_probability, self.config.max_probability)
    }

    fn breakout(&self, upper: i64, signals: &[TrendSignal]) -> Scenario {
        let kind = ScenarioKind::StrongBreakout;
        Scenario {
            kind,
            name: kind.name().to_string(),
            probability: self.probability(signals, kind),
            price_range: (upper - 50, upper + 250),
            key_levels: vec![upper, upper + 100, upper + 200],
            preconditions: vec![
                format!("price holds above {upper}"),
                "call open interest keeps building".to_string(),
                "put writers defend the lower strikes".to_string(),
            ],
            recommended_action: format!("lean long above {upper}; bull call spreads"),
        }
    }

    fn range_bound(&self, lower: i64, upper: i64, max_pain: i64, signals: &[TrendSignal]) -> Scenario {
        let kind = ScenarioKind::RangeBound;
        let mut key_levels = vec![lower, max_pain, upper];
        key_levels.sort_unstable();
        key_levels.dedup();
        Scenario {
            kind,
            name: kind.name().to_string(),
            probability: self.probability(signals, kind),
            price_range: (lower, upper),
            key_levels,
            preconditions: vec![
                format!("price stays between {lower} and {upper}"),
                "no major news shock before settlement".to_string(),
            ],
            recommended_action: format!("sell premium outside {lower} ~ {upper}; iron condor"),
        }
    }

    fn pullback(&self, lower: i64, signals: &[TrendSignal]) -> Scenario {
        let kind = ScenarioKind::PullbackCorrection;
        Scenario {
            kind,
            name: kind.name().to_string(),
            probability: self.probability(signals, kind),
            price_range: (lower - 250, lower + 50),
            key_levels: vec![lower - 200, lower - 100, lower],
            preconditions: vec![
                format!("price breaks below {lower}"),
                "put open interest keeps building".to_string(),
            ],
            recommended_action: format!("hedge below {lower}; bear put spreads"),
        }
    }

    fn magnet(&self, max_pain: i64, distance: f64) -> Scenario {
        let kind = ScenarioKind::MaxPainMagnet;
        let window = self.config.magnet_half_width;
        Scenario {
            kind,
            name: kind.name().to_string(),
            probability: (distance / 10.0).min(self.config.magnet_max_probability),
            price_range: (max_pain - window, max_pain + window),
            key_levels: vec![max_pain - window, max_pain, max_pain + window],
            preconditions: vec![
                format!("settlement-day pinning toward {max_pain}"),
                "large writers defend their short strikes".to_string(),
            ],
            recommended_action: format!("fade moves away from {max_pain} into settlement"),
        }
    }
}

/// Current price and Max Pain used to anchor scenarios.
///
/// The latest close stands in for Max Pain when no ladder exists, and Max
/// Pain stands in for the price when no close was recorded.
#[must_use]
pub fn price_anchor(
    snapshots: &[OptionsSnapshot],
    metrics: &[PositioningMetrics],
) -> Option<(f64, i64)> {
    let close = latest_close(snapshots);
    let max_pain = latest_max_pain(metrics).or_else(|| close.map(|c| c.round() as i64))?;
    Some((close.unwrap_or(max_pain as f64), max_pain))
}
