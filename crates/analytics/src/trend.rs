//! Directional trend signals across consecutive snapshots.
//!
//! Four independent detectors each contribute at most one [`TrendSignal`]:
//! OI flow, Put/Call ratio, price momentum and Max Pain distance. A detector
//! that lacks the data it needs (no closes, empty ladders, a single snapshot
//! where two are required) is skipped silently. The engine reasons only about
//! the earliest and latest snapshot plus aggregate levels, so callers must
//! pass snapshots oldest first.

use serde::{Deserialize, Serialize};
use settlement_core::{
    Direction, OptionsSnapshot, PositioningMetrics, Sentiment, SignalSource, TrendConfig,
    TrendSignal, MAX_STRENGTH,
};

use crate::positioning::PositioningAnalyzer;

/// Aggregate direction and strength over a set of signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallTrend {
    pub direction: Direction,
    pub strength: u8,
}

impl Default for OverallTrend {
    fn default() -> Self {
        Self {
            direction: Direction::Neutral,
            strength: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendSignalEngine {
    analyzer: PositioningAnalyzer,
    config: TrendConfig,
}

impl TrendSignalEngine {
    #[must_use]
    pub const fn new(analyzer: PositioningAnalyzer, config: TrendConfig) -> Self {
        Self { analyzer, config }
    }

    /// Computes signals, analyzing each snapshot first.
    #[must_use]
    pub fn compute(&self, snapshots: &[OptionsSnapshot]) -> Vec<TrendSignal> {
        let metrics: Vec<PositioningMetrics> =
            snapshots.iter().map(|s| self.analyzer.analyze(s)).collect();
        self.compute_with_metrics(snapshots, &metrics)
    }

    /// Computes signals from snapshots and their already-computed metrics.
    /// `metrics[i]` must belong to `snapshots[i]`.
    #[must_use]
    pub fn compute_with_metrics(
        &self,
        snapshots: &[OptionsSnapshot],
        metrics: &[PositioningMetrics],
    ) -> Vec<TrendSignal> {
        let signals: Vec<TrendSignal> = [
            self.oi_flow(snapshots),
            self.put_call_bias(metrics),
            self.price_momentum(snapshots, metrics),
            self.max_pain_distance(snapshots, metrics),
        ]
        .into_iter()
        .flatten()
        .collect();

        tracing::debug!(
            snapshots = snapshots.len(),
            signals = signals.len(),
            "Trend signals computed"
        );

        signals
    }

    /// Compares mean net call and put OI change.
    fn oi_flow(&self, snapshots: &[OptionsSnapshot]) -> Option<TrendSignal> {
        let populated: Vec<&OptionsSnapshot> = snapshots.iter().filter(|s| !s.is_empty()).collect();
        if populated.is_empty() {
            return None;
        }

        let count = populated.len() as f64;
        let mean_call = populated.iter().map(|s| s.net_call_oi_delta() as f64).sum::<f64>() / count;
        let mean_put = populated.iter().map(|s| s.net_put_oi_delta() as f64).sum::<f64>() / count;
        let ratio = self.config.oi_flow_ratio;

        let signal = if mean_call > ratio * mean_put.abs() {
            TrendSignal::new(
                SignalSource::OiFlow,
                Direction::Bullish,
                self.oi_strength(mean_call),
                format!("call OI building faster than puts (avg {mean_call:+.0} vs {mean_put:+.0})"),
            )
        } else if mean_put > ratio * mean_call.abs() {
            TrendSignal::new(
                SignalSource::OiFlow,
                Direction::Bearish,
                self.oi_strength(mean_put),
                format!("put OI building faster than calls (avg {mean_put:+.0} vs {mean_call:+.0})"),
            )
        } else {
            TrendSignal::new(
                SignalSource::OiFlow,
                Direction::Neutral,
                2,
                format!("balanced OI flow (call {mean_call:+.0}, put {mean_put:+.0})"),
            )
        };

        tracing::debug!(mean_call, mean_put, direction = %signal.direction, "OI flow");
        Some(signal)
    }

    fn oi_strength(&self, dominant: f64) -> u8 {
        scaled_strength(dominant / self.config.oi_strength_step)
    }

    /// Band of the mean ratio, overridden by a conflicting ratio trend.
    fn put_call_bias(&self, metrics: &[PositioningMetrics]) -> Option<TrendSignal> {
        let ratios: Vec<f64> = metrics
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| m.put_call_ratio_oi)
            .collect();
        let (first, last) = (ratios.first()?, ratios.last()?);

        let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
        let band = Sentiment::from_ratio(mean);
        let band_direction = band.direction();
        let change = last - first;
        let threshold = self.config.ratio_trend_threshold;

        let trend_direction = if change < -threshold {
            Some(Direction::Bullish)
        } else if change > threshold {
            Some(Direction::Bearish)
        } else {
            None
        };

        let signal = match trend_direction {
            Some(direction) if direction != band_direction => TrendSignal::new(
                SignalSource::PutCallRatio,
                direction,
                3,
                format!("P/C ratio moved {change:+.2} against a {band} reading ({mean:.2})"),
            )
            .with_label("ratio_trend"),
            _ => {
                let strength = if band.is_extreme() {
                    4
                } else if band_direction.is_directional() {
                    3
                } else {
                    2
                };
                TrendSignal::new(
                    SignalSource::PutCallRatio,
                    band_direction,
                    strength,
                    format!("average P/C ratio {mean:.2} reads {band}"),
                )
            }
        };

        tracing::debug!(mean, change, direction = %signal.direction, "Put/Call bias");
        Some(signal)
    }

    /// Close-to-close move, or a single close against Max Pain.
    fn price_momentum(
        &self,
        snapshots: &[OptionsSnapshot],
        metrics: &[PositioningMetrics],
    ) -> Option<TrendSignal> {
        let closes: Vec<(usize, f64)> = snapshots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.underlying_close.map(|close| (i, close)))
            .collect();

        match closes.as_slice() {
            [] => None,
            [(index, close)] => {
                let positioning = metrics.get(*index).filter(|m| !m.is_empty())?;
                let gap = close - positioning.max_pain_strike as f64;
                if gap.abs() <= self.config.single_day_gap {
                    return None;
                }
                let direction = if gap > 0.0 {
                    Direction::Bullish
                } else {
                    Direction::Bearish
                };
                Some(
                    TrendSignal::new(
                        SignalSource::PriceMomentum,
                        direction,
                        3,
                        format!(
                            "close {close:.0} sits {gap:+.0} from Max Pain {}",
                            positioning.max_pain_strike
                        ),
                    )
                    .with_label("single_day"),
                )
            }
            [(_, first), .., (_, last)] => {
                let change = last - first;
                let pct = change / first * 100.0;
                let signal = if change > self.config.momentum_points {
                    TrendSignal::new(
                        SignalSource::PriceMomentum,
                        Direction::Bullish,
                        scaled_strength(pct.abs() / self.config.momentum_pct_step),
                        format!("price up {change:.0} points ({pct:+.2}%)"),
                    )
                } else if change < -self.config.momentum_points {
                    TrendSignal::new(
                        SignalSource::PriceMomentum,
                        Direction::Bearish,
                        scaled_strength(pct.abs() / self.config.momentum_pct_step),
                        format!("price down {:.0} points ({pct:+.2}%)", change.abs()),
                    )
                } else {
                    TrendSignal::new(
                        SignalSource::PriceMomentum,
                        Direction::Neutral,
                        2,
                        format!("price flat ({change:+.0} points)"),
                    )
                };
                tracing::debug!(change, pct, direction = %signal.direction, "Price momentum");
                Some(signal)
            }
        }
    }

    /// Reversion when far from Max Pain, magnetism when close.
    fn max_pain_distance(
        &self,
        snapshots: &[OptionsSnapshot],
        metrics: &[PositioningMetrics],
    ) -> Option<TrendSignal> {
        let close = latest_close(snapshots)?;
        let max_pain = latest_max_pain(metrics)?;
        let distance = close - max_pain as f64;

        let signal = if distance.abs() > self.config.reversion_distance {
            let direction = if distance > 0.0 {
                Direction::Bearish
            } else {
                Direction::Bullish
            };
            TrendSignal::new(
                SignalSource::MaxPainDistance,
                direction,
                4,
                format!("price {distance:+.0} from Max Pain {max_pain}, reversion expected"),
            )
            .with_label("reversion")
        } else if distance.abs() < self.config.magnet_distance {
            TrendSignal::new(
                SignalSource::MaxPainDistance,
                Direction::Neutral,
                3,
                format!("price within {:.0} of Max Pain {max_pain}, strong pinning", distance.abs()),
            )
        } else {
            TrendSignal::new(
                SignalSource::MaxPainDistance,
                Direction::Neutral,
                2,
                format!("price {distance:+.0} from Max Pain {max_pain}"),
            )
        };

        Some(signal)
    }
}

/// `floor(units) + 2` clamped to [2, 5].
fn scaled_strength(units: f64) -> u8 {
    if !units.is_finite() {
        return MAX_STRENGTH;
    }
    (units.max(0.0).floor() + 2.0).clamp(2.0, f64::from(MAX_STRENGTH)) as u8
}

/// Most recent recorded underlying close.
#[must_use]
pub fn latest_close(snapshots: &[OptionsSnapshot]) -> Option<f64> {
    snapshots.iter().rev().find_map(|s| s.underlying_close)
}

/// Max Pain of the most recent snapshot that has a strike ladder.
#[must_use]
pub fn latest_max_pain(metrics: &[PositioningMetrics]) -> Option<i64> {
    metrics
        .iter()
        .rev()
        .find(|m| !m.is_empty())
        .map(|m| m.max_pain_strike)
}

/// Aggregates signals into one direction and strength.
///
/// Strengths are summed per direction. A directional winner must exceed the
/// runner-up by `winner_margin`; otherwise the trend is neutral.
#[must_use]
pub fn overall_trend(signals: &[TrendSignal], config: &TrendConfig) -> OverallTrend {
    let score = |direction: Direction| -> u32 {
        signals
            .iter()
            .filter(|s| s.direction == direction)
            .map(|s| u32::from(s.strength))
            .sum()
    };

    let bullish = score(Direction::Bullish);
    let bearish = score(Direction::Bearish);
    let neutral = score(Direction::Neutral);
    let total = bullish + bearish + neutral;
    if total == 0 {
        return OverallTrend::default();
    }

    let mut ranked = [
        (Direction::Bullish, bullish),
        (Direction::Bearish, bearish),
        (Direction::Neutral, neutral),
    ];
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let (winner, winner_score) = ranked[0];
    let runner_up = ranked[1].1;
    let total = f64::from(total);

    if winner.is_directional() && f64::from(winner_score) > config.winner_margin * f64::from(runner_up)
    {
        let strength = (8.0 * f64::from(winner_score) / total).round().clamp(2.0, 5.0) as u8;
        OverallTrend {
            direction: winner,
            strength,
        }
    } else {
        let strength = (6.0 * f64::from(neutral) / total).round().clamp(2.0, 4.0) as u8;
        OverallTrend {
            direction: Direction::Neutral,
            strength,
        }
    }
}
