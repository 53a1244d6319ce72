//! Advisory risk flags.

use std::collections::HashSet;

use settlement_core::{OptionsSnapshot, PositioningMetrics, RiskConfig, RiskFlag, TrendSignal};

use crate::trend::{latest_close, latest_max_pain};

#[derive(Debug, Clone, Default)]
pub struct RiskAnnotator {
    config: RiskConfig,
}

impl RiskAnnotator {
    #[must_use]
    pub const fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Runs every rule independently. Rules that lack data stay silent.
    #[must_use]
    pub fn annotate(
        &self,
        snapshots: &[OptionsSnapshot],
        signals: &[TrendSignal],
        metrics: &[PositioningMetrics],
    ) -> Vec<RiskFlag> {
        let flags: Vec<RiskFlag> = [
            self.check_magnetism(snapshots, metrics),
            self.check_sentiment(metrics),
            self.check_position_shift(snapshots),
            self.check_ambiguity(signals),
            self.check_data(snapshots),
        ]
        .into_iter()
        .flatten()
        .collect();

        for flag in &flags {
            tracing::debug!(risk = %flag, "Risk flagged");
        }

        flags
    }

    fn check_magnetism(
        &self,
        snapshots: &[OptionsSnapshot],
        metrics: &[PositioningMetrics],
    ) -> Option<RiskFlag> {
        let close = latest_close(snapshots)?;
        let max_pain = latest_max_pain(metrics)?;
        let distance = (close - max_pain as f64).abs();
        (distance > self.config.magnetism_distance).then_some(RiskFlag::MaxPainMagnetism { distance })
    }

    fn check_sentiment(&self, metrics: &[PositioningMetrics]) -> Option<RiskFlag> {
        let latest = metrics.last().filter(|m| !m.is_empty())?;
        let ratio = latest.put_call_ratio_oi;
        (ratio < self.config.ratio_low || ratio > self.config.ratio_high)
            .then_some(RiskFlag::SentimentExtreme { ratio })
    }

    fn check_position_shift(&self, snapshots: &[OptionsSnapshot]) -> Option<RiskFlag> {
        if snapshots.is_empty() {
            return None;
        }
        let count = snapshots.len() as f64;
        let call_delta = snapshots.iter().map(|s| s.net_call_oi_delta() as f64).sum::<f64>() / count;
        let put_delta = snapshots.iter().map(|s| s.net_put_oi_delta() as f64).sum::<f64>() / count;

        (call_delta.abs() > self.config.large_shift || put_delta.abs() > self.config.large_shift)
            .then_some(RiskFlag::LargePositionShift {
                call_delta,
                put_delta,
            })
    }

    /// Every signal points a different way.
    fn check_ambiguity(&self, signals: &[TrendSignal]) -> Option<RiskFlag> {
        if signals.len() < self.config.ambiguity_min_signals {
            return None;
        }
        let directions: HashSet<_> = signals.iter().map(|s| s.direction).collect();
        (directions.len() == signals.len()).then_some(RiskFlag::DirectionalAmbiguity)
    }

    fn check_data(&self, snapshots: &[OptionsSnapshot]) -> Option<RiskFlag> {
        (snapshots.len() < self.config.min_snapshots).then_some(RiskFlag::DataInsufficient)
    }
}
