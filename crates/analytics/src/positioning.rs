//! Single-snapshot positioning: Put/Call ratios, Max Pain, resistance and support.

use rust_decimal::Decimal;
use settlement_core::{
    DealerPosition, KeyLevels, OiBias, OptionsSnapshot, PositioningConfig, PositioningMetrics,
    Sentiment,
};

/// Computes [`PositioningMetrics`] for one snapshot.
#[derive(Debug, Clone, Default)]
pub struct PositioningAnalyzer {
    config: PositioningConfig,
}

impl PositioningAnalyzer {
    #[must_use]
    pub const fn new(config: PositioningConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &PositioningConfig {
        &self.config
    }

    /// Analyzes one snapshot.
    ///
    /// An empty strike ladder yields [`PositioningMetrics::empty`]; callers are
    /// expected to treat that as "no positioning" rather than as real zeros.
    #[must_use]
    pub fn analyze(&self, snapshot: &OptionsSnapshot) -> PositioningMetrics {
        if snapshot.is_empty() {
            return PositioningMetrics::empty();
        }

        let total_call_oi = snapshot.total_call_oi();
        let total_put_oi = snapshot.total_put_oi();
        let put_call_ratio_oi = put_call_ratio(total_put_oi, total_call_oi);
        let put_call_ratio_volume =
            put_call_ratio(snapshot.total_put_volume(), snapshot.total_call_volume());

        let (max_pain_strike, pain) = max_pain(snapshot, self.config.contract_multiplier);

        let (max_call_oi_strike, max_call_oi) =
            first_max(&snapshot.strikes, &snapshot.call_oi).unwrap_or((0, 0));
        let (max_put_oi_strike, max_put_oi) =
            first_max(&snapshot.strikes, &snapshot.put_oi).unwrap_or((0, 0));

        let metrics = PositioningMetrics {
            put_call_ratio_oi,
            put_call_ratio_volume,
            max_pain_strike,
            max_pain_cost: Decimal::from_i128_with_scale(pain, 0),
            resistance_strikes: top_strikes(&snapshot.strikes, &snapshot.call_oi, self.config.top_n),
            support_strikes: top_strikes(&snapshot.strikes, &snapshot.put_oi, self.config.top_n),
            total_call_oi,
            total_put_oi,
            call_oi_change: snapshot.net_call_oi_delta(),
            put_oi_change: snapshot.net_put_oi_delta(),
            max_call_oi_strike,
            max_put_oi_strike,
            max_call_oi,
            max_put_oi,
            sentiment: Sentiment::from_ratio(put_call_ratio_oi),
        };

        tracing::debug!(
            contract = %snapshot.contract_code,
            date = %snapshot.trade_date,
            strikes = snapshot.len(),
            pc_ratio = metrics.put_call_ratio_oi,
            max_pain = metrics.max_pain_strike,
            "Positioning analyzed"
        );

        metrics
    }
}

/// Put/Call ratio rounded to 4 dp.
///
/// A zero call side yields `+inf` when puts are positive and `0` when both
/// sides are zero.
#[must_use]
pub fn put_call_ratio(put: u64, call: u64) -> f64 {
    if call == 0 {
        return if put > 0 { f64::INFINITY } else { 0.0 };
    }
    round4(put as f64 / call as f64)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Aggregate payout to option holders if the contract settles at `settlement`.
#[must_use]
pub fn pain_at(snapshot: &OptionsSnapshot, settlement: i64, multiplier: i64) -> i128 {
    let points: i128 = snapshot
        .rows()
        .map(|row| {
            let call_payout = i128::from((settlement - row.strike).max(0)) * i128::from(row.call_oi);
            let put_payout = i128::from((row.strike - settlement).max(0)) * i128::from(row.put_oi);
            call_payout + put_payout
        })
        .sum();
    points * i128::from(multiplier)
}

/// Strike with the lowest aggregate payout, scanning listed strikes only.
/// Ties go to the smallest strike.
fn max_pain(snapshot: &OptionsSnapshot, multiplier: i64) -> (i64, i128) {
    let mut best: Option<(i64, i128)> = None;
    for &candidate in &snapshot.strikes {
        let pain = pain_at(snapshot, candidate, multiplier);
        match best {
            Some((_, lowest)) if pain >= lowest => {}
            _ => best = Some((candidate, pain)),
        }
    }
    best.unwrap_or((0, 0))
}

/// First strike carrying the maximum value. On ascending strikes, ties
/// resolve to the smallest strike.
pub(crate) fn first_max<T: Copy + Ord>(strikes: &[i64], values: &[T]) -> Option<(i64, T)> {
    strikes
        .iter()
        .zip(values)
        .fold(None, |best, (&strike, &value)| match best {
            Some((_, top)) if value <= top => best,
            _ => Some((strike, value)),
        })
}

/// Top `n` strikes by value descending, ties by strike ascending.
fn top_strikes(strikes: &[i64], values: &[u64], n: usize) -> Vec<i64> {
    let mut ranked: Vec<(i64, u64)> = strikes.iter().copied().zip(values.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(strike, _)| strike).collect()
}

/// Summarizes the levels implied by positioning.
#[must_use]
pub fn key_levels(metrics: &PositioningMetrics) -> KeyLevels {
    KeyLevels {
        max_pain: metrics.max_pain_strike,
        resistance: metrics.resistance_strikes.clone(),
        support: metrics.support_strikes.clone(),
        upper: metrics.resistance_strikes.first().copied(),
        lower: metrics.support_strikes.first().copied(),
    }
}

/// Bearish when the call wall sits above the put wall.
#[must_use]
pub const fn oi_bias(metrics: &PositioningMetrics) -> OiBias {
    if metrics.max_call_oi_strike > metrics.max_put_oi_strike {
        OiBias::Bearish
    } else {
        OiBias::Bullish
    }
}

/// Infers writer activity from the net call and put OI changes.
#[must_use]
pub fn dealer_position(metrics: &PositioningMetrics) -> DealerPosition {
    let call = metrics.call_oi_change as f64;
    let put = metrics.put_oi_change as f64;

    if put > call * 1.5 && put > 0.0 {
        DealerPosition::WritingPuts
    } else if call > put * 1.5 && call > 0.0 {
        DealerPosition::WritingCalls
    } else if call > 0.0 && put > 0.0 {
        DealerPosition::TwoSided
    } else {
        DealerPosition::Unwinding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use settlement_core::StrikeRow;

    fn make_snapshot(rows: &[(i64, u64, u64)]) -> OptionsSnapshot {
        OptionsSnapshot::from_rows(
            NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            "202601W2",
            rows.iter().map(|&(strike, call_oi, put_oi)| StrikeRow {
                strike,
                call_oi,
                put_oi,
                call_oi_delta: 0,
                put_oi_delta: 0,
            }),
        )
    }

    fn reference_snapshot() -> OptionsSnapshot {
        make_snapshot(&[
            (28500, 50, 2868),
            (29000, 100, 1630),
            (29800, 1157, 761),
            (30000, 1789, 1493),
        ])
    }

    #[test]
    fn ratio_zero_denominator_rules() {
        assert!(put_call_ratio(500, 0).is_infinite());
        assert_eq!(put_call_ratio(0, 0), 0.0);
        assert_eq!(put_call_ratio(0, 100), 0.0);
    }

    #[test]
    fn ratio_rounds_to_four_places() {
        assert_eq!(put_call_ratio(6752, 3096), 2.1809);
        assert_eq!(put_call_ratio(1, 3), 0.3333);
    }

    #[test]
    fn reference_ladder_is_extremely_bearish() {
        let metrics = PositioningAnalyzer::default().analyze(&reference_snapshot());

        assert!((metrics.put_call_ratio_oi - 6752.0 / 3096.0).abs() < 1e-3);
        assert_eq!(metrics.sentiment, Sentiment::ExtremelyBearish);
        assert_eq!(metrics.total_call_oi, 3096);
        assert_eq!(metrics.total_put_oi, 6752);
    }

    #[test]
    fn max_pain_on_reference_ladder() {
        let snapshot = reference_snapshot();
        let metrics = PositioningAnalyzer::default().analyze(&snapshot);

        // pain(29800) = 443_600 points, pain(30000) = 406_400 points
        assert_eq!(pain_at(&snapshot, 29800, 1), 443_600);
        assert_eq!(pain_at(&snapshot, 30000, 1), 406_400);
        assert_eq!(metrics.max_pain_strike, 30000);
        assert_eq!(metrics.max_pain_cost, dec!(20320000));
    }

    #[test]
    fn max_pain_tie_goes_to_smallest_strike() {
        // Every strike costs 2000 points
        let snapshot = make_snapshot(&[(100, 10, 0), (200, 0, 0), (300, 0, 10)]);
        assert_eq!(pain_at(&snapshot, 100, 1), pain_at(&snapshot, 200, 1));
        assert_eq!(pain_at(&snapshot, 200, 1), pain_at(&snapshot, 300, 1));
        let metrics = PositioningAnalyzer::default().analyze(&snapshot);
        assert_eq!(metrics.max_pain_strike, 100);

        // 300 and 400 tie at 1000 points, 200 costs 2000
        let partial = make_snapshot(&[(200, 0, 0), (300, 10, 0), (400, 0, 10)]);
        assert_eq!(pain_at(&partial, 200, 1), 2000);
        assert_eq!(PositioningAnalyzer::default().analyze(&partial).max_pain_strike, 300);
    }

    #[test]
    fn empty_ladder_yields_zeroed_metrics() {
        let snapshot = make_snapshot(&[]);
        let metrics = PositioningAnalyzer::default().analyze(&snapshot);

        assert_eq!(metrics.max_pain_strike, 0);
        assert_eq!(metrics.put_call_ratio_oi, 0.0);
        assert_eq!(metrics.put_call_ratio_volume, 0.0);
        assert!(metrics.resistance_strikes.is_empty());
        assert!(metrics.support_strikes.is_empty());
    }

    #[test]
    fn top_strikes_ordered_by_oi_then_strike() {
        let snapshot = make_snapshot(&[
            (100, 5, 1),
            (200, 9, 1),
            (300, 5, 7),
            (400, 1, 7),
            (500, 9, 2),
        ]);
        let metrics = PositioningAnalyzer::default().analyze(&snapshot);

        assert_eq!(metrics.resistance_strikes, vec![200, 500, 100]);
        assert_eq!(metrics.support_strikes, vec![300, 400, 500]);
        assert_eq!(metrics.max_call_oi_strike, 200);
        assert_eq!(metrics.max_put_oi_strike, 300);
    }

    #[test]
    fn top_n_is_configurable() {
        let analyzer = PositioningAnalyzer::new(PositioningConfig {
            top_n: 1,
            ..PositioningConfig::default()
        });
        let metrics = analyzer.analyze(&reference_snapshot());
        assert_eq!(metrics.resistance_strikes, vec![30000]);
        assert_eq!(metrics.support_strikes, vec![28500]);
    }

    #[test]
    fn volume_ratio_uses_volume_columns() {
        let snapshot = reference_snapshot().with_volume(vec![10, 10, 10, 10], vec![5, 5, 5, 5]);
        let metrics = PositioningAnalyzer::default().analyze(&snapshot);
        assert_eq!(metrics.put_call_ratio_volume, 0.5);
    }

    #[test]
    fn key_levels_and_bias() {
        let metrics = PositioningAnalyzer::default().analyze(&reference_snapshot());
        let levels = key_levels(&metrics);

        assert_eq!(levels.max_pain, 30000);
        assert_eq!(levels.upper, Some(30000));
        assert_eq!(levels.lower, Some(28500));
        // Call wall at 30000 above put wall at 28500
        assert_eq!(oi_bias(&metrics), OiBias::Bearish);
    }

    #[test]
    fn dealer_position_rules() {
        let mut metrics = PositioningMetrics::empty();

        metrics.call_oi_change = 1000;
        metrics.put_oi_change = 2000;
        assert_eq!(dealer_position(&metrics), DealerPosition::WritingPuts);

        metrics.call_oi_change = 3000;
        metrics.put_oi_change = 1000;
        assert_eq!(dealer_position(&metrics), DealerPosition::WritingCalls);

        metrics.call_oi_change = 1000;
        metrics.put_oi_change = 1200;
        assert_eq!(dealer_position(&metrics), DealerPosition::TwoSided);

        metrics.call_oi_change = -500;
        metrics.put_oi_change = -800;
        assert_eq!(dealer_position(&metrics), DealerPosition::Unwinding);
    }
}
