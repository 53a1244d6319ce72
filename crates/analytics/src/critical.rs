//! Critical strike annotation.

use std::collections::BTreeSet;

use settlement_core::OptionsSnapshot;

use crate::positioning::first_max;

/// Merges the strikes carrying the heaviest call OI, put OI, combined OI and
/// combined absolute OI change.
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalStrikeSelector;

impl CriticalStrikeSelector {
    /// Returns the deduplicated candidate strikes, ascending. An empty ladder
    /// yields an empty set.
    #[must_use]
    pub fn select(&self, snapshot: &OptionsSnapshot) -> BTreeSet<i64> {
        let total_oi: Vec<u64> = snapshot.rows().map(|row| row.total_oi()).collect();
        let total_delta: Vec<u64> = snapshot.rows().map(|row| row.total_abs_delta()).collect();

        [
            first_max(&snapshot.strikes, &snapshot.call_oi),
            first_max(&snapshot.strikes, &snapshot.put_oi),
            first_max(&snapshot.strikes, &total_oi),
            first_max(&snapshot.strikes, &total_delta),
        ]
        .into_iter()
        .flatten()
        .map(|(strike, _)| strike)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use settlement_core::StrikeRow;

    fn make_row(strike: i64, call_oi: u64, put_oi: u64, call_delta: i64, put_delta: i64) -> StrikeRow {
        StrikeRow {
            strike,
            call_oi,
            put_oi,
            call_oi_delta: call_delta,
            put_oi_delta: put_delta,
        }
    }

    fn make_snapshot(rows: Vec<StrikeRow>) -> OptionsSnapshot {
        OptionsSnapshot::from_rows(NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(), "X", rows)
    }

    #[test]
    fn four_distinct_candidates() {
        let snapshot = make_snapshot(vec![
            make_row(29000, 10, 900, 0, 0),
            make_row(29500, 600, 600, 5, -5),
            make_row(30000, 1000, 10, 0, 0),
            make_row(30500, 50, 50, -800, 900),
        ]);

        let strikes: Vec<i64> = CriticalStrikeSelector.select(&snapshot).into_iter().collect();
        assert_eq!(strikes, vec![29000, 29500, 30000, 30500]);
    }

    #[test]
    fn candidates_are_deduplicated() {
        let snapshot = make_snapshot(vec![
            make_row(100, 1, 1, 0, 0),
            make_row(200, 50, 50, 40, -40),
            make_row(300, 2, 2, 0, 0),
        ]);

        let strikes: Vec<i64> = CriticalStrikeSelector.select(&snapshot).into_iter().collect();
        assert_eq!(strikes, vec![200]);
    }

    #[test]
    fn empty_ladder_yields_empty_set() {
        let snapshot = make_snapshot(Vec::new());
        assert!(CriticalStrikeSelector.select(&snapshot).is_empty());
    }

    #[test]
    fn negative_deltas_count_by_magnitude() {
        let snapshot = make_snapshot(vec![
            make_row(100, 5, 5, 0, 0),
            make_row(200, 1, 1, -3000, -2000),
            make_row(300, 5, 6, 100, 100),
        ]);

        let strikes = CriticalStrikeSelector.select(&snapshot);
        assert!(strikes.contains(&200));
    }
}
