//! Options open-interest snapshot for one trading day and one contract series.
//!
//! A snapshot is the strike ladder of a single expiry with call/put open
//! interest and the change versus the prior session. Everything downstream
//! (positioning, signals, scenarios) assumes the invariants checked by
//! [`OptionsSnapshot::validate`]: parallel columns share the ladder length and
//! strikes are strictly increasing. The analytics never re-validate; the
//! ingestion layer is expected to call `validate` once.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Expiry series a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// Weekly contract settling on Wednesday
    WeeklyWednesday,
    /// Weekly contract settling on Friday
    WeeklyFriday,
    /// Near-month contract settling on the third Wednesday of the month
    NearMonth,
}

impl ContractKind {
    /// Returns the first settlement date on or after `from`.
    #[must_use]
    pub fn next_settlement_date(self, from: NaiveDate) -> NaiveDate {
        match self {
            Self::WeeklyWednesday => next_weekday(from, Weekday::Wed),
            Self::WeeklyFriday => next_weekday(from, Weekday::Fri),
            Self::NearMonth => {
                let this_month = third_wednesday(from.year(), from.month());
                if this_month >= from {
                    this_month
                } else if from.month() == 12 {
                    third_wednesday(from.year() + 1, 1)
                } else {
                    third_wednesday(from.year(), from.month() + 1)
                }
            }
        }
    }

    /// Short label used in reports and file names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WeeklyWednesday => "weekly_wed",
            Self::WeeklyFriday => "weekly_fri",
            Self::NearMonth => "monthly",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for ContractKind {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly_wed" | "weekly_wednesday" | "wed" | "wednesday" => Ok(Self::WeeklyWednesday),
            "weekly_fri" | "weekly_friday" | "fri" | "friday" => Ok(Self::WeeklyFriday),
            "monthly" | "near_month" | "month" => Ok(Self::NearMonth),
            other => Err(SnapshotError::UnknownContractKind(other.to_string())),
        }
    }
}

fn next_weekday(from: NaiveDate, target: Weekday) -> NaiveDate {
    let ahead = (i64::from(target.num_days_from_monday())
        - i64::from(from.weekday().num_days_from_monday()))
    .rem_euclid(7);
    from + Duration::days(ahead)
}

fn third_wednesday(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Wed, 3)
        .unwrap_or(NaiveDate::MIN)
}

/// Errors raised when a snapshot violates the ladder invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// A parallel column does not match the strike ladder length.
    #[error("column {column} has {actual} entries, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Strikes are not strictly increasing.
    #[error("strike {strike} at row {row} does not exceed previous strike {previous}")]
    UnsortedStrikes {
        row: usize,
        previous: i64,
        strike: i64,
    },

    /// Contract kind label could not be parsed.
    #[error("unknown contract kind: {0}")]
    UnknownContractKind(String),

    /// Underlying close is not a finite positive price.
    #[error("invalid underlying close: {0}")]
    InvalidClose(f64),
}

/// One row of the strike ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrikeRow {
    pub strike: i64,
    pub call_oi: u64,
    pub put_oi: u64,
    pub call_oi_delta: i64,
    pub put_oi_delta: i64,
}

impl StrikeRow {
    /// Combined call and put open interest.
    #[must_use]
    pub const fn total_oi(&self) -> u64 {
        self.call_oi + self.put_oi
    }

    /// Combined absolute open-interest change.
    #[must_use]
    pub const fn total_abs_delta(&self) -> u64 {
        self.call_oi_delta.unsigned_abs() + self.put_oi_delta.unsigned_abs()
    }
}

/// Open-interest table for one contract on one trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsSnapshot {
    /// Trading day (unique per contract)
    pub trade_date: NaiveDate,
    /// Expiry / contract series identifier, e.g. "202601W2"
    pub contract_code: String,
    /// Expiry series, when known
    #[serde(default)]
    pub contract_kind: Option<ContractKind>,
    /// Strike ladder, strictly increasing
    pub strikes: Vec<i64>,
    /// Call open interest per strike
    pub call_oi: Vec<u64>,
    /// Put open interest per strike
    pub put_oi: Vec<u64>,
    /// Call open-interest change versus the prior session
    pub call_oi_delta: Vec<i64>,
    /// Put open-interest change versus the prior session
    pub put_oi_delta: Vec<i64>,
    /// Call volume per strike (empty when the source has no volume column)
    #[serde(default)]
    pub call_volume: Vec<u64>,
    /// Put volume per strike (empty when the source has no volume column)
    #[serde(default)]
    pub put_volume: Vec<u64>,
    /// Underlying closing price used as the pricing reference
    #[serde(default)]
    pub underlying_close: Option<f64>,
}

impl OptionsSnapshot {
    /// Creates an empty snapshot for a contract and date.
    #[must_use]
    pub fn empty(trade_date: NaiveDate, contract_code: impl Into<String>) -> Self {
        Self {
            trade_date,
            contract_code: contract_code.into(),
            contract_kind: None,
            strikes: Vec::new(),
            call_oi: Vec::new(),
            put_oi: Vec::new(),
            call_oi_delta: Vec::new(),
            put_oi_delta: Vec::new(),
            call_volume: Vec::new(),
            put_volume: Vec::new(),
            underlying_close: None,
        }
    }

    /// Builds a snapshot from ladder rows. Rows are sorted by strike.
    #[must_use]
    pub fn from_rows(
        trade_date: NaiveDate,
        contract_code: impl Into<String>,
        rows: impl IntoIterator<Item = StrikeRow>,
    ) -> Self {
        let mut rows: Vec<StrikeRow> = rows.into_iter().collect();
        rows.sort_by_key(|r| r.strike);

        let mut snapshot = Self::empty(trade_date, contract_code);
        for row in rows {
            snapshot.strikes.push(row.strike);
            snapshot.call_oi.push(row.call_oi);
            snapshot.put_oi.push(row.put_oi);
            snapshot.call_oi_delta.push(row.call_oi_delta);
            snapshot.put_oi_delta.push(row.put_oi_delta);
        }
        snapshot
    }

    /// Sets the contract kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ContractKind) -> Self {
        self.contract_kind = Some(kind);
        self
    }

    /// Sets the underlying close.
    #[must_use]
    pub fn with_close(mut self, close: f64) -> Self {
        self.underlying_close = Some(close);
        self
    }

    /// Sets per-strike volumes.
    #[must_use]
    pub fn with_volume(mut self, call_volume: Vec<u64>, put_volume: Vec<u64>) -> Self {
        self.call_volume = call_volume;
        self.put_volume = put_volume;
        self
    }

    /// Number of strikes in the ladder.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strikes.len()
    }

    /// Returns true if the ladder has no strikes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }

    /// Iterates over the ladder row by row.
    pub fn rows(&self) -> impl Iterator<Item = StrikeRow> + '_ {
        (0..self.strikes.len()).map(move |i| StrikeRow {
            strike: self.strikes[i],
            call_oi: self.call_oi[i],
            put_oi: self.put_oi[i],
            call_oi_delta: self.call_oi_delta[i],
            put_oi_delta: self.put_oi_delta[i],
        })
    }

    #[must_use]
    pub fn total_call_oi(&self) -> u64 {
        self.call_oi.iter().sum()
    }

    #[must_use]
    pub fn total_put_oi(&self) -> u64 {
        self.put_oi.iter().sum()
    }

    /// Net call open-interest change across the ladder.
    #[must_use]
    pub fn net_call_oi_delta(&self) -> i64 {
        self.call_oi_delta.iter().sum()
    }

    /// Net put open-interest change across the ladder.
    #[must_use]
    pub fn net_put_oi_delta(&self) -> i64 {
        self.put_oi_delta.iter().sum()
    }

    #[must_use]
    pub fn total_call_volume(&self) -> u64 {
        self.call_volume.iter().sum()
    }

    #[must_use]
    pub fn total_put_volume(&self) -> u64 {
        self.put_volume.iter().sum()
    }

    /// Checks the ladder invariants.
    ///
    /// # Errors
    /// Returns the first violated invariant: a column length mismatch, a
    /// non-increasing strike, or a non-finite / non-positive close.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let expected = self.strikes.len();
        let columns = [
            ("call_oi", self.call_oi.len()),
            ("put_oi", self.put_oi.len()),
            ("call_oi_delta", self.call_oi_delta.len()),
            ("put_oi_delta", self.put_oi_delta.len()),
        ];
        for (column, actual) in columns {
            if actual != expected {
                return Err(SnapshotError::LengthMismatch {
                    column,
                    expected,
                    actual,
                });
            }
        }

        // Volume columns are optional but must be complete when present.
        for (column, actual) in [
            ("call_volume", self.call_volume.len()),
            ("put_volume", self.put_volume.len()),
        ] {
            if actual != 0 && actual != expected {
                return Err(SnapshotError::LengthMismatch {
                    column,
                    expected,
                    actual,
                });
            }
        }

        for (row, pair) in self.strikes.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(SnapshotError::UnsortedStrikes {
                    row: row + 1,
                    previous: pair[0],
                    strike: pair[1],
                });
            }
        }

        if let Some(close) = self.underlying_close {
            if !close.is_finite() || close <= 0.0 {
                return Err(SnapshotError::InvalidClose(close));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(strike: i64, call_oi: u64, put_oi: u64) -> StrikeRow {
        StrikeRow {
            strike,
            call_oi,
            put_oi,
            call_oi_delta: 0,
            put_oi_delta: 0,
        }
    }

    #[test]
    fn from_rows_sorts_by_strike() {
        let snapshot = OptionsSnapshot::from_rows(
            date(2026, 1, 12),
            "202601W2",
            vec![row(30000, 1, 2), row(29000, 3, 4), row(29500, 5, 6)],
        );

        assert_eq!(snapshot.strikes, vec![29000, 29500, 30000]);
        assert_eq!(snapshot.call_oi, vec![3, 5, 1]);
        assert_eq!(snapshot.put_oi, vec![4, 6, 2]);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn validate_rejects_length_mismatch() {
        let mut snapshot =
            OptionsSnapshot::from_rows(date(2026, 1, 12), "X", vec![row(100, 1, 1), row(200, 1, 1)]);
        snapshot.put_oi.pop();

        assert_eq!(
            snapshot.validate(),
            Err(SnapshotError::LengthMismatch {
                column: "put_oi",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn validate_rejects_duplicate_strikes() {
        let mut snapshot =
            OptionsSnapshot::from_rows(date(2026, 1, 12), "X", vec![row(100, 1, 1), row(200, 1, 1)]);
        snapshot.strikes[1] = 100;

        assert!(matches!(
            snapshot.validate(),
            Err(SnapshotError::UnsortedStrikes { row: 1, .. })
        ));
    }

    #[test]
    fn validate_allows_missing_volume_but_not_partial_volume() {
        let snapshot =
            OptionsSnapshot::from_rows(date(2026, 1, 12), "X", vec![row(100, 1, 1), row(200, 1, 1)]);
        assert!(snapshot.validate().is_ok());

        let partial = snapshot.with_volume(vec![1], vec![1, 2]);
        assert!(matches!(
            partial.validate(),
            Err(SnapshotError::LengthMismatch {
                column: "call_volume",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_non_positive_close() {
        let snapshot = OptionsSnapshot::empty(date(2026, 1, 12), "X").with_close(0.0);
        assert_eq!(snapshot.validate(), Err(SnapshotError::InvalidClose(0.0)));
    }

    #[test]
    fn aggregates_sum_columns() {
        let mut snapshot =
            OptionsSnapshot::from_rows(date(2026, 1, 12), "X", vec![row(100, 10, 20), row(200, 30, 40)]);
        snapshot.call_oi_delta = vec![5, -2];
        snapshot.put_oi_delta = vec![-7, 1];

        assert_eq!(snapshot.total_call_oi(), 40);
        assert_eq!(snapshot.total_put_oi(), 60);
        assert_eq!(snapshot.net_call_oi_delta(), 3);
        assert_eq!(snapshot.net_put_oi_delta(), -6);
        assert_eq!(snapshot.total_call_volume(), 0);
    }

    #[test]
    fn weekly_settlement_dates() {
        // 2026-01-12 is a Monday
        let monday = date(2026, 1, 12);
        assert_eq!(
            ContractKind::WeeklyWednesday.next_settlement_date(monday),
            date(2026, 1, 14)
        );
        assert_eq!(
            ContractKind::WeeklyFriday.next_settlement_date(monday),
            date(2026, 1, 16)
        );
        // Settlement day itself counts
        assert_eq!(
            ContractKind::WeeklyWednesday.next_settlement_date(date(2026, 1, 14)),
            date(2026, 1, 14)
        );
    }

    #[test]
    fn near_month_rolls_after_third_wednesday() {
        assert_eq!(
            ContractKind::NearMonth.next_settlement_date(date(2026, 1, 5)),
            date(2026, 1, 21)
        );
        assert_eq!(
            ContractKind::NearMonth.next_settlement_date(date(2026, 1, 22)),
            date(2026, 2, 18)
        );
        assert_eq!(
            ContractKind::NearMonth.next_settlement_date(date(2025, 12, 30)),
            date(2026, 1, 21)
        );
    }

    #[test]
    fn contract_kind_parses_labels() {
        assert_eq!("weekly_wed".parse::<ContractKind>(), Ok(ContractKind::WeeklyWednesday));
        assert_eq!("Friday".parse::<ContractKind>(), Ok(ContractKind::WeeklyFriday));
        assert_eq!("monthly".parse::<ContractKind>(), Ok(ContractKind::NearMonth));
        assert!("quarterly".parse::<ContractKind>().is_err());
    }
}
