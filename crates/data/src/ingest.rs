//! Snapshot ingestion from CSV and JSON files.
//!
//! CSV ladders carry one row per strike:
//!
//! ```text
//! strike,call_oi,call_oi_delta,put_oi,put_oi_delta[,call_volume,put_volume]
//! ```
//!
//! The trade date and contract come from the caller (or from a
//! `{contract}_{YYYY-MM-DD}.csv` file name when loading a directory). JSON files
//! hold the serde form of [`OptionsSnapshot`]. Every loaded snapshot is sorted
//! and validated once here; the analytics never re-validate.

use chrono::NaiveDate;
use serde::Deserialize;
use settlement_core::{ContractKind, OptionsSnapshot, SnapshotError, StrikeRow};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File holding `trade_date,close` rows for a series directory.
pub const PRICE_CONTEXT_FILE: &str = "prices.csv";

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot: {0}")]
    Invalid(#[from] SnapshotError),

    #[error("expected {{contract}}_{{YYYY-MM-DD}}.csv, got {}", .0.display())]
    UnrecognizedFileName(PathBuf),
}

/// Snapshot identity supplied alongside a CSV ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotMeta {
    pub trade_date: NaiveDate,
    pub contract_code: String,
    pub contract_kind: Option<ContractKind>,
    pub underlying_close: Option<f64>,
}

impl SnapshotMeta {
    #[must_use]
    pub fn new(trade_date: NaiveDate, contract_code: impl Into<String>) -> Self {
        Self {
            trade_date,
            contract_code: contract_code.into(),
            contract_kind: None,
            underlying_close: None,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: Option<ContractKind>) -> Self {
        self.contract_kind = kind;
        self
    }

    #[must_use]
    pub fn with_close(mut self, close: Option<f64>) -> Self {
        self.underlying_close = close;
        self
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    strike: i64,
    call_oi: u64,
    call_oi_delta: i64,
    put_oi: u64,
    put_oi_delta: i64,
    #[serde(default)]
    call_volume: Option<u64>,
    #[serde(default)]
    put_volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    trade_date: NaiveDate,
    close: f64,
}

/// Parses a CSV ladder. Rows may arrive in any strike order.
///
/// # Errors
/// Returns an error if a row fails to parse or the resulting ladder is
/// invalid (duplicate strikes, non-positive close).
pub fn read_csv<R: Read>(reader: R, meta: &SnapshotMeta) -> Result<OptionsSnapshot, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut rows: Vec<CsvRow> = Vec::new();
    for result in csv_reader.deserialize() {
        rows.push(result?);
    }
    rows.sort_by_key(|r| r.strike);

    let has_volume = rows
        .iter()
        .any(|r| r.call_volume.is_some() || r.put_volume.is_some());
    let call_volume: Vec<u64> = rows.iter().map(|r| r.call_volume.unwrap_or(0)).collect();
    let put_volume: Vec<u64> = rows.iter().map(|r| r.put_volume.unwrap_or(0)).collect();

    let mut snapshot = OptionsSnapshot::from_rows(
        meta.trade_date,
        meta.contract_code.clone(),
        rows.iter().map(|r| StrikeRow {
            strike: r.strike,
            call_oi: r.call_oi,
            put_oi: r.put_oi,
            call_oi_delta: r.call_oi_delta,
            put_oi_delta: r.put_oi_delta,
        }),
    );
    if has_volume {
        snapshot = snapshot.with_volume(call_volume, put_volume);
    }
    snapshot.contract_kind = meta.contract_kind;
    snapshot.underlying_close = meta.underlying_close;

    snapshot.validate()?;
    Ok(snapshot)
}

/// Loads a CSV ladder from disk.
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed.
pub fn load_csv(path: &Path, meta: &SnapshotMeta) -> Result<OptionsSnapshot, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot = read_csv(file, meta)?;
    debug!(path = %path.display(), strikes = snapshot.len(), "Loaded CSV snapshot");
    Ok(snapshot)
}

/// Loads a JSON snapshot from disk.
///
/// # Errors
/// Returns an error if the file cannot be read, is not a snapshot, or fails
/// validation.
pub fn load_json(path: &Path) -> Result<OptionsSnapshot, IngestError> {
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut snapshot: OptionsSnapshot = serde_json::from_str(&text)?;
    sort_ladder(&mut snapshot);
    snapshot.validate()?;
    debug!(path = %path.display(), strikes = snapshot.len(), "Loaded JSON snapshot");
    Ok(snapshot)
}

/// Reorders a deserialized ladder by strike, carrying every parallel column.
/// Mismatched columns are left untouched for `validate` to report.
fn sort_ladder(snapshot: &mut OptionsSnapshot) {
    let len = snapshot.strikes.len();
    let columns_match = [
        snapshot.call_oi.len(),
        snapshot.put_oi.len(),
        snapshot.call_oi_delta.len(),
        snapshot.put_oi_delta.len(),
    ]
    .iter()
    .all(|&n| n == len);
    if !columns_match || snapshot.strikes.windows(2).all(|w| w[0] <= w[1]) {
        return;
    }

    let mut order: Vec<usize> = (0..len).collect();
    order.sort_by_key(|&i| snapshot.strikes[i]);

    fn permute<T: Copy>(column: &mut Vec<T>, order: &[usize]) {
        if column.len() == order.len() {
            *column = order.iter().map(|&i| column[i]).collect();
        }
    }
    permute(&mut snapshot.strikes, &order);
    permute(&mut snapshot.call_oi, &order);
    permute(&mut snapshot.put_oi, &order);
    permute(&mut snapshot.call_oi_delta, &order);
    permute(&mut snapshot.put_oi_delta, &order);
    permute(&mut snapshot.call_volume, &order);
    permute(&mut snapshot.put_volume, &order);
}

/// Loads `trade_date,close` rows.
///
/// # Errors
/// Returns an error if the file cannot be opened or a row fails to parse.
pub fn load_price_context(path: &Path) -> Result<BTreeMap<NaiveDate, f64>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut prices = BTreeMap::new();
    for result in reader.deserialize() {
        let row: PriceRow = result?;
        prices.insert(row.trade_date, row.close);
    }
    Ok(prices)
}

/// Splits `{contract}_{YYYY-MM-DD}` into its parts.
fn parse_file_stem(path: &Path) -> Option<(String, NaiveDate)> {
    let stem = path.file_stem()?.to_str()?;
    let (contract, date) = stem.rsplit_once('_')?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    (!contract.is_empty()).then(|| (contract.to_string(), date))
}

/// Loads every snapshot in a directory, oldest first per contract.
///
/// JSON files are read as-is. CSV ladders must be named
/// `{contract}_{YYYY-MM-DD}.csv`. When the directory holds a `prices.csv`, its
/// closes fill snapshots that have none. Pass `contract` to keep a single
/// series.
///
/// # Errors
/// Returns an error if the directory cannot be read or any snapshot file is
/// malformed.
pub fn load_series(dir: &Path, contract: Option<&str>) -> Result<Vec<OptionsSnapshot>, IngestError> {
    let entries = fs::read_dir(dir).map_err(|source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| IngestError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();

    let price_path = dir.join(PRICE_CONTEXT_FILE);
    let prices = if price_path.exists() {
        load_price_context(&price_path)?
    } else {
        BTreeMap::new()
    };

    let mut snapshots = Vec::new();
    for path in paths {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let snapshot = match extension {
            "json" => load_json(&path)?,
            "csv" if path == price_path => continue,
            "csv" => {
                let (code, date) = parse_file_stem(&path)
                    .ok_or_else(|| IngestError::UnrecognizedFileName(path.clone()))?;
                load_csv(&path, &SnapshotMeta::new(date, code))?
            }
            _ => {
                warn!(path = %path.display(), "Skipping unrecognized file");
                continue;
            }
        };

        if contract.is_some_and(|c| c != snapshot.contract_code) {
            continue;
        }
        snapshots.push(snapshot);
    }

    for snapshot in &mut snapshots {
        if snapshot.underlying_close.is_none() {
            snapshot.underlying_close = prices.get(&snapshot.trade_date).copied();
        }
        snapshot.validate()?;
    }

    snapshots.sort_by(|a, b| {
        a.contract_code
            .cmp(&b.contract_code)
            .then(a.trade_date.cmp(&b.trade_date))
    });

    info!(
        dir = %dir.display(),
        snapshots = snapshots.len(),
        prices = prices.len(),
        "Loaded snapshot series"
    );

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const LADDER: &str = "\
strike,call_oi,call_oi_delta,put_oi,put_oi_delta
30000,1789,120,1493,-40
28500,50,0,2868,300
29800,1157,85,761,12
29000,100,-5,1630,44
";

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn csv_rows_are_sorted_and_validated() {
        let meta = SnapshotMeta::new(date(12), "202601W3").with_close(Some(29950.0));
        let snapshot = read_csv(LADDER.as_bytes(), &meta).unwrap();

        assert_eq!(snapshot.strikes, vec![28500, 29000, 29800, 30000]);
        assert_eq!(snapshot.call_oi, vec![50, 100, 1157, 1789]);
        assert_eq!(snapshot.put_oi_delta, vec![300, 44, 12, -40]);
        assert_eq!(snapshot.underlying_close, Some(29950.0));
        assert!(snapshot.call_volume.is_empty());
    }

    #[test]
    fn csv_volume_columns_are_optional() {
        let csv = "\
strike,call_oi,call_oi_delta,put_oi,put_oi_delta,call_volume,put_volume
29000,10,0,20,0,5,8
30000,30,0,40,0,,2
";
        let snapshot = read_csv(csv.as_bytes(), &SnapshotMeta::new(date(12), "X")).unwrap();
        assert_eq!(snapshot.call_volume, vec![5, 0]);
        assert_eq!(snapshot.put_volume, vec![8, 2]);
    }

    #[test]
    fn duplicate_strikes_are_rejected() {
        let csv = "\
strike,call_oi,call_oi_delta,put_oi,put_oi_delta
30000,1,0,1,0
30000,2,0,2,0
";
        let err = read_csv(csv.as_bytes(), &SnapshotMeta::new(date(12), "X")).unwrap_err();
        assert!(matches!(err, IngestError::Invalid(SnapshotError::UnsortedStrikes { .. })));
    }

    #[test]
    fn negative_open_interest_fails_to_parse() {
        let csv = "\
strike,call_oi,call_oi_delta,put_oi,put_oi_delta
30000,-1,0,1,0
";
        let err = read_csv(csv.as_bytes(), &SnapshotMeta::new(date(12), "X")).unwrap_err();
        assert!(matches!(err, IngestError::Csv(_)));
    }

    #[test]
    fn json_snapshot_is_sorted_on_load() {
        let dir = TempDir::new().unwrap();
        let json = r#"{
            "trade_date": "2026-01-12",
            "contract_code": "202601W3",
            "contract_kind": "weekly_wednesday",
            "strikes": [30000, 29500],
            "call_oi": [10, 20],
            "put_oi": [30, 40],
            "call_oi_delta": [1, 2],
            "put_oi_delta": [3, 4],
            "underlying_close": 29900.0
        }"#;
        let path = write_file(dir.path(), "snapshot.json", json);

        let snapshot = load_json(&path).unwrap();
        assert_eq!(snapshot.strikes, vec![29500, 30000]);
        assert_eq!(snapshot.call_oi, vec![20, 10]);
        assert_eq!(snapshot.contract_kind, Some(ContractKind::WeeklyWednesday));
    }

    #[test]
    fn series_merges_prices_and_filters_contract() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "202601W3_2026-01-13.csv", LADDER);
        write_file(dir.path(), "202601W3_2026-01-12.csv", LADDER);
        write_file(dir.path(), "202601F3_2026-01-12.csv", LADDER);
        write_file(
            dir.path(),
            PRICE_CONTEXT_FILE,
            "trade_date,close\n2026-01-12,30000\n2026-01-13,30250\n",
        );
        write_file(dir.path(), "notes.txt", "ignored");

        let all = load_series(dir.path(), None).unwrap();
        assert_eq!(all.len(), 3);

        let series = load_series(dir.path(), Some("202601W3")).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].trade_date, date(12));
        assert_eq!(series[0].underlying_close, Some(30000.0));
        assert_eq!(series[1].underlying_close, Some(30250.0));
    }

    #[test]
    fn series_rejects_unnamed_csv() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "ladder.csv", LADDER);

        let err = load_series(dir.path(), None).unwrap_err();
        assert!(matches!(err, IngestError::UnrecognizedFileName(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_json(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/snapshot.json"));
    }
}
