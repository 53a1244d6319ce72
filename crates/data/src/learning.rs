//! Append-only analysis log and advisory historical context.
//!
//! Each analysis run appends one [`AnalysisRecord`]. The log is never
//! rewritten; next-day outcomes are derived at query time by pairing
//! consecutive closes of the same contract. The context is advisory text for
//! reports and never feeds back into the engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use settlement_core::metrics::ratio_format;
use settlement_core::Sentiment;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::store::StoreError;

/// Records considered when looking for similar situations.
const RECENT_WINDOW: usize = 20;
/// Ratio distance that counts as a similar situation.
const SIMILAR_RATIO: f64 = 0.1;
/// Outcomes needed before a band average is reported.
const MIN_OUTCOMES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub trade_date: NaiveDate,
    pub contract_code: String,
    #[serde(with = "ratio_format")]
    pub pc_ratio: f64,
    pub sentiment: Sentiment,
    pub max_pain: i64,
    pub close: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl AnalysisRecord {
    #[must_use]
    pub fn new(
        trade_date: NaiveDate,
        contract_code: impl Into<String>,
        pc_ratio: f64,
        max_pain: i64,
        close: Option<f64>,
    ) -> Self {
        Self {
            trade_date,
            contract_code: contract_code.into(),
            pc_ratio,
            sentiment: Sentiment::from_ratio(pc_ratio),
            max_pain,
            close,
            recorded_at: Utc::now(),
        }
    }
}

/// How much history the log has accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Novice,
    Learning,
    Developing,
    Experienced,
    Veteran,
}

impl ExperienceLevel {
    #[must_use]
    pub const fn from_count(records: usize) -> Self {
        match records {
            0..=9 => Self::Novice,
            10..=29 => Self::Learning,
            30..=49 => Self::Developing,
            50..=99 => Self::Experienced,
            _ => Self::Veteran,
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Novice => "novice",
            Self::Learning => "learning",
            Self::Developing => "developing",
            Self::Experienced => "experienced",
            Self::Veteran => "veteran",
        };
        f.pad(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarSituation {
    pub trade_date: NaiveDate,
    pub contract_code: String,
    #[serde(with = "ratio_format")]
    pub pc_ratio: f64,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalContext {
    pub total_records: usize,
    pub experience: ExperienceLevel,
    /// Recent records within the similarity band, newest first
    pub similar_situations: Vec<SimilarSituation>,
    pub insights: Vec<String>,
    pub warnings: Vec<String>,
}

/// Append-only log, optionally backed by a JSON-lines file.
#[derive(Debug, Default)]
pub struct LearningLog {
    path: Option<PathBuf>,
    records: Vec<AnalysisRecord>,
}

impl LearningLog {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a JSON-lines log. A missing file is an empty log; lines that
    /// fail to parse are skipped with a warning.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = match File::open(&path) {
            Ok(file) => Some(file),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        if let Some(file) = file {
            for (number, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<AnalysisRecord>(&line) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(
                        path = %path.display(),
                        line = number + 1,
                        error = %e,
                        "Skipping unreadable learning record"
                    ),
                }
            }
        }

        debug!(path = %path.display(), records = records.len(), "Opened learning log");
        Ok(Self {
            path: Some(path),
            records,
        })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    /// Appends a record, writing it through to the backing file.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written.
    pub fn append(&mut self, record: AnalysisRecord) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.exists() {
                    fs::create_dir_all(parent)?;
                }
            }
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            let line = serde_json::to_string(&record)?;
            writeln!(file, "{line}")?;
        }
        self.records.push(record);
        Ok(())
    }

    /// Close-to-close change following each record, per contract.
    fn outcomes(&self) -> Vec<(&AnalysisRecord, f64)> {
        let mut ordered: Vec<&AnalysisRecord> = self.records.iter().collect();
        ordered.sort_by(|a, b| {
            a.contract_code
                .cmp(&b.contract_code)
                .then(a.trade_date.cmp(&b.trade_date))
        });

        ordered
            .windows(2)
            .filter(|pair| pair[0].contract_code == pair[1].contract_code)
            .filter_map(|pair| match (pair[0].close, pair[1].close) {
                (Some(today), Some(next)) => Some((pair[0], next - today)),
                _ => None,
            })
            .collect()
    }

    /// Advisory context for a new reading.
    #[must_use]
    pub fn historical_context(&self, pc_ratio: f64, sentiment: Sentiment) -> HistoricalContext {
        let similar_situations: Vec<SimilarSituation> = self
            .records
            .iter()
            .rev()
            .take(RECENT_WINDOW)
            .filter(|r| (r.pc_ratio - pc_ratio).abs() < SIMILAR_RATIO)
            .map(|r| SimilarSituation {
                trade_date: r.trade_date,
                contract_code: r.contract_code.clone(),
                pc_ratio: r.pc_ratio,
                sentiment: r.sentiment,
            })
            .collect();

        let mut insights = Vec::new();
        let band: Vec<f64> = self
            .outcomes()
            .into_iter()
            .filter(|(record, _)| record.sentiment == sentiment)
            .map(|(_, change)| change)
            .collect();
        if band.len() >= MIN_OUTCOMES {
            let average = band.iter().sum::<f64>() / band.len() as f64;
            insights.push(format!(
                "after {sentiment} readings the index moved {average:+.0} points the next day on average ({} samples)",
                band.len()
            ));
        }
        if !similar_situations.is_empty() {
            insights.push(format!(
                "{} similar P/C readings among the last {RECENT_WINDOW} analyses",
                similar_situations.len()
            ));
        }

        let mut warnings = Vec::new();
        if sentiment.is_extreme() {
            warnings.push(format!(
                "{sentiment} positioning is extreme; contrarian reversals are common"
            ));
        }

        HistoricalContext {
            total_records: self.records.len(),
            experience: ExperienceLevel::from_count(self.records.len()),
            similar_situations,
            insights,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn make_record(day: i64, ratio: f64, close: Option<f64>) -> AnalysisRecord {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap() + Duration::days(day);
        AnalysisRecord::new(date, "202601W3", ratio, 30000, close)
    }

    #[test]
    fn experience_levels() {
        assert_eq!(ExperienceLevel::from_count(0), ExperienceLevel::Novice);
        assert_eq!(ExperienceLevel::from_count(10), ExperienceLevel::Learning);
        assert_eq!(ExperienceLevel::from_count(49), ExperienceLevel::Developing);
        assert_eq!(ExperienceLevel::from_count(99), ExperienceLevel::Experienced);
        assert_eq!(ExperienceLevel::from_count(100), ExperienceLevel::Veteran);
    }

    #[test]
    fn appended_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log").join("learning.jsonl");

        let mut log = LearningLog::open(&path).unwrap();
        assert!(log.records().is_empty());
        log.append(make_record(0, 0.95, Some(30000.0))).unwrap();
        log.append(make_record(1, f64::INFINITY, None)).unwrap();

        let reopened = LearningLog::open(&path).unwrap();
        assert_eq!(reopened.records().len(), 2);
        assert!(reopened.records()[1].pc_ratio.is_infinite());
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("learning.jsonl");

        let mut log = LearningLog::open(&path).unwrap();
        log.append(make_record(0, 0.95, None)).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{ broken").unwrap();

        assert_eq!(LearningLog::open(&path).unwrap().records().len(), 1);
    }

    #[test]
    fn similar_situations_within_band() {
        let mut log = LearningLog::in_memory();
        log.append(make_record(0, 0.80, None)).unwrap();
        log.append(make_record(1, 1.00, None)).unwrap();
        log.append(make_record(2, 1.05, None)).unwrap();

        let context = log.historical_context(1.02, Sentiment::Neutral);
        assert_eq!(context.similar_situations.len(), 2);
        // Newest first
        assert_eq!(context.similar_situations[0].pc_ratio, 1.05);
        assert_eq!(context.experience, ExperienceLevel::Novice);
    }

    #[test]
    fn band_average_needs_five_outcomes() {
        let mut log = LearningLog::in_memory();
        for day in 0..5 {
            log.append(make_record(day, 1.0, Some(30000.0 + 100.0 * day as f64))).unwrap();
        }
        // Four outcomes so far
        let context = log.historical_context(1.0, Sentiment::Neutral);
        assert!(!context.insights.iter().any(|i| i.contains("next day")));

        log.append(make_record(5, 1.0, Some(30500.0))).unwrap();
        let context = log.historical_context(1.0, Sentiment::Neutral);
        assert!(context.insights.iter().any(|i| i.contains("+100 points")));
    }

    #[test]
    fn extreme_sentiment_warns() {
        let log = LearningLog::in_memory();
        let context = log.historical_context(1.6, Sentiment::ExtremelyBearish);
        assert_eq!(context.warnings.len(), 1);
        assert!(context.warnings[0].contains("extremely_bearish"));
        assert!(context.similar_situations.is_empty());
    }
}
