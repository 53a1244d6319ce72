//! Lists stored predictions with their review results.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use settlement_analytics::{review, PredictionReview};
use settlement_core::Direction;
use settlement_data::{JsonFileStore, PredictionRecord, PredictionStore};
use std::path::PathBuf;

use super::{print_json, OutputFormat, DEFAULT_STORE_DIR};

/// Arguments for the history command.
#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Prediction store directory
    #[arg(long, env = "SETTLE_STORE_DIR", default_value = DEFAULT_STORE_DIR)]
    pub store: PathBuf,

    /// Only list this contract
    #[arg(long)]
    pub contract: Option<String>,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    contract_code: String,
    settlement_date: Option<NaiveDate>,
    overall_trend: Direction,
    trend_strength: u8,
    predicted_range: (i64, i64),
    review: Option<PredictionReview>,
}

#[derive(Debug, Serialize)]
struct HistorySummary {
    predictions: usize,
    reviewed: usize,
    average_score: Option<f64>,
    in_range_rate: Option<f64>,
    entries: Vec<HistoryEntry>,
}

/// Runs the history command.
///
/// # Errors
/// Returns an error if the store cannot be listed.
pub fn run_history(args: HistoryArgs) -> Result<()> {
    let store = JsonFileStore::new(&args.store);
    let records = store
        .list()
        .with_context(|| format!("Failed to list predictions in {}", args.store.display()))?;

    let records: Vec<PredictionRecord> = records
        .into_iter()
        .filter(|r| args.contract.as_ref().map_or(true, |c| *c == r.key.contract_code))
        .collect();

    let summary = summarize(&records);
    match args.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

fn summarize(records: &[PredictionRecord]) -> HistorySummary {
    let entries: Vec<HistoryEntry> = records
        .iter()
        .map(|record| HistoryEntry {
            contract_code: record.key.contract_code.clone(),
            settlement_date: record.key.settlement_date,
            overall_trend: record.prediction.overall_trend,
            trend_strength: record.prediction.trend_strength,
            predicted_range: record.prediction.predicted_range,
            review: record
                .actual_settlement
                .map(|actual| review(&record.prediction, actual)),
        })
        .collect();

    let reviews: Vec<&PredictionReview> = entries.iter().filter_map(|e| e.review.as_ref()).collect();
    let (average_score, in_range_rate) = if reviews.is_empty() {
        (None, None)
    } else {
        let n = reviews.len() as f64;
        let score = reviews.iter().map(|r| f64::from(r.score)).sum::<f64>() / n;
        let in_range = reviews.iter().filter(|r| r.in_range).count() as f64 / n * 100.0;
        (Some(score), Some(in_range))
    };

    HistorySummary {
        predictions: entries.len(),
        reviewed: reviews.len(),
        average_score,
        in_range_rate,
        entries,
    }
}

fn print_summary(summary: &HistorySummary) {
    if summary.entries.is_empty() {
        println!("No stored predictions.");
        return;
    }

    println!(
        "{:<12} {:<12} {:<8} {:>3} {:>15} {:>9} {:>6} {:>5}",
        "Contract", "Settles", "Trend", "Str", "Range", "Actual", "Score", "Grade"
    );
    println!("{}", "─".repeat(78));
    for entry in &summary.entries {
        let settles = entry
            .settlement_date
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
        let range = format!("{}-{}", entry.predicted_range.0, entry.predicted_range.1);
        let (actual, score, grade) = match &entry.review {
            Some(r) => (
                format!("{:.0}", r.actual_price),
                r.score.to_string(),
                r.grade.to_string(),
            ),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        println!(
            "{:<12} {:<12} {:<8} {:>3} {:>15} {:>9} {:>6} {:>5}",
            entry.contract_code,
            settles,
            entry.overall_trend,
            entry.trend_strength,
            range,
            actual,
            score,
            grade
        );
    }
    println!();
    println!("Predictions: {}  reviewed: {}", summary.predictions, summary.reviewed);
    if let (Some(score), Some(rate)) = (summary.average_score, summary.in_range_rate) {
        println!("Average score: {score:.1}  in range: {rate:.0}%");
    }
}
