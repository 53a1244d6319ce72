//! Post-settlement review command.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use settlement_analytics::{review, PredictionReview};
use settlement_data::{JsonFileStore, PredictionKey, PredictionStore};
use std::path::PathBuf;

use super::{print_json, OutputFormat, DEFAULT_STORE_DIR};

/// Arguments for the review command.
#[derive(Args, Debug, Clone)]
pub struct ReviewArgs {
    /// Contract code of the stored prediction
    #[arg(long)]
    pub contract: String,

    /// Settlement date of the stored prediction (YYYY-MM-DD)
    #[arg(long)]
    pub settlement_date: Option<NaiveDate>,

    /// Actual settlement price
    #[arg(long)]
    pub actual: f64,

    /// Prediction store directory
    #[arg(long, env = "SETTLE_STORE_DIR", default_value = DEFAULT_STORE_DIR)]
    pub store: PathBuf,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

/// Runs the review command. The actual price is written back to the store.
///
/// # Errors
/// Returns an error if the prediction is missing, the price is invalid, or
/// the store cannot be updated.
pub fn run_review(args: ReviewArgs) -> Result<()> {
    if !args.actual.is_finite() || args.actual <= 0.0 {
        return Err(anyhow!("Actual settlement price must be positive, got {}", args.actual));
    }

    let store = JsonFileStore::new(&args.store);
    let key = PredictionKey::new(args.contract.clone(), args.settlement_date);
    let result = review_stored(&store, &key, args.actual)?;

    match args.format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => print_review(&result),
    }
    Ok(())
}

/// Scores the stored prediction under `key` and records the actual price.
fn review_stored(
    store: &dyn PredictionStore,
    key: &PredictionKey,
    actual: f64,
) -> Result<PredictionReview> {
    let record = store
        .load(key)
        .context("Failed to read prediction store")?
        .ok_or_else(|| anyhow!("No stored prediction for {}", key.file_stem()))?;

    let result = review(&record.prediction, actual);
    store
        .save(&record.with_actual(actual))
        .context("Failed to update stored prediction")?;
    Ok(result)
}

fn print_review(review: &PredictionReview) {
    println!();
    println!("Review: {}", review.contract_code);
    if let Some(date) = review.settlement_date {
        println!("Settlement date:   {}", date.format("%Y-%m-%d"));
    }
    println!("Predicted:         {:.0}", review.predicted_price);
    println!("Actual:            {:.0}", review.actual_price);
    println!(
        "Error:             {:+.0} ({:.2}%)",
        review.price_error, review.error_pct
    );
    println!(
        "In range:          {}",
        if review.in_range { "✅ yes" } else { "❌ no" }
    );
    println!(
        "Direction:         {}",
        if review.direction_correct { "✅ correct" } else { "❌ wrong" }
    );
    println!("Score:             {}/100  grade {}", review.score, review.grade);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlement_core::SettlementPrediction;
    use settlement_data::{InMemoryStore, PredictionRecord};

    fn make_prediction() -> SettlementPrediction {
        let mut prediction = SettlementPrediction::insufficient_data(
            "202601W3",
            None,
            NaiveDate::from_ymd_opt(2026, 1, 14),
        );
        prediction.analysis_dates = vec![NaiveDate::from_ymd_opt(2026, 1, 13).unwrap()];
        prediction.current_price = 30000.0;
        prediction.trend_strength = 3;
        prediction.predicted_range = (30000, 30400);
        prediction.risks.clear();
        prediction
    }

    #[test]
    fn review_updates_stored_actual() {
        let store = InMemoryStore::new();
        let record = PredictionRecord::new(make_prediction());
        store.save(&record).unwrap();

        let result = review_stored(&store, &record.key, 30210.0).unwrap();

        // In range, direction right, error 0.03%
        assert_eq!(result.score, 100);
        assert_eq!(
            store.load(&record.key).unwrap().unwrap().actual_settlement,
            Some(30210.0)
        );
    }

    #[test]
    fn missing_prediction_is_an_error() {
        let store = InMemoryStore::new();
        let key = PredictionKey::new("202601W3", None);
        let err = review_stored(&store, &key, 30000.0).unwrap_err();
        assert!(err.to_string().contains("202601W3_undated"));
    }
}
