use chrono::NaiveDate;
use settlement_analytics::{review, PredictionRequest, SettlementPredictor};
use settlement_core::{ContractKind, Direction, RiskFlag};
use settlement_data::{load_series, JsonFileStore, PredictionRecord, PredictionStore};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const CONTRACT: &str = "202601W3";

/// Symmetric ladder around 30000 with call-heavy open-interest additions.
fn write_ladder(dir: &Path, date: &str) {
    let mut csv = String::from("strike,call_oi,call_oi_delta,put_oi,put_oi_delta\n");
    for strike in (29800..=30200).step_by(100) {
        csv.push_str(&format!("{strike},1000,600,1000,200\n"));
    }
    fs::write(dir.join(format!("{CONTRACT}_{date}.csv")), csv).unwrap();
}

fn write_series(dir: &Path) {
    write_ladder(dir, "2026-01-12");
    write_ladder(dir, "2026-01-13");
    fs::write(
        dir.join("prices.csv"),
        "trade_date,close\n2026-01-12,30000\n2026-01-13,30150\n",
    )
    .unwrap();
}

fn settlement_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 14).unwrap()
}

#[test]
fn test_series_loads_with_price_context() {
    let dir = TempDir::new().unwrap();
    write_series(dir.path());

    let snapshots = load_series(dir.path(), Some(CONTRACT)).unwrap();

    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].underlying_close, Some(30000.0));
    assert_eq!(snapshots[1].underlying_close, Some(30150.0));
    assert!(load_series(dir.path(), Some("other")).unwrap().is_empty());
}

#[tokio::test]
async fn test_predict_store_and_review() {
    let dir = TempDir::new().unwrap();
    write_series(dir.path());
    let snapshots = load_series(dir.path(), None).unwrap();

    let predictor = Arc::new(SettlementPredictor::default());
    let request = PredictionRequest::new(CONTRACT, snapshots).with_settlement_date(settlement_date());
    let prediction = {
        let predictor = Arc::clone(&predictor);
        tokio::task::spawn_blocking(move || predictor.predict(&request))
            .await
            .unwrap()
    };

    assert_eq!(prediction.analysis_dates.len(), 2);
    assert_eq!(prediction.settlement_date, Some(settlement_date()));
    assert_eq!(prediction.current_price, 30150.0);
    assert_eq!(prediction.key_metrics.max_pain, 30000);
    assert!((2..=5).contains(&prediction.trend_strength));
    assert!(!prediction.scenarios.is_empty() && prediction.scenarios.len() <= 3);
    for scenario in &prediction.scenarios {
        assert!((15.0..=60.0).contains(&scenario.probability));
    }
    assert!(prediction
        .trend_signals
        .iter()
        .any(|s| s.direction == Direction::Bullish));
    assert!(!prediction.risks.contains(&RiskFlag::NoData));

    let store = JsonFileStore::new(dir.path().join("predictions"));
    let record = PredictionRecord::new(prediction.clone());
    store.save(&record).unwrap();

    let stored = store.load(&record.key).unwrap().unwrap();
    assert_eq!(stored.prediction.predicted_range, prediction.predicted_range);

    let (low, high) = prediction.predicted_range;
    let actual = ((low + high) / 2) as f64;
    let result = review(&stored.prediction, actual);
    assert!(result.in_range);
    assert!(result.score >= 75);

    store.save(&stored.with_actual(actual)).unwrap();
    let records = store.list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].actual_settlement, Some(actual));
}

#[test]
fn test_missing_series_degrades_to_fallback() {
    let predictor = SettlementPredictor::default();
    let mut request = PredictionRequest::new(CONTRACT, Vec::new());
    request.contract_kind = Some(ContractKind::WeeklyWednesday);

    let prediction = predictor.predict(&request);

    assert!(prediction.is_degenerate());
    assert_eq!(prediction.risks, vec![RiskFlag::NoData]);
    assert_eq!(prediction.predicted_range, (0, 0));
    assert!(prediction.scenarios.is_empty());
}
