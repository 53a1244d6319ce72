//! Settlement prediction command.
//!
//! Loads every snapshot in a directory, groups them by contract and runs one
//! prediction per contract on the blocking pool.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use settlement_analytics::{PredictionRequest, SettlementPredictor};
use settlement_core::{ContractKind, OptionsSnapshot, PredictionFormatter, SettlementPrediction};
use settlement_data::{load_series, JsonFileStore, PredictionRecord, PredictionStore};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::{load_config, print_json, OutputFormat, DEFAULT_STORE_DIR};

/// Arguments for the predict command.
#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// Directory of snapshot files ({contract}_{YYYY-MM-DD}.csv or .json)
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Only predict this contract
    #[arg(long)]
    pub contract: Option<String>,

    /// Contract series, overriding what the snapshots carry
    #[arg(long)]
    pub kind: Option<ContractKind>,

    /// Settlement date (YYYY-MM-DD); derived from the contract series when omitted
    #[arg(long)]
    pub settlement_date: Option<NaiveDate>,

    /// Engine config file (defaults to config/Settlement.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Prediction store directory
    #[arg(long, env = "SETTLE_STORE_DIR", default_value = DEFAULT_STORE_DIR)]
    pub store: PathBuf,

    /// Do not persist predictions
    #[arg(long)]
    pub no_save: bool,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

/// Runs the predict command.
///
/// # Errors
/// Returns an error if the snapshots cannot be loaded, a prediction task
/// panics, or a prediction cannot be stored.
pub async fn run_predict(args: PredictArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let snapshots = load_series(&args.dir, args.contract.as_deref())
        .with_context(|| format!("Failed to load snapshots from {}", args.dir.display()))?;

    let requests = build_requests(snapshots, &args);
    if requests.is_empty() {
        warn!(dir = %args.dir.display(), "No snapshots found");
        // Still emit the no-data outlook for an explicitly requested contract
        if let Some(code) = &args.contract {
            let mut request = PredictionRequest::new(code.clone(), Vec::new());
            request.contract_kind = args.kind;
            request.settlement_date = args.settlement_date;
            let predictor = SettlementPredictor::new(config);
            emit(&[predictor.predict(&request)], args.format)?;
        }
        return Ok(());
    }

    info!(contracts = requests.len(), "Running predictions");
    let predictions = predict_all(Arc::new(SettlementPredictor::new(config)), requests).await?;

    if !args.no_save {
        let store = JsonFileStore::new(&args.store);
        save_all(&store, &predictions)?;
        info!(store = %args.store.display(), saved = predictions.len(), "Predictions saved");
    }

    emit(&predictions, args.format)
}

fn build_requests(snapshots: Vec<OptionsSnapshot>, args: &PredictArgs) -> Vec<PredictionRequest> {
    let mut by_contract: BTreeMap<String, Vec<OptionsSnapshot>> = BTreeMap::new();
    for snapshot in snapshots {
        by_contract
            .entry(snapshot.contract_code.clone())
            .or_default()
            .push(snapshot);
    }

    by_contract
        .into_iter()
        .map(|(code, snapshots)| {
            let mut request = PredictionRequest::new(code, snapshots);
            if let Some(kind) = args.kind {
                request.contract_kind = Some(kind);
            }
            if let Some(date) = args.settlement_date {
                request = request.with_settlement_date(date);
            }
            request
        })
        .collect()
}

/// Runs each request on the blocking pool. Output order follows input order.
async fn predict_all(
    predictor: Arc<SettlementPredictor>,
    requests: Vec<PredictionRequest>,
) -> Result<Vec<SettlementPrediction>> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let predictor = Arc::clone(&predictor);
            tokio::task::spawn_blocking(move || predictor.predict(&request))
        })
        .collect();

    let mut predictions = Vec::with_capacity(handles.len());
    for handle in handles {
        predictions.push(handle.await.context("Prediction task failed")?);
    }
    Ok(predictions)
}

fn save_all(store: &dyn PredictionStore, predictions: &[SettlementPrediction]) -> Result<()> {
    for prediction in predictions {
        store
            .save(&PredictionRecord::new(prediction.clone()))
            .with_context(|| format!("Failed to save prediction for {}", prediction.contract_code))?;
    }
    Ok(())
}

fn emit(predictions: &[SettlementPrediction], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&predictions)?,
        OutputFormat::Text => {
            for prediction in predictions {
                print!("{}", PredictionFormatter::format(prediction));
            }
        }
    }
    Ok(())
}
