//! Single-snapshot analysis command.
//!
//! Prints positioning metrics for one ladder, appends the reading to the
//! learning log and shows the advisory historical context.
//!
//! ```bash
//! settle analyze --file data/202601W3_2026-01-12.csv --contract 202601W3 \
//!     --date 2026-01-12 --close 29950
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use settlement_analytics::{
    dealer_position, key_levels, oi_bias, CriticalStrikeSelector, PositioningAnalyzer,
};
use settlement_core::{
    ContractKind, DealerPosition, KeyLevels, MetricsFormatter, OiBias, OptionsSnapshot,
    PositioningMetrics,
};
use settlement_data::{load_csv, load_json, AnalysisRecord, HistoricalContext, LearningLog, SnapshotMeta};
use std::path::PathBuf;

use super::{load_config, print_json, OutputFormat};

/// Arguments for the analyze command.
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Snapshot file (.csv ladder or .json snapshot)
    #[arg(short, long)]
    pub file: PathBuf,

    /// Contract code for CSV input (e.g., "202601W3")
    #[arg(long)]
    pub contract: Option<String>,

    /// Trade date for CSV input (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Contract series: weekly_wed, weekly_fri or monthly
    #[arg(long)]
    pub kind: Option<ContractKind>,

    /// Underlying close for CSV input
    #[arg(long)]
    pub close: Option<f64>,

    /// Engine config file (defaults to config/Settlement.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Learning log (JSON lines); the reading is appended here
    #[arg(long, env = "SETTLE_LEARNING_LOG", default_value = "data/learning.jsonl")]
    pub learning_log: PathBuf,

    /// Skip appending to the learning log
    #[arg(long)]
    pub no_log: bool,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    snapshot: SnapshotSummary,
    metrics: PositioningMetrics,
    key_levels: KeyLevels,
    oi_bias: OiBias,
    dealer_position: DealerPosition,
    critical_strikes: Vec<i64>,
    history: HistoricalContext,
}

#[derive(Debug, Serialize)]
struct SnapshotSummary {
    trade_date: NaiveDate,
    contract_code: String,
    contract_kind: Option<ContractKind>,
    strikes: usize,
    underlying_close: Option<f64>,
}

/// Runs the analyze command.
///
/// # Errors
/// Returns an error if the snapshot cannot be loaded or the learning log
/// cannot be written.
pub fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let snapshot = load_snapshot(&args)?;

    let analyzer = PositioningAnalyzer::new(config.positioning);
    let metrics = analyzer.analyze(&snapshot);

    let mut log = if args.no_log {
        LearningLog::in_memory()
    } else {
        LearningLog::open(&args.learning_log)
            .with_context(|| format!("Failed to open learning log {}", args.learning_log.display()))?
    };
    // Context reflects history before this reading
    let history = log.historical_context(metrics.put_call_ratio_oi, metrics.sentiment);
    if !args.no_log && !metrics.is_empty() {
        log.append(AnalysisRecord::new(
            snapshot.trade_date,
            snapshot.contract_code.clone(),
            metrics.put_call_ratio_oi,
            metrics.max_pain_strike,
            snapshot.underlying_close,
        ))
        .context("Failed to append to learning log")?;
    }

    tracing::info!(
        contract = %snapshot.contract_code,
        date = %snapshot.trade_date,
        max_pain = metrics.max_pain_strike,
        pc_ratio = metrics.put_call_ratio_oi,
        "Snapshot analyzed"
    );

    let report = AnalysisReport {
        snapshot: SnapshotSummary {
            trade_date: snapshot.trade_date,
            contract_code: snapshot.contract_code.clone(),
            contract_kind: snapshot.contract_kind,
            strikes: snapshot.len(),
            underlying_close: snapshot.underlying_close,
        },
        key_levels: key_levels(&metrics),
        oi_bias: oi_bias(&metrics),
        dealer_position: dealer_position(&metrics),
        critical_strikes: CriticalStrikeSelector.select(&snapshot).into_iter().collect(),
        metrics,
        history,
    };

    match args.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_text(&snapshot, &report),
    }

    Ok(())
}

fn load_snapshot(args: &AnalyzeArgs) -> Result<OptionsSnapshot> {
    let extension = args
        .file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let mut snapshot = match extension {
        "json" => load_json(&args.file)
            .with_context(|| format!("Failed to load snapshot {}", args.file.display()))?,
        "csv" => {
            let contract = args
                .contract
                .clone()
                .ok_or_else(|| anyhow!("--contract is required for CSV input"))?;
            let date = args
                .date
                .ok_or_else(|| anyhow!("--date is required for CSV input"))?;
            let meta = SnapshotMeta::new(date, contract)
                .with_kind(args.kind)
                .with_close(args.close);
            load_csv(&args.file, &meta)
                .with_context(|| format!("Failed to load ladder {}", args.file.display()))?
        }
        other => return Err(anyhow!("Unsupported snapshot format: {other:?}")),
    };

    // Flags override JSON content
    if let Some(kind) = args.kind {
        snapshot.contract_kind = Some(kind);
    }
    if let Some(close) = args.close {
        snapshot.underlying_close = Some(close);
    }
    snapshot.validate()?;
    Ok(snapshot)
}

fn print_text(snapshot: &OptionsSnapshot, report: &AnalysisReport) {
    print!("{}", MetricsFormatter::format(snapshot, &report.metrics));

    println!("OI bias:               {:?}", report.oi_bias);
    println!("Dealer position:       {}", report.dealer_position);
    println!(
        "Critical strikes:      {}",
        report
            .critical_strikes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    let history = &report.history;
    println!(
        "History: {} records ({}), {} similar readings",
        history.total_records,
        history.experience,
        history.similar_situations.len()
    );
    for insight in &history.insights {
        println!("  • {insight}");
    }
    for warning in &history.warnings {
        println!("  ⚠️  {warning}");
    }
}
