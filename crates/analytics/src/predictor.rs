//! End-to-end settlement prediction.
//!
//! [`SettlementPredictor`] wires the analyzer, critical-strike selector,
//! trend engine, scenario generator and risk annotator together. It holds
//! only configuration, so one instance can serve concurrent callers.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use settlement_core::{
    ContractKind, EngineConfig, KeyMetrics, OptionsSnapshot, PositioningMetrics,
    SettlementPrediction,
};

use crate::critical::CriticalStrikeSelector;
use crate::positioning::PositioningAnalyzer;
use crate::risk::RiskAnnotator;
use crate::scenario::{price_anchor, ScenarioGenerator};
use crate::trend::{overall_trend, TrendSignalEngine};

/// Input for one prediction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub contract_code: String,
    pub contract_kind: Option<ContractKind>,
    /// Explicit settlement date; derived from the contract kind when absent
    pub settlement_date: Option<NaiveDate>,
    pub snapshots: Vec<OptionsSnapshot>,
}

impl PredictionRequest {
    #[must_use]
    pub fn new(contract_code: impl Into<String>, snapshots: Vec<OptionsSnapshot>) -> Self {
        let contract_kind = snapshots.iter().find_map(|s| s.contract_kind);
        Self {
            contract_code: contract_code.into(),
            contract_kind,
            settlement_date: None,
            snapshots,
        }
    }

    #[must_use]
    pub fn with_settlement_date(mut self, date: NaiveDate) -> Self {
        self.settlement_date = Some(date);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettlementPredictor {
    config: EngineConfig,
    analyzer: PositioningAnalyzer,
    selector: CriticalStrikeSelector,
    trend: TrendSignalEngine,
    scenarios: ScenarioGenerator,
    risk: RiskAnnotator,
}

impl SettlementPredictor {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let analyzer = PositioningAnalyzer::new(config.positioning.clone());
        Self {
            analyzer: analyzer.clone(),
            selector: CriticalStrikeSelector,
            trend: TrendSignalEngine::new(analyzer, config.trend.clone()),
            scenarios: ScenarioGenerator::new(config.scenario.clone(), config.trend.clone()),
            risk: RiskAnnotator::new(config.risk.clone()),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn analyzer(&self) -> &PositioningAnalyzer {
        &self.analyzer
    }

    /// Runs the full pipeline. Zero snapshots yield the no-data fallback.
    #[must_use]
    pub fn predict(&self, request: &PredictionRequest) -> SettlementPrediction {
        let mut snapshots = request.snapshots.clone();
        snapshots.sort_by_key(|s| s.trade_date);

        let Some(latest) = snapshots.last() else {
            tracing::warn!(contract = %request.contract_code, "No snapshots, returning fallback prediction");
            return SettlementPrediction::insufficient_data(
                request.contract_code.clone(),
                request.contract_kind,
                request.settlement_date,
            );
        };

        let settlement_date = request.settlement_date.or_else(|| {
            request
                .contract_kind
                .map(|kind| kind.next_settlement_date(latest.trade_date))
        });

        let metrics: Vec<PositioningMetrics> =
            snapshots.iter().map(|s| self.analyzer.analyze(s)).collect();
        let signals = self.trend.compute_with_metrics(&snapshots, &metrics);
        let trend = overall_trend(&signals, &self.config.trend);
        let scenarios = self.scenarios.generate(&snapshots, &metrics, &signals);
        let risks = self.risk.annotate(&snapshots, &signals, &metrics);

        let (current_price, predicted_range) = match price_anchor(&snapshots, &metrics) {
            Some((current, max_pain)) => (
                current,
                self.scenarios.predicted_range(current, max_pain, trend),
            ),
            None => (0.0, (0, 0)),
        };

        let key_metrics = self.key_metrics(latest, &snapshots, &metrics, current_price);

        tracing::info!(
            contract = %request.contract_code,
            snapshots = snapshots.len(),
            trend = %trend.direction,
            strength = trend.strength,
            range_low = predicted_range.0,
            range_high = predicted_range.1,
            risks = risks.len(),
            "Settlement prediction generated"
        );

        SettlementPrediction {
            contract_code: request.contract_code.clone(),
            contract_kind: request.contract_kind,
            settlement_date,
            analysis_dates: snapshots.iter().map(|s| s.trade_date).collect(),
            current_price,
            trend_signals: signals,
            overall_trend: trend.direction,
            trend_strength: trend.strength,
            predicted_range,
            scenarios,
            key_metrics,
            risks,
            generated_at: Utc::now(),
        }
    }

    fn key_metrics(
        &self,
        latest: &OptionsSnapshot,
        snapshots: &[OptionsSnapshot],
        metrics: &[PositioningMetrics],
        current_price: f64,
    ) -> KeyMetrics {
        let populated: Vec<&PositioningMetrics> = metrics.iter().filter(|m| !m.is_empty()).collect();
        let avg_pc_ratio = if populated.is_empty() {
            0.0
        } else {
            let mean =
                populated.iter().map(|m| m.put_call_ratio_oi).sum::<f64>() / populated.len() as f64;
            (mean * 10_000.0).round() / 10_000.0
        };

        let count = snapshots.len() as f64;
        let latest_metrics = metrics.last().cloned().unwrap_or_else(PositioningMetrics::empty);

        KeyMetrics {
            current_price,
            max_pain: latest_metrics.max_pain_strike,
            avg_pc_ratio,
            latest_pc_ratio: latest_metrics.put_call_ratio_oi,
            total_call_oi: latest_metrics.total_call_oi,
            total_put_oi: latest_metrics.total_put_oi,
            avg_call_oi_change: snapshots.iter().map(|s| s.net_call_oi_delta() as f64).sum::<f64>()
                / count,
            avg_put_oi_change: snapshots.iter().map(|s| s.net_put_oi_delta() as f64).sum::<f64>()
                / count,
            critical_strikes: self.selector.select(latest).into_iter().collect(),
            resistance_strikes: latest_metrics.resistance_strikes,
            support_strikes: latest_metrics.support_strikes,
        }
    }
}
