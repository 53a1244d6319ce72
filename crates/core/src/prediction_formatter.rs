#![allow(clippy::format_push_string)]

//! Narrative rendering of a settlement prediction.
//!
//! Pure templating over [`SettlementPrediction`]; no numbers are derived here
//! beyond formatting.

use crate::metrics_formatter::{format_ratio, join_strikes};
use crate::prediction::SettlementPrediction;
use crate::signal::Direction;

const RULE: &str = "═══════════════════════════════════════════════════════════════\n";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────\n";

pub struct PredictionFormatter;

impl PredictionFormatter {
    #[must_use]
    pub fn format(prediction: &SettlementPrediction) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE);
        output.push_str(&format!(
            "          SETTLEMENT OUTLOOK  {}{}\n",
            prediction.contract_code,
            prediction
                .settlement_date
                .map(|d| format!("  (settles {})", d.format("%Y-%m-%d %a")))
                .unwrap_or_default()
        ));
        output.push_str(RULE);
        output.push('\n');

        if prediction.is_degenerate() {
            output.push_str("⚠️  No analysis data available.\n");
            for risk in &prediction.risks {
                output.push_str(&format!("    - {risk}\n"));
            }
            output.push('\n');
            return output;
        }

        output.push_str(&format!(
            "Analysis dates:        {}\n",
            prediction
                .analysis_dates
                .iter()
                .map(|d| d.format("%m/%d").to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        output.push_str(&format!(
            "Current price:         {:.0}\n",
            prediction.current_price
        ));
        output.push_str(&format!(
            "Overall trend:         {}\n",
            trend_text(prediction.overall_trend, prediction.trend_strength)
        ));
        output.push_str(&format!(
            "Predicted range:       {} ~ {}\n",
            prediction.predicted_range.0, prediction.predicted_range.1
        ));
        if let Some(primary) = prediction.primary_scenario() {
            output.push_str(&format!(
                "Most likely:           {} near {} ({:.1}%)\n",
                primary.name,
                primary.midpoint(),
                primary.probability
            ));
        }
        output.push('\n');

        let metrics = &prediction.key_metrics;
        output.push_str("Key Metrics\n");
        output.push_str(THIN_RULE);
        output.push_str(&format!("Max Pain:              {}\n", metrics.max_pain));
        output.push_str(&format!(
            "P/C Ratio:             {} (avg {})\n",
            format_ratio(metrics.latest_pc_ratio),
            format_ratio(metrics.avg_pc_ratio)
        ));
        output.push_str(&format!(
            "Avg OI change:         call {:+.0} / put {:+.0}\n",
            metrics.avg_call_oi_change, metrics.avg_put_oi_change
        ));
        output.push_str(&format!(
            "Critical strikes:      {}\n",
            join_strikes(&metrics.critical_strikes)
        ));
        output.push('\n');

        output.push_str("Signals\n");
        output.push_str(THIN_RULE);
        if prediction.trend_signals.is_empty() {
            output.push_str("No detector had enough data.\n");
        }
        for signal in &prediction.trend_signals {
            output.push_str(&format!(
                "{} {:<8} [{}] {}\n",
                direction_icon(signal.direction),
                signal.direction,
                strength_bar(signal.strength),
                signal.rationale
            ));
        }
        output.push('\n');

        output.push_str("Scenarios\n");
        output.push_str(THIN_RULE);
        for (rank, scenario) in prediction.scenarios.iter().enumerate() {
            output.push_str(&format!(
                "{}. {} ({:.1}%)  {} ~ {}\n",
                rank + 1,
                scenario.name,
                scenario.probability,
                scenario.price_range.0,
                scenario.price_range.1
            ));
            output.push_str(&format!(
                "   Levels: {}\n",
                join_strikes(&scenario.key_levels)
            ));
            for condition in &scenario.preconditions {
                output.push_str(&format!("   ✓ {condition}\n"));
            }
            output.push_str(&format!("   → {}\n", scenario.recommended_action));
        }
        output.push('\n');

        if !prediction.risks.is_empty() {
            output.push_str("Risks\n");
            output.push_str(THIN_RULE);
            for risk in &prediction.risks {
                output.push_str(&format!("⚠️  {risk}\n"));
            }
            output.push('\n');
        }

        output.push_str(RULE);
        output
    }
}

/// Short description of a trend and its strength.
#[must_use]
pub fn trend_text(direction: Direction, strength: u8) -> String {
    let strength_word = match strength {
        0 => "no data",
        1 => "very weak",
        2 => "weak",
        3 => "moderate",
        4 => "firm",
        _ => "strong",
    };
    match direction {
        Direction::Bullish => format!("bullish trend ({strength_word})"),
        Direction::Bearish => format!("bearish trend ({strength_word})"),
        Direction::Neutral => format!("range consolidation ({strength_word})"),
    }
}

fn direction_icon(direction: Direction) -> &'static str {
    match direction {
        Direction::Bullish => "▲",
        Direction::Bearish => "▼",
        Direction::Neutral => "◆",
    }
}

fn strength_bar(strength: u8) -> String {
    let filled = usize::from(strength.min(5));
    format!("{}{}", "■".repeat(filled), "□".repeat(5 - filled))
}
