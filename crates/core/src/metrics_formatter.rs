#![allow(clippy::format_push_string)]

use crate::metrics::{PositioningMetrics, Sentiment};
use crate::snapshot::OptionsSnapshot;

const RULE: &str = "═══════════════════════════════════════════════════════════════\n";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────\n";

/// Plain-text rendering of a single-day positioning report.
pub struct MetricsFormatter;

impl MetricsFormatter {
    #[must_use]
    pub fn format(snapshot: &OptionsSnapshot, metrics: &PositioningMetrics) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(RULE);
        output.push_str(&format!(
            "          POSITIONING REPORT  {}  {}\n",
            snapshot.contract_code,
            snapshot.trade_date.format("%Y-%m-%d")
        ));
        output.push_str(RULE);
        output.push('\n');

        if snapshot.is_empty() {
            output.push_str("⚠️  Snapshot has no strikes; positioning unavailable.\n\n");
            return output;
        }

        output.push_str("Sentiment\n");
        output.push_str(THIN_RULE);
        output.push_str(&format!(
            "P/C Ratio (OI):        {}\n",
            format_ratio(metrics.put_call_ratio_oi)
        ));
        if snapshot.total_call_volume() > 0 || snapshot.total_put_volume() > 0 {
            output.push_str(&format!(
                "P/C Ratio (Volume):    {}\n",
                format_ratio(metrics.put_call_ratio_volume)
            ));
        }
        output.push_str(&format!(
            "Reading:               {}\n",
            describe_sentiment(metrics.sentiment)
        ));
        output.push('\n');

        output.push_str("Max Pain\n");
        output.push_str(THIN_RULE);
        output.push_str(&format!("Strike:                {}\n", metrics.max_pain_strike));
        output.push_str(&format!("Holder payout:         {}\n", metrics.max_pain_cost));
        if let Some(close) = snapshot.underlying_close {
            output.push_str(&format!(
                "Underlying close:      {:.0} ({:+.0} vs Max Pain)\n",
                close,
                close - metrics.max_pain_strike as f64
            ));
        }
        output.push('\n');

        output.push_str("Open Interest\n");
        output.push_str(THIN_RULE);
        output.push_str(&format!(
            "Call OI:               {} ({:+})\n",
            metrics.total_call_oi, metrics.call_oi_change
        ));
        output.push_str(&format!(
            "Put OI:                {} ({:+})\n",
            metrics.total_put_oi, metrics.put_oi_change
        ));
        output.push_str(&format!(
            "Largest call OI:       {} @ {}\n",
            metrics.max_call_oi, metrics.max_call_oi_strike
        ));
        output.push_str(&format!(
            "Largest put OI:        {} @ {}\n",
            metrics.max_put_oi, metrics.max_put_oi_strike
        ));
        output.push_str(&format!(
            "Resistance:            {}\n",
            join_strikes(&metrics.resistance_strikes)
        ));
        output.push_str(&format!(
            "Support:               {}\n",
            join_strikes(&metrics.support_strikes)
        ));
        output.push('\n');
        output.push_str(RULE);

        output
    }
}

pub(crate) fn format_ratio(ratio: f64) -> String {
    if ratio.is_infinite() {
        "∞".to_string()
    } else {
        format!("{ratio:.4}")
    }
}

pub(crate) fn join_strikes(strikes: &[i64]) -> String {
    if strikes.is_empty() {
        return "-".to_string();
    }
    strikes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_sentiment(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::ExtremelyBullish => "extremely bullish (call OI dominates)",
        Sentiment::Bullish => "bullish (call OI slightly ahead)",
        Sentiment::Neutral => "neutral (put and call OI balanced)",
        Sentiment::Bearish => "bearish (put OI slightly ahead)",
        Sentiment::ExtremelyBearish => "extremely bearish (put OI dominates)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn format_includes_key_fields() {
        let snapshot = OptionsSnapshot {
            strikes: vec![29000, 30000],
            call_oi: vec![100, 200],
            put_oi: vec![300, 50],
            call_oi_delta: vec![0, 0],
            put_oi_delta: vec![0, 0],
            ..OptionsSnapshot::empty(NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(), "202601W2")
        }
        .with_close(29500.0);

        let mut metrics = PositioningMetrics::empty();
        metrics.max_pain_strike = 29000;
        metrics.max_pain_cost = dec!(250000);
        metrics.put_call_ratio_oi = f64::INFINITY;
        metrics.resistance_strikes = vec![30000, 29000];
        metrics.total_call_oi = 300;

        let text = MetricsFormatter::format(&snapshot, &metrics);
        assert!(text.contains("202601W2"));
        assert!(text.contains("∞"));
        assert!(text.contains("30000, 29000"));
        assert!(text.contains("+500 vs Max Pain"));
        assert!(!text.contains("Volume"));
    }

    #[test]
    fn empty_snapshot_is_reported() {
        let snapshot =
            OptionsSnapshot::empty(NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(), "202601W2");
        let text = MetricsFormatter::format(&snapshot, &PositioningMetrics::empty());
        assert!(text.contains("no strikes"));
    }
}
