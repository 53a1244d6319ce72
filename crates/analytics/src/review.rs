//! Post-settlement accuracy review.
//!
//! Scores a stored prediction against the actual settlement price. This sits
//! outside the prediction path; the engine never reads its own past output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use settlement_core::SettlementPrediction;
use std::fmt;

/// Moves smaller than this on both sides count as a correct flat call.
const FLAT_MOVE: f64 = 50.0;

/// Error bands (percent) and the points each one earns.
const ERROR_BANDS: [(f64, u8); 5] = [(0.5, 25), (1.0, 20), (1.5, 15), (2.0, 10), (3.0, 5)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
}

impl Grade {
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Self::APlus,
            80..=89 => Self::A,
            70..=79 => Self::BPlus,
            60..=69 => Self::B,
            50..=59 => Self::C,
            _ => Self::D,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReview {
    pub contract_code: String,
    pub settlement_date: Option<NaiveDate>,
    /// Midpoint of the predicted range
    pub predicted_price: f64,
    pub actual_price: f64,
    /// Actual minus predicted
    pub price_error: f64,
    /// Absolute error as a percentage of the actual price
    pub error_pct: f64,
    pub in_range: bool,
    pub direction_correct: bool,
    /// 0-100
    pub score: u8,
    pub grade: Grade,
}

/// Scores `prediction` against the `actual` settlement price.
#[must_use]
pub fn review(prediction: &SettlementPrediction, actual: f64) -> PredictionReview {
    let predicted_price = prediction.predicted_price();
    let price_error = actual - predicted_price;
    let error_pct = if actual > 0.0 {
        price_error.abs() / actual * 100.0
    } else {
        0.0
    };

    let (low, high) = prediction.predicted_range;
    let in_range = !prediction.is_degenerate() && actual >= low as f64 && actual <= high as f64;

    let predicted_move = predicted_price - prediction.current_price;
    let actual_move = actual - prediction.current_price;
    let direction_correct = !prediction.is_degenerate()
        && if predicted_move.abs() < FLAT_MOVE && actual_move.abs() < FLAT_MOVE {
            true
        } else {
            predicted_move * actual_move > 0.0
        };

    let mut score = 0u8;
    if in_range {
        score += 50;
    }
    if direction_correct {
        score += 25;
    }
    if !prediction.is_degenerate() {
        if let Some((_, points)) = ERROR_BANDS.iter().find(|(limit, _)| error_pct < *limit) {
            score += points;
        }
    }

    let grade = Grade::from_score(score);
    tracing::info!(
        contract = %prediction.contract_code,
        predicted = predicted_price,
        actual,
        score,
        grade = %grade,
        "Prediction reviewed"
    );

    PredictionReview {
        contract_code: prediction.contract_code.clone(),
        settlement_date: prediction.settlement_date,
        predicted_price,
        actual_price: actual,
        price_error,
        error_pct,
        in_range,
        direction_correct,
        score,
        grade,
    }
}
