use serde::{Deserialize, Serialize};

use crate::config::MarginThresholds;
use crate::domain::{Category, FLAG_NO_BENCHMARK};

/// Margin figure and category for one listing. A missing or non-positive
/// benchmark price is a first-class outcome, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginAssessment {
    pub margin_percent: Option<f64>,
    pub category: Category,
    pub flag: Option<&'static str>,
}

/// Profit margin as a percentage of benchmark price after subtracting the
/// listing price and all landed costs. Thresholds are closed on the lower
/// end: a margin of exactly the profitable cutoff is PROFITABLE.
pub fn categorize(
    benchmark_price: Option<f64>,
    listing_price: f64,
    total_cost: f64,
    thresholds: &MarginThresholds,
) -> MarginAssessment {
    let benchmark = match benchmark_price {
        Some(price) if price > 0.0 => price,
        _ => {
            return MarginAssessment {
                margin_percent: None,
                category: Category::Unknown,
                flag: Some(FLAG_NO_BENCHMARK),
            }
        }
    };

    let margin_percent = (benchmark - listing_price - total_cost) * 100.0 / benchmark;
    let category = if margin_percent >= thresholds.profitable_min_pct {
        Category::Profitable
    } else if margin_percent >= thresholds.maybe_min_pct {
        Category::Maybe
    } else {
        Category::Unknown
    };

    MarginAssessment {
        margin_percent: Some(margin_percent),
        category,
        flag: None,
    }
}
