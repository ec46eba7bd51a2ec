use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Scraped vehicle offer as delivered by an ingestion adapter.
///
/// Fields arrive dirty: strings may carry stray whitespace or casing, numeric
/// fields may be absent. The normalizer is the only consumer allowed to reject
/// a listing; everything downstream works on [`NormalizedListing`].
///
/// [`NormalizedListing`]: crate::scoring::NormalizedListing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub vin: Option<String>,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    pub price: Option<f64>,
    pub mileage: Option<f64>,
    pub coords: Option<Coordinates>,
    pub zip: Option<String>,
    pub phone: Option<String>,
}

/// Benchmark entry used as the ground-truth comparison price for a matched
/// listing. Natural key is (year, make, model, trim); duplicates under fuzzy
/// matching are permitted and resolved by score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appraisal {
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    pub benchmark_price: f64,
    pub avg_mileage: Option<u32>,
    pub notes: Option<String>,
}

/// Which rung of the tiered matching strategy produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    Ymmt,
    Ymm,
    Fuzzy,
    None,
}

impl MatchTier {
    pub fn label(&self) -> &'static str {
        match self {
            MatchTier::Ymmt => "YMMT",
            MatchTier::Ymm => "YMM",
            MatchTier::Fuzzy => "FUZZY",
            MatchTier::None => "NONE",
        }
    }
}

/// Profit categorization derived from margin percent and the configured
/// thresholds. `Unknown` covers both sub-threshold margins and listings that
/// could not be matched or priced; the flags on the result distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Profitable,
    Maybe,
    Unknown,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Profitable => "PROFITABLE",
            Category::Maybe => "MAYBE",
            Category::Unknown => "UNKNOWN",
        }
    }
}

/// Trim-specific statistical depreciation coefficients, keyed by
/// (make, model, trim) with a fuzzy fallback on trim within (make, model).
/// Read-only reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationFormula {
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    /// Dollars deducted per 10,000 miles over the benchmark average.
    pub mileage_rate_per_10k: f64,
    /// Dollars deducted per model year of age.
    pub year_rate: f64,
    pub sample_size: u32,
    pub r_squared: f64,
}

/// Coarse vehicle classification used when no trim-specific depreciation
/// data exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleClass {
    Supercar,
    Suv,
    CoupeConvertible,
    Sedan,
}

impl VehicleClass {
    pub fn label(&self) -> &'static str {
        match self {
            VehicleClass::Supercar => "supercar",
            VehicleClass::Suv => "suv",
            VehicleClass::CoupeConvertible => "coupe_convertible",
            VehicleClass::Sedan => "sedan",
        }
    }
}

/// Itemized landed cost for one listing. All components are non-negative
/// except `depreciation`, which may be a bonus for under-average mileage;
/// `total` is clamped so it never drops below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub shipping_miles: Option<f64>,
    pub shipping: f64,
    pub recon: f64,
    pub packaging: f64,
    pub depreciation: f64,
    pub total: f64,
}

/// Error marker attached to a result when a single record fails scoring.
/// Batch siblings are unaffected; the marker keeps the failure visible in
/// the audit trail instead of silently defaulting to UNKNOWN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    Validation,
    Calculation,
}

/// Flag recorded when neither source coordinates, zip, nor phone area code
/// resolved; a zero shipping cost without this flag is a bug.
pub const FLAG_NO_COORDS: &str = "no_coords";
/// Flag recorded when no benchmark matched or the benchmark price was not
/// positive; forces the UNKNOWN category.
pub const FLAG_NO_BENCHMARK: &str = "no_benchmark";
/// Flag recorded when no depreciation data applied to a matched listing.
pub const FLAG_NO_DEPRECIATION_DATA: &str = "no_depreciation_data";

/// Fully scored record for one listing: the match that was found (if any),
/// the itemized landed cost, the derived category, and an explanation map
/// holding every intermediate value keyed by calculation name.
///
/// The category is a pure function of (benchmark_price, total_cost,
/// thresholds) and can be recomputed from the stored inputs at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub vin: Option<String>,
    pub tier: MatchTier,
    pub confidence: f64,
    pub appraisal: Option<Appraisal>,
    pub costs: Option<CostBreakdown>,
    pub margin_percent: Option<f64>,
    pub category: Category,
    pub flags: Vec<String>,
    pub explanation: BTreeMap<String, serde_json::Value>,
    pub failure: Option<ScoringFailure>,
    pub scored_at: DateTime<Utc>,
}

impl MatchResult {
    /// Unscored placeholder for a record that failed validation or cost
    /// calculation. No partial cost data is retained.
    pub fn failed(vin: Option<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut explanation = BTreeMap::new();
        explanation.insert(
            "error".to_string(),
            serde_json::json!({
                "kind": match kind {
                    FailureKind::Validation => "validation",
                    FailureKind::Calculation => "calculation",
                },
                "message": message.clone(),
            }),
        );
        Self {
            vin,
            tier: MatchTier::None,
            confidence: 0.0,
            appraisal: None,
            costs: None,
            margin_percent: None,
            category: Category::Unknown,
            flags: Vec::new(),
            explanation,
            failure: Some(ScoringFailure { kind, message }),
            scored_at: Utc::now(),
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}
