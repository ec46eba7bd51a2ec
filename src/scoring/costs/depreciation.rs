//! Depreciation adjustment with graceful fallback. The lookup is the same
//! ordered-strategy pattern as the matcher: exact trim formula, then a fuzzy
//! trim match within the same make and model, then a coarse class heuristic
//! so a matched listing always gets some adjustment.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::domain::{Appraisal, DepreciationFormula, VehicleClass};
use crate::similarity::{normalize_token, normalize_trim, token_sort_ratio};

use super::super::normalizer::NormalizedListing;

/// Where the coefficients came from, for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DepreciationSource {
    TrimFormula { sample_size: u32 },
    FuzzyTrimFormula { similarity: f64, sample_size: u32 },
    ClassHeuristic(VehicleClass),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationAdjustment {
    /// Dollars added to landed cost; negative for under-average mileage.
    pub amount: f64,
    pub source: DepreciationSource,
}

impl DepreciationAdjustment {
    pub fn unavailable() -> Self {
        Self {
            amount: 0.0,
            source: DepreciationSource::Unavailable,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.source != DepreciationSource::Unavailable
    }

    /// True when no trim-specific formula backed the figure.
    pub fn is_heuristic(&self) -> bool {
        matches!(self.source, DepreciationSource::ClassHeuristic(_))
    }
}

/// Compute the adjustment for a matched listing.
pub fn depreciation_adjustment(
    listing: &NormalizedListing,
    appraisal: &Appraisal,
    config: &ScoringConfig,
) -> DepreciationAdjustment {
    let (mileage_rate, year_rate, source) = exact_formula(listing, &config.depreciation.formulas)
        .or_else(|| fuzzy_formula(listing, config))
        .unwrap_or_else(|| {
            let class = classify_vehicle(&listing.make, &listing.model);
            let (mileage_rate, year_rate) = class_rates(class);
            (
                mileage_rate,
                year_rate,
                DepreciationSource::ClassHeuristic(class),
            )
        });

    let mileage_term = match appraisal.avg_mileage {
        Some(avg) => (listing.mileage as f64 - avg as f64) / 10_000.0 * mileage_rate,
        None => 0.0,
    };
    let year_term = (config.valuation_year - listing.year) as f64 * year_rate;

    DepreciationAdjustment {
        amount: mileage_term + year_term,
        source,
    }
}

fn exact_formula(
    listing: &NormalizedListing,
    formulas: &[DepreciationFormula],
) -> Option<(f64, f64, DepreciationSource)> {
    formulas
        .iter()
        .filter(|formula| {
            normalize_token(&formula.make) == listing.make
                && normalize_token(&formula.model) == listing.model
                && formula.trim.as_deref().map(normalize_trim).unwrap_or_default() == listing.trim
        })
        // Duplicate keys resolve to the best-evidenced formula.
        .max_by_key(|formula| formula.sample_size)
        .map(|formula| {
            (
                formula.mileage_rate_per_10k,
                formula.year_rate,
                DepreciationSource::TrimFormula {
                    sample_size: formula.sample_size,
                },
            )
        })
}

fn fuzzy_formula(
    listing: &NormalizedListing,
    config: &ScoringConfig,
) -> Option<(f64, f64, DepreciationSource)> {
    if listing.trim.is_empty() {
        return None;
    }

    let mut best: Option<(f64, &DepreciationFormula)> = None;
    for formula in &config.depreciation.formulas {
        if normalize_token(&formula.make) != listing.make
            || normalize_token(&formula.model) != listing.model
        {
            continue;
        }
        let Some(trim) = formula.trim.as_deref() else {
            continue;
        };
        let score = token_sort_ratio(&listing.trim, &normalize_trim(trim));
        if score < config.depreciation.trim_min_similarity {
            continue;
        }
        let is_better = match best {
            Some((best_score, best_formula)) => {
                score > best_score
                    || (score == best_score && formula.sample_size > best_formula.sample_size)
            }
            None => true,
        };
        if is_better {
            best = Some((score, formula));
        }
    }

    best.map(|(similarity, formula)| {
        (
            formula.mileage_rate_per_10k,
            formula.year_rate,
            DepreciationSource::FuzzyTrimFormula {
                similarity,
                sample_size: formula.sample_size,
            },
        )
    })
}

/// Static make/model classification for the heuristic fallback. Expects
/// canonicalized (uppercase) inputs.
pub fn classify_vehicle(make: &str, model: &str) -> VehicleClass {
    const SUPERCAR_MAKES: [&str; 8] = [
        "FERRARI",
        "LAMBORGHINI",
        "MCLAREN",
        "BUGATTI",
        "KOENIGSEGG",
        "PAGANI",
        "ASTON MARTIN",
        "MASERATI",
    ];
    const SUV_HINTS: [&str; 12] = [
        "SUV",
        "CROSSOVER",
        "TAHOE",
        "SUBURBAN",
        "EXPLORER",
        "HIGHLANDER",
        "PILOT",
        "X5",
        "X7",
        "Q7",
        "GLE",
        "4RUNNER",
    ];
    const COUPE_HINTS: [&str; 6] = [
        "COUPE",
        "CONVERTIBLE",
        "ROADSTER",
        "SPIDER",
        "SPYDER",
        "CABRIOLET",
    ];

    if SUPERCAR_MAKES.contains(&make) {
        return VehicleClass::Supercar;
    }
    if SUV_HINTS.iter().any(|hint| model_has_token(model, hint)) {
        return VehicleClass::Suv;
    }
    if COUPE_HINTS.iter().any(|hint| model_has_token(model, hint)) {
        return VehicleClass::CoupeConvertible;
    }
    VehicleClass::Sedan
}

fn model_has_token(model: &str, token: &str) -> bool {
    model.split_whitespace().any(|part| part == token)
}

/// Coarse (per-10k-mile, per-year) dollar rates by class, derived from the
/// category adjustment schedule the appraisers work from.
fn class_rates(class: VehicleClass) -> (f64, f64) {
    match class {
        VehicleClass::Supercar => (6_000.0, 4_000.0),
        VehicleClass::CoupeConvertible => (4_000.0, 2_500.0),
        VehicleClass::Suv => (1_500.0, 1_200.0),
        VehicleClass::Sedan => (2_000.0, 1_500.0),
    }
}
