//! Tiered benchmark matching. The three tiers are an ordered chain of
//! strategies sharing one contract; the first tier to produce an outcome
//! wins, which keeps the precedence explicit and each tier independently
//! testable.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::domain::{Appraisal, MatchTier};
use crate::similarity::{comparison_keys, token_sort_ratio};

use super::normalizer::NormalizedListing;

/// Outcome of a match attempt against a benchmark snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub tier: MatchTier,
    pub confidence: f64,
    pub appraisal: Option<Appraisal>,
    /// Raw 0–100 similarity, present only for fuzzy matches.
    pub similarity: Option<f64>,
}

impl MatchOutcome {
    pub fn unmatched() -> Self {
        Self {
            tier: MatchTier::None,
            confidence: 0.0,
            appraisal: None,
            similarity: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.appraisal.is_some()
    }
}

type TierStrategy = fn(&NormalizedListing, &[Appraisal], &ScoringConfig) -> Option<MatchOutcome>;

/// Strict precedence: exact YMMT, then exact YMM, then fuzzy.
const TIERS: [TierStrategy; 3] = [exact_ymmt, exact_ymm, fuzzy];

/// Find the best benchmark for a normalized listing. An empty snapshot or a
/// listing nothing resembles yields the unmatched outcome, never an error.
pub fn find_best(
    listing: &NormalizedListing,
    benchmarks: &[Appraisal],
    config: &ScoringConfig,
) -> MatchOutcome {
    TIERS
        .iter()
        .find_map(|tier| tier(listing, benchmarks, config))
        .unwrap_or_else(MatchOutcome::unmatched)
}

fn exact_ymmt(
    listing: &NormalizedListing,
    benchmarks: &[Appraisal],
    _config: &ScoringConfig,
) -> Option<MatchOutcome> {
    benchmarks
        .iter()
        .find(|appraisal| appraisal_ymmt_key(appraisal) == listing.ymmt_key)
        .map(|appraisal| MatchOutcome {
            tier: MatchTier::Ymmt,
            confidence: 1.0,
            appraisal: Some(appraisal.clone()),
            similarity: None,
        })
}

fn exact_ymm(
    listing: &NormalizedListing,
    benchmarks: &[Appraisal],
    _config: &ScoringConfig,
) -> Option<MatchOutcome> {
    // Trim is ignored at this tier. Among multiple candidates prefer the
    // closest average mileage, then the lowest benchmark price, then the
    // first inserted.
    benchmarks
        .iter()
        .filter(|appraisal| appraisal_ymm_key(appraisal) == listing.ymm_key)
        .enumerate()
        .min_by(|(idx_a, a), (idx_b, b)| {
            mileage_distance(listing, a)
                .cmp(&mileage_distance(listing, b))
                .then(a.benchmark_price.total_cmp(&b.benchmark_price))
                .then(idx_a.cmp(idx_b))
        })
        .map(|(_, appraisal)| MatchOutcome {
            tier: MatchTier::Ymm,
            confidence: 0.85,
            appraisal: Some(appraisal.clone()),
            similarity: None,
        })
}

fn fuzzy(
    listing: &NormalizedListing,
    benchmarks: &[Appraisal],
    config: &ScoringConfig,
) -> Option<MatchOutcome> {
    let mut best: Option<(f64, &Appraisal)> = None;
    for appraisal in benchmarks {
        let score = token_sort_ratio(&listing.ymmt_key, &appraisal_ymmt_key(appraisal));
        let is_better = match best {
            Some((best_score, _)) => score > best_score,
            None => true,
        };
        if is_better {
            best = Some((score, appraisal));
        }
    }

    let (score, appraisal) = best?;
    if score < config.fuzzy_min_similarity {
        return None;
    }
    Some(MatchOutcome {
        tier: MatchTier::Fuzzy,
        confidence: score / 100.0,
        appraisal: Some(appraisal.clone()),
        similarity: Some(score),
    })
}

fn mileage_distance(listing: &NormalizedListing, appraisal: &Appraisal) -> u32 {
    match appraisal.avg_mileage {
        Some(avg) => listing.mileage.abs_diff(avg),
        // Benchmarks without an average mileage sort after any with one.
        None => u32::MAX,
    }
}

fn appraisal_ymmt_key(appraisal: &Appraisal) -> String {
    comparison_keys(
        appraisal.year,
        &appraisal.make,
        &appraisal.model,
        appraisal.trim.as_deref(),
    )
    .0
}

fn appraisal_ymm_key(appraisal: &Appraisal) -> String {
    comparison_keys(
        appraisal.year,
        &appraisal.make,
        &appraisal.model,
        appraisal.trim.as_deref(),
    )
    .1
}
