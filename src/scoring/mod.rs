//! The matching and scoring pipeline. One listing flows strictly through
//! normalize, match, cost, categorize; across listings scoring is
//! embarrassingly parallel with bounded concurrency, and only geocoding may
//! block on I/O.

pub mod categorizer;
pub mod costs;
pub mod matcher;
pub mod normalizer;

pub use categorizer::{categorize, MarginAssessment};
pub use costs::{CalculationError, CostAssessment};
pub use matcher::MatchOutcome;
pub use normalizer::{normalize, NormalizedListing, ValidationError};

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::{ConfigError, ScoringConfig};
use crate::domain::{
    Appraisal, Category, FailureKind, Listing, MatchResult, FLAG_NO_BENCHMARK, FLAG_NO_COORDS,
    FLAG_NO_DEPRECIATION_DATA,
};
use crate::geo::Geocoder;

/// Per-record scoring failure: fatal to that one record, never to a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Calculation(#[from] CalculationError),
}

impl ScoreError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            ScoreError::Validation(_) => FailureKind::Validation,
            ScoreError::Calculation(_) => FailureKind::Calculation,
        }
    }
}

/// Stateless scorer binding a configuration snapshot to a geocoding
/// collaborator. Benchmarks are passed per call as a snapshot so a bulk
/// replace concurrent with in-flight scoring never produces a torn read.
pub struct ScoringPipeline<G> {
    config: Arc<ScoringConfig>,
    geocoder: Arc<G>,
}

impl<G> Clone for ScoringPipeline<G> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            geocoder: Arc::clone(&self.geocoder),
        }
    }
}

impl<G: Geocoder + 'static> ScoringPipeline<G> {
    pub fn new(config: ScoringConfig, geocoder: G) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            geocoder: Arc::new(geocoder),
        })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one listing against a benchmark snapshot.
    pub async fn score(
        &self,
        listing: &Listing,
        benchmarks: &[Appraisal],
    ) -> Result<MatchResult, ScoreError> {
        let normalized = normalize(listing)?;
        debug!(vin = ?normalized.vin, key = %normalized.ymmt_key, "scoring listing");

        let outcome = matcher::find_best(&normalized, benchmarks, &self.config);
        let assessment = costs::compute_costs(
            &normalized,
            outcome.appraisal.as_ref(),
            self.geocoder.as_ref(),
            &self.config,
        )
        .await?;

        let benchmark_price = outcome
            .appraisal
            .as_ref()
            .map(|appraisal| appraisal.benchmark_price);
        let margin = categorize(
            benchmark_price,
            normalized.price,
            assessment.breakdown.total,
            &self.config.thresholds,
        );

        Ok(self.assemble(&normalized, outcome, assessment, margin))
    }

    /// Score a batch with bounded concurrency. Results come back in input
    /// order; a record that fails validation or calculation is returned with
    /// a failure marker and never aborts its siblings.
    pub async fn score_all(
        &self,
        listings: Vec<Listing>,
        benchmarks: Arc<Vec<Appraisal>>,
    ) -> Vec<MatchResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_scores));
        let mut tasks = JoinSet::new();

        for (index, listing) in listings.into_iter().enumerate() {
            let pipeline = self.clone();
            let benchmarks = Arc::clone(&benchmarks);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                let result = match pipeline.score(&listing, &benchmarks).await {
                    Ok(result) => result,
                    Err(error) => {
                        warn!(%error, "listing failed scoring");
                        MatchResult::failed(
                            normalizer::normalize_vin(listing.vin.as_deref()),
                            error.failure_kind(),
                            error.to_string(),
                        )
                    }
                };
                (index, result)
            });
        }

        let mut indexed = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => indexed.push(entry),
                Err(join_error) => warn!(%join_error, "scoring task panicked"),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    fn assemble(
        &self,
        listing: &NormalizedListing,
        outcome: MatchOutcome,
        assessment: CostAssessment,
        margin: MarginAssessment,
    ) -> MatchResult {
        let mut flags = Vec::new();
        let mut explanation = std::collections::BTreeMap::new();

        explanation.insert(
            "listing".to_string(),
            json!({
                "vin": listing.vin.clone(),
                "key": listing.ymmt_key.clone(),
                "price": listing.price,
                "mileage": listing.mileage,
            }),
        );
        explanation.insert(
            "match".to_string(),
            json!({
                "tier": outcome.tier.label(),
                "confidence": outcome.confidence,
                "similarity": outcome.similarity,
                "benchmark_price": outcome
                    .appraisal
                    .as_ref()
                    .map(|appraisal| appraisal.benchmark_price),
            }),
        );
        explanation.insert(
            "shipping".to_string(),
            json!({
                "miles": assessment.shipping.miles,
                "rate_per_mile": self.config.shipping.rate_per_mile,
                "cost": assessment.shipping.cost,
                "method": assessment.shipping.method.map(|method| method.label()),
            }),
        );
        explanation.insert(
            "recon".to_string(),
            json!({ "cost": assessment.breakdown.recon }),
        );
        explanation.insert(
            "packaging".to_string(),
            json!({ "cost": assessment.breakdown.packaging }),
        );
        explanation.insert(
            "depreciation".to_string(),
            json!({
                "applied": assessment.breakdown.depreciation,
                "raw_adjustment": assessment.depreciation.amount,
                "source": assessment.depreciation.source.clone(),
            }),
        );
        explanation.insert(
            "margin".to_string(),
            json!({
                "listing_price": listing.price,
                "total_cost": assessment.breakdown.total,
                "margin_percent": margin.margin_percent,
                "category": margin.category.label(),
            }),
        );
        explanation.insert(
            "thresholds".to_string(),
            json!({
                "profitable_min_pct": self.config.thresholds.profitable_min_pct,
                "maybe_min_pct": self.config.thresholds.maybe_min_pct,
                "fuzzy_min_similarity": self.config.fuzzy_min_similarity,
            }),
        );

        if !assessment.shipping.is_resolved() {
            flags.push(FLAG_NO_COORDS.to_string());
        }
        if outcome.is_matched() && assessment.depreciation.is_heuristic() {
            flags.push(FLAG_NO_DEPRECIATION_DATA.to_string());
        }
        // An unmatched listing is UNKNOWN no matter what the costs say.
        let category = if outcome.is_matched() {
            margin.category
        } else {
            if !flags.iter().any(|flag| flag == FLAG_NO_BENCHMARK) {
                flags.push(FLAG_NO_BENCHMARK.to_string());
            }
            Category::Unknown
        };
        if let Some(flag) = margin.flag {
            if !flags.iter().any(|existing| existing == flag) {
                flags.push(flag.to_string());
            }
        }

        MatchResult {
            vin: listing.vin.clone(),
            tier: outcome.tier,
            confidence: outcome.confidence,
            appraisal: outcome.appraisal,
            costs: Some(assessment.breakdown),
            margin_percent: margin.margin_percent,
            category,
            flags,
            explanation,
            failure: None,
            scored_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, DepreciationFormula, MatchTier};
    use crate::geo::NullGeocoder;

    fn listing(vin: Option<&str>, price: Option<f64>) -> Listing {
        Listing {
            vin: vin.map(str::to_string),
            year: 2019,
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            trim: Some("SE".to_string()),
            price,
            mileage: Some(30_000.0),
            coords: Some(Coordinates {
                lat: 40.117802,
                lon: -83.135870,
            }),
            zip: None,
            phone: None,
        }
    }

    fn benchmarks() -> Vec<Appraisal> {
        vec![Appraisal {
            year: 2019,
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            trim: Some("SE".to_string()),
            benchmark_price: 24_000.0,
            avg_mileage: Some(30_000),
            notes: None,
        }]
    }

    fn pipeline() -> ScoringPipeline<NullGeocoder> {
        let mut config = ScoringConfig::default();
        config.valuation_year = 2019;
        ScoringPipeline::new(config, NullGeocoder).expect("valid config")
    }

    #[tokio::test]
    async fn scores_a_matched_listing_end_to_end() {
        let result = pipeline()
            .score(&listing(Some("4T1B11HK5KU000001"), Some(18_000.0)), &benchmarks())
            .await
            .expect("scores");

        assert_eq!(result.tier, MatchTier::Ymmt);
        assert_eq!(result.confidence, 1.0);
        let costs = result.costs.as_ref().expect("costs present");
        // Listing sits at the destination: zero shipping, explicit value.
        assert_eq!(costs.shipping, 0.0);
        assert_eq!(costs.recon, 1_300.0);
        assert_eq!(costs.packaging, 500.0);
        // margin = (24000 - 18000 - 1800) / 24000 = 17.5%
        assert_eq!(result.margin_percent, Some(17.5));
        assert_eq!(result.category, Category::Profitable);
        assert!(result.explanation.contains_key("match"));
        assert!(result.explanation.contains_key("thresholds"));
        assert!(!result.has_flag(FLAG_NO_COORDS));
    }

    #[tokio::test]
    async fn heuristic_depreciation_is_flagged_until_a_formula_covers_the_trim() {
        // No trim formulas configured: the class heuristic stands in and the
        // result must say so.
        let result = pipeline()
            .score(&listing(Some("4T1B11HK5KU000001"), Some(18_000.0)), &benchmarks())
            .await
            .expect("scores");
        assert!(result.has_flag(FLAG_NO_DEPRECIATION_DATA));

        let mut config = ScoringConfig::default();
        config.valuation_year = 2019;
        config.depreciation.formulas = vec![DepreciationFormula {
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            trim: Some("SE".to_string()),
            mileage_rate_per_10k: 1_500.0,
            year_rate: 900.0,
            sample_size: 75,
            r_squared: 0.88,
        }];
        let covered = ScoringPipeline::new(config, NullGeocoder)
            .expect("valid config")
            .score(&listing(None, Some(18_000.0)), &benchmarks())
            .await
            .expect("scores");
        assert!(!covered.has_flag(FLAG_NO_DEPRECIATION_DATA));
    }

    #[tokio::test]
    async fn unmatched_listing_is_unknown_regardless_of_costs() {
        let result = pipeline()
            .score(&listing(None, Some(18_000.0)), &[])
            .await
            .expect("scores");

        assert_eq!(result.tier, MatchTier::None);
        assert_eq!(result.category, Category::Unknown);
        assert!(result.has_flag(FLAG_NO_BENCHMARK));
        // Costs are still itemized for later re-scoring.
        assert!(result.costs.is_some());
    }

    #[tokio::test]
    async fn validation_failure_propagates_from_score() {
        let error = pipeline()
            .score(&listing(None, None), &benchmarks())
            .await
            .expect_err("missing price must fail");
        assert!(matches!(
            error,
            ScoreError::Validation(ValidationError::MissingPrice)
        ));
    }

    #[tokio::test]
    async fn batch_keeps_order_and_isolates_failures() {
        let listings = vec![
            listing(Some("VINA"), Some(18_000.0)),
            listing(Some("VINB"), None),
            listing(Some("VINC"), Some(18_000.0)),
        ];
        let results = pipeline()
            .score_all(listings, Arc::new(benchmarks()))
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].vin.as_deref(), Some("VINA"));
        assert!(results[0].failure.is_none());
        let failure = results[1].failure.as_ref().expect("failure marker");
        assert_eq!(failure.kind, FailureKind::Validation);
        assert!(results[1].explanation.contains_key("error"));
        assert!(results[2].failure.is_none());
        assert_eq!(results[2].category, Category::Profitable);
    }
}
