//! Landed-cost calculation: three independent pure sub-calculations
//! (shipping, reconditioning, packaging) plus the optional depreciation
//! adjustment, summed into a total that never drops below zero.

mod depreciation;
mod packaging;
mod recon;
mod shipping;

pub use depreciation::{classify_vehicle, depreciation_adjustment, DepreciationAdjustment, DepreciationSource};
pub use packaging::packaging_cost;
pub use recon::recon_cost;
pub use shipping::{shipping_quote, ShippingQuote};

use crate::config::{DepreciationMode, ScoringConfig};
use crate::domain::{Appraisal, CostBreakdown};
use crate::geo::Geocoder;

use super::normalizer::NormalizedListing;

/// Malformed numeric input to a cost sub-calculation. Missing geocoding is
/// never one of these; it is a flagged zero.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalculationError {
    #[error("{context}: {value} is not a finite non-negative number")]
    MalformedNumber { context: &'static str, value: f64 },
}

/// Everything the pipeline needs from the cost stage: the breakdown, the
/// shipping resolution detail, and where the depreciation figure came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CostAssessment {
    pub breakdown: CostBreakdown,
    pub shipping: ShippingQuote,
    pub depreciation: DepreciationAdjustment,
}

/// Run every sub-calculation for a listing. The benchmark is optional: costs
/// are still itemized for unmatched listings so re-scoring after an
/// appraisal upload starts from a complete picture; only the depreciation
/// term needs benchmark context.
pub async fn compute_costs<G: Geocoder>(
    listing: &NormalizedListing,
    appraisal: Option<&Appraisal>,
    geocoder: &G,
    config: &ScoringConfig,
) -> Result<CostAssessment, CalculationError> {
    let shipping = shipping_quote(listing, geocoder, &config.shipping).await?;
    let recon = recon_cost(listing.year, listing.mileage, &config.recon);
    let packaging = packaging_cost(listing.price, &config.packaging)?;

    let depreciation = match (appraisal, config.depreciation.mode) {
        (Some(appraisal), DepreciationMode::Additive | DepreciationMode::ReplaceRecon) => {
            depreciation_adjustment(listing, appraisal, config)
        }
        _ => DepreciationAdjustment::unavailable(),
    };

    // The recon-plus-adjustment component is clamped to the recon floor so a
    // large under-mileage bonus cannot erase reconditioning. The breakdown
    // keeps the invariant total == shipping + packaging + recon + depreciation.
    let floor = config.recon.floor();
    let (recon_field, depreciation_field) = match config.depreciation.mode {
        DepreciationMode::Off => (recon, 0.0),
        DepreciationMode::Additive => {
            let combined = (recon + depreciation.amount).max(floor);
            (recon, combined - recon)
        }
        DepreciationMode::ReplaceRecon if depreciation.is_applied() => {
            (0.0, depreciation.amount.max(floor))
        }
        DepreciationMode::ReplaceRecon => (recon, 0.0),
    };

    let total = (shipping.cost + packaging + recon_field + depreciation_field).max(0.0);

    Ok(CostAssessment {
        breakdown: CostBreakdown {
            shipping_miles: shipping.miles,
            shipping: shipping.cost,
            recon: recon_field,
            packaging,
            depreciation: depreciation_field,
            total,
        },
        shipping,
        depreciation,
    })
}
