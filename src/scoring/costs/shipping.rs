use serde::{Deserialize, Serialize};

use crate::config::ShippingConfig;
use crate::domain::Coordinates;
use crate::geo::{area_code_coordinates, area_code_from_phone, haversine_miles, Geocoder};
use crate::scoring::normalizer::NormalizedListing;

use super::CalculationError;

/// How the listing's position was established, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingMethod {
    Coordinates,
    Zip,
    AreaCode,
}

impl ShippingMethod {
    pub fn label(&self) -> &'static str {
        match self {
            ShippingMethod::Coordinates => "coords",
            ShippingMethod::Zip => "zip",
            ShippingMethod::AreaCode => "area_code",
        }
    }
}

/// Shipping estimate. `miles` and `method` are absent exactly when nothing
/// resolved, in which case the cost is zero and the pipeline records the
/// mandatory `no_coords` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub miles: Option<f64>,
    pub cost: f64,
    pub method: Option<ShippingMethod>,
}

impl ShippingQuote {
    pub fn unresolved() -> Self {
        Self {
            miles: None,
            cost: 0.0,
            method: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.method.is_some()
    }
}

/// Estimate shipping from the listing's position to the configured
/// destination. Resolution order: explicit coordinates, then zip through the
/// geocoder (bounded by the configured timeout; a timeout reads exactly like
/// a miss), then seller phone area code. Whole-dollar cost, rounded up.
pub async fn shipping_quote<G: Geocoder>(
    listing: &NormalizedListing,
    geocoder: &G,
    config: &ShippingConfig,
) -> Result<ShippingQuote, CalculationError> {
    if !config.rate_per_mile.is_finite() || config.rate_per_mile < 0.0 {
        return Err(CalculationError::MalformedNumber {
            context: "shipping rate per mile",
            value: config.rate_per_mile,
        });
    }

    let Some(destination) = config.destination else {
        return Ok(ShippingQuote::unresolved());
    };

    let Some((origin, method)) = resolve_origin(listing, geocoder, config).await else {
        return Ok(ShippingQuote::unresolved());
    };

    let miles = haversine_miles(origin, destination);
    Ok(ShippingQuote {
        miles: Some(miles),
        cost: (miles * config.rate_per_mile).ceil(),
        method: Some(method),
    })
}

async fn resolve_origin<G: Geocoder>(
    listing: &NormalizedListing,
    geocoder: &G,
    config: &ShippingConfig,
) -> Option<(Coordinates, ShippingMethod)> {
    if let Some(coords) = listing.coords {
        return Some((coords, ShippingMethod::Coordinates));
    }

    if let Some(zip) = listing.zip.as_deref() {
        let lookup = tokio::time::timeout(config.geocode_timeout, geocoder.resolve(zip));
        if let Ok(Some(coords)) = lookup.await {
            return Some((coords, ShippingMethod::Zip));
        }
    }

    let coords = listing
        .phone
        .as_deref()
        .and_then(area_code_from_phone)
        .and_then(area_code_coordinates)?;
    Some((coords, ShippingMethod::AreaCode))
}
