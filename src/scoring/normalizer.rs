//! Canonicalizes raw listings into comparable keys. This is the only stage
//! allowed to reject a listing; everything downstream assumes clean input.

use serde::{Deserialize, Serialize};

use crate::config::current_year;
use crate::domain::{Coordinates, Listing};
use crate::similarity::{comparison_keys, normalize_token, normalize_trim};

/// Earliest model year accepted from a scrape.
const MIN_YEAR: i32 = 1900;

/// Listing after canonicalization: uppercase trimmed identity strings,
/// validated numerics, and precomputed YMMT/YMM comparison keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedListing {
    pub vin: Option<String>,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: String,
    pub price: f64,
    pub mileage: u32,
    pub coords: Option<Coordinates>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    /// Concatenated "YEAR MAKE MODEL TRIM" comparison key.
    pub ymmt_key: String,
    /// Concatenated "YEAR MAKE MODEL" comparison key.
    pub ymm_key: String,
}

/// Pure canonicalization; no side effects.
pub fn normalize(listing: &Listing) -> Result<NormalizedListing, ValidationError> {
    let price = match listing.price {
        None => return Err(ValidationError::MissingPrice),
        Some(value) if !value.is_finite() || value < 0.0 => {
            return Err(ValidationError::InvalidPrice(value))
        }
        Some(value) => value,
    };

    let mileage = match listing.mileage {
        None => return Err(ValidationError::MissingMileage),
        Some(value) if !value.is_finite() || value < 0.0 => {
            return Err(ValidationError::InvalidMileage(value))
        }
        Some(value) => value as u32,
    };

    let max_year = current_year() + 1;
    if listing.year < MIN_YEAR || listing.year > max_year {
        return Err(ValidationError::YearOutOfRange {
            year: listing.year,
            min: MIN_YEAR,
            max: max_year,
        });
    }

    let make = normalize_token(&listing.make);
    let model = normalize_token(&listing.model);
    let trim = listing
        .trim
        .as_deref()
        .map(normalize_trim)
        .unwrap_or_default();
    let (ymmt_key, ymm_key) = comparison_keys(
        listing.year,
        &listing.make,
        &listing.model,
        listing.trim.as_deref(),
    );

    Ok(NormalizedListing {
        vin: normalize_vin(listing.vin.as_deref()),
        year: listing.year,
        make,
        model,
        trim,
        price,
        mileage,
        coords: listing.coords,
        zip: listing
            .zip
            .as_deref()
            .map(str::trim)
            .filter(|zip| !zip.is_empty())
            .map(str::to_string),
        phone: listing.phone.clone(),
        ymmt_key,
        ymm_key,
    })
}

/// Uppercase alphanumeric VIN, or `None` when absent or empty after
/// cleaning. A VIN-less listing is never deduplicated against another.
pub fn normalize_vin(vin: Option<&str>) -> Option<String> {
    let cleaned: String = vin?
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .flat_map(|ch| ch.to_uppercase())
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("listing price is missing")]
    MissingPrice,
    #[error("listing price {0} is not a finite non-negative amount")]
    InvalidPrice(f64),
    #[error("listing mileage is missing")]
    MissingMileage,
    #[error("listing mileage {0} is not a finite non-negative count")]
    InvalidMileage(f64),
    #[error("listing year {year} outside accepted range {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_listing() -> Listing {
        Listing {
            vin: Some(" wauzzz4g7fn012345 ".to_string()),
            year: 2018,
            make: " audi ".to_string(),
            model: "a6".to_string(),
            trim: Some("premium plus quattro".to_string()),
            price: Some(31_500.0),
            mileage: Some(42_000.0),
            coords: None,
            zip: Some(" 43017 ".to_string()),
            phone: None,
        }
    }

    #[test]
    fn canonicalizes_identity_fields() {
        let normalized = normalize(&raw_listing()).expect("valid listing");
        assert_eq!(normalized.make, "AUDI");
        assert_eq!(normalized.model, "A6");
        assert_eq!(normalized.trim, "PREMIUM PLUS");
        assert_eq!(normalized.ymmt_key, "2018 AUDI A6 PREMIUM PLUS");
        assert_eq!(normalized.ymm_key, "2018 AUDI A6");
        assert_eq!(normalized.zip.as_deref(), Some("43017"));
    }

    #[test]
    fn vin_is_uppercase_alphanumeric_or_none() {
        let normalized = normalize(&raw_listing()).expect("valid listing");
        assert_eq!(normalized.vin.as_deref(), Some("WAUZZZ4G7FN012345"));

        assert_eq!(normalize_vin(Some("  - ")), None);
        assert_eq!(normalize_vin(None), None);
    }

    #[test]
    fn rejects_missing_price() {
        let mut listing = raw_listing();
        listing.price = None;
        assert_eq!(normalize(&listing), Err(ValidationError::MissingPrice));
    }

    #[test]
    fn rejects_negative_and_non_finite_numerics() {
        let mut listing = raw_listing();
        listing.price = Some(-1.0);
        assert!(matches!(
            normalize(&listing),
            Err(ValidationError::InvalidPrice(_))
        ));

        let mut listing = raw_listing();
        listing.mileage = Some(f64::NAN);
        assert!(matches!(
            normalize(&listing),
            Err(ValidationError::InvalidMileage(_))
        ));
    }

    #[test]
    fn rejects_years_outside_sane_bounds() {
        let mut listing = raw_listing();
        listing.year = 1899;
        assert!(matches!(
            normalize(&listing),
            Err(ValidationError::YearOutOfRange { .. })
        ));

        let mut listing = raw_listing();
        listing.year = current_year() + 2;
        assert!(matches!(
            normalize(&listing),
            Err(ValidationError::YearOutOfRange { .. })
        ));

        let mut listing = raw_listing();
        listing.year = current_year() + 1;
        assert!(normalize(&listing).is_ok());
    }
}
