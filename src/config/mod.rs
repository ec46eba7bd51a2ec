use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinates, DepreciationFormula};

/// Immutable snapshot of every tunable the scoring pipeline consumes.
///
/// Admin edits produce a new snapshot; in-flight scoring keeps the snapshot
/// it started with, so concurrent scoring against different revisions is
/// well-defined. Nothing in here is ambient global state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub shipping: ShippingConfig,
    pub recon: ReconConfig,
    pub packaging: PackagingTable,
    pub thresholds: MarginThresholds,
    /// Minimum token-sort similarity (0–100) for the fuzzy match tier.
    pub fuzzy_min_similarity: f64,
    pub depreciation: DepreciationConfig,
    /// Year used for age-based depreciation; defaults to the current year.
    pub valuation_year: i32,
    /// Upper bound on concurrently scored listings in `score_all`.
    pub max_concurrent_scores: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingConfig {
    pub rate_per_mile: f64,
    pub destination: Option<Coordinates>,
    /// Budget for a single geocode lookup; a timeout is treated exactly like
    /// an unresolved zip.
    #[serde(with = "duration_millis")]
    pub geocode_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconConfig {
    pub low_mileage_max: u32,
    pub low_mileage_cost: f64,
    pub modern_year_min: i32,
    pub modern_cost: f64,
    pub standard_cost: f64,
}

impl ReconConfig {
    /// Smallest configured tier; depreciation may never push the combined
    /// recon-plus-adjustment component below this floor.
    pub fn floor(&self) -> f64 {
        self.low_mileage_cost
            .min(self.modern_cost)
            .min(self.standard_cost)
    }
}

/// Ordered packaging tiers as half-open price ranges: each tier covers
/// `[floor, next_floor)`, the last extends to infinity. A price exactly on a
/// boundary lands in the higher tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagingTable {
    pub tiers: Vec<PackagingTier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackagingTier {
    pub floor: f64,
    pub cost: f64,
}

impl PackagingTable {
    pub fn cost_for(&self, price: f64) -> Option<f64> {
        self.tiers
            .iter()
            .rev()
            .find(|tier| price >= tier.floor)
            .map(|tier| tier.cost)
    }
}

/// Margin-percent cutoffs, closed on the lower end per tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginThresholds {
    pub profitable_min_pct: f64,
    pub maybe_min_pct: f64,
}

/// How the depreciation adjustment participates in landed cost. The source
/// business rules list "adjustments" alongside "reconditioning" without
/// pinning down the interaction, so both readings stay available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepreciationMode {
    Off,
    /// Adjustment is added on top of the base reconditioning cost.
    Additive,
    /// Adjustment stands in for the base reconditioning cost.
    ReplaceRecon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationConfig {
    pub mode: DepreciationMode,
    /// Minimum trim similarity (0–100) for the fuzzy formula fallback.
    pub trim_min_similarity: f64,
    /// Trim-level regression coefficients; read-only reference data.
    pub formulas: Vec<DepreciationFormula>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            shipping: ShippingConfig {
                rate_per_mile: 0.80,
                destination: Some(Coordinates {
                    lat: 40.117802,
                    lon: -83.135870,
                }),
                geocode_timeout: Duration::from_secs(5),
            },
            recon: ReconConfig {
                low_mileage_max: 5_000,
                low_mileage_cost: 800.0,
                modern_year_min: 2012,
                modern_cost: 1_300.0,
                standard_cost: 3_000.0,
            },
            packaging: PackagingTable {
                tiers: vec![
                    PackagingTier { floor: 0.0, cost: 500.0 },
                    PackagingTier { floor: 20_000.0, cost: 800.0 },
                    PackagingTier { floor: 40_000.0, cost: 1_200.0 },
                    PackagingTier { floor: 60_000.0, cost: 1_500.0 },
                    PackagingTier { floor: 80_000.0, cost: 1_800.0 },
                    PackagingTier { floor: 120_000.0, cost: 2_200.0 },
                    PackagingTier { floor: 150_000.0, cost: 2_800.0 },
                    PackagingTier { floor: 180_000.0, cost: 3_400.0 },
                    PackagingTier { floor: 220_000.0, cost: 4_000.0 },
                    PackagingTier { floor: 260_000.0, cost: 5_000.0 },
                    PackagingTier { floor: 300_000.0, cost: 7_000.0 },
                ],
            },
            thresholds: MarginThresholds {
                profitable_min_pct: 7.0,
                maybe_min_pct: 6.0,
            },
            fuzzy_min_similarity: 80.0,
            depreciation: DepreciationConfig {
                mode: DepreciationMode::Additive,
                trim_min_similarity: 70.0,
                formulas: Vec::new(),
            },
            valuation_year: current_year(),
            max_concurrent_scores: 8,
        }
    }
}

impl ScoringConfig {
    /// Build a snapshot from environment variables layered over the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Some(rate) = read_env_f64("AUTOPROFIT_SHIPPING_RATE_PER_MILE")? {
            config.shipping.rate_per_mile = rate;
        }
        match (
            read_env_f64("AUTOPROFIT_DEST_LAT")?,
            read_env_f64("AUTOPROFIT_DEST_LON")?,
        ) {
            (Some(lat), Some(lon)) => {
                config.shipping.destination = Some(Coordinates { lat, lon });
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::Invalid {
                    name: "AUTOPROFIT_DEST_LAT/AUTOPROFIT_DEST_LON",
                    reason: "both coordinates must be set together".to_string(),
                })
            }
        }
        if let Some(pct) = read_env_f64("AUTOPROFIT_PROFIT_MIN_PCT")? {
            config.thresholds.profitable_min_pct = pct;
        }
        if let Some(pct) = read_env_f64("AUTOPROFIT_MAYBE_MIN_PCT")? {
            config.thresholds.maybe_min_pct = pct;
        }
        if let Some(min) = read_env_f64("AUTOPROFIT_FUZZY_MIN_SIMILARITY")? {
            config.fuzzy_min_similarity = min;
        }

        config.validate()?;
        Ok(config)
    }

    /// Startup-fatal validation: a malformed rate table or threshold pair is
    /// a `ConfigError`, never a per-record failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.shipping.rate_per_mile.is_finite() || self.shipping.rate_per_mile < 0.0 {
            return Err(ConfigError::Invalid {
                name: "shipping.rate_per_mile",
                reason: "must be a finite non-negative number".to_string(),
            });
        }

        if self.packaging.tiers.is_empty() {
            return Err(ConfigError::Invalid {
                name: "packaging.tiers",
                reason: "at least one tier is required".to_string(),
            });
        }
        if self.packaging.tiers[0].floor != 0.0 {
            return Err(ConfigError::Invalid {
                name: "packaging.tiers",
                reason: "first tier must start at price 0".to_string(),
            });
        }
        for window in self.packaging.tiers.windows(2) {
            if window[1].floor <= window[0].floor {
                return Err(ConfigError::Invalid {
                    name: "packaging.tiers",
                    reason: "tier floors must be strictly increasing".to_string(),
                });
            }
        }
        if self
            .packaging
            .tiers
            .iter()
            .any(|tier| !tier.cost.is_finite() || tier.cost < 0.0)
        {
            return Err(ConfigError::Invalid {
                name: "packaging.tiers",
                reason: "tier costs must be finite and non-negative".to_string(),
            });
        }

        if self.thresholds.profitable_min_pct < self.thresholds.maybe_min_pct {
            return Err(ConfigError::Invalid {
                name: "thresholds",
                reason: "profitable cutoff must not be below the maybe cutoff".to_string(),
            });
        }

        if !(0.0..=100.0).contains(&self.fuzzy_min_similarity) {
            return Err(ConfigError::Invalid {
                name: "fuzzy_min_similarity",
                reason: "must be within 0..=100".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&self.depreciation.trim_min_similarity) {
            return Err(ConfigError::Invalid {
                name: "depreciation.trim_min_similarity",
                reason: "must be within 0..=100".to_string(),
            });
        }

        if self.max_concurrent_scores == 0 {
            return Err(ConfigError::Invalid {
                name: "max_concurrent_scores",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

pub fn current_year() -> i32 {
    use chrono::Datelike;
    chrono::Utc::now().year()
}

fn read_env_f64(name: &'static str) -> Result<Option<f64>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                reason: format!("'{raw}' is not a number"),
            }),
        Err(_) => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration for {name}: {reason}")]
    Invalid {
        name: &'static str,
        reason: String,
    },
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
