//! Business-rules engine that turns raw vehicle listings into profit
//! categorizations.
//!
//! The core is the matching and scoring pipeline: a scraped listing is
//! canonicalized, matched against an appraisal benchmark through a tiered
//! fuzzy strategy, costed (shipping, reconditioning, packaging, optional
//! depreciation adjustment), and mapped to a profit category with a full
//! explanation trail. HTTP surfaces, scrapers, schedulers, and real
//! persistence live outside this crate; the stores and the geocoder trait
//! are the seams they plug into.

pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
pub mod import;
pub mod scoring;
pub mod similarity;
pub mod store;
pub mod telemetry;

pub use config::ScoringConfig;
pub use domain::{Appraisal, Category, Listing, MatchResult, MatchTier};
pub use error::EngineError;
pub use scoring::ScoringPipeline;
