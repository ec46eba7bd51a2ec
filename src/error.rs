use crate::config::ConfigError;
use crate::import::ImportError;
use crate::scoring::{CalculationError, ScoreError, ValidationError};
use crate::store::StoreError;
use crate::telemetry::TelemetryError;

/// Top-level error for embedding callers. The taxonomy matters operationally:
/// configuration problems are fatal at startup, validation and calculation
/// problems are fatal only to the one record that raised them, and store or
/// import failures surface from the admin paths.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("calculation error: {0}")]
    Calculation(#[from] CalculationError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("import error: {0}")]
    Import(#[from] ImportError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl From<ScoreError> for EngineError {
    fn from(value: ScoreError) -> Self {
        match value {
            ScoreError::Validation(err) => Self::Validation(err),
            ScoreError::Calculation(err) => Self::Calculation(err),
        }
    }
}
