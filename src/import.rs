//! Bulk appraisal import from the admin CSV upload. Parses and validates
//! rows; feeding them into a [`BenchmarkStore`](crate::store::BenchmarkStore)
//! via `replace_all` or `upsert` is the caller's choice.

use std::io::Read;

use serde::{Deserialize, Deserializer};

use crate::domain::Appraisal;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("appraisal csv is malformed: {0}")]
    Csv(#[from] csv::Error),
    #[error("appraisal row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

/// Parse an appraisal CSV. Header names match the admin template; fields are
/// whitespace-trimmed and blank trims collapse to `None`.
pub fn parse_appraisals<R: Read>(reader: R) -> Result<Vec<Appraisal>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut appraisals = Vec::new();

    for (index, record) in csv_reader.deserialize::<AppraisalRow>().enumerate() {
        // Row numbers are 1-based and skip the header.
        let row = index + 2;
        let parsed = record?;
        appraisals.push(parsed.into_appraisal(row)?);
    }

    Ok(appraisals)
}

#[derive(Debug, Deserialize)]
struct AppraisalRow {
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Make")]
    make: String,
    #[serde(rename = "Model")]
    model: String,
    #[serde(rename = "Trim", default, deserialize_with = "empty_string_as_none")]
    trim: Option<String>,
    #[serde(rename = "Benchmark Price")]
    benchmark_price: f64,
    #[serde(rename = "Avg Mileage", default)]
    avg_mileage: Option<u32>,
    #[serde(rename = "Notes", default, deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

impl AppraisalRow {
    fn into_appraisal(self, row: usize) -> Result<Appraisal, ImportError> {
        if self.make.is_empty() || self.model.is_empty() {
            return Err(ImportError::InvalidRow {
                row,
                reason: "make and model are required".to_string(),
            });
        }
        if !self.benchmark_price.is_finite() || self.benchmark_price <= 0.0 {
            return Err(ImportError::InvalidRow {
                row,
                reason: format!("benchmark price {} must be positive", self.benchmark_price),
            });
        }

        Ok(Appraisal {
            year: self.year,
            make: self.make,
            model: self.model,
            trim: self.trim,
            benchmark_price: self.benchmark_price,
            avg_mileage: self.avg_mileage,
            notes: self.notes,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
