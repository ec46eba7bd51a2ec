use crate::config::PackagingTable;

use super::CalculationError;

/// Packaging cost from the price-tiered table. Tiers are half-open ranges,
/// so a price sitting exactly on a boundary takes the higher tier. The table
/// is validated at startup; a price below every floor means the table was
/// bypassed and is reported as a calculation error.
pub fn packaging_cost(price: f64, table: &PackagingTable) -> Result<f64, CalculationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(CalculationError::MalformedNumber {
            context: "packaging price",
            value: price,
        });
    }
    table
        .cost_for(price)
        .ok_or(CalculationError::MalformedNumber {
            context: "packaging tier lookup",
            value: price,
        })
}
