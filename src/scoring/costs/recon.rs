use crate::config::ReconConfig;

/// Reconditioning cost, tiered by mileage then year, evaluated in that
/// order: low-mileage vehicles get the light tier regardless of age, modern
/// vehicles the middle tier, everything else the standard tier. No
/// interpolation between tiers.
pub fn recon_cost(year: i32, mileage: u32, config: &ReconConfig) -> f64 {
    if mileage <= config.low_mileage_max {
        config.low_mileage_cost
    } else if year >= config.modern_year_min {
        config.modern_cost
    } else {
        config.standard_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;

    fn config() -> ReconConfig {
        ScoringConfig::default().recon
    }

    #[test]
    fn mileage_boundary_is_inclusive() {
        assert_eq!(recon_cost(2005, 5_000, &config()), 800.0);
        assert_eq!(recon_cost(2005, 0, &config()), 800.0);
    }

    #[test]
    fn just_over_the_mileage_boundary_falls_to_year_tiers() {
        assert_eq!(recon_cost(2012, 5_001, &config()), 1_300.0);
        assert_eq!(recon_cost(2011, 5_001, &config()), 3_000.0);
    }

    #[test]
    fn modern_year_boundary_is_inclusive() {
        assert_eq!(recon_cost(2012, 80_000, &config()), 1_300.0);
        assert_eq!(recon_cost(2011, 80_000, &config()), 3_000.0);
    }
}
