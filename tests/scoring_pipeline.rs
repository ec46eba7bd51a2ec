//! Integration specifications for the listing scoring pipeline: ingest with
//! VIN deduplication, tiered matching, landed-cost calculation, and profit
//! categorization exercised end to end through the public facade.

mod common {
    use autoprofit::config::ScoringConfig;
    use autoprofit::domain::{Appraisal, Coordinates, Listing};
    use autoprofit::geo::StaticGeocoder;
    use autoprofit::scoring::ScoringPipeline;

    pub(super) const DESTINATION: Coordinates = Coordinates {
        lat: 40.117802,
        lon: -83.135870,
    };

    pub(super) fn config() -> ScoringConfig {
        let mut config = ScoringConfig::default();
        config.shipping.destination = Some(DESTINATION);
        config.valuation_year = 2024;
        config
    }

    pub(super) fn pipeline() -> ScoringPipeline<StaticGeocoder> {
        pipeline_with(config())
    }

    pub(super) fn pipeline_with(config: ScoringConfig) -> ScoringPipeline<StaticGeocoder> {
        let geocoder = StaticGeocoder::new([(
            "33101".to_string(),
            Coordinates {
                lat: 25.7617,
                lon: -80.1918,
            },
        )]);
        ScoringPipeline::new(config, geocoder).expect("valid config")
    }

    pub(super) fn listing(vin: Option<&str>, price: f64) -> Listing {
        Listing {
            vin: vin.map(str::to_string),
            year: 2019,
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            trim: Some("SE".to_string()),
            price: Some(price),
            mileage: Some(30_000.0),
            coords: Some(DESTINATION),
            zip: None,
            phone: None,
        }
    }

    pub(super) fn appraisal(
        year: i32,
        make: &str,
        model: &str,
        trim: Option<&str>,
        benchmark_price: f64,
        avg_mileage: Option<u32>,
    ) -> Appraisal {
        Appraisal {
            year,
            make: make.to_string(),
            model: model.to_string(),
            trim: trim.map(str::to_string),
            benchmark_price,
            avg_mileage,
            notes: None,
        }
    }
}

use std::sync::Arc;

use autoprofit::domain::{
    Category, FailureKind, MatchTier, FLAG_NO_BENCHMARK, FLAG_NO_COORDS,
};
use autoprofit::store::{BenchmarkStore, InMemoryBenchmarkStore, ListingLedger};

use common::*;

#[tokio::test]
async fn tier_precedence_selects_ymmt_when_all_tiers_qualify() {
    let benchmarks = vec![
        // Fuzzy candidate: close but not exact.
        appraisal(2019, "Toyota", "Camryy", Some("SE"), 23_000.0, Some(30_000)),
        // YMM candidate: trim differs.
        appraisal(2019, "Toyota", "Camry", Some("XLE"), 23_500.0, Some(30_000)),
        // YMMT exact candidate.
        appraisal(2019, "toyota", "camry", Some("se"), 24_000.0, Some(30_000)),
    ];

    let result = pipeline()
        .score(&listing(Some("4T1B11HK5KU000001"), 18_000.0), &benchmarks)
        .await
        .expect("scores");

    assert_eq!(result.tier, MatchTier::Ymmt);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(
        result.appraisal.expect("matched").benchmark_price,
        24_000.0
    );
}

#[tokio::test]
async fn empty_benchmark_collection_scores_every_listing_unknown() {
    let results = pipeline()
        .score_all(
            vec![
                listing(Some("VIN000000000000A1"), 18_000.0),
                listing(None, 22_000.0),
            ],
            Arc::new(Vec::new()),
        )
        .await;

    assert_eq!(results.len(), 2);
    for result in results {
        assert_eq!(result.tier, MatchTier::None);
        assert_eq!(result.category, Category::Unknown);
        assert!(result.has_flag(FLAG_NO_BENCHMARK));
        assert!(result.failure.is_none());
    }
}

#[tokio::test]
async fn unresolved_coordinates_yield_flagged_zero_shipping() {
    let mut raw = listing(None, 18_000.0);
    raw.coords = None;
    raw.zip = Some("99999".to_string()); // unknown to the geocoder

    let benchmarks = vec![appraisal(
        2019,
        "Toyota",
        "Camry",
        Some("SE"),
        24_000.0,
        Some(30_000),
    )];
    let result = pipeline().score(&raw, &benchmarks).await.expect("scores");

    assert!(result.has_flag(FLAG_NO_COORDS));
    let costs = result.costs.expect("costs present");
    assert_eq!(costs.shipping, 0.0);
    assert_eq!(costs.shipping_miles, None);
}

#[tokio::test]
async fn zip_geocoding_feeds_the_shipping_estimate() {
    let mut raw = listing(None, 18_000.0);
    raw.coords = None;
    raw.zip = Some("33101".to_string()); // Miami, roughly 1,000 miles out

    let result = pipeline().score(&raw, &[]).await.expect("scores");

    assert!(!result.has_flag(FLAG_NO_COORDS));
    let costs = result.costs.expect("costs present");
    let miles = costs.shipping_miles.expect("miles recorded");
    assert!(miles > 900.0 && miles < 1_100.0, "got {miles}");
    assert_eq!(costs.shipping, (miles * 0.80).ceil());
}

#[tokio::test]
async fn margin_boundaries_land_in_the_documented_categories() {
    // Fixed cost base: shipping 0 (listing at destination), recon 1,300,
    // packaging 800, no depreciation (listing sits at the benchmark average
    // and valuation year matches the model year).
    let mut config = config();
    config.valuation_year = 2019;
    let pipeline = pipeline_with(config);

    let benchmarks = vec![appraisal(
        2019,
        "Toyota",
        "Camry",
        Some("SE"),
        30_000.0,
        Some(30_000),
    )];

    // 30,000 - price - 2,100 = margin * 300.
    for (price, expected) in [
        (25_800.0, Category::Profitable), // exactly 7.0%
        (25_800.3, Category::Maybe),      // 6.999%
        (26_100.3, Category::Unknown),    // 5.999%
    ] {
        let result = pipeline
            .score(&listing(None, price), &benchmarks)
            .await
            .expect("scores");
        let margin = result.margin_percent.expect("margin computed");
        assert_eq!(
            result.category, expected,
            "price {price} produced margin {margin}"
        );
    }

    let exact = pipeline
        .score(&listing(None, 25_800.0), &benchmarks)
        .await
        .expect("scores");
    assert_eq!(exact.margin_percent, Some(7.0));
}

#[tokio::test]
async fn reingesting_a_vin_updates_in_place_with_one_result() {
    let store = InMemoryBenchmarkStore::new(vec![appraisal(
        2019,
        "Toyota",
        "Camry",
        Some("SE"),
        24_000.0,
        Some(30_000),
    )]);
    let pipeline = pipeline();
    let mut ledger = ListingLedger::new();

    let benchmark_count = store.list_all().len();
    let vin = "4T1B11HK5KU000001";

    let first = ledger.ingest(listing(Some(vin), 18_000.0));
    let result = pipeline
        .score(ledger.listing(first).expect("stored"), &store.snapshot())
        .await
        .expect("scores");
    ledger.record_result(first, result).expect("records");

    // Same VIN again at a new price: update, not duplicate.
    let second = ledger.ingest(listing(Some(vin), 17_500.0));
    assert_eq!(first, second);
    assert_eq!(ledger.len(), 1);

    let rescored = pipeline
        .score(ledger.listing(second).expect("stored"), &store.snapshot())
        .await
        .expect("scores");
    ledger.record_result(second, rescored).expect("records");

    assert_eq!(ledger.results().count(), 1);
    assert_eq!(store.list_all().len(), benchmark_count);
}

#[tokio::test]
async fn bulk_replace_concurrent_with_scoring_uses_a_coherent_snapshot() {
    let store = InMemoryBenchmarkStore::new(vec![appraisal(
        2019,
        "Toyota",
        "Camry",
        Some("SE"),
        24_000.0,
        Some(30_000),
    )]);

    let snapshot = store.snapshot();
    // Admin wipes the collection while a score is mid-flight.
    store.replace_all(Vec::new());

    let result = pipeline()
        .score(&listing(None, 18_000.0), &snapshot)
        .await
        .expect("scores");

    // The in-flight score still saw the pre-replace world.
    assert_eq!(result.tier, MatchTier::Ymmt);
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn csv_import_feeds_the_benchmark_store() {
    let csv = "\
Year,Make,Model,Trim,Benchmark Price,Avg Mileage,Notes
2019,Toyota,Camry,SE,24000,30000,
2019,Toyota,Camry,XLE,25500,28000,
";
    let appraisals = autoprofit::import::parse_appraisals(csv.as_bytes()).expect("parses");
    let store = InMemoryBenchmarkStore::new(Vec::new());
    store.replace_all(appraisals);

    let result = pipeline()
        .score(&listing(None, 18_000.0), &store.snapshot())
        .await
        .expect("scores");
    assert_eq!(result.tier, MatchTier::Ymmt);
    assert_eq!(result.appraisal.expect("matched").benchmark_price, 24_000.0);
}

#[tokio::test]
async fn batch_failures_are_marked_without_aborting_siblings() {
    let mut bad = listing(Some("VIN000000000000B2"), 18_000.0);
    bad.mileage = None;

    let results = pipeline()
        .score_all(
            vec![listing(Some("VIN000000000000A1"), 18_000.0), bad],
            Arc::new(vec![appraisal(
                2019,
                "Toyota",
                "Camry",
                Some("SE"),
                24_000.0,
                Some(30_000),
            )]),
        )
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].failure.is_none());
    assert_eq!(results[0].tier, MatchTier::Ymmt);

    let failure = results[1].failure.as_ref().expect("failure marker");
    assert_eq!(failure.kind, FailureKind::Validation);
    assert!(failure.message.contains("mileage"));
    assert!(results[1].costs.is_none());
}
