//! Token-level string similarity shared by the matcher's fuzzy tier and the
//! depreciation trim lookup. Scores are on a 0–100 scale so configuration
//! thresholds read the same way the business rules were written.

use strsim::normalized_levenshtein;

/// Drivetrain designations that appear inconsistently between listings and
/// appraisals; stripped from trims before comparison.
const DRIVETRAIN_TOKENS: [&str; 6] = ["4MATIC", "XDRIVE", "AWD", "RWD", "FWD", "QUATTRO"];

/// Uppercase, strip punctuation to spaces, collapse runs of whitespace.
pub fn normalize_token(value: &str) -> String {
    let mut cleaned = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            cleaned.extend(ch.to_uppercase());
        } else {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical trim with drivetrain tokens removed.
pub fn normalize_trim(trim: &str) -> String {
    normalize_token(trim)
        .split_whitespace()
        .filter(|token| !DRIVETRAIN_TOKENS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the (YMMT, YMM) comparison keys for a vehicle identity.
///
/// The exact match tiers compare these canonicalized keys rather than raw
/// strings, so they intentionally share the fuzzy tier's normalization
/// (casing, punctuation, drivetrain tokens) and two spellings of the same
/// trim collapse before any tier runs.
pub fn comparison_keys(year: i32, make: &str, model: &str, trim: Option<&str>) -> (String, String) {
    let make = normalize_token(make);
    let model = normalize_token(model);
    let trim = trim.map(normalize_trim).unwrap_or_default();

    let ymm = format!("{year} {make} {model}").trim().to_string();
    let ymmt = if trim.is_empty() {
        ymm.clone()
    } else {
        format!("{ymm} {trim}")
    };
    (ymmt, ymm)
}

/// Token-sort ratio: order-insensitive similarity between two strings,
/// 0.0–100.0. Both sides are normalized, tokenized, sorted, and rejoined
/// before a normalized Levenshtein comparison.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let sorted_a = sorted_tokens(a);
    let sorted_b = sorted_tokens(b);
    if sorted_a.is_empty() && sorted_b.is_empty() {
        return 100.0;
    }
    normalized_levenshtein(&sorted_a, &sorted_b) * 100.0
}

fn sorted_tokens(value: &str) -> String {
    let normalized = normalize_token(value);
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
