//! Great-circle distance plus the geocoding seam. Real zip resolution lives
//! behind the [`Geocoder`] trait so the pipeline never couples to a specific
//! provider; the area-code table gives a coarse last-resort position when a
//! listing only carries a seller phone number.

use std::collections::HashMap;
use std::future::Future;

use crate::domain::Coordinates;

/// Spherical-earth radius used by the shipping estimate.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Haversine great-circle distance in miles, inputs in degrees.
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Zip-to-coordinates lookup treated as unreliable I/O. Implementations may
/// call out over the network; the pipeline wraps every call in a timeout and
/// treats a miss or timeout identically (shipping falls back to a flagged
/// zero, never an error).
pub trait Geocoder: Send + Sync {
    fn resolve(&self, zip: &str) -> impl Future<Output = Option<Coordinates>> + Send;
}

/// Geocoder that never resolves; useful when shipping should always fall
/// back to the flagged zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGeocoder;

impl Geocoder for NullGeocoder {
    fn resolve(&self, _zip: &str) -> impl Future<Output = Option<Coordinates>> + Send {
        std::future::ready(None)
    }
}

/// In-memory zip table, primarily for tests and offline runs.
#[derive(Debug, Default, Clone)]
pub struct StaticGeocoder {
    table: HashMap<String, Coordinates>,
}

impl StaticGeocoder {
    pub fn new(entries: impl IntoIterator<Item = (String, Coordinates)>) -> Self {
        Self {
            table: entries.into_iter().collect(),
        }
    }
}

impl Geocoder for StaticGeocoder {
    fn resolve(&self, zip: &str) -> impl Future<Output = Option<Coordinates>> + Send {
        std::future::ready(self.table.get(zip).copied())
    }
}

/// Pull a three-digit US area code out of a phone number in any common
/// format (3802275839, (380) 227-5839, +1 380-227-5839, ...).
pub fn area_code_from_phone(phone: &str) -> Option<&str> {
    let digits: Vec<(usize, char)> = phone
        .char_indices()
        .filter(|(_, ch)| ch.is_ascii_digit())
        .collect();

    let start = match digits.len() {
        10 => 0,
        11 if digits[0].1 == '1' => 1,
        _ => return None,
    };

    let (first, _) = digits[start];
    let (last, _) = digits[start + 2];
    let slice = &phone[first..=last];
    // Only usable when the three digits are contiguous in the source string.
    slice.chars().all(|ch| ch.is_ascii_digit()).then_some(slice)
}

/// Approximate centroid for a US area code. Intentionally coarse: shipping
/// estimated from an area code is better than no estimate at all.
pub fn area_code_coordinates(area_code: &str) -> Option<Coordinates> {
    let (lat, lon) = match area_code {
        "212" | "646" | "917" => (40.7128, -74.0060),  // New York City
        "213" | "323" => (34.0522, -118.2437),         // Los Angeles
        "214" | "972" => (32.7767, -96.7970),          // Dallas
        "305" => (25.7617, -80.1918),                  // Miami
        "312" | "773" => (41.8781, -87.6298),          // Chicago
        "380" | "614" => (39.9612, -82.9988),          // Columbus
        "404" => (33.7490, -84.3880),                  // Atlanta
        "415" => (37.7749, -122.4194),                 // San Francisco
        "480" | "602" => (33.4484, -112.0740),         // Phoenix
        "503" | "971" => (45.5152, -122.6784),         // Portland
        "512" => (30.2672, -97.7431),                  // Austin
        "617" => (42.3601, -71.0589),                  // Boston
        "702" => (36.1699, -115.1398),                 // Las Vegas
        "713" | "832" => (29.7604, -95.3698),          // Houston
        "720" | "303" => (39.7392, -104.9903),         // Denver
        "206" => (47.6062, -122.3321),                 // Seattle
        "313" | "947" => (42.3314, -83.0458),          // Detroit
        "615" => (36.1627, -86.7816),                  // Nashville
        "704" | "980" => (35.2271, -80.8431),          // Charlotte
        "813" => (27.9506, -82.4572),                  // Tampa
        "816" => (39.0997, -94.5786),                  // Kansas City
        "954" => (26.1224, -80.1373),                  // Fort Lauderdale
        _ => return None,
    };
    Some(Coordinates { lat, lon })
}
