//! Common types and enums for mappicker-rs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude
    pub latitude: f64,
    /// Longitude
    pub longitude: f64,
}

impl Coordinate {
    /// Tokyo Station, used when no saved or device location is available.
    pub const TOKYO_STATION: Coordinate = Coordinate {
        latitude: 35.68084,
        longitude: 139.767009,
    };

    /// Create a new coordinate.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether this coordinate can be shown on a map.
    ///
    /// A zero component is what an unset record field looks like, so it is
    /// treated as "no location".
    pub fn is_set(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude != 0.0
            && self.longitude != 0.0
    }

    /// Round both components to `places` decimal places.
    pub fn rounded(&self, places: i32) -> Self {
        let factor = 10f64.powi(places);
        let round = |value: f64| {
            let scaled = value * factor;
            // Past 2^52 every f64 is already an integer at this scale.
            if scaled.abs() >= 4_503_599_627_370_496.0 {
                value
            } else {
                scaled.round() / factor
            }
        };
        Self {
            latitude: round(self.latitude),
            longitude: round(self.longitude),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Coarseness tier of an address fragment, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificityLevel {
    /// The complete normalized input
    Full,
    /// Building number within a lot (号)
    Go,
    /// Lot number (番地)
    Banchi,
    /// Numbered block of a town (丁目)
    Chome,
    /// Town or district
    Town,
    /// City, ward, town or village
    City,
    /// Prefecture
    Prefecture,
    /// No administrative segment could be recognised
    Unknown,
}

impl SpecificityLevel {
    /// Levels that fallback queries are built from, most specific first.
    pub const FALLBACK_ORDER: [SpecificityLevel; 6] = [
        SpecificityLevel::Go,
        SpecificityLevel::Banchi,
        SpecificityLevel::Chome,
        SpecificityLevel::Town,
        SpecificityLevel::City,
        SpecificityLevel::Prefecture,
    ];

    /// Stable identifier used in logs and serialized outcomes.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecificityLevel::Full => "full",
            SpecificityLevel::Go => "go",
            SpecificityLevel::Banchi => "banchi",
            SpecificityLevel::Chome => "chome",
            SpecificityLevel::Town => "town",
            SpecificityLevel::City => "city",
            SpecificityLevel::Prefecture => "prefecture",
            SpecificityLevel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SpecificityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map zoom level chosen for each specificity tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomPolicy {
    /// Zoom when the full input matched
    pub full: u8,
    /// Zoom when a query ending in 号 matched
    pub go: u8,
    /// Zoom when a query ending in 番地 matched
    pub banchi: u8,
    /// Zoom when a query ending in 丁目 matched
    pub chome: u8,
    /// Zoom when a query ending in the town matched
    pub town: u8,
    /// Zoom when a query ending in the city matched
    pub city: u8,
    /// Zoom when only the prefecture matched
    pub prefecture: u8,
    /// Zoom when no segment was recognised
    pub fallback: u8,
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        Self {
            full: 19,
            go: 19,
            banchi: 18,
            chome: 17,
            town: 16,
            city: 13,
            prefecture: 10,
            fallback: 15,
        }
    }
}

impl ZoomPolicy {
    /// Zoom level for a matched specificity.
    pub fn zoom_for(&self, level: SpecificityLevel) -> u8 {
        match level {
            SpecificityLevel::Full => self.full,
            SpecificityLevel::Go => self.go,
            SpecificityLevel::Banchi => self.banchi,
            SpecificityLevel::Chome => self.chome,
            SpecificityLevel::Town => self.town,
            SpecificityLevel::City => self.city,
            SpecificityLevel::Prefecture => self.prefecture,
            SpecificityLevel::Unknown => self.fallback,
        }
    }
}

/// A single candidate returned by the geocoding provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Resolved position
    pub coordinate: Coordinate,
    /// Provider's label for the match, if any
    pub display_name: Option<String>,
}

/// One query the resolver will try, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAttempt {
    /// Text sent to the provider
    pub query: String,
    /// Finest segment the query was built from
    pub specificity: SpecificityLevel,
    /// Zoom to apply if this attempt matches
    pub zoom: u8,
}

/// Final answer of one `resolve` call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Whether any attempt matched
    pub matched: bool,
    /// Position of the match
    pub coordinate: Option<Coordinate>,
    /// Query that produced the match
    pub matched_query: Option<String>,
    /// Specificity of the matching query
    pub specificity: Option<SpecificityLevel>,
    /// Zoom hint for the map view
    pub zoom: Option<u8>,
    /// Number of geocode calls dispatched
    pub attempts: usize,
}

impl ResolutionOutcome {
    /// An unmatched outcome after `attempts` calls.
    pub fn not_found(attempts: usize) -> Self {
        Self {
            attempts,
            ..Self::default()
        }
    }

    /// A matched outcome.
    pub fn found(
        result: GeocodeResult,
        attempt: &SearchAttempt,
        attempts: usize,
    ) -> Self {
        Self {
            matched: true,
            coordinate: Some(result.coordinate),
            matched_query: Some(attempt.query.clone()),
            specificity: Some(attempt.specificity),
            zoom: Some(attempt.zoom),
            attempts,
        }
    }
}

/// Payload published whenever the selected coordinate changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationChange {
    /// Latitude
    pub latitude: f64,
    /// Longitude
    pub longitude: f64,
}

impl From<Coordinate> for LocationChange {
    fn from(coordinate: Coordinate) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_policy_tiers_are_monotonic() {
        let policy = ZoomPolicy::default();
        let zooms: Vec<u8> = SpecificityLevel::FALLBACK_ORDER
            .iter()
            .map(|level| policy.zoom_for(*level))
            .collect();
        assert!(zooms.windows(2).all(|pair| pair[0] >= pair[1]));
        assert_eq!(policy.zoom_for(SpecificityLevel::Full), 19);
        assert_eq!(policy.zoom_for(SpecificityLevel::Unknown), 15);
    }

    #[test]
    fn test_coordinate_is_set() {
        assert!(Coordinate::TOKYO_STATION.is_set());
        assert!(!Coordinate::new(0.0, 139.7).is_set());
        assert!(!Coordinate::new(f64::NAN, 139.7).is_set());
    }

    #[test]
    fn test_coordinate_rounding() {
        let c = Coordinate::new(35.123456789, 139.987654321).rounded(4);
        assert_eq!(c, Coordinate::new(35.1235, 139.9877));
    }

    #[test]
    fn test_specificity_serializes_snake_case() {
        let json = serde_json::to_string(&SpecificityLevel::Banchi).unwrap();
        assert_eq!(json, "\"banchi\"");
        assert_eq!(SpecificityLevel::Prefecture.to_string(), "prefecture");
    }
}
