//! Hand-off from an address geocoder.
//!
//! The geocoder itself lives outside this crate; it only has to implement
//! [`Geocoder`]. [`assess`] turns its answer into one of the three outcomes a
//! user sees: address not found, found but not covered, covered.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::coverage::{Classifier, CoverageSummary, FeatureSet};
use crate::models::QueryPoint;

/// Best match for a free-text address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPoint {
    pub lon: f64,
    pub lat: f64,
    /// Display name reported by the geocoder
    pub label: String,
}

impl GeocodedPoint {
    pub fn new(lon: f64, lat: f64, label: impl Into<String>) -> Self {
        Self {
            lon,
            lat,
            label: label.into(),
        }
    }

    pub fn query_point(&self) -> QueryPoint {
        QueryPoint::new(self.lon, self.lat)
    }
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
    #[error("geocoder returned invalid coordinates ({lon}, {lat})")]
    InvalidCoordinates { lon: f64, lat: f64 },
}

/// Address lookup returning zero or one best location
pub trait Geocoder {
    fn locate(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError>;
}

/// User-facing result of a coverage check
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoverageOutcome {
    AddressNotFound,
    NotCovered {
        location: GeocodedPoint,
    },
    Covered {
        location: GeocodedPoint,
        coverage: CoverageSummary,
    },
}

impl CoverageOutcome {
    pub fn is_covered(&self) -> bool {
        matches!(self, CoverageOutcome::Covered { .. })
    }
}

/// Coverage outcome together with what it was checked against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    /// Distinct `source_file` tags of the loaded set, in load order
    pub loaded_files: Vec<String>,
    pub total_features: usize,
    #[serde(flatten)]
    pub outcome: CoverageOutcome,
}

impl CheckReport {
    pub fn new(outcome: CoverageOutcome, features: &FeatureSet) -> Self {
        Self {
            loaded_files: features.source_files().into_iter().map(str::to_string).collect(),
            total_features: features.len(),
            outcome,
        }
    }
}

/// Classify an already geocoded location
pub fn assess(
    located: Option<GeocodedPoint>,
    features: &FeatureSet,
    classifier: &Classifier,
) -> CoverageOutcome {
    let Some(location) = located else {
        return CoverageOutcome::AddressNotFound;
    };

    let result = features.classify_with(classifier, location.query_point());
    if result.covered {
        CoverageOutcome::Covered {
            coverage: result.summary(),
            location,
        }
    } else {
        CoverageOutcome::NotCovered { location }
    }
}

/// Geocode `address` and classify the result
pub fn check_address(
    geocoder: &dyn Geocoder,
    address: &str,
    features: &FeatureSet,
    classifier: &Classifier,
) -> Result<CoverageOutcome, GeocodeError> {
    let located = geocoder.locate(address)?;

    if let Some(point) = &located {
        if !point.lon.is_finite() || !point.lat.is_finite() {
            return Err(GeocodeError::InvalidCoordinates {
                lon: point.lon,
                lat: point.lat,
            });
        }
        debug!("Geocoded '{}' to {} ({}, {})", address, point.label, point.lon, point.lat);
    }

    let outcome = assess(located, features, classifier);
    info!(
        "Coverage check for '{}': {}",
        address,
        match &outcome {
            CoverageOutcome::AddressNotFound => "address not found",
            CoverageOutcome::NotCovered { .. } => "not covered",
            CoverageOutcome::Covered { .. } => "covered",
        }
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PropertyMap, RawFeature, RawGeometry};
    use serde_json::{json, Map};
    use std::collections::HashMap;

    struct FixedGeocoder(HashMap<&'static str, GeocodedPoint>);

    impl Geocoder for FixedGeocoder {
        fn locate(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError> {
            if query == "offline" {
                return Err(GeocodeError::Unavailable("connection refused".to_string()));
            }
            Ok(self.0.get(query).cloned())
        }
    }

    fn geocoder() -> FixedGeocoder {
        let mut known = HashMap::new();
        known.insert("Hospital", GeocodedPoint::new(0.5, 0.5, "Hospital, Centro"));
        known.insert("Farm", GeocodedPoint::new(20.0, 20.0, "Farm Road"));
        known.insert("Broken", GeocodedPoint::new(f64::NAN, 1.0, "Broken"));
        FixedGeocoder(known)
    }

    fn features() -> FeatureSet {
        FeatureSet::from_raw(&[RawFeature::new(
            RawGeometry::Polygon {
                coordinates: vec![vec![
                    vec![0.0, 0.0],
                    vec![0.0, 1.0],
                    vec![1.0, 1.0],
                    vec![1.0, 0.0],
                    vec![0.0, 0.0],
                ]],
            },
            PropertyMap::with_source_file(Map::new(), "centro.kmz"),
        )])
    }

    #[test]
    fn test_three_outcomes() {
        let features = features();
        let classifier = Classifier::default();
        let geocoder = geocoder();

        let covered = check_address(&geocoder, "Hospital", &features, &classifier).unwrap();
        assert!(covered.is_covered());

        let not_covered = check_address(&geocoder, "Farm", &features, &classifier).unwrap();
        assert_eq!(
            not_covered,
            CoverageOutcome::NotCovered {
                location: GeocodedPoint::new(20.0, 20.0, "Farm Road")
            }
        );

        let missing = check_address(&geocoder, "Nowhere", &features, &classifier).unwrap();
        assert_eq!(missing, CoverageOutcome::AddressNotFound);
    }

    #[test]
    fn test_geocoder_errors_propagate() {
        let features = features();
        let classifier = Classifier::default();

        assert!(matches!(
            check_address(&geocoder(), "offline", &features, &classifier),
            Err(GeocodeError::Unavailable(_))
        ));
        assert!(matches!(
            check_address(&geocoder(), "Broken", &features, &classifier),
            Err(GeocodeError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_outcome_json() {
        let outcome = assess(
            Some(GeocodedPoint::new(0.5, 0.5, "Hospital")),
            &features(),
            &Classifier::default(),
        );
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["status"], json!("covered"));
        assert_eq!(value["location"]["label"], json!("Hospital"));
        assert_eq!(value["coverage"]["source_file"], json!("centro.kmz"));
        assert_eq!(value["coverage"]["match_method"], json!("rewind_test"));

        let missing = serde_json::to_value(CoverageOutcome::AddressNotFound).unwrap();
        assert_eq!(missing, json!({ "status": "address_not_found" }));
    }

    #[test]
    fn test_report_lists_loaded_maps() {
        let mut raw = vec![RawFeature::new(
            RawGeometry::Point {
                coordinates: vec![30.0, 30.0],
            },
            PropertyMap::with_source_file(Map::new(), "sites.kml"),
        )];
        raw.extend(
            features()
                .iter()
                .map(|f| RawFeature::new(RawGeometry::from(&f.geometry), f.properties.clone())),
        );
        let features = FeatureSet::from_raw(&raw);

        let outcome = assess(
            Some(GeocodedPoint::new(0.5, 0.5, "Hospital")),
            &features,
            &Classifier::default(),
        );
        let report = CheckReport::new(outcome, &features);
        assert_eq!(report.loaded_files, vec!["sites.kml", "centro.kmz"]);
        assert_eq!(report.total_features, 2);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["loaded_files"], json!(["sites.kml", "centro.kmz"]));
        assert_eq!(value["total_features"], json!(2));
        assert_eq!(value["status"], json!("covered"));
        assert_eq!(value["coverage"]["source_file"], json!("centro.kmz"));
    }

    #[test]
    fn test_report_on_empty_set() {
        let report = CheckReport::new(CoverageOutcome::AddressNotFound, &FeatureSet::default());
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({ "loaded_files": [], "total_features": 0, "status": "address_not_found" })
        );
    }
}
