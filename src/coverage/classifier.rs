//! First-match coverage classification.

use geo_types::Point;
use tracing::debug;

use super::strategy::{run_guarded, strategies_for, MatchMethod};
use super::CoverageResult;
use crate::models::{NormalizedFeature, QueryPoint};

/// Service radius around point sites, in kilometers
pub const SITE_RADIUS_KM: f64 = 4.0;

/// Coverage classifier.
///
/// Scans features in order and reports the first one that covers the query
/// point. Features are never mutated; repaired shapes only live for the
/// duration of a single test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    /// Point features cover everything within this geodesic distance (meters)
    pub site_radius_m: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_radius_km(SITE_RADIUS_KM)
    }
}

impl Classifier {
    pub fn with_radius_km(site_radius_km: f64) -> Self {
        Self {
            site_radius_m: site_radius_km * 1000.0,
        }
    }

    /// Find the first feature covering `point`
    pub fn classify<'a>(
        &self,
        point: QueryPoint,
        features: &'a [NormalizedFeature],
    ) -> CoverageResult<'a> {
        let target = point.to_point();

        for (index, feature) in features.iter().enumerate() {
            if let Some(method) = self.evaluate(target, feature) {
                debug!(
                    "({}, {}) covered by feature #{} ({}) via {}",
                    point.lon,
                    point.lat,
                    index,
                    feature.geometry.kind(),
                    method
                );
                return CoverageResult::matched(index, feature, method);
            }
        }

        debug!(
            "({}, {}) not covered by any of {} features",
            point.lon,
            point.lat,
            features.len()
        );
        CoverageResult::uncovered()
    }

    /// Run the strategies for one feature; `None` if none of them hit
    pub fn evaluate(&self, point: Point<f64>, feature: &NormalizedFeature) -> Option<MatchMethod> {
        strategies_for(&feature.geometry)
            .iter()
            .find_map(|(method, strategy)| {
                match run_guarded(*strategy, self, point, &feature.geometry) {
                    Ok(true) => Some(*method),
                    Ok(false) => None,
                    Err(e) => {
                        debug!(
                            "{} strategy failed for {} feature from {}: {}",
                            method,
                            feature.geometry.kind(),
                            feature.source_file().unwrap_or("unknown"),
                            e
                        );
                        None
                    }
                }
            })
    }
}

/// Classify with the default 4 km site radius
pub fn classify(point: QueryPoint, features: &[NormalizedFeature]) -> CoverageResult<'_> {
    Classifier::default().classify(point, features)
}
