//! Coverage results returned to callers.

use serde::Serialize;

use super::MatchMethod;
use crate::models::{NormalizedFeature, PropertyMap};

/// Outcome of one coverage query.
///
/// Borrows into the feature set it was computed against; do not keep it
/// past a reload of that set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageResult<'a> {
    pub covered: bool,
    /// The stored feature that matched, never a repaired copy
    pub matched_feature: Option<&'a NormalizedFeature>,
    /// Position of the match in the scanned sequence
    pub matched_index: Option<usize>,
    pub match_method: Option<MatchMethod>,
}

impl<'a> CoverageResult<'a> {
    pub fn matched(index: usize, feature: &'a NormalizedFeature, method: MatchMethod) -> Self {
        Self {
            covered: true,
            matched_feature: Some(feature),
            matched_index: Some(index),
            match_method: Some(method),
        }
    }

    pub fn uncovered() -> Self {
        Self {
            covered: false,
            matched_feature: None,
            matched_index: None,
            match_method: None,
        }
    }

    /// Provenance of the matching feature, if any
    pub fn source_file(&self) -> Option<&'a str> {
        self.matched_feature.and_then(NormalizedFeature::source_file)
    }

    /// Owned, serializable view of this result
    pub fn summary(&self) -> CoverageSummary {
        CoverageSummary {
            covered: self.covered,
            source_file: self.source_file().map(str::to_string),
            details: self.matched_feature.map(|f| f.properties.clone()),
            geometry_type: self.matched_feature.map(|f| f.geometry.kind()),
            match_method: self.match_method,
        }
    }
}

/// What the presentation layer shows for a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub covered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PropertyMap>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_method: Option<MatchMethod>,
}
