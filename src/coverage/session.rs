//! Ownership of the loaded feature set.
//!
//! A `FeatureSet` is immutable once built. `CoverageSession` swaps whole sets
//! behind an `Arc`, so a reader classifying against a snapshot sees either
//! the old set or the new one, never a mix.

use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashSet;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::info;

use super::{Classifier, CoverageResult};
use crate::models::{NormalizedFeature, QueryPoint, RawFeature};
use crate::normalize::normalize_features;

/// Normalized features from one or more loaded map files
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    features: Vec<NormalizedFeature>,
}

impl FeatureSet {
    pub fn new(features: Vec<NormalizedFeature>) -> Self {
        Self { features }
    }

    /// Normalize decoded features into a new set
    pub fn from_raw(features: &[RawFeature]) -> Self {
        Self::new(normalize_features(features))
    }

    pub fn features(&self) -> &[NormalizedFeature] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedFeature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Classify with the default site radius
    pub fn classify(&self, point: QueryPoint) -> CoverageResult<'_> {
        Classifier::default().classify(point, &self.features)
    }

    pub fn classify_with(&self, classifier: &Classifier, point: QueryPoint) -> CoverageResult<'_> {
        classifier.classify(point, &self.features)
    }

    /// Distinct `source_file` tags, in first-seen order
    pub fn source_files(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.features
            .iter()
            .filter_map(NormalizedFeature::source_file)
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

/// Serializes as a GeoJSON `FeatureCollection`, the coverage map export
impl Serialize for FeatureSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "FeatureCollection")?;
        map.serialize_entry("features", &self.features)?;
        map.end()
    }
}

/// Session holding the current feature set
#[derive(Debug, Default)]
pub struct CoverageSession {
    current: RwLock<Arc<FeatureSet>>,
}

impl CoverageSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set as of now; unaffected by later reloads
    pub fn snapshot(&self) -> Arc<FeatureSet> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Drop everything loaded so far and load `sources` instead
    pub fn replace(&self, sources: &[RawFeature]) -> Arc<FeatureSet> {
        let next = Arc::new(FeatureSet::from_raw(sources));
        info!("Loaded {} coverage features", next.len());
        self.swap(Arc::clone(&next));
        next
    }

    /// Append `sources` to the current set, publishing a new set
    pub fn extend(&self, sources: &[RawFeature]) -> Arc<FeatureSet> {
        let added = normalize_features(sources);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);

        let mut features = Vec::with_capacity(guard.len() + added.len());
        features.extend(guard.features.iter().cloned());
        features.extend(added);
        let next = Arc::new(FeatureSet::new(features));

        info!(
            "Added {} coverage features ({} total)",
            next.len() - guard.len(),
            next.len()
        );
        *guard = Arc::clone(&next);
        next
    }

    pub fn clear(&self) {
        self.swap(Arc::new(FeatureSet::default()));
    }

    fn swap(&self, next: Arc<FeatureSet>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }
}
