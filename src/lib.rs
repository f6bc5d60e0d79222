//! Canopy - network coverage checks against map features
//!
//! Normalizes decoded map geometry into flat 2D features and decides whether
//! a location is covered by any of them.

pub mod config;
pub mod coverage;
pub mod geocode;
pub mod models;
pub mod normalize;

pub use coverage::{classify, Classifier, CoverageResult, CoverageSession, FeatureSet, MatchMethod};
pub use models::{Geometry2D, NormalizedFeature, PropertyMap, QueryPoint, RawFeature, RawGeometry};
pub use normalize::normalize;
