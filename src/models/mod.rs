//! Core data models for coverage checks.

pub mod feature;
pub mod geometry;

pub use feature::{
    NormalizedFeature, PropertyMap, QueryPoint, RawFeature, RawFeatureCollection, SOURCE_FILE_KEY,
};
pub use geometry::{Geometry2D, RawCoord, RawGeometry};
