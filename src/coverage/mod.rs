//! Coverage classification.
//!
//! Decides whether a point is served by any of the loaded features, using a
//! layered fallback per geometry kind so malformed map data still answers.

mod classifier;
mod result;
mod session;
pub mod strategy;

pub use classifier::{classify, Classifier, SITE_RADIUS_KM};
pub use result::{CoverageResult, CoverageSummary};
pub use session::{CoverageSession, FeatureSet};
pub use strategy::{strategies_for, MatchMethod, Strategy, StrategyError};
