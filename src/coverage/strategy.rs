//! Per-geometry containment strategies.
//!
//! Each geometry kind maps to an ordered list of strategies. The classifier
//! tries them in order and stops at the first one reporting a hit. A strategy
//! that errors or panics counts as a miss.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use geo::orient::{Direction, Orient};
use geo::{Area, BooleanOps, Buffer, CoordsIter, Distance, Haversine, Intersects};
use geo_types::{LineString, MultiLineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Classifier;
use crate::models::Geometry2D;

/// Which strategy produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Point-in-polygon after normalizing ring winding
    RewindTest,
    /// Point-in-polygon against a zero-width buffer of the polygon
    BufferRepair,
    /// Closed line treated as a polygon boundary
    LineToPolygon,
    /// Within the site radius of a point feature
    Radius,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMethod::RewindTest => write!(f, "rewind_test"),
            MatchMethod::BufferRepair => write!(f, "buffer_repair"),
            MatchMethod::LineToPolygon => write!(f, "line_to_polygon"),
            MatchMethod::Radius => write!(f, "radius"),
        }
    }
}

/// Why a strategy could not decide containment
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("line is not closed and cannot bound a polygon")]
    OpenLine,
    #[error("degenerate geometry: {0}")]
    Degenerate(&'static str),
    #[error("buffer repair produced no polygons")]
    EmptyRepair,
    #[error("{0} geometry is not handled by this strategy")]
    Unsupported(&'static str),
    #[error("strategy panicked: {0}")]
    Panicked(String),
}

/// Slack on the site radius so a point placed exactly on it is not lost to rounding
const DISTANCE_TOLERANCE_M: f64 = 1e-6;

/// A containment test: `Ok(true)` is a hit
pub type Strategy = fn(&Classifier, Point<f64>, &Geometry2D) -> Result<bool, StrategyError>;

const AREA_STRATEGIES: &[(MatchMethod, Strategy)] = &[
    (MatchMethod::RewindTest, rewound_contains as Strategy),
    (MatchMethod::BufferRepair, buffered_contains as Strategy),
];

const LINE_STRATEGIES: &[(MatchMethod, Strategy)] =
    &[(MatchMethod::LineToPolygon, enclosed_by_line as Strategy)];

const SITE_STRATEGIES: &[(MatchMethod, Strategy)] =
    &[(MatchMethod::Radius, within_site_radius as Strategy)];

/// Ordered strategies for a geometry kind
pub fn strategies_for(geometry: &Geometry2D) -> &'static [(MatchMethod, Strategy)] {
    match geometry {
        Geometry2D::Polygon(_) | Geometry2D::MultiPolygon(_) => AREA_STRATEGIES,
        Geometry2D::LineString(_) | Geometry2D::MultiLineString(_) => LINE_STRATEGIES,
        Geometry2D::Point(_) => SITE_STRATEGIES,
    }
}

/// Run a strategy, turning a panic into `StrategyError::Panicked`
pub(crate) fn run_guarded(
    strategy: Strategy,
    classifier: &Classifier,
    point: Point<f64>,
    geometry: &Geometry2D,
) -> Result<bool, StrategyError> {
    panic::catch_unwind(AssertUnwindSafe(|| strategy(classifier, point, geometry)))
        .unwrap_or_else(|payload| Err(StrategyError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn ensure_finite(geometry: &Geometry2D) -> Result<(), StrategyError> {
    let finite = match geometry {
        Geometry2D::Point(g) => all_finite(g),
        Geometry2D::LineString(g) => all_finite(g),
        Geometry2D::Polygon(g) => all_finite(g),
        Geometry2D::MultiPolygon(g) => all_finite(g),
        Geometry2D::MultiLineString(g) => all_finite(g),
    };
    if finite {
        Ok(())
    } else {
        Err(StrategyError::Degenerate("non-finite coordinate"))
    }
}

fn all_finite<G>(geometry: &G) -> bool
where
    G: CoordsIter<Scalar = f64>,
{
    geometry
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Re-orient rings (exterior counter-clockwise, holes clockwise) on a copy,
/// then test containment. Points on the boundary count as inside.
pub fn rewound_contains(
    _: &Classifier,
    point: Point<f64>,
    geometry: &Geometry2D,
) -> Result<bool, StrategyError> {
    ensure_finite(geometry)?;
    match geometry {
        Geometry2D::Polygon(polygon) => Ok(polygon.orient(Direction::Default).intersects(&point)),
        Geometry2D::MultiPolygon(polygons) => {
            Ok(polygons.orient(Direction::Default).intersects(&point))
        }
        other => Err(StrategyError::Unsupported(other.kind())),
    }
}

/// Repair the stored (not rewound) polygon and test every resulting piece.
///
/// Rings are first resolved with even-odd filling, which splits a
/// self-intersecting ring into its lobes, then buffered by zero.
pub fn buffered_contains(
    _: &Classifier,
    point: Point<f64>,
    geometry: &Geometry2D,
) -> Result<bool, StrategyError> {
    ensure_finite(geometry)?;
    let repaired = match geometry {
        Geometry2D::Polygon(polygon) if polygon.exterior().0.len() < 4 => {
            return Err(StrategyError::Degenerate("exterior ring has fewer than four positions"));
        }
        Geometry2D::Polygon(polygon) => zero_buffer(polygon),
        Geometry2D::MultiPolygon(polygons) => zero_buffer(polygons),
        other => return Err(StrategyError::Unsupported(other.kind())),
    };

    if repaired.0.is_empty() {
        return Err(StrategyError::EmptyRepair);
    }

    let hit = repaired.iter().any(|piece| piece.intersects(&point));
    Ok(hit)
}

fn zero_buffer<G>(geometry: &G) -> MultiPolygon<f64>
where
    G: BooleanOps<Scalar = f64>,
{
    let resolved = geometry.union(&MultiPolygon::<f64>::new(vec![]));
    let buffered = resolved.buffer(0.0);
    if buffered.0.is_empty() {
        resolved
    } else {
        buffered
    }
}

/// Interpret a closed line (or set of closed lines) as a polygon boundary.
pub fn enclosed_by_line(
    _: &Classifier,
    point: Point<f64>,
    geometry: &Geometry2D,
) -> Result<bool, StrategyError> {
    ensure_finite(geometry)?;
    let polygon = match geometry {
        Geometry2D::LineString(line) => Polygon::new(closed_ring(line)?, vec![]),
        Geometry2D::MultiLineString(lines) => polygon_from_lines(lines)?,
        other => return Err(StrategyError::Unsupported(other.kind())),
    };
    Ok(polygon.intersects(&point))
}

fn closed_ring(line: &LineString<f64>) -> Result<LineString<f64>, StrategyError> {
    if !line.is_closed() {
        return Err(StrategyError::OpenLine);
    }
    if line.0.len() < 4 {
        return Err(StrategyError::Degenerate("ring needs at least four positions"));
    }
    Ok(line.clone())
}

/// Largest ring becomes the exterior, the rest become holes.
fn polygon_from_lines(lines: &MultiLineString<f64>) -> Result<Polygon<f64>, StrategyError> {
    let mut rings = lines
        .iter()
        .map(closed_ring)
        .collect::<Result<Vec<_>, _>>()?;

    if rings.is_empty() {
        return Err(StrategyError::Degenerate("no member lines"));
    }

    rings.sort_by(|a, b| ring_area(b).total_cmp(&ring_area(a)));
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn ring_area(ring: &LineString<f64>) -> f64 {
    Polygon::new(ring.clone(), vec![]).unsigned_area()
}

/// Geodesic (haversine) distance to the site is within the service radius.
pub fn within_site_radius(
    classifier: &Classifier,
    point: Point<f64>,
    geometry: &Geometry2D,
) -> Result<bool, StrategyError> {
    match geometry {
        Geometry2D::Point(site) => {
            ensure_finite(geometry)?;
            let distance = Haversine.distance(*site, point);
            Ok(distance <= classifier.site_radius_m + DISTANCE_TOLERANCE_M)
        }
        other => Err(StrategyError::Unsupported(other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(coords: &[(f64, f64)]) -> LineString<f64> {
        LineString::from(coords.to_vec())
    }

    #[test]
    fn test_strategy_order() {
        let polygon = Geometry2D::Polygon(Polygon::new(
            ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        ));
        let methods: Vec<MatchMethod> = strategies_for(&polygon).iter().map(|(m, _)| *m).collect();
        assert_eq!(methods, vec![MatchMethod::RewindTest, MatchMethod::BufferRepair]);

        let site = Geometry2D::Point(Point::new(0.0, 0.0));
        assert_eq!(strategies_for(&site).len(), 1);
        assert_eq!(strategies_for(&site)[0].0, MatchMethod::Radius);
    }

    #[test]
    fn test_rewind_respects_holes() {
        let outer = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let hole = ring(&[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)]);
        let geometry = Geometry2D::Polygon(Polygon::new(outer, vec![hole]));
        let classifier = Classifier::default();

        assert_eq!(
            rewound_contains(&classifier, Point::new(2.0, 2.0), &geometry),
            Ok(true)
        );
        assert_eq!(
            rewound_contains(&classifier, Point::new(5.0, 5.0), &geometry),
            Ok(false)
        );
    }

    #[test]
    fn test_boundary_counts_as_inside() {
        let geometry = Geometry2D::Polygon(Polygon::new(
            ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]),
            vec![],
        ));
        assert_eq!(
            rewound_contains(&Classifier::default(), Point::new(0.0, 0.5), &geometry),
            Ok(true)
        );
    }

    #[test]
    fn test_open_line_refused() {
        let geometry = Geometry2D::LineString(ring(&[(0.0, 0.0), (4.0, 0.0), (2.0, 4.0)]));
        assert_eq!(
            enclosed_by_line(&Classifier::default(), Point::new(2.0, 1.0), &geometry),
            Err(StrategyError::OpenLine)
        );
    }

    #[test]
    fn test_closed_two_point_line_is_degenerate() {
        let geometry = Geometry2D::LineString(ring(&[(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]));
        assert!(matches!(
            enclosed_by_line(&Classifier::default(), Point::new(0.5, 0.5), &geometry),
            Err(StrategyError::Degenerate(_))
        ));
    }

    #[test]
    fn test_multi_line_largest_ring_is_exterior() {
        let hole = ring(&[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0), (4.0, 4.0)]);
        let outer = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let geometry = Geometry2D::MultiLineString(MultiLineString::new(vec![hole, outer]));
        let classifier = Classifier::default();

        assert_eq!(
            enclosed_by_line(&classifier, Point::new(1.0, 1.0), &geometry),
            Ok(true)
        );
        assert_eq!(
            enclosed_by_line(&classifier, Point::new(5.0, 5.0), &geometry),
            Ok(false)
        );
    }

    #[test]
    fn test_non_finite_is_degenerate() {
        let geometry = Geometry2D::Polygon(Polygon::new(
            ring(&[(0.0, 0.0), (f64::NAN, 1.0), (1.0, 1.0), (0.0, 0.0)]),
            vec![],
        ));
        assert!(matches!(
            buffered_contains(&Classifier::default(), Point::new(0.5, 0.5), &geometry),
            Err(StrategyError::Degenerate(_))
        ));
    }

    #[test]
    fn test_repair_splits_figure_eight() {
        let geometry = Geometry2D::Polygon(Polygon::new(
            ring(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0), (0.0, 0.0)]),
            vec![],
        ));
        let classifier = Classifier::default();

        assert_eq!(
            buffered_contains(&classifier, Point::new(0.3, 1.0), &geometry),
            Ok(true)
        );
        assert_eq!(
            buffered_contains(&classifier, Point::new(1.7, 1.0), &geometry),
            Ok(true)
        );
        assert_eq!(
            buffered_contains(&classifier, Point::new(1.0, 0.3), &geometry),
            Ok(false)
        );
    }

    #[test]
    fn test_repair_keeps_ring_outside_exterior() {
        let outer = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let stray = ring(&[(3.0, 0.0), (4.0, 0.0), (4.0, 1.0), (3.0, 1.0), (3.0, 0.0)]);
        let geometry = Geometry2D::Polygon(Polygon::new(outer, vec![stray]));
        let classifier = Classifier::default();
        let query = Point::new(3.5, 0.5);

        assert_eq!(rewound_contains(&classifier, query, &geometry), Ok(false));
        assert_eq!(buffered_contains(&classifier, query, &geometry), Ok(true));
    }

    #[test]
    fn test_wrong_kind_is_unsupported() {
        let geometry = Geometry2D::Point(Point::new(0.0, 0.0));
        assert_eq!(
            rewound_contains(&Classifier::default(), Point::new(0.0, 0.0), &geometry),
            Err(StrategyError::Unsupported("Point"))
        );
    }

    #[test]
    fn test_guard_catches_panic() {
        fn exploding(_: &Classifier, _: Point<f64>, _: &Geometry2D) -> Result<bool, StrategyError> {
            panic!("bad ring")
        }

        let geometry = Geometry2D::Point(Point::new(0.0, 0.0));
        let result = run_guarded(
            exploding,
            &Classifier::default(),
            Point::new(0.0, 0.0),
            &geometry,
        );
        assert_eq!(result, Err(StrategyError::Panicked("bad ring".to_string())));
    }
}
