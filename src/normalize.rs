//! Flattens decoded geometry into 2D single-geometry features.
//!
//! Geometry collections are descended recursively and every leaf inherits
//! the properties of the feature it came from. Altitude is dropped. Empty
//! geometries and coordinates with fewer than two components are skipped.

use geo_types::{Coord, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use tracing::debug;

use crate::models::{Geometry2D, NormalizedFeature, PropertyMap, RawCoord, RawFeature, RawGeometry};

/// Normalize `(geometry, properties)` pairs, preserving input order.
pub fn normalize<'a, I>(sources: I) -> Vec<NormalizedFeature>
where
    I: IntoIterator<Item = (&'a RawGeometry, &'a PropertyMap)>,
{
    let mut flat = Vec::new();
    let mut source_count = 0usize;

    for (geometry, properties) in sources {
        source_count += 1;
        flatten(geometry, properties, &mut flat);
    }

    debug!(
        "Normalized {} source geometries into {} features",
        source_count,
        flat.len()
    );

    flat
}

/// Normalize decoded features; features without geometry are skipped.
pub fn normalize_features(features: &[RawFeature]) -> Vec<NormalizedFeature> {
    normalize(
        features
            .iter()
            .filter_map(|f| f.geometry.as_ref().map(|g| (g, &f.properties))),
    )
}

fn flatten(geometry: &RawGeometry, properties: &PropertyMap, out: &mut Vec<NormalizedFeature>) {
    if let RawGeometry::GeometryCollection { geometries } = geometry {
        for child in geometries {
            flatten(child, properties, out);
        }
        return;
    }

    match to_2d(geometry) {
        Some(geometry) => out.push(NormalizedFeature {
            geometry,
            properties: properties.clone(),
        }),
        None => debug!("Skipping empty {} geometry", geometry.kind()),
    }
}

/// Convert a leaf geometry, or `None` if nothing usable is left.
pub fn to_2d(geometry: &RawGeometry) -> Option<Geometry2D> {
    match geometry {
        RawGeometry::Point { coordinates } => coord(coordinates).map(|c| Geometry2D::Point(Point(c))),
        RawGeometry::LineString { coordinates } => line(coordinates).map(Geometry2D::LineString),
        RawGeometry::Polygon { coordinates } => polygon(coordinates).map(Geometry2D::Polygon),
        RawGeometry::MultiPolygon { coordinates } => {
            let polygons: Vec<Polygon<f64>> =
                coordinates.iter().filter_map(|rings| polygon(rings)).collect();
            non_empty(polygons).map(|p| Geometry2D::MultiPolygon(MultiPolygon::new(p)))
        }
        RawGeometry::MultiLineString { coordinates } => {
            let lines: Vec<LineString<f64>> =
                coordinates.iter().filter_map(|l| line(l)).collect();
            non_empty(lines).map(|l| Geometry2D::MultiLineString(MultiLineString::new(l)))
        }
        RawGeometry::GeometryCollection { .. } => None,
    }
}

/// Keep the first two components: `[lon, lat, alt] -> (lon, lat)`
fn coord(raw: &RawCoord) -> Option<Coord<f64>> {
    match raw.as_slice() {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    }
}

fn line(raw: &[RawCoord]) -> Option<LineString<f64>> {
    let coords: Vec<Coord<f64>> = raw.iter().filter_map(coord).collect();
    non_empty(coords).map(LineString::new)
}

/// First ring is the exterior; a polygon without one is dropped.
fn polygon(rings: &[Vec<RawCoord>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    let exterior = line(exterior)?;
    let interiors = interiors.iter().filter_map(|ring| line(ring)).collect();
    Some(Polygon::new(exterior, interiors))
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
