//! Geometry vocabulary shared by the normalizer and the classifier.
//!
//! `RawGeometry` mirrors what a map-file decoder hands over (GeoJSON-shaped,
//! possibly nested, possibly carrying altitude). `Geometry2D` is the closed,
//! flat, two-dimensional set the classifier dispatches on.

use geo_types::{Coord, LineString, MultiLineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Deserializer, Serialize};

/// A decoded coordinate: `[lon, lat]` or `[lon, lat, alt]`.
pub type RawCoord = Vec<f64>;

/// Geometry as produced by the feature decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawGeometry {
    Point {
        #[serde(default, deserialize_with = "null_as_empty")]
        coordinates: RawCoord,
    },
    LineString {
        #[serde(default, deserialize_with = "null_as_empty")]
        coordinates: Vec<RawCoord>,
    },
    Polygon {
        #[serde(default, deserialize_with = "null_as_empty")]
        coordinates: Vec<Vec<RawCoord>>,
    },
    MultiPolygon {
        #[serde(default, deserialize_with = "null_as_empty")]
        coordinates: Vec<Vec<Vec<RawCoord>>>,
    },
    MultiLineString {
        #[serde(default, deserialize_with = "null_as_empty")]
        coordinates: Vec<Vec<RawCoord>>,
    },
    GeometryCollection {
        #[serde(default, deserialize_with = "null_as_empty")]
        geometries: Vec<RawGeometry>,
    },
}

impl RawGeometry {
    /// GeoJSON type name
    pub fn kind(&self) -> &'static str {
        match self {
            RawGeometry::Point { .. } => "Point",
            RawGeometry::LineString { .. } => "LineString",
            RawGeometry::Polygon { .. } => "Polygon",
            RawGeometry::MultiPolygon { .. } => "MultiPolygon",
            RawGeometry::MultiLineString { .. } => "MultiLineString",
            RawGeometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }
}

/// Deserialize `null` the same way as a missing field.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single, flat, two-dimensional geometry.
///
/// There is no collection variant: collections are flattened
/// away during normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry2D {
    Point(Point<f64>),
    LineString(LineString<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
    MultiLineString(MultiLineString<f64>),
}

impl Geometry2D {
    /// GeoJSON type name, used when reporting a match
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry2D::Point(_) => "Point",
            Geometry2D::LineString(_) => "LineString",
            Geometry2D::Polygon(_) => "Polygon",
            Geometry2D::MultiPolygon(_) => "MultiPolygon",
            Geometry2D::MultiLineString(_) => "MultiLineString",
        }
    }
}

fn raw_coord(c: &Coord<f64>) -> RawCoord {
    vec![c.x, c.y]
}

fn raw_line(line: &LineString<f64>) -> Vec<RawCoord> {
    line.coords().map(raw_coord).collect()
}

fn raw_rings(polygon: &Polygon<f64>) -> Vec<Vec<RawCoord>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(raw_line)
        .collect()
}

impl From<&Geometry2D> for RawGeometry {
    fn from(geometry: &Geometry2D) -> Self {
        match geometry {
            Geometry2D::Point(p) => RawGeometry::Point {
                coordinates: raw_coord(&p.0),
            },
            Geometry2D::LineString(line) => RawGeometry::LineString {
                coordinates: raw_line(line),
            },
            Geometry2D::Polygon(polygon) => RawGeometry::Polygon {
                coordinates: raw_rings(polygon),
            },
            Geometry2D::MultiPolygon(polygons) => RawGeometry::MultiPolygon {
                coordinates: polygons.iter().map(raw_rings).collect(),
            },
            Geometry2D::MultiLineString(lines) => RawGeometry::MultiLineString {
                coordinates: lines.iter().map(raw_line).collect(),
            },
        }
    }
}
