//! Feature records: decoder hand-off, normalized features and query points.

use geo_types::Point;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

use super::geometry::{null_as_empty, Geometry2D, RawGeometry};

/// Property key identifying which map file a feature came from
pub const SOURCE_FILE_KEY: &str = "source_file";

/// Attribute record attached to a decoded geometry.
///
/// Cloning shares the underlying map; every leaf flattened out of one
/// source geometry points at the same record. Treat it as read-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap(Arc<Map<String, Value>>);

impl PropertyMap {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(Arc::new(map))
    }

    /// Build a record carrying the `source_file` provenance tag
    pub fn with_source_file(mut map: Map<String, Value>, source_file: &str) -> Self {
        map.insert(
            SOURCE_FILE_KEY.to_string(),
            Value::String(source_file.to_string()),
        );
        Self::new(map)
    }

    /// Copy of this record with `source_file` set
    pub fn tagged(&self, source_file: &str) -> Self {
        Self::with_source_file(self.0.as_ref().clone(), source_file)
    }

    pub fn source_file(&self) -> Option<&str> {
        self.0.get(SOURCE_FILE_KEY).and_then(Value::as_str)
    }

    /// True when both handles point at the same record
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl Deref for PropertyMap {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Map<String, Value>> for PropertyMap {
    fn from(map: Map<String, Value>) -> Self {
        Self::new(map)
    }
}

impl Serialize for PropertyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PropertyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::new)
    }
}

/// One decoded feature, GeoJSON-shaped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: PropertyMap,
}

impl RawFeature {
    pub fn new(geometry: RawGeometry, properties: PropertyMap) -> Self {
        Self {
            geometry: Some(geometry),
            properties,
        }
    }
}

/// A decoded map file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeatureCollection {
    #[serde(default, deserialize_with = "skip_unreadable")]
    pub features: Vec<RawFeature>,
}

/// Decode features one at a time; an entry that does not decode (unknown
/// geometry type, wrong coordinate nesting) is dropped instead of failing
/// the whole file.
fn skip_unreadable<'de, D>(deserializer: D) -> Result<Vec<RawFeature>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Vec<Value> = null_as_empty(deserializer)?;
    let total = entries.len();

    let features: Vec<RawFeature> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(feature) => Some(feature),
            Err(e) => {
                debug!("Skipping unreadable feature #{}: {}", index, e);
                None
            }
        })
        .collect();

    if features.len() < total {
        debug!("Kept {} of {} features", features.len(), total);
    }
    Ok(features)
}

impl RawFeatureCollection {
    /// Attach the `source_file` tag to every feature
    pub fn tag_source(&mut self, source_file: &str) {
        for feature in &mut self.features {
            feature.properties = feature.properties.tagged(source_file);
        }
    }
}

/// A flat 2D feature ready for coverage checks
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeature {
    pub geometry: Geometry2D,
    pub properties: PropertyMap,
}

impl NormalizedFeature {
    pub fn source_file(&self) -> Option<&str> {
        self.properties.source_file()
    }
}

/// Serializes as a GeoJSON `Feature`
impl Serialize for NormalizedFeature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", "Feature")?;
        map.serialize_entry("geometry", &RawGeometry::from(&self.geometry))?;
        map.serialize_entry("properties", &self.properties)?;
        map.end()
    }
}

/// Location to test for coverage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub lon: f64,
    pub lat: f64,
}

impl QueryPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}
