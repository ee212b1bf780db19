//! GeoJSON (RFC 7946) document model and conversions to and from `geo`.
//!
//! Only the subset the pipeline exchanges is modelled: feature collections
//! of features whose geometry is one of the six coordinate-bearing geometry
//! types. Positions are written as `[longitude, latitude]`; a third ordinate
//! is accepted on input and discarded.

use geo::{
    Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
    Geometry as GeoGeometry,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::{FeatureTable, Value};

/// A GeoJSON position.
pub type Position = Vec<f64>;

/// Errors raised while encoding or decoding GeoJSON.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    /// The document is not valid JSON or does not match the GeoJSON model.
    #[error("invalid GeoJSON document")]
    Json {
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The geometry kind has no GeoJSON coordinate representation here.
    #[error("{kind} geometries cannot be written as GeoJSON")]
    UnsupportedGeometry {
        /// Name of the rejected geometry kind.
        kind: &'static str,
    },
    /// A position carried fewer than two ordinates.
    #[error("GeoJSON position has {len} ordinates; at least 2 are required")]
    InvalidPosition {
        /// Number of ordinates found.
        len: usize,
    },
    /// A boundary document contained no polygonal geometry.
    #[error("GeoJSON document contains no polygons")]
    NoPolygons,
}

impl From<serde_json::Error> for GeoJsonError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}

/// Coordinate-bearing GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// Single position.
    Point(Position),
    /// Unconnected positions.
    MultiPoint(Vec<Position>),
    /// Connected positions.
    LineString(Vec<Position>),
    /// Several lines.
    MultiLineString(Vec<Vec<Position>>),
    /// Exterior ring followed by interior rings.
    Polygon(Vec<Vec<Position>>),
    /// Several polygons.
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    /// Attribute values in column order.
    #[serde(default)]
    pub properties: Map<String, JsonValue>,
    /// Feature geometry; `null` when absent.
    pub geometry: Option<Geometry>,
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    /// Member features.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Convert a feature table into a collection ready for upload.
    ///
    /// Missing values and the literal text `None` become empty strings,
    /// timestamps are written as ISO-8601 text and non-finite floats become
    /// empty strings.
    ///
    /// # Errors
    ///
    /// Returns [`GeoJsonError::UnsupportedGeometry`] when a row holds a
    /// geometry kind that GeoJSON coordinates cannot express.
    pub fn from_table(table: &FeatureTable) -> Result<Self, GeoJsonError> {
        let features = table
            .rows()
            .iter()
            .map(|row| {
                let properties = table
                    .columns()
                    .iter()
                    .zip(&row.values)
                    .map(|(column, value)| (column.clone(), property_value(value)))
                    .collect();
                let geometry = row.geometry.as_ref().map(Geometry::try_from).transpose()?;
                Ok::<_, GeoJsonError>(Feature {
                    properties,
                    geometry,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { features })
    }

    /// Serialise the collection to compact JSON bytes.
    ///
    /// # Errors
    ///
    /// Propagates serialiser failures as [`GeoJsonError::Json`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, GeoJsonError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a collection from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GeoJsonError::Json`] for malformed documents.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, GeoJsonError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Report whether the collection has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Render a cell as a GeoJSON property value.
///
/// # Examples
/// ```
/// use parc_core::{Value, geojson::property_value};
/// use serde_json::json;
///
/// assert_eq!(property_value(&Value::Null), json!(""));
/// assert_eq!(property_value(&Value::from("None")), json!(""));
/// assert_eq!(property_value(&Value::Float(f64::NAN)), json!(""));
/// assert_eq!(property_value(&Value::Int(4)), json!(4));
/// ```
#[must_use]
pub fn property_value(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::String(String::new()),
        Value::Text(text) if text == "None" => JsonValue::String(String::new()),
        Value::Text(text) => JsonValue::String(text.clone()),
        Value::Bool(flag) => JsonValue::Bool(*flag),
        Value::Int(number) => JsonValue::from(*number),
        Value::Float(number) => serde_json::Number::from_f64(*number)
            .map_or_else(|| JsonValue::String(String::new()), JsonValue::Number),
        Value::Timestamp(_) | Value::Date(_) | Value::Json(_) => JsonValue::String(value.to_string()),
    }
}

/// Parse a bare GeoJSON geometry, as returned by `ST_AsGeoJSON`.
///
/// # Errors
///
/// Returns [`GeoJsonError::Json`] for malformed text and
/// [`GeoJsonError::InvalidPosition`] for short positions.
pub fn parse_geometry(text: &str) -> Result<GeoGeometry<f64>, GeoJsonError> {
    let geometry: Geometry = serde_json::from_str(text)?;
    GeoGeometry::try_from(geometry)
}

/// Collect every polygon of a boundary document.
///
/// Accepts a feature collection, a single feature or a bare geometry.
///
/// # Errors
///
/// Returns [`GeoJsonError::NoPolygons`] when nothing polygonal is found, or
/// a decoding error for malformed input.
pub fn polygons_from_slice(bytes: &[u8]) -> Result<MultiPolygon<f64>, GeoJsonError> {
    let document: JsonValue = serde_json::from_slice(bytes)?;
    let geometries: Vec<Geometry> = match document.get("type").and_then(JsonValue::as_str) {
        Some("FeatureCollection") => serde_json::from_value::<FeatureCollection>(document)?
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .collect(),
        Some("Feature") => serde_json::from_value::<Feature>(document)?
            .geometry
            .into_iter()
            .collect(),
        _ => vec![serde_json::from_value(document)?],
    };

    let mut polygons = Vec::new();
    for geometry in geometries {
        match GeoGeometry::try_from(geometry)? {
            GeoGeometry::Polygon(polygon) => polygons.push(polygon),
            GeoGeometry::MultiPolygon(multi) => polygons.extend(multi),
            _ => {}
        }
    }
    if polygons.is_empty() {
        return Err(GeoJsonError::NoPolygons);
    }
    Ok(MultiPolygon::new(polygons))
}

fn position(coord: Coord<f64>) -> Position {
    vec![coord.x, coord.y]
}

fn positions(line: &LineString<f64>) -> Vec<Position> {
    line.coords().copied().map(position).collect()
}

fn rings(polygon: &Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(positions)
        .collect()
}

impl TryFrom<&GeoGeometry<f64>> for Geometry {
    type Error = GeoJsonError;

    fn try_from(geometry: &GeoGeometry<f64>) -> Result<Self, Self::Error> {
        Ok(match geometry {
            GeoGeometry::Point(point) => Self::Point(position(point.0)),
            GeoGeometry::MultiPoint(points) => {
                Self::MultiPoint(points.iter().map(|point| position(point.0)).collect())
            }
            GeoGeometry::Line(line) => Self::LineString(vec![position(line.start), position(line.end)]),
            GeoGeometry::LineString(line) => Self::LineString(positions(line)),
            GeoGeometry::MultiLineString(lines) => {
                Self::MultiLineString(lines.iter().map(positions).collect())
            }
            GeoGeometry::Polygon(polygon) => Self::Polygon(rings(polygon)),
            GeoGeometry::MultiPolygon(polygons) => {
                Self::MultiPolygon(polygons.iter().map(rings).collect())
            }
            GeoGeometry::Rect(rect) => Self::Polygon(rings(&rect.to_polygon())),
            GeoGeometry::Triangle(triangle) => Self::Polygon(rings(&triangle.to_polygon())),
            GeoGeometry::GeometryCollection(_) => {
                return Err(GeoJsonError::UnsupportedGeometry {
                    kind: "GeometryCollection",
                });
            }
        })
    }
}

fn coord(position: &[f64]) -> Result<Coord<f64>, GeoJsonError> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(GeoJsonError::InvalidPosition {
            len: position.len(),
        }),
    }
}

fn line(positions: &[Position]) -> Result<LineString<f64>, GeoJsonError> {
    positions
        .iter()
        .map(|position| coord(position))
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<Polygon<f64>, GeoJsonError> {
    let mut lines = rings.iter().map(|ring| line(ring));
    let exterior = lines.next().transpose()?.unwrap_or_else(|| LineString::new(Vec::new()));
    let interiors = lines.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

impl TryFrom<Geometry> for GeoGeometry<f64> {
    type Error = GeoJsonError;

    fn try_from(geometry: Geometry) -> Result<Self, Self::Error> {
        Ok(match geometry {
            Geometry::Point(position) => Self::Point(Point(coord(&position)?)),
            Geometry::MultiPoint(positions) => Self::MultiPoint(MultiPoint::new(
                positions
                    .iter()
                    .map(|position| coord(position).map(Point))
                    .collect::<Result<_, _>>()?,
            )),
            Geometry::LineString(positions) => Self::LineString(line(&positions)?),
            Geometry::MultiLineString(lines) => Self::MultiLineString(MultiLineString::new(
                lines
                    .iter()
                    .map(|positions| line(positions))
                    .collect::<Result<_, _>>()?,
            )),
            Geometry::Polygon(rings) => Self::Polygon(polygon(&rings)?),
            Geometry::MultiPolygon(polygons) => Self::MultiPolygon(MultiPolygon::new(
                polygons
                    .iter()
                    .map(|rings| polygon(rings))
                    .collect::<Result<_, _>>()?,
            )),
        })
    }
}
