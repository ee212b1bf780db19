//! The seam between the readers and the spatial database.

use async_trait::async_trait;
use parc_core::{ColumnKind, GeoJsonError};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// A JSON object holding one row, as produced by `to_jsonb`.
pub type JsonRecord = Map<String, JsonValue>;

/// Name and catalogue type of a source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    /// Column name.
    pub name: String,
    /// Storage class derived from `information_schema.columns.data_type`.
    pub kind: ColumnKind,
}

impl TableColumn {
    /// Build a column from its catalogue description.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: &str) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::from_data_type(data_type),
        }
    }
}

/// How an asset table's position is derived from its geometry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointAnchor {
    /// The geometry is already a point.
    Point,
    /// Linear or areal geometry, represented by its centroid.
    Centroid,
}

/// A trail row: attributes and its geometry as WGS84 GeoJSON text.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRow {
    /// Attributes without the geometry column.
    pub record: JsonRecord,
    /// `ST_AsGeoJSON` output after reprojection, absent for null geometries.
    pub geometry: Option<String>,
}

/// Errors raised while reading from the spatial database.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A query failed.
    #[error("query against {relation} failed")]
    Query {
        /// Schema-qualified relation the query targeted.
        relation: String,
        /// Driver error.
        #[source]
        source: sqlx::Error,
    },
    /// A row was not a JSON object.
    #[error("row from {relation} is not a JSON object")]
    MalformedRow {
        /// Schema-qualified relation the row came from.
        relation: String,
    },
    /// A geometry could not be decoded.
    #[error("invalid geometry in {relation}")]
    Geometry {
        /// Schema-qualified relation the geometry came from.
        relation: String,
        /// Decoder error.
        #[source]
        source: GeoJsonError,
    },
}

/// Read access to the spatial tables the pipeline consumes.
///
/// Implementations hold the live connection, hence `&mut self`.
#[async_trait(?Send)]
pub trait SpatialSource {
    /// Names of the base tables in `schema`.
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>, SourceError>;

    /// Columns of `schema.table` in ordinal order.
    async fn table_columns(
        &mut self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<TableColumn>, SourceError>;

    /// Every row of `schema.table` without its geometry column, plus
    /// `gis_latitude` and `gis_longitude` computed in WGS84 from `anchor`.
    async fn fetch_points(
        &mut self,
        schema: &str,
        table: &str,
        anchor: PointAnchor,
    ) -> Result<Vec<JsonRecord>, SourceError>;

    /// Every row of `schema.table` with its line geometry.
    async fn fetch_lines(&mut self, schema: &str, table: &str) -> Result<Vec<LineRow>, SourceError>;
}
