//! SQL text for the PostGIS queries.
//!
//! Table and schema names come from the catalogue, so they are quoted rather
//! than bound.

use parc_core::schema::GEOMETRY_SOURCE_COLUMN;

use crate::source::PointAnchor;

pub(super) const LIST_TABLES: &str = "SELECT table_name::text \
     FROM information_schema.tables \
     WHERE table_schema = $1 \
     ORDER BY table_name";

pub(super) const TABLE_COLUMNS: &str = "SELECT column_name::text, data_type::text \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

/// Quote an SQL identifier, doubling embedded quotes.
///
/// # Examples
/// ```
/// use parc_data::postgres::quote_ident;
///
/// assert_eq!(quote_ident("trails"), r#""trails""#);
/// assert_eq!(quote_ident(r#"odd"name"#), r#""odd""name""#);
/// ```
#[must_use]
pub fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Schema-qualified, quoted relation name.
#[must_use]
pub fn relation(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

/// Query returning each row as JSON plus WGS84 coordinates of its anchor.
#[must_use]
pub fn point_query(schema: &str, table: &str, anchor: PointAnchor) -> String {
    let column = format!("src.{}", quote_ident(GEOMETRY_SOURCE_COLUMN));
    let position = match anchor {
        PointAnchor::Point => column,
        PointAnchor::Centroid => format!("ST_Centroid({column})"),
    };
    format!(
        "SELECT to_jsonb(t) - '{GEOMETRY_SOURCE_COLUMN}' AS record FROM (\
         SELECT src.*, \
         ST_Y(ST_Transform({position}, 4326)) AS gis_latitude, \
         ST_X(ST_Transform({position}, 4326)) AS gis_longitude \
         FROM {} AS src) AS t",
        relation(schema, table)
    )
}

/// Query returning each row as JSON with its geometry as GeoJSON, reprojected
/// to WGS84 by PostGIS whatever the stored spatial reference.
#[must_use]
pub fn line_query(schema: &str, table: &str) -> String {
    let column = format!("src.{}", quote_ident(GEOMETRY_SOURCE_COLUMN));
    format!(
        "SELECT to_jsonb(src) - '{GEOMETRY_SOURCE_COLUMN}' AS record, \
         ST_AsGeoJSON(ST_Transform({column}, 4326)) AS geometry \
         FROM {} AS src",
        relation(schema, table)
    )
}
