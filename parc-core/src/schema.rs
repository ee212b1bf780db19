//! Column mappings and reference data for the published datasets.

use geo::{Rect, coord};

/// Source geometry column present in every asset table.
pub const GEOMETRY_SOURCE_COLUMN: &str = "wkb_geometry";

/// Derived latitude column computed by the asset reader.
pub const LATITUDE_SOURCE_COLUMN: &str = "gis_latitude";

/// Derived longitude column computed by the asset reader.
pub const LONGITUDE_SOURCE_COLUMN: &str = "gis_longitude";

/// Source column holding the asset category.
pub const CATEGORY_SOURCE_COLUMN: &str = "asset_category";

/// Output name of the geometry column.
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Asset source keys and their output column names, in output order.
pub const ASSET_COLUMNS: [(&str, &str); 13] = [
    ("assetid", "Asset ID"),
    ("gisid", "GIS ID"),
    ("park", "Park"),
    ("park_subarea", "Park Subarea"),
    ("asset_category", "Category - Classification"),
    ("asset_type", "Segment - Sub Classification"),
    ("description", "Description"),
    ("campsite_number", "Campsite Number"),
    ("name", "Name"),
    ("accessible", "acs Is Asset Accessible"),
    ("route_accessible", "acs Is the Route to the Asset Accessible"),
    ("gis_latitude", "GIS Latitude"),
    ("gis_longitude", "GIS Longitude"),
];

/// Trail source keys and their output column names, in output order.
///
/// The geometry column is handled separately and is not listed here.
pub const TRAIL_COLUMNS: [(&str, &str); 14] = [
    ("assetid", "Asset ID"),
    ("gisid", "GIS ID"),
    ("asset_category", "Category - Classification"),
    ("asset_type", "Asset Type"),
    ("park", "Park"),
    ("park_subarea", "Park Subarea"),
    ("trail_surface", "Trail Surface"),
    ("length_m", "Length Meters"),
    ("trail_name", "Trail Name"),
    ("osmid", "OSM ID"),
    ("description", "Description"),
    ("verified_by", "Verified By"),
    ("accessible", "Is Accessible"),
    ("route_accessible", "Is Route Accessible"),
];

/// Asset categories retained by the asset transformer.
pub const ASSET_CATEGORIES: [&str; 14] = [
    "Grounds",
    "Furniture and Amenities",
    "Signs",
    "Water Service",
    "Transportation",
    "Stormwater",
    "Bridges",
    "Structures",
    "Trails",
    "Buildings",
    "Electrical Telcomm Service",
    "Wastewater Service",
    "Water Management",
    "Fuel Storage",
];

/// Schema holding the asset tables.
pub const ASSET_SCHEMA: &str = "assets";

/// Tables in [`ASSET_SCHEMA`] that never carry asset rows.
pub const EXCLUDED_ASSET_TABLES: [&str; 1] = ["qgis_projects"];

/// Linear or areal asset tables whose position is taken from the centroid.
pub const CENTROID_TABLES: [&str; 2] = ["trails", "roads"];

/// Table holding trail line work.
pub const TRAIL_TABLE: &str = "trails";

/// Minimum and maximum latitude of the British Columbia bounding box.
pub const BC_LATITUDE: (f64, f64) = (47.0, 60.0);

/// Minimum and maximum longitude of the British Columbia bounding box.
pub const BC_LONGITUDE: (f64, f64) = (-145.0, -113.0);

/// Bounding box of British Columbia in WGS84 (x = longitude, y = latitude).
///
/// Used with `geo::Intersects`, which treats the edges as inside.
#[must_use]
pub fn bc_bounds() -> Rect<f64> {
    Rect::new(
        coord! { x: BC_LONGITUDE.0, y: BC_LATITUDE.0 },
        coord! { x: BC_LONGITUDE.1, y: BC_LATITUDE.1 },
    )
}

/// Report whether a category belongs to the published allow-list.
///
/// # Examples
/// ```
/// use parc_core::is_published_category;
///
/// assert!(is_published_category("Signs"));
/// assert!(!is_published_category("Parking"));
/// assert!(!is_published_category("signs"));
/// ```
#[must_use]
pub fn is_published_category(category: &str) -> bool {
    ASSET_CATEGORIES.contains(&category)
}

/// Output column names of a mapping, in order.
#[must_use]
pub fn output_columns(mapping: &[(&str, &str)]) -> Vec<String> {
    mapping.iter().map(|(_, output)| (*output).to_owned()).collect()
}
