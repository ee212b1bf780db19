//! Core domain model for the BC Parks asset publishing pipeline.
//!
//! Raw rows read from the CityWide database arrive as [`RecordTable`] and
//! [`SpatialTable`] values. The [`transform`] module cleans them into
//! [`FeatureTable`]s in WGS84, and [`geojson`] turns those into the documents
//! uploaded to the portal. Nothing in this crate performs IO.

pub mod geojson;
pub mod quality;
pub mod schema;
mod table;
pub mod transform;
mod value;

#[doc(hidden)]
pub mod test_support;

pub use geojson::{FeatureCollection, GeoJsonError};
pub use schema::is_published_category;
pub use table::{FeatureRow, FeatureTable, Record, RecordTable, SpatialRecord, SpatialTable};
pub use transform::{TransformError, transform_assets, transform_trails};
pub use value::{ColumnKind, Value};
