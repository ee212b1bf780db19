//! Facade crate for the BC Parks asset publishing pipeline.
//!
//! This crate re-exports the domain model and cleaning transforms, and exposes
//! the database and portal adapters behind the `data` feature.

#![forbid(unsafe_code)]

pub use parc_core::{
    FeatureCollection, FeatureRow, FeatureTable, GeoJsonError, Record, RecordTable,
    SpatialRecord, SpatialTable, TransformError, Value, transform_assets, transform_trails,
};

#[cfg(feature = "data")]
pub use parc_data::{
    ArcGisPortal, Database, DatabaseCredentials, LayerTarget, PortalCredentials, PublishError,
    Publisher, Secret, SourceError, SpatialSource, read_assets, read_point_assets, read_trails,
};
