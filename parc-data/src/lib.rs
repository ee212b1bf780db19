//! Adapters between the pipeline and its two external systems.
//!
//! [`postgres`] reads the CityWide PostGIS database through the
//! [`source::SpatialSource`] seam and [`reader`] assembles the raw asset and
//! trail tables from it. [`portal`] maintains the hosted feature layers on an
//! ArcGIS portal.

pub mod credentials;
pub mod portal;
pub mod postgres;
pub mod reader;
pub mod source;

#[doc(hidden)]
pub mod test_support;

pub use credentials::{DatabaseCredentials, PortalCredentials, Secret};
pub use portal::{ArcGisPortal, LayerTarget, PublishError, Publisher};
pub use postgres::Database;
pub use reader::{read_assets, read_point_assets, read_trails};
pub use source::{SourceError, SpatialSource};
