//! Publishing to an ArcGIS Online / Enterprise portal.
//!
//! [`ContentPortal`] is the narrow set of REST operations the pipeline needs.
//! [`ArcGisPortal`] implements it over HTTP; [`Publisher`] drives the
//! search, delete, upload and publish sequence on top of any implementation.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use parc_data::portal::{ArcGisPortal, ArcGisPortalConfig, Publisher};
//! use parc_data::Secret;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ArcGisPortalConfig::new("https://example.maps.arcgis.com")
//!     .with_timeout(Duration::from_secs(120));
//! let portal = ArcGisPortal::with_config(config)?;
//! let mut publisher = Publisher::new(portal);
//! publisher.connect("analyst", &Secret::new("password")).await?;
//! publisher.disconnect();
//! # Ok(())
//! # }
//! ```

mod arcgis;
mod client;
mod publisher;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::credentials::Secret;

pub use client::{ArcGisPortal, ArcGisPortalConfig, DEFAULT_USER_AGENT};
pub use publisher::{
    FEATURE_SERVICE_ITEM_TYPE, GEOJSON_ITEM_TYPE, ITEM_TAG, LayerTarget, PollSettings,
    PublishError, PublishedLayer, Publisher, dataset_keyword,
};

/// An authenticated portal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Short-lived access token.
    pub token: Secret,
    /// Named user owning uploaded content.
    pub username: String,
}

/// A content item as reported by the portal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalItem {
    /// Item identifier.
    pub id: String,
    /// Item title.
    pub title: String,
    /// Item type, for example `GeoJson` or `Feature Service`.
    #[serde(rename = "type")]
    pub item_type: String,
    /// Owning user.
    #[serde(default)]
    pub owner: String,
    /// Free-form keywords attached to the item.
    #[serde(default)]
    pub type_keywords: Vec<String>,
}

/// Search for items of one type owned by one user.
///
/// Candidates match by exact title or by carrying `type_keyword`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    /// Exact item title.
    pub title: String,
    /// Owning user.
    pub owner: String,
    /// Item type.
    pub item_type: String,
    /// Stable keyword identifying the dataset.
    pub type_keyword: Option<String>,
}

impl ItemQuery {
    /// Render the portal search expression.
    ///
    /// The portal's search is fuzzy, so results must still be checked
    /// with [`ItemQuery::matches`].
    ///
    /// # Examples
    /// ```
    /// use parc_data::portal::ItemQuery;
    ///
    /// let query = ItemQuery {
    ///     title: "Trails".into(),
    ///     owner: "analyst".into(),
    ///     item_type: "GeoJson".into(),
    ///     type_keyword: None,
    /// };
    /// assert_eq!(
    ///     query.to_search_expression(),
    ///     r#"title:"Trails" AND owner:"analyst" AND type:"GeoJson""#
    /// );
    /// ```
    #[must_use]
    pub fn to_search_expression(&self) -> String {
        let title = format!("title:\"{}\"", escape(&self.title));
        let identity = match &self.type_keyword {
            Some(keyword) => format!("({title} OR typekeywords:\"{}\")", escape(keyword)),
            None => title,
        };
        format!(
            "{identity} AND owner:\"{}\" AND type:\"{}\"",
            escape(&self.owner),
            escape(&self.item_type)
        )
    }

    /// Report whether an item is an exact match.
    #[must_use]
    pub fn matches(&self, item: &PortalItem) -> bool {
        let same_identity = item.title == self.title
            || self
                .type_keyword
                .as_ref()
                .is_some_and(|keyword| item.type_keywords.contains(keyword));
        same_identity && item.owner == self.owner && item.item_type == self.item_type
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A file upload creating a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpload {
    /// Item title.
    pub title: String,
    /// Item type.
    pub item_type: String,
    /// File name presented to the portal.
    pub file_name: String,
    /// Item description.
    pub description: String,
    /// Item tags.
    pub tags: Vec<String>,
    /// Item type keywords.
    pub type_keywords: Vec<String>,
    /// File content.
    pub data: Vec<u8>,
}

/// A publish job started for an uploaded item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishJob {
    /// Identifier of the hosted service item being created or overwritten.
    pub service_item_id: String,
    /// Asynchronous job identifier.
    pub job_id: String,
}

/// State of a publish job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// Still running.
    Processing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed(String),
}

/// Errors raised by portal operations.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client")]
    Client {
        /// Builder error.
        #[source]
        source: reqwest::Error,
    },
    /// The request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error text.
        message: String,
    },
    /// The request could not be sent.
    #[error("request to {url} failed: {message}")]
    Network {
        /// Request URL.
        url: String,
        /// Error text.
        message: String,
    },
    /// The portal answered with an error envelope.
    #[error("portal error {code} from {url}: {message}")]
    Api {
        /// Request URL.
        url: String,
        /// Portal error code.
        code: i64,
        /// Error message, with any details appended.
        message: String,
    },
    /// The response body did not have the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// Request URL.
        url: String,
        /// Error text.
        message: String,
    },
    /// The portal reported that an operation did not succeed.
    #[error("{operation} was rejected: {message}")]
    Rejected {
        /// Operation name.
        operation: &'static str,
        /// Reason given by the portal.
        message: String,
    },
    /// A publish job finished with an error.
    #[error("publish job {job_id} failed: {message}")]
    JobFailed {
        /// Job identifier.
        job_id: String,
        /// Status message.
        message: String,
    },
    /// A publish job did not finish within the poll budget.
    #[error("publish job {job_id} did not finish after {polls} status checks")]
    JobTimedOut {
        /// Job identifier.
        job_id: String,
        /// Number of status checks made.
        polls: u32,
    },
}

/// Content operations used to maintain the published layers.
#[async_trait(?Send)]
pub trait ContentPortal {
    /// Exchange named-user credentials for an access token.
    async fn generate_token(&self, username: &str, password: &Secret) -> Result<Secret, PortalError>;

    /// Resolve the user the token belongs to, if any.
    async fn current_user(&self, token: &Secret) -> Result<Option<String>, PortalError>;

    /// Candidate items for `query`; callers filter with [`ItemQuery::matches`].
    async fn search_items(
        &self,
        session: &Session,
        query: &ItemQuery,
    ) -> Result<Vec<PortalItem>, PortalError>;

    /// Permanently delete an item.
    async fn delete_item(&self, session: &Session, item: &PortalItem) -> Result<(), PortalError>;

    /// Identifier of the user's folder titled `title`, created when missing.
    async fn ensure_folder(&self, session: &Session, title: &str) -> Result<String, PortalError>;

    /// Upload a file as a new item in a folder.
    async fn add_item(
        &self,
        session: &Session,
        folder_id: &str,
        upload: ItemUpload,
    ) -> Result<PortalItem, PortalError>;

    /// Start publishing an uploaded item as a hosted feature layer.
    ///
    /// With `overwrite` the existing service named `service_name` receives
    /// the new data and keeps its item id.
    async fn publish_item(
        &self,
        session: &Session,
        item: &PortalItem,
        service_name: &str,
        overwrite: bool,
    ) -> Result<PublishJob, PortalError>;

    /// Current state of a publish job.
    async fn publish_status(
        &self,
        session: &Session,
        job: &PublishJob,
    ) -> Result<JobStatus, PortalError>;
}
