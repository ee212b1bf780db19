//! The search, delete, upload and publish sequence for one dataset.

use std::time::Duration;

use log::{error, info, warn};
use parc_core::{FeatureCollection, FeatureTable, GeoJsonError};
use thiserror::Error;

use super::{
    ContentPortal, ItemQuery, ItemUpload, JobStatus, PortalError, PortalItem, PublishJob, Session,
};
use crate::credentials::Secret;

/// Item type of uploaded GeoJSON documents.
pub const GEOJSON_ITEM_TYPE: &str = "GeoJson";
/// Item type of hosted feature layers.
pub const FEATURE_SERVICE_ITEM_TYPE: &str = "Feature Service";
/// Tag attached to every uploaded item.
pub const ITEM_TAG: &str = "BCparks data";

/// Stable type keyword identifying a dataset across title changes.
///
/// # Examples
/// ```
/// use parc_data::portal::dataset_keyword;
///
/// assert_eq!(dataset_keyword("bcparks_trails_v2"), "parc-sync:bcparks_trails_v2");
/// ```
#[must_use]
pub fn dataset_keyword(file_base_name: &str) -> String {
    format!("parc-sync:{file_base_name}")
}

/// Where and how a dataset is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerTarget {
    /// Title shared by the GeoJSON item and the feature layer.
    pub title: String,
    /// File name of the upload, without the `.geojson` extension.
    pub file_base_name: String,
    /// Item description.
    pub description: String,
    /// Folder receiving the upload.
    pub folder: String,
}

/// Publish job polling limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between status checks.
    pub interval: Duration,
    /// Status checks made before giving up.
    pub max_polls: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: 120,
        }
    }
}

/// Identifiers of a freshly published dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedLayer {
    /// Layer title.
    pub title: String,
    /// Identifier of the uploaded GeoJSON item.
    pub item_id: String,
    /// Identifier of the hosted feature layer item.
    pub service_item_id: String,
}

/// Errors raised by [`Publisher`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// The portal issued a token that resolves to no named user.
    #[error("portal did not identify a user for the supplied credentials")]
    NotAuthenticated,
    /// An operation needing a session ran before [`Publisher::connect`].
    #[error("no active portal session")]
    NotConnected,
    /// A portal call failed while connecting.
    #[error("portal request failed")]
    Portal {
        /// Underlying portal error.
        #[source]
        source: PortalError,
    },
    /// Publishing a dataset failed; nothing is rolled back.
    #[error("failed to publish '{title}': {message}")]
    Publish {
        /// Layer title.
        title: String,
        /// Failure description.
        message: String,
    },
}

impl From<PortalError> for PublishError {
    fn from(source: PortalError) -> Self {
        Self::Portal { source }
    }
}

/// Internal failure of one publish step, flattened into
/// [`PublishError::Publish`] at the boundary.
#[derive(Debug, Error)]
enum StepError {
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error("failed to encode GeoJSON: {0}")]
    Encode(#[from] GeoJsonError),
}

fn publish_failed(target: &LayerTarget, err: &StepError) -> PublishError {
    error!("..error publishing '{}': {err}", target.title);
    PublishError::Publish {
        title: target.title.clone(),
        message: err.to_string(),
    }
}

/// Maintains published layers through a [`ContentPortal`].
#[derive(Debug)]
pub struct Publisher<P> {
    portal: P,
    session: Option<Session>,
    poll: PollSettings,
}

impl<P: ContentPortal> Publisher<P> {
    /// Wrap a portal; no session is opened yet.
    #[must_use]
    pub fn new(portal: P) -> Self {
        Self {
            portal,
            session: None,
            poll: PollSettings::default(),
        }
    }

    /// Override the publish job polling limits.
    #[must_use]
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Borrow the underlying portal.
    #[must_use]
    pub fn portal(&self) -> &P {
        &self.portal
    }

    /// Report whether a session is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Authenticate as a named user.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Portal`] when a request fails and
    /// [`PublishError::NotAuthenticated`] when the token names no user.
    pub async fn connect(&mut self, username: &str, password: &Secret) -> Result<(), PublishError> {
        let token = self.portal.generate_token(username, password).await?;
        let Some(user) = self.portal.current_user(&token).await? else {
            error!("..failed to authenticate with AGOL as {username}");
            return Err(PublishError::NotAuthenticated);
        };
        info!("..successfully connected to AGOL as {user}");
        self.session = Some(Session {
            token,
            username: user,
        });
        Ok(())
    }

    /// Drop the session. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            info!("..AGOL session closed.");
        } else {
            warn!("No active AGOL connection to disconnect.");
        }
    }

    /// Publish a feature table as a hosted feature layer.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::NotConnected`] without a session; any other
    /// failure is logged and returned as [`PublishError::Publish`].
    pub async fn publish(
        &self,
        table: &FeatureTable,
        target: &LayerTarget,
    ) -> Result<PublishedLayer, PublishError> {
        if self.session.is_none() {
            return Err(PublishError::NotConnected);
        }
        info!("..converting data to geojson");
        let collection = FeatureCollection::from_table(table)
            .map_err(|err| publish_failed(target, &StepError::from(err)))?;
        self.publish_collection(&collection, target).await
    }

    /// Publish an already converted GeoJSON document.
    ///
    /// # Errors
    ///
    /// As for [`Publisher::publish`].
    pub async fn publish_collection(
        &self,
        collection: &FeatureCollection,
        target: &LayerTarget,
    ) -> Result<PublishedLayer, PublishError> {
        let session = self.session.as_ref().ok_or(PublishError::NotConnected)?;
        match self.replace_layer(session, collection, target).await {
            Ok(layer) => {
                info!("..feature layer '{}' published successfully.", target.title);
                Ok(layer)
            }
            Err(err) => Err(publish_failed(target, &err)),
        }
    }

    async fn replace_layer(
        &self,
        session: &Session,
        collection: &FeatureCollection,
        target: &LayerTarget,
    ) -> Result<PublishedLayer, StepError> {
        let keyword = dataset_keyword(&target.file_base_name);
        for existing in self
            .find_existing(session, target, GEOJSON_ITEM_TYPE, Some(&keyword))
            .await?
        {
            self.portal.delete_item(session, &existing).await?;
            info!("..existing GeoJSON item '{}' deleted.", existing.title);
        }

        let folder_id = self.portal.ensure_folder(session, &target.folder).await?;
        let upload = ItemUpload {
            title: target.title.clone(),
            item_type: GEOJSON_ITEM_TYPE.to_owned(),
            file_name: format!("{}.geojson", target.file_base_name),
            description: target.description.clone(),
            tags: vec![ITEM_TAG.to_owned()],
            type_keywords: vec![keyword],
            data: collection.to_bytes()?,
        };
        let item = self.portal.add_item(session, &folder_id, upload).await?;
        info!("..new GeoJSON item '{}' added.", item.title);

        let overwrite = !self
            .find_existing(session, target, FEATURE_SERVICE_ITEM_TYPE, None)
            .await?
            .is_empty();
        if overwrite {
            info!("..overwriting existing feature layer '{}'.", target.title);
        }

        let job = self
            .portal
            .publish_item(session, &item, &target.file_base_name, overwrite)
            .await?;
        self.await_job(session, &job).await?;
        Ok(PublishedLayer {
            title: target.title.clone(),
            item_id: item.id,
            service_item_id: job.service_item_id,
        })
    }

    async fn find_existing(
        &self,
        session: &Session,
        target: &LayerTarget,
        item_type: &str,
        keyword: Option<&str>,
    ) -> Result<Vec<PortalItem>, PortalError> {
        let query = ItemQuery {
            title: target.title.clone(),
            owner: session.username.clone(),
            item_type: item_type.to_owned(),
            type_keyword: keyword.map(str::to_owned),
        };
        let candidates = self.portal.search_items(session, &query).await?;
        Ok(candidates
            .into_iter()
            .filter(|item| query.matches(item))
            .collect())
    }

    async fn await_job(&self, session: &Session, job: &PublishJob) -> Result<(), PortalError> {
        for poll in 1..=self.poll.max_polls {
            match self.portal.publish_status(session, job).await? {
                JobStatus::Completed => return Ok(()),
                JobStatus::Failed(message) => {
                    return Err(PortalError::JobFailed {
                        job_id: job.job_id.clone(),
                        message,
                    });
                }
                JobStatus::Processing if poll < self.poll.max_polls => {
                    tokio::time::sleep(self.poll.interval).await;
                }
                JobStatus::Processing => {}
            }
        }
        Err(PortalError::JobTimedOut {
            job_id: job.job_id.clone(),
            polls: self.poll.max_polls,
        })
    }
}
