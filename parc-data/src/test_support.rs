//! In-memory doubles for [`SpatialSource`] and [`ContentPortal`].
//!
//! These let readers, the publisher and the pipeline be exercised without a
//! database or a portal.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use tokio::runtime::Builder;

use crate::credentials::Secret;
use crate::portal::{
    ContentPortal, ItemQuery, ItemUpload, JobStatus, PortalError, PortalItem, PublishJob, Session,
};
use crate::postgres::relation;
use crate::source::{JsonRecord, LineRow, PointAnchor, SourceError, SpatialSource, TableColumn};

/// Drive a future to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
#[expect(clippy::expect_used, reason = "test helper fails loudly")]
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build Tokio runtime")
        .block_on(future)
}

/// Contents of one stub table.
#[derive(Debug, Clone, Default)]
pub struct StubTable {
    columns: Vec<TableColumn>,
    points: Vec<JsonRecord>,
    lines: Vec<LineRow>,
}

impl StubTable {
    /// A table answering [`SpatialSource::fetch_points`].
    ///
    /// `columns` pairs each name with its catalogue data type.
    #[must_use]
    pub fn points(columns: &[(&str, &str)], rows: Vec<JsonRecord>) -> Self {
        Self {
            columns: catalogue(columns),
            points: rows,
            lines: Vec::new(),
        }
    }

    /// A table answering [`SpatialSource::fetch_lines`] with
    /// `(attributes, WGS84 GeoJSON geometry)` rows.
    #[must_use]
    pub fn lines(columns: &[(&str, &str)], rows: Vec<(JsonRecord, Option<String>)>) -> Self {
        Self {
            columns: catalogue(columns),
            points: Vec::new(),
            lines: rows
                .into_iter()
                .map(|(record, geometry)| LineRow { record, geometry })
                .collect(),
        }
    }
}

fn catalogue(columns: &[(&str, &str)]) -> Vec<TableColumn> {
    columns
        .iter()
        .map(|(name, data_type)| TableColumn::new(*name, data_type))
        .collect()
}

/// Stub [`SpatialSource`] serving fixed tables from the `assets` schema.
///
/// Tables are listed in name order, like the catalogue query.
#[derive(Debug, Clone, Default)]
pub struct StubSpatialSource {
    tables: BTreeMap<String, StubTable>,
    anchors: BTreeMap<String, PointAnchor>,
    failing: Option<String>,
}

impl StubSpatialSource {
    /// Add a table.
    #[must_use]
    pub fn with_table(mut self, name: &str, table: StubTable) -> Self {
        self.tables.insert(name.to_owned(), table);
        self
    }

    /// Make every row query against `table` fail.
    #[must_use]
    pub fn failing_on(mut self, table: &str) -> Self {
        self.failing = Some(table.to_owned());
        self
    }

    /// Anchor requested for `table`, if its points were fetched.
    #[must_use]
    pub fn anchor_for(&self, table: &str) -> Option<PointAnchor> {
        self.anchors.get(table).copied()
    }

    fn check(&self, schema: &str, table: &str) -> Result<(), SourceError> {
        if self.failing.as_deref() == Some(table) {
            return Err(SourceError::Query {
                relation: relation(schema, table),
                source: sqlx::Error::Protocol(format!("relation {table} is unavailable")),
            });
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl SpatialSource for StubSpatialSource {
    async fn list_tables(&mut self, _schema: &str) -> Result<Vec<String>, SourceError> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn table_columns(
        &mut self,
        _schema: &str,
        table: &str,
    ) -> Result<Vec<TableColumn>, SourceError> {
        Ok(self
            .tables
            .get(table)
            .map(|stub| stub.columns.clone())
            .unwrap_or_default())
    }

    async fn fetch_points(
        &mut self,
        schema: &str,
        table: &str,
        anchor: PointAnchor,
    ) -> Result<Vec<JsonRecord>, SourceError> {
        self.check(schema, table)?;
        self.anchors.insert(table.to_owned(), anchor);
        Ok(self
            .tables
            .get(table)
            .map(|stub| stub.points.clone())
            .unwrap_or_default())
    }

    async fn fetch_lines(&mut self, schema: &str, table: &str) -> Result<Vec<LineRow>, SourceError> {
        self.check(schema, table)?;
        Ok(self
            .tables
            .get(table)
            .map(|stub| stub.lines.clone())
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
struct PortalState {
    items: Vec<PortalItem>,
    folders: Vec<(String, String)>,
    uploads: Vec<ItemUpload>,
    published: Vec<String>,
    overwrites: Vec<bool>,
    next_id: u32,
    polls: u32,
}

impl PortalState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }
}

/// In-memory [`ContentPortal`] keeping items, folders and publish jobs.
///
/// Deleting and publishing mutate the stored items so tests can assert on
/// what remains live after a sequence of calls.
#[derive(Debug)]
pub struct InMemoryPortal {
    username: Option<String>,
    failing: Option<&'static str>,
    job_failure: Option<String>,
    pending_polls: u32,
    state: RefCell<PortalState>,
}

impl Default for InMemoryPortal {
    fn default() -> Self {
        Self {
            username: Some("analyst".to_owned()),
            failing: None,
            job_failure: None,
            pending_polls: 0,
            state: RefCell::new(PortalState::default()),
        }
    }
}

impl InMemoryPortal {
    /// Issue tokens that resolve to no user.
    #[must_use]
    pub fn anonymous(mut self) -> Self {
        self.username = None;
        self
    }

    /// Reject one operation: `generateToken`, `self`, `search`, `delete`,
    /// `createFolder`, `addItem`, `publish` or `status`.
    #[must_use]
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing = Some(operation);
        self
    }

    /// Finish every publish job with `message` as its failure.
    #[must_use]
    pub fn with_job_failure(mut self, message: &str) -> Self {
        self.job_failure = Some(message.to_owned());
        self
    }

    /// Report jobs as processing for `polls` status checks.
    #[must_use]
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Live items with `title` and `item_type`.
    #[must_use]
    pub fn items_titled(&self, title: &str, item_type: &str) -> usize {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|item| item.title == title && item.item_type == item_type)
            .count()
    }

    /// Total number of live items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.state.borrow().items.len()
    }

    /// The most recent upload.
    #[must_use]
    pub fn last_upload(&self) -> Option<ItemUpload> {
        self.state.borrow().uploads.last().cloned()
    }

    /// Titles of every successfully started publish job, in order.
    #[must_use]
    pub fn published_titles(&self) -> Vec<String> {
        self.state.borrow().published.clone()
    }

    /// Overwrite flag of every successfully started publish job, in order.
    #[must_use]
    pub fn overwrites(&self) -> Vec<bool> {
        self.state.borrow().overwrites.clone()
    }

    /// Report whether an item with `id` is live.
    #[must_use]
    pub fn has_item(&self, id: &str) -> bool {
        self.state.borrow().items.iter().any(|item| item.id == id)
    }

    /// Titles of the folders created so far.
    #[must_use]
    pub fn folders(&self) -> Vec<String> {
        self.state
            .borrow()
            .folders
            .iter()
            .map(|(_, title)| title.clone())
            .collect()
    }

    fn check(&self, operation: &'static str) -> Result<(), PortalError> {
        if self.failing == Some(operation) {
            return Err(PortalError::Rejected {
                operation,
                message: "injected failure".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ContentPortal for InMemoryPortal {
    async fn generate_token(&self, username: &str, _password: &Secret) -> Result<Secret, PortalError> {
        self.check("generateToken")?;
        Ok(Secret::new(format!("token-for-{username}")))
    }

    async fn current_user(&self, _token: &Secret) -> Result<Option<String>, PortalError> {
        self.check("self")?;
        Ok(self.username.clone())
    }

    async fn search_items(
        &self,
        _session: &Session,
        query: &ItemQuery,
    ) -> Result<Vec<PortalItem>, PortalError> {
        self.check("search")?;
        Ok(self
            .state
            .borrow()
            .items
            .iter()
            .filter(|item| item.item_type == query.item_type)
            .cloned()
            .collect())
    }

    async fn delete_item(&self, _session: &Session, item: &PortalItem) -> Result<(), PortalError> {
        self.check("delete")?;
        let mut state = self.state.borrow_mut();
        let before = state.items.len();
        state.items.retain(|stored| stored.id != item.id);
        if state.items.len() == before {
            return Err(PortalError::Rejected {
                operation: "delete",
                message: format!("item {} does not exist", item.id),
            });
        }
        Ok(())
    }

    async fn ensure_folder(&self, _session: &Session, title: &str) -> Result<String, PortalError> {
        self.check("createFolder")?;
        let mut state = self.state.borrow_mut();
        if let Some((id, _)) = state.folders.iter().find(|(_, existing)| existing == title) {
            return Ok(id.clone());
        }
        let id = state.next_id("folder-");
        state.folders.push((id.clone(), title.to_owned()));
        Ok(id)
    }

    async fn add_item(
        &self,
        session: &Session,
        _folder_id: &str,
        upload: ItemUpload,
    ) -> Result<PortalItem, PortalError> {
        self.check("addItem")?;
        let mut state = self.state.borrow_mut();
        let item = PortalItem {
            id: state.next_id("item-"),
            title: upload.title.clone(),
            item_type: upload.item_type.clone(),
            owner: session.username.clone(),
            type_keywords: upload.type_keywords.clone(),
        };
        state.items.push(item.clone());
        state.uploads.push(upload);
        Ok(item)
    }

    async fn publish_item(
        &self,
        session: &Session,
        item: &PortalItem,
        _service_name: &str,
        overwrite: bool,
    ) -> Result<PublishJob, PortalError> {
        self.check("publish")?;
        let mut state = self.state.borrow_mut();
        let existing = state
            .items
            .iter()
            .find(|candidate| {
                candidate.title == item.title
                    && candidate.owner == session.username
                    && candidate.item_type == crate::portal::FEATURE_SERVICE_ITEM_TYPE
            })
            .map(|service| service.id.clone());
        let service_item_id = match (existing, overwrite) {
            (Some(id), true) => id,
            (None, false) => {
                let service = PortalItem {
                    id: state.next_id("service-"),
                    title: item.title.clone(),
                    item_type: crate::portal::FEATURE_SERVICE_ITEM_TYPE.to_owned(),
                    owner: session.username.clone(),
                    type_keywords: Vec::new(),
                };
                let id = service.id.clone();
                state.items.push(service);
                id
            }
            (Some(_), false) => {
                return Err(PortalError::Rejected {
                    operation: "publish",
                    message: format!("a service titled '{}' already exists", item.title),
                });
            }
            (None, true) => {
                return Err(PortalError::Rejected {
                    operation: "publish",
                    message: format!("no service titled '{}' to overwrite", item.title),
                });
            }
        };
        let job = PublishJob {
            service_item_id,
            job_id: state.next_id("job-"),
        };
        state.published.push(item.title.clone());
        state.overwrites.push(overwrite);
        state.polls = 0;
        Ok(job)
    }

    async fn publish_status(
        &self,
        _session: &Session,
        _job: &PublishJob,
    ) -> Result<JobStatus, PortalError> {
        self.check("status")?;
        let mut state = self.state.borrow_mut();
        state.polls += 1;
        if state.polls <= self.pending_polls {
            return Ok(JobStatus::Processing);
        }
        Ok(self
            .job_failure
            .clone()
            .map_or(JobStatus::Completed, JobStatus::Failed))
    }
}
