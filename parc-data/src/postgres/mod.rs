//! PostgreSQL/PostGIS access to the CityWide database.
//!
//! [`Database`] owns at most one connection. Connection failures are logged
//! and surface as `None` so the caller decides whether they are fatal.

mod sql;

use async_trait::async_trait;
use log::{error, info, warn};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use crate::credentials::DatabaseCredentials;
use crate::source::{JsonRecord, LineRow, PointAnchor, SourceError, SpatialSource, TableColumn};

pub use sql::{line_query, point_query, quote_ident, relation};

/// Lifecycle wrapper around a single database connection.
#[derive(Debug)]
pub struct Database {
    credentials: DatabaseCredentials,
    connection: Option<PgConnection>,
}

impl Database {
    /// Prepare a connector; no connection is opened yet.
    #[must_use]
    pub fn new(credentials: DatabaseCredentials) -> Self {
        Self {
            credentials,
            connection: None,
        }
    }

    fn options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.credentials.host)
            .port(self.credentials.port)
            .database(&self.credentials.database)
            .username(&self.credentials.user)
            .password(self.credentials.password.expose())
    }

    /// Open the connection, logging and returning `None` on failure.
    ///
    /// An existing connection is reused.
    pub async fn connect(&mut self) -> Option<&mut PgConnection> {
        if self.connection.is_none() {
            match PgConnection::connect_with(&self.options()).await {
                Ok(connection) => {
                    info!("..Postgres connection established successfully.");
                    self.connection = Some(connection);
                }
                Err(err) => {
                    error!("..error connecting to database: {err}");
                    return None;
                }
            }
        }
        self.connection.as_mut()
    }

    /// Report whether a connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Borrow the open connection as a [`SpatialSource`].
    pub fn source(&mut self) -> Option<PgSpatialSource<'_>> {
        self.connection.as_mut().map(PgSpatialSource::new)
    }

    /// Close the connection. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        match self.connection.take() {
            Some(connection) => match connection.close().await {
                Ok(()) => info!("Postgres connection closed."),
                Err(err) => error!("Error closing connection: {err}"),
            },
            None => warn!("..no active database connection to close."),
        }
    }
}

/// [`SpatialSource`] over a borrowed PostgreSQL connection.
#[derive(Debug)]
pub struct PgSpatialSource<'c> {
    connection: &'c mut PgConnection,
}

impl<'c> PgSpatialSource<'c> {
    /// Wrap an open connection.
    pub fn new(connection: &'c mut PgConnection) -> Self {
        Self { connection }
    }
}

fn query_error(relation: String) -> impl FnOnce(sqlx::Error) -> SourceError {
    move |source| SourceError::Query { relation, source }
}

fn into_record(relation: &str, value: JsonValue) -> Result<JsonRecord, SourceError> {
    match value {
        JsonValue::Object(record) => Ok(record),
        _ => Err(SourceError::MalformedRow {
            relation: relation.to_owned(),
        }),
    }
}

#[async_trait(?Send)]
impl SpatialSource for PgSpatialSource<'_> {
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>, SourceError> {
        sqlx::query_scalar::<_, String>(sql::LIST_TABLES)
            .bind(schema)
            .fetch_all(&mut *self.connection)
            .await
            .map_err(query_error(quote_ident(schema)))
    }

    async fn table_columns(
        &mut self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<TableColumn>, SourceError> {
        let rows = sqlx::query_as::<_, (String, String)>(sql::TABLE_COLUMNS)
            .bind(schema)
            .bind(table)
            .fetch_all(&mut *self.connection)
            .await
            .map_err(query_error(relation(schema, table)))?;
        Ok(rows
            .into_iter()
            .map(|(name, data_type)| TableColumn::new(name, &data_type))
            .collect())
    }

    async fn fetch_points(
        &mut self,
        schema: &str,
        table: &str,
        anchor: PointAnchor,
    ) -> Result<Vec<JsonRecord>, SourceError> {
        let name = relation(schema, table);
        let query = point_query(schema, table, anchor);
        let rows = sqlx::query_scalar::<_, JsonValue>(&query)
            .fetch_all(&mut *self.connection)
            .await
            .map_err(query_error(name.clone()))?;
        rows.into_iter()
            .map(|value| into_record(&name, value))
            .collect()
    }

    async fn fetch_lines(&mut self, schema: &str, table: &str) -> Result<Vec<LineRow>, SourceError> {
        let name = relation(schema, table);
        let query = line_query(schema, table);
        let rows = sqlx::query_as::<_, (JsonValue, Option<String>)>(&query)
            .fetch_all(&mut *self.connection)
            .await
            .map_err(query_error(name.clone()))?;
        rows.into_iter()
            .map(|(record, geometry)| {
                Ok(LineRow {
                    record: into_record(&name, record)?,
                    geometry,
                })
            })
            .collect()
    }
}
