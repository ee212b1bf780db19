//! HTTP implementation of [`ContentPortal`] over the sharing REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};

use super::arcgis::{
    AddItemResponse, CreateFolderResponse, PublishResponse, SearchResponse, SelfResponse,
    StatusResponse, SuccessResponse, TokenResponse, UserContentResponse, decode,
};
use super::{
    ContentPortal, ItemQuery, ItemUpload, JobStatus, PortalError, PortalItem, PublishJob, Session,
};
use crate::credentials::Secret;

/// Default user agent for portal requests.
pub const DEFAULT_USER_AGENT: &str = "parc-sync/0.1";

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const TOKEN_EXPIRATION_MINUTES: &str = "60";
const SEARCH_PAGE_SIZE: &str = "100";

/// Configuration for [`ArcGisPortal`].
#[derive(Debug, Clone)]
pub struct ArcGisPortalConfig {
    /// Portal root, for example `https://example.maps.arcgis.com`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ArcGisPortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.arcgis.com".to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl ArcGisPortalConfig {
    /// Create a configuration for the given portal host.
    ///
    /// A missing scheme defaults to `https`; trailing slashes are dropped.
    ///
    /// # Examples
    /// ```
    /// use parc_data::portal::ArcGisPortalConfig;
    ///
    /// let config = ArcGisPortalConfig::new("example.maps.arcgis.com/");
    /// assert_eq!(config.base_url, "https://example.maps.arcgis.com");
    /// ```
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        let trimmed = host.trim().trim_end_matches('/');
        let base_url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_owned()
        } else {
            format!("https://{trimmed}")
        };
        Self {
            base_url,
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// [`ContentPortal`] backed by the portal's REST API.
#[derive(Debug, Clone)]
pub struct ArcGisPortal {
    client: Client,
    config: ArcGisPortalConfig,
}

impl ArcGisPortal {
    /// Create a portal client with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Client`] if the HTTP client fails to build.
    pub fn new(host: impl Into<String>) -> Result<Self, PortalError> {
        Self::with_config(ArcGisPortalConfig::new(host))
    }

    /// Create a portal client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Client`] if the HTTP client fails to build.
    pub fn with_config(config: ArcGisPortalConfig) -> Result<Self, PortalError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|source| PortalError::Client { source })?;
        Ok(Self { client, config })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/sharing/rest/{path}", self.config.base_url)
    }

    fn user_url(&self, username: &str, path: &str) -> String {
        if path.is_empty() {
            self.rest_url(&format!("content/users/{username}"))
        } else {
            self.rest_url(&format!("content/users/{username}/{path}"))
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, PortalError> {
        let response = request
            .header(REFERER, self.config.base_url.as_str())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let body: JsonValue = response
            .json()
            .await
            .map_err(|err| PortalError::Decode {
                url: url.to_owned(),
                message: err.to_string(),
            })?;
        decode(url, body)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &Secret,
        query: &[(&str, &str)],
    ) -> Result<T, PortalError> {
        let request = self
            .client
            .get(url)
            .query(&[("f", "json"), ("token", token.expose())])
            .query(query);
        self.send(url, request).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &Secret,
        form: &[(&str, &str)],
    ) -> Result<T, PortalError> {
        let mut fields = vec![("f", "json"), ("token", token.expose())];
        fields.extend_from_slice(form);
        let request = self.client.post(url).form(&fields);
        self.send(url, request).await
    }

    /// Convert a reqwest error to a [`PortalError`].
    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> PortalError {
        if error.is_timeout() {
            return PortalError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return PortalError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        PortalError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

fn rejected(operation: &'static str, message: impl Into<String>) -> PortalError {
    PortalError::Rejected {
        operation,
        message: message.into(),
    }
}

#[async_trait(?Send)]
impl ContentPortal for ArcGisPortal {
    async fn generate_token(&self, username: &str, password: &Secret) -> Result<Secret, PortalError> {
        let url = self.rest_url("generateToken");
        let request = self.client.post(&url).form(&[
            ("username", username),
            ("password", password.expose()),
            ("client", "referer"),
            ("referer", self.config.base_url.as_str()),
            ("expiration", TOKEN_EXPIRATION_MINUTES),
            ("f", "json"),
        ]);
        let response: TokenResponse = self.send(&url, request).await?;
        Ok(Secret::new(response.token))
    }

    async fn current_user(&self, token: &Secret) -> Result<Option<String>, PortalError> {
        let url = self.rest_url("community/self");
        let response: SelfResponse = self.get(&url, token, &[]).await?;
        Ok(response.username.filter(|name| !name.is_empty()))
    }

    async fn search_items(
        &self,
        session: &Session,
        query: &ItemQuery,
    ) -> Result<Vec<PortalItem>, PortalError> {
        let url = self.rest_url("search");
        let expression = query.to_search_expression();
        let mut items = Vec::new();
        let mut start = 1_i64;
        while start > 0 {
            let start_text = start.to_string();
            let page: SearchResponse = self
                .get(
                    &url,
                    &session.token,
                    &[
                        ("q", expression.as_str()),
                        ("num", SEARCH_PAGE_SIZE),
                        ("start", start_text.as_str()),
                    ],
                )
                .await?;
            items.extend(page.results);
            start = page.next_start;
        }
        Ok(items)
    }

    async fn delete_item(&self, session: &Session, item: &PortalItem) -> Result<(), PortalError> {
        let owner = if item.owner.is_empty() {
            session.username.as_str()
        } else {
            item.owner.as_str()
        };
        let url = self.user_url(owner, &format!("items/{}/delete", item.id));
        let response: SuccessResponse = self
            .post(&url, &session.token, &[("permanentDelete", "true")])
            .await?;
        if response.success {
            Ok(())
        } else {
            Err(rejected("delete", format!("item {} was not deleted", item.id)))
        }
    }

    async fn ensure_folder(&self, session: &Session, title: &str) -> Result<String, PortalError> {
        let url = self.user_url(&session.username, "");
        let content: UserContentResponse = self.get(&url, &session.token, &[]).await?;
        if let Some(folder) = content.folders.into_iter().find(|folder| folder.title == title) {
            return Ok(folder.id);
        }

        let url = self.user_url(&session.username, "createFolder");
        let created: CreateFolderResponse =
            self.post(&url, &session.token, &[("title", title)]).await?;
        match created.folder {
            Some(folder) if created.success => Ok(folder.id),
            _ => Err(rejected("createFolder", format!("folder '{title}' was not created"))),
        }
    }

    async fn add_item(
        &self,
        session: &Session,
        folder_id: &str,
        upload: ItemUpload,
    ) -> Result<PortalItem, PortalError> {
        let url = self.user_url(&session.username, &format!("{folder_id}/addItem"));
        let part = Part::bytes(upload.data)
            .file_name(upload.file_name.clone())
            .mime_str("application/geo+json")
            .map_err(|err| PortalError::Decode {
                url: url.clone(),
                message: err.to_string(),
            })?;
        let form = Form::new()
            .text("f", "json")
            .text("token", session.token.expose().to_owned())
            .text("title", upload.title.clone())
            .text("type", upload.item_type.clone())
            .text("description", upload.description)
            .text("tags", upload.tags.join(","))
            .text("typeKeywords", upload.type_keywords.join(","))
            .part("file", part);
        let request = self.client.post(&url).multipart(form);
        let response: AddItemResponse = self.send(&url, request).await?;
        match response.id {
            Some(id) if response.success => Ok(PortalItem {
                id,
                title: upload.title,
                item_type: upload.item_type,
                owner: session.username.clone(),
                type_keywords: upload.type_keywords,
            }),
            _ => Err(rejected("addItem", format!("'{}' was not uploaded", upload.file_name))),
        }
    }

    async fn publish_item(
        &self,
        session: &Session,
        item: &PortalItem,
        service_name: &str,
        overwrite: bool,
    ) -> Result<PublishJob, PortalError> {
        let url = self.user_url(&session.username, "publish");
        let parameters = json!({ "name": service_name }).to_string();
        let form = publish_form(&item.id, &parameters, overwrite);
        let response: PublishResponse = self.post(&url, &session.token, &form).await?;
        let service = response
            .services
            .into_iter()
            .next()
            .ok_or_else(|| rejected("publish", "no service was created"))?;
        if let Some(message) = service.failure() {
            return Err(rejected("publish", message));
        }
        match (service.service_item_id, service.job_id) {
            (Some(service_item_id), Some(job_id)) => Ok(PublishJob {
                service_item_id,
                job_id,
            }),
            _ => Err(rejected("publish", "response lacked a job identifier")),
        }
    }

    async fn publish_status(
        &self,
        session: &Session,
        job: &PublishJob,
    ) -> Result<JobStatus, PortalError> {
        let url = self.user_url(
            &session.username,
            &format!("items/{}/status", job.service_item_id),
        );
        let response: StatusResponse = self
            .get(
                &url,
                &session.token,
                &[("jobId", job.job_id.as_str()), ("jobType", "publish")],
            )
            .await?;
        Ok(match response.status.as_str() {
            "completed" => JobStatus::Completed,
            "failed" | "partial" => JobStatus::Failed(
                response
                    .status_message
                    .unwrap_or_else(|| response.status.clone()),
            ),
            _ => JobStatus::Processing,
        })
    }
}

/// Form fields of a `publish` request. With `overwrite` the portal replaces
/// the data of the existing service of the same name, keeping its item id.
fn publish_form<'a>(
    item_id: &'a str,
    parameters: &'a str,
    overwrite: bool,
) -> [(&'static str, &'a str); 4] {
    [
        ("itemId", item_id),
        ("filetype", "geojson"),
        ("publishParameters", parameters),
        ("overwrite", if overwrite { "true" } else { "false" }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn portal() -> ArcGisPortal {
        ArcGisPortal::new("https://example.maps.arcgis.com/").expect("client should build")
    }

    #[rstest]
    fn rest_urls_hang_off_sharing_root(portal: ArcGisPortal) {
        assert_eq!(
            portal.rest_url("generateToken"),
            "https://example.maps.arcgis.com/sharing/rest/generateToken"
        );
    }

    #[rstest]
    #[case("", "https://example.maps.arcgis.com/sharing/rest/content/users/analyst")]
    #[case(
        "items/42/delete",
        "https://example.maps.arcgis.com/sharing/rest/content/users/analyst/items/42/delete"
    )]
    fn user_urls(portal: ArcGisPortal, #[case] path: &str, #[case] expected: &str) {
        assert_eq!(portal.user_url("analyst", path), expected);
    }

    #[rstest]
    #[case("http://localhost:8080/portal", "http://localhost:8080/portal")]
    #[case("  governmentofbc.maps.arcgis.com ", "https://governmentofbc.maps.arcgis.com")]
    fn config_normalises_host(#[case] host: &str, #[case] expected: &str) {
        assert_eq!(ArcGisPortalConfig::new(host).base_url, expected);
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = ArcGisPortalConfig::new("https://example.com")
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[rstest]
    #[case(true, "true")]
    #[case(false, "false")]
    fn publish_form_carries_overwrite_flag(#[case] overwrite: bool, #[case] expected: &str) {
        let form = publish_form("item-7", r#"{"name":"bcparks_assets_v2"}"#, overwrite);
        assert!(form.contains(&("overwrite", expected)), "{form:?}");
        assert!(form.contains(&("itemId", "item-7")), "{form:?}");
    }
}
