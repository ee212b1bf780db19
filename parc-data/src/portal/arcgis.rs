//! Response bodies of the ArcGIS sharing REST API.
//!
//! Every endpoint answers HTTP 200 and signals failure with an `error`
//! envelope instead, so bodies are inspected with [`decode`] before being
//! mapped onto the typed responses below.
//!
//! See: <https://developers.arcgis.com/rest/users-groups-and-items/>

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use super::{PortalError, PortalItem};

/// Error envelope returned in place of a normal body.
#[derive(Debug, Deserialize)]
pub(super) struct ApiError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        if self.details.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.details.join("; "))
        }
    }
}

/// Decode a body, surfacing the portal's error envelope when present.
pub(super) fn decode<T: DeserializeOwned>(url: &str, body: JsonValue) -> Result<T, PortalError> {
    if let Some(envelope) = body.get("error") {
        let error: ApiError =
            serde_json::from_value(envelope.clone()).map_err(|err| PortalError::Decode {
                url: url.to_owned(),
                message: err.to_string(),
            })?;
        return Err(PortalError::Api {
            url: url.to_owned(),
            code: error.code,
            message: error.describe(),
        });
    }
    serde_json::from_value(body).map_err(|err| PortalError::Decode {
        url: url.to_owned(),
        message: err.to_string(),
    })
}

/// `generateToken` response.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub token: String,
}

/// `community/self` response; anonymous sessions carry no username.
#[derive(Debug, Deserialize)]
pub(super) struct SelfResponse {
    #[serde(default)]
    pub username: Option<String>,
}

/// One page of `search` results.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<PortalItem>,
    /// Start index of the next page, `-1` after the last page.
    #[serde(default = "last_page")]
    pub next_start: i64,
}

fn last_page() -> i64 {
    -1
}

/// Generic `{ "success": bool }` acknowledgement.
#[derive(Debug, Deserialize)]
pub(super) struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

/// A folder in a user's content listing.
#[derive(Debug, Deserialize)]
pub(super) struct Folder {
    pub id: String,
    pub title: String,
}

/// `content/users/{user}` listing.
#[derive(Debug, Deserialize)]
pub(super) struct UserContentResponse {
    #[serde(default)]
    pub folders: Vec<Folder>,
}

/// `createFolder` response.
#[derive(Debug, Deserialize)]
pub(super) struct CreateFolderResponse {
    #[serde(default)]
    pub success: bool,
    pub folder: Option<Folder>,
}

/// `addItem` response.
#[derive(Debug, Deserialize)]
pub(super) struct AddItemResponse {
    #[serde(default)]
    pub success: bool,
    pub id: Option<String>,
}

/// One entry of the `publish` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PublishedService {
    pub service_item_id: Option<String>,
    pub job_id: Option<String>,
    pub error: Option<ApiError>,
}

impl PublishedService {
    pub fn failure(&self) -> Option<String> {
        self.error.as_ref().map(ApiError::describe)
    }
}

/// `publish` response.
#[derive(Debug, Deserialize)]
pub(super) struct PublishResponse {
    #[serde(default)]
    pub services: Vec<PublishedService>,
}

/// `items/{id}/status` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub status_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn error_envelope_becomes_api_error() {
        let body = json!({"error": {"code": 498, "message": "Invalid token.", "details": ["expired"]}});
        let err = decode::<TokenResponse>("https://portal/generateToken", body)
            .expect_err("envelope is an error");
        match err {
            PortalError::Api { code, message, .. } => {
                assert_eq!(code, 498);
                assert_eq!(message, "Invalid token. (expired)");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[rstest]
    fn search_page_defaults_to_last() {
        let page: SearchResponse =
            decode("https://portal/search", json!({"results": []})).expect("valid page");
        assert!(page.results.is_empty());
        assert_eq!(page.next_start, -1);
    }

    #[rstest]
    fn publish_response_reports_service_errors() {
        let response: PublishResponse = decode(
            "https://portal/publish",
            json!({"services": [{"success": false, "error": {"code": 409, "message": "Service name already exists"}}]}),
        )
        .expect("valid body");
        let service = response.services.first().expect("one service");
        assert_eq!(service.failure().as_deref(), Some("Service name already exists"));
    }

    #[rstest]
    fn malformed_body_is_a_decode_error() {
        let err = decode::<StatusResponse>("https://portal/status", json!({"state": "done"}))
            .expect_err("status is required");
        assert!(matches!(err, PortalError::Decode { .. }));
    }
}
