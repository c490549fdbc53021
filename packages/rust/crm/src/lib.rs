//! Client for the CRM object-creation API.
//!
//! Every object type shares one endpoint shape: `POST {base}/{object_type}`
//! with a JSON body of `properties` plus optional `associations`. The client
//! holds the bearer credential it was built with and nothing else, so one
//! instance can be shared by all concurrent requests.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crmbridge_shared::{
    ApiKey, Association, CrmBridgeError, CrmConfig, CrmObjectRef, ObjectType, Result,
};

/// User-Agent string for outbound CRM requests.
const USER_AGENT: &str = concat!("crmbridge/", env!("CARGO_PKG_VERSION"));

/// Longest upstream error body kept in logs and errors.
const MAX_ERROR_BODY: usize = 2_000;

/// Property set of a CRM object.
pub type Properties = Map<String, Value>;

/// Request body of an object-create call.
#[derive(Debug, Serialize)]
struct CreateObjectRequest<'a> {
    properties: &'a Properties,
    #[serde(skip_serializing_if = "<[Association]>::is_empty")]
    associations: &'a [Association],
}

// ---------------------------------------------------------------------------
// CrmClient
// ---------------------------------------------------------------------------

/// Authenticated handle to the CRM object API.
#[derive(Debug, Clone)]
pub struct CrmClient {
    http: Client,
    base_url: Url,
    api_key: ApiKey,
}

impl CrmClient {
    /// Build a client from the `[crm]` config section and a credential loaded
    /// at process start.
    pub fn new(config: &CrmConfig, api_key: ApiKey) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CrmBridgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    /// Full URL of the create endpoint for `object_type`.
    pub fn endpoint(&self, object_type: ObjectType) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            object_type.as_str()
        )
    }

    /// Create one object, optionally associated to existing objects.
    ///
    /// Any non-2xx answer is a [`CrmBridgeError::CrmRequest`] carrying the
    /// status and body, whatever the status value.
    #[instrument(skip_all, fields(object_type = %object_type))]
    pub async fn create_object(
        &self,
        object_type: ObjectType,
        properties: &Properties,
        associations: &[Association],
    ) -> Result<CrmObjectRef> {
        let url = self.endpoint(object_type);
        let payload = CreateObjectRequest {
            properties,
            associations,
        };

        debug!(%url, associations = associations.len(), "creating CRM object");

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| CrmBridgeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = truncate(&body, MAX_ERROR_BODY);
            warn!(%url, status = status.as_u16(), %body, "CRM request failed");
            return Err(CrmBridgeError::CrmRequest {
                object_type,
                status: status.as_u16(),
                body,
            });
        }

        let object: CrmObjectRef = response.json().await.map_err(|e| {
            CrmBridgeError::decode(format!("{url}: unexpected response body: {e}"))
        })?;

        debug!(id = %object.id, "CRM object created");
        Ok(object)
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
