//! JSON-over-HTTP client for the Sprout API

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sprout_proto::{PlantProfile, PlantRegistry};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, Operation};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const PLANTS_PATH: &str = "/plants";

/// Shape of API error bodies; only `message` is used
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreatePlant<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    plant_type: &'a str,
    location: &'a str,
    #[serde(rename = "deviceId")]
    device_id: &'a str,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialStore,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, credentials: CredentialStore) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `path` and decode the JSON reply.
    ///
    /// The stored token, if any, goes along as a bearer token. An empty
    /// success body decodes as JSON `null`.
    pub async fn post<B, R>(&self, operation: Operation, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);

        match self.credentials.token() {
            Ok(Some(token)) if !token.is_empty() => request = request.bearer_auth(token),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "could not read stored token, sending without"),
        }

        tracing::debug!(%url, %operation, "request");
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.bytes().await {
                Ok(bytes) => serde_json::from_slice::<ErrorBody>(&bytes)
                    .ok()
                    .and_then(|b| b.message),
                Err(_) => None,
            };
            tracing::warn!(%url, status = status.as_u16(), ?message, "request rejected");
            return Err(ApiError::Status {
                operation,
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(operation, e))?;
        // 201/204 with nothing in them still succeeded
        let body: &[u8] = if bytes.trim_ascii().is_empty() {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(body).map_err(|source| ApiError::Decode { operation, source })
    }
}

impl PlantRegistry for ApiClient {
    type Error = ApiError;

    async fn register_plant(&self, device_id: &str, profile: &PlantProfile) -> Result<(), ApiError> {
        let body = CreatePlant {
            name: &profile.display_name,
            plant_type: profile.plant_type.id(),
            location: &profile.location,
            device_id,
        };
        let _created: serde_json::Value = self.post(Operation::CreatePlant, PLANTS_PATH, &body).await?;
        tracing::info!(device_id, name = %profile.display_name, "plant registered");
        Ok(())
    }
}
