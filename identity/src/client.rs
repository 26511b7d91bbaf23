//! HTTP clients for the key service and the identity service.

use crate::collaborators::{IdentityResolver, KeyValidator};
use crate::config::CollaboratorConfig;
use crate::errors::CollaboratorError;
use crate::metrics_defs::{COLLABORATOR_REQUEST_DURATION, COLLABORATOR_RETRIES};
use crate::protocol::{
    IDENTITY_SERVICE, KEY_SERVICE, ResolveRequest, ResolveResponse, ValidateKeyRequest,
    ValidateKeyResponse,
};
use crate::types::KeyValidation;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{counter, histogram};
use std::time::Instant;
use tokio::time::{Duration, sleep};

pub const API_KEY_HEADER: &str = "x-api-key";

const BASE_DELAY_MS: u64 = 100;
const MAX_DELAY_MS: u64 = 2000;

const RETRIABLE_STATUS_CODES: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,     // 429
    StatusCode::INTERNAL_SERVER_ERROR, // 500
    StatusCode::BAD_GATEWAY,           // 502
    StatusCode::SERVICE_UNAVAILABLE,   // 503
    StatusCode::GATEWAY_TIMEOUT,       // 504
];

#[derive(Clone)]
struct HttpCollaborator {
    name: &'static str,
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    max_retries: u32,
}

impl HttpCollaborator {
    fn new(
        name: &'static str,
        config: &CollaboratorConfig,
        path: &str,
    ) -> Result<Self, CollaboratorError> {
        let endpoint = format!("{}/{}", config.url.as_str().trim_end_matches('/'), path);
        let endpoint =
            Url::parse(&endpoint).map_err(|e| CollaboratorError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(HttpCollaborator {
            name,
            client,
            endpoint,
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn post_json<Req, Resp>(&self, body: &Req) -> Result<Resp, CollaboratorError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let start = Instant::now();
        let result = self.post_with_retries(body).await;

        let outcome = if result.is_ok() { "success" } else { "failure" };
        histogram!(COLLABORATOR_REQUEST_DURATION, "collaborator" => self.name, "outcome" => outcome)
            .record(start.elapsed().as_secs_f64());

        result
    }

    async fn post_with_retries<Req, Resp>(&self, body: &Req) -> Result<Resp, CollaboratorError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut retries = 0;

        loop {
            let mut request = self.client.post(self.endpoint.clone()).json(body);
            if let Some(api_key) = &self.api_key {
                request = request.header(API_KEY_HEADER, api_key);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json::<Resp>().await?);
                }
                Ok(response) => {
                    let status = response.status();
                    if !RETRIABLE_STATUS_CODES.contains(&status) {
                        return Err(CollaboratorError::UnexpectedStatus {
                            collaborator: self.name,
                            status,
                        });
                    }
                    if retries >= self.max_retries {
                        return Err(CollaboratorError::RetriesExceeded(self.name));
                    }
                    tracing::debug!(collaborator = self.name, status = %status, retries, "Retrying collaborator call");
                }
                Err(e) if is_retriable(&e) && retries < self.max_retries => {
                    tracing::debug!(collaborator = self.name, error = %e, retries, "Retrying collaborator call");
                }
                Err(e) => return Err(e.into()),
            }

            counter!(COLLABORATOR_RETRIES, "collaborator" => self.name).increment(1);

            // Backoff between retries
            sleep(backoff_delay(retries)).await;
            retries += 1;
        }
    }
}

/// Exponential backoff from `BASE_DELAY_MS`, capped at `MAX_DELAY_MS`.
fn backoff_delay(retries: u32) -> Duration {
    let millis = 2_u64
        .checked_pow(retries)
        .and_then(|factor| factor.checked_mul(BASE_DELAY_MS))
        .unwrap_or(MAX_DELAY_MS);
    Duration::from_millis(millis.min(MAX_DELAY_MS))
}

fn is_retriable(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

/// Calls `POST {url}/validate` on the key service.
#[derive(Clone)]
pub struct KeyServiceClient {
    inner: HttpCollaborator,
}

impl KeyServiceClient {
    pub fn new(config: &CollaboratorConfig) -> Result<Self, CollaboratorError> {
        Ok(KeyServiceClient {
            inner: HttpCollaborator::new(KEY_SERVICE, config, "validate")?,
        })
    }
}

#[async_trait]
impl KeyValidator for KeyServiceClient {
    async fn validate(&self, credential: &str) -> Result<KeyValidation, CollaboratorError> {
        let response: ValidateKeyResponse = self
            .inner
            .post_json(&ValidateKeyRequest { key: credential })
            .await?;

        KeyValidation::try_from(response)
    }
}

/// Calls `POST {url}/resolve` on the identity service.
#[derive(Clone)]
pub struct IdentityServiceClient {
    inner: HttpCollaborator,
}

impl IdentityServiceClient {
    pub fn new(config: &CollaboratorConfig) -> Result<Self, CollaboratorError> {
        Ok(IdentityServiceClient {
            inner: HttpCollaborator::new(IDENTITY_SERVICE, config, "resolve")?,
        })
    }
}

#[async_trait]
impl IdentityResolver for IdentityServiceClient {
    async fn resolve(&self, request: &ResolveRequest) -> Result<ResolveResponse, CollaboratorError> {
        self.inner.post_json(request).await
    }
}
