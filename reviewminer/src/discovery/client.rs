//! HTTP client for the hosted discovery service (v1 REST API)

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::backend::{Environment, SearchBackend};
use super::query::QuerySpec;
use super::target::CollectionRef;
use crate::aggregations::RawResponse;
use crate::config::{Credentials, DiscoveryConfig};
use crate::error::{Error, Result, TransportError};

pub struct DiscoveryClient {
    client: Client,
    url: Url,
    version_date: String,
    credentials: Option<Credentials>,
}

#[derive(Deserialize)]
struct EnvironmentsResponse {
    #[serde(default)]
    environments: Vec<Environment>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

impl DiscoveryClient {
    pub fn new(
        url: &str,
        version_date: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self> {
        let url = Url::parse(url.trim_end_matches('/'))?;
        if url.cannot_be_a_base() {
            return Err(Error::Config(format!("service url '{}' cannot be a base", url)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransportError::from)?;

        Ok(Self {
            client,
            url,
            version_date: version_date.to_string(),
            credentials,
        })
    }

    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        Self::new(
            &config.url,
            &config.version_date,
            config.credentials()?,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.url.clone();
        // Base-ness is checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, TransportError> {
        let request = match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        };

        let response = request
            .query(&[("version", self.version_date.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransportError::Auth {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: backend_message(status, &body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// The service reports failures as `{"code": 400, "error": "..."}`
fn backend_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        return parsed.error;
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl SearchBackend for DiscoveryClient {
    async fn query(
        &self,
        collection: &CollectionRef,
        spec: &QuerySpec,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = self.endpoint(&[
            "v1",
            "environments",
            &collection.environment_id,
            "collections",
            &collection.collection_id,
            "query",
        ]);
        tracing::debug!(path = url.path(), "Dispatching discovery query");

        let request = self.client.get(url).query(&spec.query_params());
        self.send(request).await
    }

    async fn environments(&self) -> std::result::Result<Vec<Environment>, TransportError> {
        let url = self.endpoint(&["v1", "environments"]);
        let response: EnvironmentsResponse = self.send(self.client.get(url)).await?;
        Ok(response.environments)
    }

    fn backend_name(&self) -> &str {
        "discovery"
    }
}
