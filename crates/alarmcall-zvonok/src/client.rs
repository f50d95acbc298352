//! Zvonok API client.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, ZvonokError};
use crate::response::check_response;
use crate::retry::RetryPolicy;

/// Provider operations and their paths under the API base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    CreateCall,
    DeleteCall,
    CheckCall,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::CreateCall => "/manager/cabapi_external/api/v1/phones/call/",
            Endpoint::DeleteCall => "/manager/cabapi_external/api/v1/phones/remove_call/",
            Endpoint::CheckCall => "/manager/cabapi_external/api/v1/phones/call_by_id/",
        }
    }

    fn action(self) -> &'static str {
        match self {
            Endpoint::CreateCall => "create",
            Endpoint::DeleteCall => "delete",
            Endpoint::CheckCall => "check",
        }
    }
}

/// Settings for [`ZvonokClient`].
#[derive(Clone)]
pub struct ZvonokConfig {
    /// Public API key. Required; kept optional so that absence is reported
    /// by [`ZvonokClient::new`] rather than by whoever reads the env.
    pub api_token: Option<String>,
    pub campaign_id: String,
    /// Scheme and host, e.g. `https://zvonok.com`.
    pub api_base: String,
    pub retry: RetryPolicy,
}

impl ZvonokConfig {
    pub fn new(
        api_token: Option<String>,
        campaign_id: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            api_token,
            campaign_id: campaign_id.into(),
            api_base: api_base.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl fmt::Debug for ZvonokConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZvonokConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("campaign_id", &self.campaign_id)
            .field("api_base", &self.api_base)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Form body shared by every operation.
#[derive(Serialize)]
struct CallForm<'a> {
    public_key: &'a str,
    phone: &'a str,
    campaign_id: &'a str,
}

/// Stateless client for the Zvonok voice-call API.
#[derive(Clone)]
pub struct ZvonokClient {
    http: reqwest::Client,
    api_token: String,
    campaign_id: String,
    api_base: String,
    retry: RetryPolicy,
}

impl ZvonokClient {
    /// Build a client. Fails if the API token is missing or blank, or if the
    /// API base is not an http(s) URL.
    pub fn new(config: ZvonokConfig) -> Result<Self> {
        let api_token = config
            .api_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ZvonokError::NoToken)?;

        let base = Url::parse(&config.api_base).map_err(|e| ZvonokError::InvalidApiBase {
            base: config.api_base.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ZvonokError::InvalidApiBase {
                base: config.api_base.clone(),
                reason: format!("unsupported scheme {}", base.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ZvonokError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            api_token,
            campaign_id: config.campaign_id,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            retry: config.retry,
        })
    }

    /// Full URL of an endpoint.
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.api_base, endpoint.path())
    }

    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    /// Ask the provider to call `phone`.
    pub async fn create_call(&self, phone: &str) -> Result<Value> {
        self.request(Endpoint::CreateCall, phone).await
    }

    /// Remove a pending call to `phone`.
    pub async fn delete_call(&self, phone: &str) -> Result<Value> {
        self.request(Endpoint::DeleteCall, phone).await
    }

    /// Fetch the status of the call to `phone`.
    pub async fn check_call(&self, phone: &str) -> Result<Value> {
        self.request(Endpoint::CheckCall, phone).await
    }

    async fn request(&self, endpoint: Endpoint, phone: &str) -> Result<Value> {
        info!(phone = %phone, action = endpoint.action(), "Zvonok request");

        let url = self.url_for(endpoint);
        let form = CallForm {
            public_key: &self.api_token,
            phone,
            campaign_id: &self.campaign_id,
        };

        let mut attempt = 1;
        loop {
            match self.http.post(&url).form(&form).send().await {
                Ok(response) => {
                    let status = response.status();
                    if self.retry.is_retryable_status(status) && self.retry.has_attempts_left(attempt) {
                        let delay = self.retry.backoff(attempt);
                        warn!(
                            url = %url,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Transient Zvonok response, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    debug!(url = %url, status = status.as_u16(), attempt, "Zvonok response received");
                    return check_response(&url, status.as_u16(), &body);
                }
                Err(e) => {
                    let transient = e.is_connect() || e.is_timeout();
                    if transient && self.retry.has_attempts_left(attempt) {
                        let delay = self.retry.backoff(attempt);
                        warn!(url = %url, error = %e, attempt, "Zvonok request failed, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(ZvonokError::Api(format!(
                        "Api method with url = {} failed: {}",
                        url, e
                    )));
                }
            }
        }
    }
}

impl fmt::Debug for ZvonokClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZvonokClient")
            .field("campaign_id", &self.campaign_id)
            .field("api_base", &self.api_base)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
