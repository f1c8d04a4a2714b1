//! HTTP client with retry, exponential backoff, timeout, and gzip.

use std::time::Duration;

use diagnose_core::config::{defaults, ApiConfig};
use diagnose_core::errors::CloudError;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the backend API; request paths are appended to it.
    pub base_url: String,
    pub timeout: Duration,
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry).
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(defaults::DEFAULT_API_TIMEOUT_SECS),
            max_retries: defaults::DEFAULT_API_MAX_RETRIES,
            initial_backoff: Duration::from_millis(defaults::DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_secs(defaults::DEFAULT_MAX_BACKOFF_SECS),
        }
    }
}

impl HttpClientConfig {
    pub fn from_api_config(base_url: &str, api: &ApiConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(api.effective_timeout_secs()),
            max_retries: api.effective_max_retries(),
            ..Self::default()
        }
    }
}

fn net_err(reason: impl std::fmt::Display) -> CloudError {
    CloudError::NetworkError {
        reason: reason.to_string(),
    }
}

/// Transport client. Connection errors and 5xx responses are retried with
/// backoff; 4xx responses and undecodable bodies fail immediately.
#[derive(Debug)]
pub struct HttpClient {
    config: HttpClientConfig,
    bearer_token: Option<String>,
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, CloudError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(net_err)?;
        Ok(Self {
            config,
            bearer_token: None,
            client,
        })
    }

    pub fn set_bearer_token(&mut self, token: String) {
        self.bearer_token = Some(token);
    }

    pub async fn get<Resp: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Resp, CloudError> {
        self.do_request(Method::GET, path, query, None::<&()>, self.config.max_retries)
            .await
    }

    pub async fn put<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        path: &str,
        payload: &Req,
    ) -> Result<Resp, CloudError> {
        self.do_request(Method::PUT, path, &[], Some(payload), self.config.max_retries)
            .await
    }

    /// PUT without retries, for callers that retry on their own schedule.
    pub async fn put_once<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        path: &str,
        payload: &Req,
    ) -> Result<Resp, CloudError> {
        self.do_request(Method::PUT, path, &[], Some(payload), 0).await
    }

    /// Unified retry loop for any HTTP method.
    async fn do_request<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Req>,
        max_retries: u32,
    ) -> Result<Resp, CloudError> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut backoff = self.config.initial_backoff;
        let mut last_err = net_err("no attempt made");

        for attempt in 0..=max_retries {
            if attempt > 0 {
                tracing::debug!(
                    attempt,
                    max_retries,
                    ?backoff,
                    %url,
                    "retrying request"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(self.config.max_backoff);
            }

            let mut req = self.client.request(method.clone(), &url);
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(b) = body {
                req = req.json(b);
            }
            if let Some(ref token) = self.bearer_token {
                req = req.bearer_auth(token);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await.map_err(net_err)?;
                        return decode_body(&bytes);
                    }
                    let body_text = resp.text().await.unwrap_or_default();
                    let err = CloudError::BadStatus {
                        status: status.as_u16(),
                        body: body_text,
                    };
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    last_err = err;
                }
                Err(e) => {
                    last_err = net_err(e);
                }
            }
        }

        tracing::warn!(%url, attempts = max_retries + 1, error = %last_err, "request failed");
        Err(last_err)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// An empty body decodes as `{}` so acknowledgement-only endpoints succeed.
fn decode_body<Resp: DeserializeOwned>(bytes: &[u8]) -> Result<Resp, CloudError> {
    let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
        &b"{}"[..]
    } else {
        bytes
    };
    serde_json::from_slice(bytes).map_err(|e| CloudError::DecodeFailed {
        reason: e.to_string(),
    })
}
