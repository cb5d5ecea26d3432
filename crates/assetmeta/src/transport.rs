//! API caller: the transport seam between the metadata protocol and HTTP
//!
//! The protocol layer builds a method, URL, optional JSON payload and extra
//! headers; an [`ApiCaller`] turns that into a JSON response or an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::client::ClientConfig;
use crate::error::ErrorResponse;
use crate::{Error, Result, VERSION};

/// Header pair added to requests that carry a JSON body
pub const JSON_CONTENT_TYPE: (&str, &str) = ("Content-Type", "application/json");

/// Performs one admin API exchange
#[async_trait]
pub trait ApiCaller: Send + Sync {
    async fn call(
        &self,
        method: Method,
        url: Url,
        payload: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<Value>;
}

/// HTTP implementation of [`ApiCaller`] authenticating with the account key pair.
///
/// Reads (`GET`) are retried on connection failures, timeouts and 5xx
/// responses. Writes are sent exactly once.
pub struct HttpCaller {
    http: reqwest::Client,
    api_key: String,
    api_secret: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpCaller {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        let user_agent = header::HeaderValue::from_str(&format!("assetmeta-rust/{}", VERSION))
            .map_err(|e| Error::Config(format!("invalid user agent: {}", e)))?;
        headers.insert(header::USER_AGENT, user_agent);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    async fn send(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        extra_headers: &[(&str, &str)],
    ) -> Result<Value> {
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .basic_auth(&self.api_key, Some(&self.api_secret));

        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await?;
        let status = response.status();
        let request_id = response
            .headers()
            .get("X-Request-Id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body_bytes = response.bytes().await?;

        if status.is_success() {
            if status == StatusCode::NO_CONTENT || body_bytes.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&body_bytes)?);
        }

        let body = serde_json::from_slice::<Value>(&body_bytes).ok();
        let message = match serde_json::from_slice::<ErrorResponse>(&body_bytes) {
            Ok(err) => err.error.message,
            Err(_) => String::from_utf8_lossy(&body_bytes).to_string(),
        };

        Err(Error::Api {
            status_code: status.as_u16(),
            message,
            request_id,
            body,
        })
    }
}

#[async_trait]
impl ApiCaller for HttpCaller {
    async fn call(
        &self,
        method: Method,
        url: Url,
        payload: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<Value> {
        let body = payload.as_ref().map(serde_json::to_vec).transpose()?;
        let retries = if method == Method::GET {
            self.max_retries
        } else {
            0
        };

        let mut attempt = 0;
        loop {
            tracing::debug!(%method, %url, attempt, "admin API request");

            match self.send(&method, &url, body.as_deref(), extra_headers).await {
                Err(e) if e.is_retryable() && attempt < retries => {
                    let delay = backoff(self.retry_delay, attempt);
                    tracing::warn!(%method, %url, error = %e, ?delay, "retrying admin API request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// `base * 2^attempt`, saturating
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
}
