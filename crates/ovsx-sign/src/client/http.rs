//! HTTP layer: status mapping and retry.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::warn;

use crate::error::{RegistryError, RegistryResult};
use crate::types::RegistryConfig;

use super::helpers::backoff_for;

/// HTTP backend for making requests (holds reqwest client and config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) config: RegistryConfig,
}

impl HttpBackend {
    /// Make a request, retrying transient failures with jittered backoff.
    pub(crate) async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> RegistryResult<reqwest::Response> {
        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            match self.request_once(method.clone(), url).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;
                    let backoff = backoff_for(&e, retries);

                    warn!(
                        error = %e,
                        url = %url,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> RegistryResult<reqwest::Response> {
        let response = self.client.request(method, url).send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(response),

            404 => Err(RegistryError::NotFound {
                url: url.to_string(),
            }),

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(RegistryError::RateLimited { retry_after })
            }

            _ if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(RegistryError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }

            code => Err(RegistryError::Http {
                status: code,
                url: url.to_string(),
            }),
        }
    }
}
