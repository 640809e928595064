//! Registry client for extension metadata and signing keys.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::identity::ExtensionIdentity;
use crate::types::{ExtensionMetadata, RegistryConfig};

mod helpers;
mod http;

use http::HttpBackend;

/// User-Agent sent with every registry request.
pub const REGISTRY_USER_AGENT: &str = concat!("ovsx-sign/", env!("CARGO_PKG_VERSION"));

/// Registry client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: HttpBackend,
}

impl RegistryClient {
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RegistryError::Config {
                message: "registry URL is empty".to_string(),
            });
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(REGISTRY_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| RegistryError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http: HttpBackend {
                client,
                base_url,
                config,
            },
        })
    }

    pub fn from_env() -> RegistryResult<Self> {
        Self::new(RegistryConfig::from_env())
    }

    /// Registry base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    /// Well-known registry public key (`{base}/file/public.pem`).
    pub fn default_public_key_url(&self) -> String {
        helpers::default_public_key_url(&self.http.base_url)
    }

    /// Fetch the registry's metadata for an extension version.
    pub async fn get_extension_metadata(
        &self,
        identity: &ExtensionIdentity,
    ) -> RegistryResult<ExtensionMetadata> {
        let url = helpers::extension_api_url(&self.http.base_url, identity);
        debug!(url = %url, extension = %identity, "fetching extension metadata");

        let response = self.http.request(reqwest::Method::GET, &url).await?;
        response
            .json::<ExtensionMetadata>()
            .await
            .map_err(|e| RegistryError::InvalidResponse {
                message: format!("failed to parse extension metadata: {}", e),
            })
    }

    /// Whether `url` answers a HEAD request with success.
    ///
    /// Not-found and other non-retryable statuses are `Ok(false)`; transport
    /// failures that survive the retry budget are errors.
    pub async fn exists(&self, url: &str) -> RegistryResult<bool> {
        debug!(url = %url, "checking resource");

        match self.http.request(reqwest::Method::HEAD, url).await {
            Ok(_) => Ok(true),
            Err(RegistryError::NotFound { .. }) | Err(RegistryError::Http { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// GET `url` and return the body.
    pub async fn fetch_bytes(&self, url: &str) -> RegistryResult<Vec<u8>> {
        debug!(url = %url, "fetching");

        let response = self.http.request(reqwest::Method::GET, url).await?;
        let bytes = response.bytes().await.map_err(|e| RegistryError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(bytes.to_vec())
    }

    /// GET `url` and store the body as `dest_dir/filename`.
    ///
    /// Creates `dest_dir` if needed and returns the written path.
    pub async fn download(
        &self,
        url: &str,
        dest_dir: &Path,
        filename: &str,
    ) -> RegistryResult<PathBuf> {
        let bytes = self.fetch_bytes(url).await?;

        tokio::fs::create_dir_all(dest_dir).await?;

        let path = dest_dir.join(filename);
        tokio::fs::write(&path, &bytes).await?;

        debug!(url = %url, path = %path.display(), bytes = bytes.len(), "downloaded");
        Ok(path)
    }
}
