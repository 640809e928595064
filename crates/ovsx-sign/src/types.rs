//! Registry configuration and API response types.

use serde::{Deserialize, Serialize};

/// Default registry when no environment override is set.
pub const DEFAULT_REGISTRY_URL: &str = "https://open-vsx.org";

/// Extension metadata returned by `GET /api/{publisher}/{name}/{version}`.
///
/// Only the fields key resolution needs; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    #[serde(default)]
    pub files: ExtensionFiles,
}

/// File links of an extension version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionFiles {
    /// Signature archive URL (present when the version is signed).
    #[serde(default)]
    pub signature: Option<String>,

    /// URL of the public key that verifies the signature archive.
    #[serde(default, rename = "publicKey")]
    pub public_key: Option<String>,
}

impl ExtensionMetadata {
    /// The public key URL, if the registry published a signing-key
    /// reference for this version.
    ///
    /// A reference requires both a signature link (the version is signed)
    /// and a non-empty public key link.
    pub fn signing_key_url(&self) -> Option<&str> {
        self.files.signature.as_ref()?;
        self.files
            .public_key
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL for the registry.
    #[serde(default = "default_registry_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `OVSX_REGISTRY_URL` | Registry base URL |
    /// | `VSX_REGISTRY_URL` | Registry base URL (legacy name) |
    /// | `OVSX_REGISTRY_TIMEOUT` | Request timeout in seconds |
    /// | `OVSX_REGISTRY_MAX_RETRIES` | Max retries for transient failures |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("OVSX_REGISTRY_URL")
                .or_else(|_| std::env::var("VSX_REGISTRY_URL"))
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(default_registry_url),
            timeout_secs: std::env::var("OVSX_REGISTRY_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("OVSX_REGISTRY_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
        }
    }

    /// Set the base URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}
