//! Public key resolution.
//!
//! Resolves the key that verifies an extension with the following priority:
//! 1. Local file (if the caller supplied a path)
//! 2. Signing key referenced by the registry's metadata for the version
//! 3. Registry default key (`{registry}/file/public.pem`), if reachable
//!
//! Keys are resolved per call and never cached.

use std::path::Path;

use ed25519_dalek::VerifyingKey;
use tracing::{debug, info, warn};

use crate::client::RegistryClient;
use crate::error::{RegistryError, RegistryResult};
use crate::identity::ExtensionIdentity;
use crate::keys::{key_id, load_public_key, parse_public_key_pem, KeyError};
use crate::types::RegistryConfig;

/// Resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Local key file missing or unreadable, or fetched key text invalid.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The registry default key could not be confirmed to exist.
    #[error("public key unreachable at {url}: {reason}")]
    PublicKeyUnreachable { url: String, reason: String },

    /// Downloading a located key failed.
    #[error("failed to fetch public key from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: RegistryError,
    },
}

/// Where a public key was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Caller-supplied file.
    Local(String),

    /// Key referenced by the extension's registry metadata.
    Registry(String),

    /// The registry's default key.
    RegistryDefault(String),
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "local:{}", path),
            Self::Registry(url) => write!(f, "registry:{}", url),
            Self::RegistryDefault(url) => write!(f, "registry-default:{}", url),
        }
    }
}

/// A resolved public key.
#[derive(Debug, Clone)]
pub struct ResolvedKey {
    pub key: VerifyingKey,
    pub source: KeySource,
}

/// Key resolver bound to one registry.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    client: RegistryClient,
}

impl KeyResolver {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    pub fn with_config(config: RegistryConfig) -> RegistryResult<Self> {
        Ok(Self::new(RegistryClient::new(config)?))
    }

    pub fn from_env() -> RegistryResult<Self> {
        Ok(Self::new(RegistryClient::from_env()?))
    }

    /// Registry client used for network resolution.
    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Resolve the public key for `identity`, or load `local` if given.
    pub async fn resolve_public_key(
        &self,
        identity: &ExtensionIdentity,
        local: Option<&Path>,
    ) -> Result<ResolvedKey, ResolveError> {
        let resolved = match local {
            Some(path) => self.resolve_local(path).await?,
            None => self.resolve_remote(identity).await?,
        };

        info!(
            extension = %identity,
            source = %resolved.source,
            key_id = %key_id(&resolved.key).unwrap_or_default(),
            "resolved public key"
        );
        Ok(resolved)
    }

    async fn resolve_local(&self, path: &Path) -> Result<ResolvedKey, ResolveError> {
        debug!(path = %path.display(), "loading local public key");

        let key = load_public_key(path).await?;
        Ok(ResolvedKey {
            key,
            source: KeySource::Local(path.display().to_string()),
        })
    }

    async fn resolve_remote(
        &self,
        identity: &ExtensionIdentity,
    ) -> Result<ResolvedKey, ResolveError> {
        match self.client.get_extension_metadata(identity).await {
            Ok(metadata) => {
                if let Some(url) = metadata.signing_key_url() {
                    debug!(extension = %identity, url = %url, "registry references signing key");
                    let key = self.fetch_key(url).await?;
                    return Ok(ResolvedKey {
                        key,
                        source: KeySource::Registry(url.to_string()),
                    });
                }
                warn!(
                    extension = %identity,
                    "registry metadata has no signing key reference, using default key"
                );
            }
            Err(e) => {
                warn!(
                    extension = %identity,
                    error = %e,
                    "registry metadata lookup failed, using default key"
                );
            }
        }

        self.resolve_default().await
    }

    async fn resolve_default(&self) -> Result<ResolvedKey, ResolveError> {
        let url = self.client.default_public_key_url();

        match self.client.exists(&url).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(ResolveError::PublicKeyUnreachable {
                    url,
                    reason: "not found".to_string(),
                })
            }
            Err(e) => {
                return Err(ResolveError::PublicKeyUnreachable {
                    reason: e.to_string(),
                    url,
                })
            }
        }

        let key = self.fetch_key(&url).await?;
        Ok(ResolvedKey {
            key,
            source: KeySource::RegistryDefault(url),
        })
    }

    async fn fetch_key(&self, url: &str) -> Result<VerifyingKey, ResolveError> {
        let bytes = self
            .client
            .fetch_bytes(url)
            .await
            .map_err(|source| ResolveError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let pem = String::from_utf8(bytes).map_err(|_| KeyError::InvalidPublicKey {
            reason: format!("key at {} is not UTF-8 text", url),
        })?;

        Ok(parse_public_key_pem(&pem)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use pkcs8::{EncodePublicKey, LineEnding};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> ExtensionIdentity {
        ExtensionIdentity::new("acme", "widgets", "1.2.3")
    }

    fn public_pem() -> (VerifyingKey, String) {
        let key = SigningKey::generate(&mut rand::thread_rng()).verifying_key();
        let pem = key.to_public_key_pem(LineEnding::LF).unwrap();
        (key, pem)
    }

    fn resolver(server: &MockServer, retries: u32) -> KeyResolver {
        KeyResolver::with_config(
            RegistryConfig::default()
                .with_url(server.uri())
                .with_max_retries(retries)
                .with_timeout_secs(5),
        )
        .unwrap()
    }

    async fn mount_default_key(server: &MockServer, pem: &str) {
        Mock::given(method("HEAD"))
            .and(path("/file/public.pem"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file/public.pem"))
            .respond_with(ResponseTemplate::new(200).set_body_string(pem.to_string()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_metadata_key_reference() {
        let server = MockServer::start().await;
        let (key, pem) = public_pem();

        Mock::given(method("GET"))
            .and(path("/api/acme/widgets/1.2.3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": {
                    "signature": format!("{}/sig/widgets.sigzip", server.uri()),
                    "publicKey": format!("{}/keys/acme.pem", server.uri())
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/keys/acme.pem"))
            .respond_with(ResponseTemplate::new(200).set_body_string(pem))
            .mount(&server)
            .await;

        let resolved = resolver(&server, 0)
            .resolve_public_key(&identity(), None)
            .await
            .unwrap();

        assert_eq!(resolved.key, key);
        assert_eq!(
            resolved.source,
            KeySource::Registry(format!("{}/keys/acme.pem", server.uri()))
        );
    }

    #[tokio::test]
    async fn test_metadata_not_found_falls_back_to_default() {
        let server = MockServer::start().await;
        let (key, pem) = public_pem();

        Mock::given(method("GET"))
            .and(path("/api/acme/widgets/1.2.3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_default_key(&server, &pem).await;

        let resolved = resolver(&server, 0)
            .resolve_public_key(&identity(), None)
            .await
            .unwrap();

        assert_eq!(resolved.key, key);
        assert!(matches!(resolved.source, KeySource::RegistryDefault(_)));
    }

    #[tokio::test]
    async fn test_unsigned_version_falls_back_to_default() {
        let server = MockServer::start().await;
        let (key, pem) = public_pem();

        Mock::given(method("GET"))
            .and(path("/api/acme/widgets/1.2.3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": { "download": "https://example.test/widgets.vsix" }
            })))
            .mount(&server)
            .await;
        mount_default_key(&server, &pem).await;

        let resolved = resolver(&server, 0)
            .resolve_public_key(&identity(), None)
            .await
            .unwrap();

        assert_eq!(resolved.key, key);
    }

    #[tokio::test]
    async fn test_unparsable_metadata_falls_back_to_default() {
        let server = MockServer::start().await;
        let (key, pem) = public_pem();

        Mock::given(method("GET"))
            .and(path("/api/acme/widgets/1.2.3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;
        mount_default_key(&server, &pem).await;

        let resolved = resolver(&server, 0)
            .resolve_public_key(&identity(), None)
            .await
            .unwrap();

        assert_eq!(resolved.key, key);
    }

    #[tokio::test]
    async fn test_default_key_unreachable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/acme/widgets/1.2.3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/file/public.pem"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file/public.pem"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = resolver(&server, 0)
            .resolve_public_key(&identity(), None)
            .await;

        assert!(matches!(
            result,
            Err(ResolveError::PublicKeyUnreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_retry_on_server_error() {
        let server = MockServer::start().await;
        let (key, pem) = public_pem();

        Mock::given(method("GET"))
            .and(path("/api/acme/widgets/1.2.3"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/acme/widgets/1.2.3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": {
                    "signature": "https://example.test/widgets.sigzip",
                    "publicKey": format!("{}/keys/acme.pem", server.uri())
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/keys/acme.pem"))
            .respond_with(ResponseTemplate::new(200).set_body_string(pem))
            .mount(&server)
            .await;

        let resolved = resolver(&server, 1)
            .resolve_public_key(&identity(), None)
            .await
            .unwrap();

        assert_eq!(resolved.key, key);
        assert!(matches!(resolved.source, KeySource::Registry(_)));
    }

    #[tokio::test]
    async fn test_invalid_remote_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/acme/widgets/1.2.3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_default_key(&server, "not a pem").await;

        let result = resolver(&server, 0)
            .resolve_public_key(&identity(), None)
            .await;

        assert!(matches!(
            result,
            Err(ResolveError::Key(KeyError::InvalidPublicKey { .. }))
        ));
    }

    #[tokio::test]
    async fn test_local_key_skips_registry() {
        let server = MockServer::start().await;
        let (key, pem) = public_pem();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("public.pem");
        std::fs::write(&key_path, pem).unwrap();

        let resolved = resolver(&server, 0)
            .resolve_public_key(&identity(), Some(&key_path))
            .await
            .unwrap();

        assert_eq!(resolved.key, key);
        assert!(matches!(resolved.source, KeySource::Local(_)));
    }

    #[tokio::test]
    async fn test_local_key_missing() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        let result = resolver(&server, 0)
            .resolve_public_key(&identity(), Some(&dir.path().join("missing.pem")))
            .await;

        assert!(matches!(
            result,
            Err(ResolveError::Key(KeyError::KeyFileNotFound { .. }))
        ));
    }
}
