//! Ed25519 key files.
//!
//! Public keys are SPKI PEM, private keys PKCS#8 PEM. A generated pair is
//! written as `public.pem` and `private.pem` in one directory.

use std::path::{Path, PathBuf};

use ed25519_dalek::{SigningKey, VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::digest::sha256_hex;

/// File name of the public half of a generated pair.
pub const PUBLIC_KEY_FILE: &str = "public.pem";

/// File name of the private half of a generated pair.
pub const PRIVATE_KEY_FILE: &str = "private.pem";

/// Key errors.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// A key file given by path does not exist.
    #[error("key file not found: {}", .path.display())]
    KeyFileNotFound { path: PathBuf },

    /// Public key text is not an Ed25519 SPKI PEM.
    #[error("invalid public key: {reason}")]
    InvalidPublicKey { reason: String },

    /// Private key text is not an Ed25519 PKCS#8 PEM.
    #[error("invalid private key: {reason}")]
    InvalidPrivateKey { reason: String },

    /// Refusing to replace an existing key file.
    #[error("key file already exists: {} (use overwrite to replace it)", .path.display())]
    AlreadyExists { path: PathBuf },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for key operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Key-pair generation options.
#[derive(Debug, Clone, Default)]
pub struct KeyPairOptions {
    /// Directory for the key files (default: current directory).
    pub output_dir: Option<PathBuf>,

    /// Replace existing key files.
    pub overwrite: bool,
}

impl KeyPairOptions {
    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Allow replacing existing key files.
    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }
}

/// Paths of a written key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPairPaths {
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
}

/// Parse an SPKI PEM public key.
pub fn parse_public_key_pem(pem: &str) -> KeyResult<VerifyingKey> {
    VerifyingKey::from_public_key_pem(pem.trim()).map_err(|e| KeyError::InvalidPublicKey {
        reason: e.to_string(),
    })
}

/// Parse a PKCS#8 PEM private key.
pub fn parse_private_key_pem(pem: &str) -> KeyResult<SigningKey> {
    SigningKey::from_pkcs8_pem(pem.trim()).map_err(|e| KeyError::InvalidPrivateKey {
        reason: e.to_string(),
    })
}

/// Load a public key from an SPKI PEM file.
pub async fn load_public_key(path: &Path) -> KeyResult<VerifyingKey> {
    parse_public_key_pem(&read_key_file(path).await?)
}

/// Load a private key from a PKCS#8 PEM file.
pub async fn load_private_key(path: &Path) -> KeyResult<SigningKey> {
    parse_private_key_pem(&read_key_file(path).await?)
}

/// Key ID: `sha256:<hex>` of the SPKI DER encoding.
pub fn key_id(key: &VerifyingKey) -> KeyResult<String> {
    let doc = key
        .to_public_key_der()
        .map_err(|e| KeyError::InvalidPublicKey {
            reason: format!("failed to encode public key: {}", e),
        })?;
    Ok(format!("sha256:{}", sha256_hex(doc.as_bytes())))
}

async fn read_key_file(path: &Path) -> KeyResult<String> {
    match fs::read_to_string(path).await {
        Ok(pem) => Ok(pem),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(KeyError::KeyFileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Generate a fresh Ed25519 pair and write it to the output directory.
///
/// Without `overwrite`, an existing file at either target path fails the
/// whole operation and neither file is written.
pub async fn generate_keypair(options: &KeyPairOptions) -> KeyResult<KeyPairPaths> {
    let dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir).await?;

    let public_key_path = dir.join(PUBLIC_KEY_FILE);
    let private_key_path = dir.join(PRIVATE_KEY_FILE);

    if !options.overwrite {
        for path in [&public_key_path, &private_key_path] {
            if fs::try_exists(path).await? {
                return Err(KeyError::AlreadyExists { path: path.clone() });
            }
        }
    }

    let signing_key = SigningKey::generate(&mut rand::thread_rng());
    let private_pem =
        signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyError::InvalidPrivateKey {
                reason: format!("failed to encode private key as PKCS#8 PEM: {}", e),
            })?;
    let public_pem = signing_key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyError::InvalidPublicKey {
            reason: format!("failed to encode public key as SPKI PEM: {}", e),
        })?;

    write_key_file(&public_key_path, public_pem.as_bytes(), options.overwrite, 0o644).await?;

    if let Err(e) = write_key_file(
        &private_key_path,
        private_pem.as_bytes(),
        options.overwrite,
        0o600,
    )
    .await
    {
        if !options.overwrite {
            // We created the public file above; do not leave half a pair.
            discard_partial_key(&public_key_path).await;
        }
        return Err(e);
    }

    info!(
        public_key = %public_key_path.display(),
        private_key = %private_key_path.display(),
        "generated ed25519 key pair"
    );

    Ok(KeyPairPaths {
        public_key_path,
        private_key_path,
    })
}

/// Remove a key file left behind by a failed generation.
///
/// Returns whether the file is gone. Failures are logged, not returned.
async fn discard_partial_key(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to remove public key after private key write failed"
            );
            false
        }
    }
}

async fn write_key_file(path: &Path, content: &[u8], overwrite: bool, mode: u32) -> KeyResult<()> {
    let mut open = fs::OpenOptions::new();
    open.write(true);
    if overwrite {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }
    #[cfg(unix)]
    open.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = open.open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            KeyError::AlreadyExists {
                path: path.to_path_buf(),
            }
        } else {
            KeyError::Io(e)
        }
    })?;
    file.write_all(content).await?;
    file.flush().await?;

    // `mode` only applies on creation; tighten replaced files too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    }

    debug!(path = %path.display(), "wrote key file");
    Ok(())
}
