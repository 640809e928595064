//! Signature archives for VS Code extension packages.
//!
//! This crate implements both sides of the extension signature protocol:
//!
//! - Ed25519 signing of the raw VSIX bytes
//! - Per-entry and whole-package SHA-256 manifests
//! - Signature archive (`.sigzip`) creation and verification
//! - Public key resolution (local file → registry reference → registry default)
//! - Ed25519 key-pair generation
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use ovsx_sign::{generate_keypair, sign, verify, KeyPairOptions, SignOptions, VerifyOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let keys = generate_keypair(&KeyPairOptions::default().with_output_dir("keys")).await?;
//!
//! let archive = sign(
//!     Path::new("my-extension.vsix"),
//!     &keys.private_key_path,
//!     &SignOptions::default(),
//! )
//! .await?;
//!
//! let options = VerifyOptions::new()
//!     .with_public_key(&keys.public_key_path)
//!     .verify_signature_manifest();
//! let valid = verify(Path::new("my-extension.vsix"), &archive, &options).await?;
//! assert!(valid);
//! # Ok(())
//! # }
//! ```
//!
//! # Signature archive
//!
//! | Entry | Content |
//! |-------|---------|
//! | `.signature.sig` | Raw Ed25519 signature over the package bytes |
//! | `.signature.manifest` | JSON manifest (see [`manifest`]) |
//! | `.signature.p7s` | Empty placeholder for legacy consumers |
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `OVSX_REGISTRY_URL` | Registry base URL (default: `https://open-vsx.org`) |
//! | `VSX_REGISTRY_URL` | Registry base URL, used when `OVSX_REGISTRY_URL` is unset |
//! | `OVSX_REGISTRY_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `OVSX_REGISTRY_MAX_RETRIES` | Max retries for transient failures (default: 3) |

pub mod archive;
pub mod client;
mod digest;
pub mod error;
pub mod identity;
pub mod keys;
pub mod manifest;
pub mod resolver;
pub mod sign;
pub mod signature;
pub mod types;
pub mod verify;

/// Signature entry of a signature archive.
pub const SIGNATURE_ENTRY: &str = ".signature.sig";

/// Manifest entry of a signature archive.
pub const SIGNATURE_MANIFEST_ENTRY: &str = ".signature.manifest";

/// Placeholder entry of a signature archive.
pub const SIGNATURE_P7S_ENTRY: &str = ".signature.p7s";

/// Default signature archive file name.
pub const SIGNED_ARCHIVE_NAME: &str = "extension.sigzip";

// Re-export main types
pub use client::{RegistryClient, REGISTRY_USER_AGENT};
pub use digest::{sha256, sha256_base64, sha256_hex};
pub use error::{ErrorCode, RegistryError, RegistryResult, VerificationError};
pub use identity::{ExtensionIdentity, IdentityError};
pub use keys::{
    generate_keypair, key_id, load_private_key, load_public_key, KeyError, KeyPairOptions,
    KeyPairPaths, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE,
};
pub use manifest::{generate_manifest, verify_manifest, Manifest, ManifestEntry, ManifestError};
pub use resolver::{KeyResolver, KeySource, ResolveError, ResolvedKey};
pub use sign::{sign, SignOptions, SigningError};
pub use signature::{sign_bytes, verify_signature, SignatureError};
pub use types::{ExtensionFiles, ExtensionMetadata, RegistryConfig, DEFAULT_REGISTRY_URL};
pub use verify::{verify, verify_with_resolver, VerifyOptions};
