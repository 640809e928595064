//! Package verification.
//!
//! Steps run in a fixed order and stop at the first failure:
//! package exists, signature archive exists, package identity, public key,
//! signature entry, then (opt-in) manifest entry and manifest check, and
//! finally the signature check.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::{debug, info};

use crate::archive::{extract_one_from_path, ArchiveError, ArchiveResult};
use crate::error::{ErrorCode, VerificationError};
use crate::identity::{ExtensionIdentity, IdentityError};
use crate::keys::KeyError;
use crate::manifest::{verify_manifest, ManifestError};
use crate::resolver::{KeyResolver, ResolveError};
use crate::signature::verify_signature;
use crate::{SIGNATURE_ENTRY, SIGNATURE_MANIFEST_ENTRY};

/// Verification options.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Local public key (SPKI PEM). When unset the key is resolved through
    /// the registry.
    pub public_key: Option<PathBuf>,

    /// Also check the signature manifest against the package (default: off).
    pub verify_signature_manifest: bool,
}

impl VerifyOptions {
    /// Create default options (registry key, signature check only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify with a local public key file.
    pub fn with_public_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.public_key = Some(path.into());
        self
    }

    /// Enable the signature manifest check.
    pub fn verify_signature_manifest(mut self) -> Self {
        self.verify_signature_manifest = true;
        self
    }
}

/// Verify `package_path` against the signature archive at `archive_path`,
/// resolving registry keys with a client configured from the environment.
pub async fn verify(
    package_path: &Path,
    archive_path: &Path,
    options: &VerifyOptions,
) -> Result<bool, VerificationError> {
    let resolver = KeyResolver::from_env().map_err(|e| {
        VerificationError::aborted(
            ErrorCode::PublicKeyUnreachable,
            format!("failed to configure registry client: {}", e),
        )
    })?;

    verify_with_resolver(package_path, archive_path, options, &resolver).await
}

/// Verify `package_path` against the signature archive at `archive_path`.
///
/// Returns `Ok(true)` once every requested check has passed; every
/// negative outcome is a [`VerificationError`].
pub async fn verify_with_resolver(
    package_path: &Path,
    archive_path: &Path,
    options: &VerifyOptions,
    resolver: &KeyResolver,
) -> Result<bool, VerificationError> {
    debug!(path = %package_path.display(), "checking package");
    if !is_file(package_path).await {
        return Err(VerificationError::aborted(
            ErrorCode::PackageIsInvalidZip,
            format!(
                "the extension package is not a valid zip file: {} does not exist",
                package_path.display()
            ),
        ));
    }

    debug!(path = %archive_path.display(), "checking signature archive");
    if !is_file(archive_path).await {
        return Err(VerificationError::aborted(
            ErrorCode::SignatureArchiveIsInvalidZip,
            format!(
                "the signature archive is not a valid zip file: {} does not exist",
                archive_path.display()
            ),
        ));
    }

    let package = fs::read(package_path).await.map_err(|e| {
        VerificationError::aborted(
            ErrorCode::PackageIsInvalidZip,
            format!("failed to read {}: {}", package_path.display(), e),
        )
    })?;

    debug!(bytes = package.len(), "reading extension identity");
    let identity = ExtensionIdentity::from_package(&package).map_err(identity_failure)?;
    debug!(extension = %identity, "read extension identity");

    let resolved = resolver
        .resolve_public_key(&identity, options.public_key.as_deref())
        .await
        .map_err(resolve_failure)?;

    debug!(entry = SIGNATURE_ENTRY, "extracting signature");
    let signature = extract_entry(archive_path, SIGNATURE_ENTRY)
        .await
        .map_err(|e| entry_failure(e, ErrorCode::SignatureIsMissing))?;

    if options.verify_signature_manifest {
        debug!(entry = SIGNATURE_MANIFEST_ENTRY, "extracting signature manifest");
        let manifest_bytes = extract_entry(archive_path, SIGNATURE_MANIFEST_ENTRY)
            .await
            .map_err(|e| entry_failure(e, ErrorCode::SignatureManifestIsMissing))?;

        let manifest: Value = serde_json::from_slice(&manifest_bytes).map_err(|e| {
            VerificationError::aborted(
                ErrorCode::SignatureManifestIsMalformed,
                format!("the signature manifest is not valid JSON: {}", e),
            )
        })?;

        debug!("verifying signature manifest");
        match verify_manifest(&manifest, &package) {
            Ok(true) => debug!("signature manifest is valid"),
            Ok(false) => {
                return Err(VerificationError::executed(
                    ErrorCode::SignatureManifestIsInvalid,
                    "the signature manifest is not valid",
                ))
            }
            Err(e) => return Err(manifest_failure(e)),
        }
    }

    debug!(source = %resolved.source, "verifying signature");
    match verify_signature(&package, &resolved.key, &signature) {
        Ok(true) => {}
        Ok(false) => {
            return Err(VerificationError::executed(
                ErrorCode::SignatureIsInvalid,
                "the signature is not valid",
            ))
        }
        Err(e) => {
            return Err(VerificationError::executed(
                ErrorCode::SignatureIsInvalid,
                format!("the signature is not valid: {}", e),
            ))
        }
    }

    info!(extension = %identity, "signature is valid");
    Ok(true)
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Pull one entry out of the signature archive on a blocking thread.
async fn extract_entry(archive_path: &Path, name: &'static str) -> ArchiveResult<Vec<u8>> {
    let path = archive_path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_one_from_path(&path, name))
        .await
        .map_err(|e| ArchiveError::Io(std::io::Error::other(e.to_string())))?
}

fn identity_failure(err: IdentityError) -> VerificationError {
    match err {
        IdentityError::InvalidManifest { reason } => VerificationError::aborted(
            ErrorCode::ExtensionManifestIsInvalid,
            format!("the extension manifest is not valid: {}", reason),
        ),
        IdentityError::Archive(e) => VerificationError::aborted(
            ErrorCode::PackageIsInvalidZip,
            format!("the extension package is not a valid zip file: {}", e),
        ),
    }
}

fn resolve_failure(err: ResolveError) -> VerificationError {
    let code = match &err {
        ResolveError::Key(KeyError::KeyFileNotFound { .. }) | ResolveError::Key(KeyError::Io(_)) => {
            ErrorCode::KeyFileNotFound
        }
        ResolveError::Key(_) => ErrorCode::PublicKeyIsInvalid,
        ResolveError::PublicKeyUnreachable { .. } | ResolveError::Fetch { .. } => {
            ErrorCode::PublicKeyUnreachable
        }
    };
    VerificationError::aborted(code, err.to_string())
}

fn entry_failure(err: ArchiveError, missing: ErrorCode) -> VerificationError {
    match err {
        ArchiveError::EntryMissing { name } => VerificationError::aborted(
            missing,
            format!("{} is missing from the signature archive", name),
        ),
        other => VerificationError::aborted(
            ErrorCode::SignatureArchiveIsInvalidZip,
            format!("the signature archive is not a valid zip file: {}", other),
        ),
    }
}

fn manifest_failure(err: ManifestError) -> VerificationError {
    match err {
        ManifestError::Malformed { .. } => {
            VerificationError::aborted(ErrorCode::SignatureManifestIsMalformed, err.to_string())
        }
        ManifestError::EntryTampered { .. } => {
            VerificationError::executed(ErrorCode::EntryIsTampered, err.to_string())
        }
        ManifestError::Archive(e) => VerificationError::aborted(
            ErrorCode::PackageIsInvalidZip,
            format!("the extension package is not a valid zip file: {}", e),
        ),
    }
}
