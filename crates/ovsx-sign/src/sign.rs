//! Package signing.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::archive::{write_archive, ArchiveError};
use crate::keys::{key_id, load_private_key, KeyError};
use crate::manifest::{generate_manifest, ManifestError};
use crate::signature::sign_bytes;
use crate::{SIGNATURE_ENTRY, SIGNATURE_MANIFEST_ENTRY, SIGNATURE_P7S_ENTRY, SIGNED_ARCHIVE_NAME};

/// Signing errors.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// The package could not be read.
    #[error("failed to read package {}: {source}", .path.display())]
    PackageUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The private key could not be loaded.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The package could not be manifested.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The signature archive could not be built.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The signature archive could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Signing options.
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    /// Where to write the signature archive (default: `./extension.sigzip`).
    pub output: Option<PathBuf>,
}

impl SignOptions {
    /// Write the signature archive to `path`.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(".").join(SIGNED_ARCHIVE_NAME))
    }
}

/// Sign the package at `package_path` with the PKCS#8 PEM key at
/// `private_key_path` and write the signature archive.
///
/// Returns the path of the written archive.
pub async fn sign(
    package_path: &Path,
    private_key_path: &Path,
    options: &SignOptions,
) -> Result<PathBuf, SigningError> {
    let package = fs::read(package_path)
        .await
        .map_err(|source| SigningError::PackageUnreadable {
            path: package_path.to_path_buf(),
            source,
        })?;
    let key = load_private_key(private_key_path).await?;

    debug!(path = %package_path.display(), bytes = package.len(), "signing package");
    let signature = sign_bytes(&package, &key);

    let manifest = generate_manifest(&package)?;
    debug!(entries = manifest.entries.len(), "generated signature manifest");
    let manifest_json = manifest.to_json();

    let archive = write_archive(&[
        (SIGNATURE_ENTRY, signature.as_slice()),
        (SIGNATURE_MANIFEST_ENTRY, manifest_json.as_slice()),
        (SIGNATURE_P7S_ENTRY, b"".as_slice()),
    ])?;

    let output = options.output_path();
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&output, &archive).await?;

    info!(
        package = %package_path.display(),
        output = %output.display(),
        key_id = %key_id(&key.verifying_key()).unwrap_or_default(),
        "wrote signature archive"
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::read_all;
    use crate::keys::{generate_keypair, KeyPairOptions};

    #[tokio::test]
    async fn test_sign_writes_three_entries_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let keys = generate_keypair(&KeyPairOptions::default().with_output_dir(dir.path()))
            .await
            .unwrap();

        let package_path = dir.path().join("ext.vsix");
        let package = write_archive(&[("extension/package.json", b"{}".as_slice())]).unwrap();
        std::fs::write(&package_path, &package).unwrap();

        let output = sign(
            &package_path,
            &keys.private_key_path,
            &SignOptions::default().with_output(dir.path().join("out").join("ext.sigzip")),
        )
        .await
        .unwrap();

        assert_eq!(output, dir.path().join("out").join("ext.sigzip"));

        let entries = read_all(&std::fs::read(&output).unwrap()).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            names,
            vec![SIGNATURE_ENTRY, SIGNATURE_MANIFEST_ENTRY, SIGNATURE_P7S_ENTRY]
        );
        assert_eq!(entries[0].content.len(), 64);
        assert!(entries[2].content.is_empty());
    }

    #[tokio::test]
    async fn test_sign_missing_package() {
        let dir = tempfile::tempdir().unwrap();
        let keys = generate_keypair(&KeyPairOptions::default().with_output_dir(dir.path()))
            .await
            .unwrap();

        let result = sign(
            &dir.path().join("missing.vsix"),
            &keys.private_key_path,
            &SignOptions::default(),
        )
        .await;

        assert!(matches!(
            result,
            Err(SigningError::PackageUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_sign_rejects_non_zip_package() {
        let dir = tempfile::tempdir().unwrap();
        let keys = generate_keypair(&KeyPairOptions::default().with_output_dir(dir.path()))
            .await
            .unwrap();

        let package_path = dir.path().join("ext.vsix");
        std::fs::write(&package_path, b"not a zip").unwrap();

        let result = sign(
            &package_path,
            &keys.private_key_path,
            &SignOptions::default().with_output(dir.path().join("ext.sigzip")),
        )
        .await;

        assert!(matches!(result, Err(SigningError::Manifest(_))));
        assert!(!dir.path().join("ext.sigzip").exists());
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            SignOptions::default().output_path(),
            PathBuf::from("./extension.sigzip")
        );
    }
}
