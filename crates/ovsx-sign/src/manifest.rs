//! Signature manifest: per-entry and whole-package size/digest record.
//!
//! ```json
//! {
//!   "package": { "size": 1234, "digests": { "sha256": "<base64>" } },
//!   "entries": {
//!     "<base64(entry path)>": { "size": 56, "digests": { "sha256": "<base64>" } }
//!   }
//! }
//! ```
//!
//! Verification has two negative outcomes. A whole-package size or digest
//! mismatch returns `Ok(false)`: the manifest simply belongs to another
//! package. A package that matches at the whole-package level but disagrees
//! on an individual entry is an error ([`ManifestError::EntryTampered`]).

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::archive::{read_all, ArchiveError};
use crate::digest::sha256_base64;

/// Manifest errors.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest does not have the required shape.
    #[error("signature manifest is malformed: {reason}")]
    Malformed { reason: String },

    /// A package entry is missing from the manifest or differs from it.
    #[error("entry {path} has been tampered with: {reason}")]
    EntryTampered { path: String, reason: String },

    /// The package could not be read as a zip container.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Digests recorded for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digests {
    /// Base64 SHA-256.
    pub sha256: String,
}

/// Size and digests of the whole package or of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Length in bytes.
    pub size: u64,

    /// Content digests.
    pub digests: Digests,
}

impl ManifestEntry {
    fn of(content: &[u8]) -> Self {
        Self {
            size: content.len() as u64,
            digests: Digests {
                sha256: sha256_base64(content),
            },
        }
    }
}

/// Signature manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// The raw package bytes.
    pub package: ManifestEntry,

    /// Package entries, keyed by base64 of the stored entry path.
    pub entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Validate an untrusted JSON value against the manifest shape.
    ///
    /// Unknown fields are ignored; missing or mistyped required fields are
    /// [`ManifestError::Malformed`].
    pub fn from_value(value: &Value) -> ManifestResult<Self> {
        Self::deserialize(value).map_err(|e| ManifestError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Parse and validate manifest JSON.
    pub fn from_slice(bytes: &[u8]) -> ManifestResult<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| ManifestError::Malformed {
            reason: format!("invalid JSON: {}", e),
        })?;
        Self::from_value(&value)
    }

    /// Serialize to the JSON stored in `.signature.manifest`.
    pub fn to_json(&self) -> Vec<u8> {
        // Only strings, integers and maps with string keys: cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Look up the record for a raw (not yet encoded) entry path.
    pub fn entry(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.get(&entry_key(path))
    }
}

/// Manifest key for an entry path.
pub fn entry_key(path: &str) -> String {
    BASE64.encode(path.as_bytes())
}

/// Build the manifest of `package`.
///
/// The package record covers the literal input bytes, not the entries
/// reassembled by the zip reader.
pub fn generate_manifest(package: &[u8]) -> ManifestResult<Manifest> {
    let entries = read_all(package)?
        .into_iter()
        .map(|entry| (entry_key(&entry.path), ManifestEntry::of(&entry.content)))
        .collect::<BTreeMap<_, _>>();

    debug!(
        size = package.len(),
        entries = entries.len(),
        "generated signature manifest"
    );

    Ok(Manifest {
        package: ManifestEntry::of(package),
        entries,
    })
}

/// Check `package` against an untrusted manifest value.
///
/// Precedence:
/// 1. malformed manifest: `Err(Malformed)`
/// 2. package size mismatch: `Ok(false)`
/// 3. package digest mismatch: `Ok(false)`
/// 4. any package entry absent from the manifest or differing in size or
///    digest: `Err(EntryTampered)`
/// 5. otherwise `Ok(true)`
pub fn verify_manifest(manifest: &Value, package: &[u8]) -> ManifestResult<bool> {
    let manifest = Manifest::from_value(manifest)?;
    verify_parsed_manifest(&manifest, package)
}

/// [`verify_manifest`] for an already validated manifest.
pub fn verify_parsed_manifest(manifest: &Manifest, package: &[u8]) -> ManifestResult<bool> {
    if manifest.package.size != package.len() as u64 {
        debug!(
            expected = manifest.package.size,
            actual = package.len(),
            "package size mismatch"
        );
        return Ok(false);
    }

    if manifest.package.digests.sha256 != sha256_base64(package) {
        debug!("package digest mismatch");
        return Ok(false);
    }

    for entry in read_all(package)? {
        let Some(recorded) = manifest.entry(&entry.path) else {
            return Err(ManifestError::EntryTampered {
                path: entry.path,
                reason: "entry is not listed in the manifest".to_string(),
            });
        };

        if recorded.size != entry.content.len() as u64 {
            return Err(ManifestError::EntryTampered {
                path: entry.path,
                reason: format!(
                    "size {} does not match manifest size {}",
                    entry.content.len(),
                    recorded.size
                ),
            });
        }

        if recorded.digests.sha256 != sha256_base64(&entry.content) {
            return Err(ManifestError::EntryTampered {
                path: entry.path,
                reason: "content digest does not match manifest".to_string(),
            });
        }
    }

    Ok(true)
}
