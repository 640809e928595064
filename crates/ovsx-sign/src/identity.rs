//! Extension identity read from a VSIX package.

use serde::Deserialize;

use crate::archive::{read_entry, ArchiveError};

/// Entry holding the extension's `package.json` inside a VSIX.
pub const PACKAGE_JSON_ENTRY: &str = "extension/package.json";

/// Identity errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The package metadata is missing, unparsable or incomplete.
    #[error("invalid extension manifest: {reason}")]
    InvalidManifest { reason: String },

    /// The package is not a readable zip container.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Publisher, name and version of an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionIdentity {
    pub publisher: String,
    pub name: String,
    pub version: String,
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

impl ExtensionIdentity {
    pub fn new(
        publisher: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher: publisher.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Read the identity from the `package.json` of a VSIX.
    ///
    /// `publisher` and `name` are required and must be non-empty; a missing
    /// version is kept as an empty string.
    pub fn from_package(package: &[u8]) -> Result<Self, IdentityError> {
        let bytes = match read_entry(package, PACKAGE_JSON_ENTRY) {
            Ok(bytes) => bytes,
            Err(ArchiveError::EntryMissing { .. }) => {
                return Err(IdentityError::InvalidManifest {
                    reason: format!("{} not found in package", PACKAGE_JSON_ENTRY),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let manifest: PackageJson =
            serde_json::from_slice(&bytes).map_err(|e| IdentityError::InvalidManifest {
                reason: format!("failed to parse {}: {}", PACKAGE_JSON_ENTRY, e),
            })?;

        let publisher = required(manifest.publisher, "publisher")?;
        let name = required(manifest.name, "name")?;

        Ok(Self {
            publisher,
            name,
            version: manifest.version.unwrap_or_default().trim().to_string(),
        })
    }

    /// `publisher.name`.
    pub fn id(&self) -> String {
        format!("{}.{}", self.publisher, self.name)
    }
}

impl std::fmt::Display for ExtensionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.id())
        } else {
            write!(f, "{}@{}", self.id(), self.version)
        }
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, IdentityError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(IdentityError::InvalidManifest {
            reason: format!("{} is missing or empty", field),
        }),
    }
}
