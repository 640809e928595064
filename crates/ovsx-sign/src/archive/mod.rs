//! Zip container access.
//!
//! Two read strategies with different costs:
//! - [`read_all`] buffers every entry; used for packages, where the manifest
//!   needs every entry's content.
//! - [`extract_one`] streams the container and buffers only the named entry;
//!   used for signature archives, which are small and name-addressed.
//!
//! [`write_archive`] builds the signature archive in memory.

mod read;
mod write;

pub use read::{extract_one, extract_one_from_path, read_all, read_entry, ArchiveEntry};
pub use write::write_archive;

/// Container errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The bytes are not a readable zip structure.
    #[error("invalid zip container: {reason}")]
    InvalidContainer { reason: String },

    /// No entry with the requested path exists.
    #[error("entry not found in container: {name}")]
    EntryMissing { name: String },

    /// The container defers entry sizes to a trailing data descriptor, so it
    /// cannot be read front to back.
    #[error("container cannot be streamed: {reason}")]
    Unstreamable { reason: String },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        // Zip-level I/O failures come from truncated or corrupt data, not
        // from the filesystem.
        Self::InvalidContainer {
            reason: err.to_string(),
        }
    }
}

/// Result type for container operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
