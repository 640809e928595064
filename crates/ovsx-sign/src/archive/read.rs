use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{ArchiveError, ArchiveResult};

/// Upper bound on the buffer reserved up front for one entry.
///
/// Declared sizes come from untrusted headers; larger entries still read in
/// full, the buffer just grows as data arrives.
const MAX_PREALLOC: u64 = 1 << 20;

fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// A decompressed container entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path exactly as stored in the container (case preserved).
    pub path: String,

    /// Decompressed content.
    pub content: Vec<u8>,
}

/// Decompress every entry of `container`, in central directory order.
pub fn read_all(container: &[u8]) -> ArchiveResult<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(Cursor::new(container))?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let path = file.name().to_string();

        let mut content = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut content)
            .map_err(|e| ArchiveError::InvalidContainer {
                reason: format!("failed to decompress {}: {}", path, e),
            })?;

        entries.push(ArchiveEntry { path, content });
    }

    Ok(entries)
}

/// Stream `reader` entry by entry and return the content of the first entry
/// whose stored path equals `name`.
///
/// Entries before the match are decompressed into a sink and dropped.
pub fn extract_one<R: Read>(mut reader: R, name: &str) -> ArchiveResult<Vec<u8>> {
    loop {
        match zip::read::read_zipfile_from_stream(&mut reader) {
            Ok(Some(mut file)) => {
                if file.name() == name {
                    let mut content = Vec::with_capacity(capacity_hint(file.size()));
                    file.read_to_end(&mut content)
                        .map_err(|e| ArchiveError::InvalidContainer {
                            reason: format!("failed to decompress {}: {}", name, e),
                        })?;
                    return Ok(content);
                }

                let skipped = file.name().to_string();
                std::io::copy(&mut file, &mut std::io::sink()).map_err(|e| {
                    ArchiveError::InvalidContainer {
                        reason: format!("failed to skip {}: {}", skipped, e),
                    }
                })?;
            }
            Ok(None) => {
                return Err(ArchiveError::EntryMissing {
                    name: name.to_string(),
                })
            }
            Err(ZipError::UnsupportedArchive(reason)) => {
                return Err(ArchiveError::Unstreamable {
                    reason: reason.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// [`extract_one`] over a file on disk.
///
/// Falls back to a central directory lookup when the container cannot be
/// streamed; only the named entry is decompressed either way.
pub fn extract_one_from_path(path: &Path, name: &str) -> ArchiveResult<Vec<u8>> {
    let file = File::open(path)?;

    match extract_one(BufReader::new(file), name) {
        Err(ArchiveError::Unstreamable { reason }) => {
            debug!(
                path = %path.display(),
                reason = %reason,
                "container not streamable, using central directory"
            );
            extract_one_indexed(File::open(path)?, name)
        }
        other => other,
    }
}

/// Decompress the entry `name` of an in-memory container via its central
/// directory.
pub fn read_entry(container: &[u8], name: &str) -> ArchiveResult<Vec<u8>> {
    extract_one_indexed(Cursor::new(container), name)
}

fn extract_one_indexed<R: Read + Seek>(reader: R, name: &str) -> ArchiveResult<Vec<u8>> {
    let mut archive = ZipArchive::new(reader)?;

    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(ArchiveError::EntryMissing {
                name: name.to_string(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let mut content = Vec::with_capacity(capacity_hint(file.size()));
    file.read_to_end(&mut content)
        .map_err(|e| ArchiveError::InvalidContainer {
            reason: format!("failed to decompress {}: {}", name, e),
        })?;
    Ok(content)
}
