use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime as ZipDateTime, ZipWriter};

use super::{ArchiveError, ArchiveResult};

/// Build a zip container holding exactly `entries`, in order.
///
/// Entries are deflated at level 9 with a fixed timestamp, so the same input
/// always yields the same bytes. Callers must not pass duplicate names.
pub fn write_archive(entries: &[(&str, &[u8])]) -> ArchiveResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(zip_timestamp())
        .unix_permissions(0o644);

    for (name, content) in entries {
        writer.start_file(*name, options)?;
        writer
            .write_all(content)
            .map_err(|e| ArchiveError::InvalidContainer {
                reason: format!("failed to write {}: {}", name, e),
            })?;
    }

    Ok(writer.finish()?.into_inner())
}

fn zip_timestamp() -> ZipDateTime {
    ZipDateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).unwrap_or_default()
}
