//! Strategy selection between individual files and a single archive.
//!
//! The choice is empirical: the archive is built first and kept only when it
//! is no larger than the files it replaces.

use crate::error::PublishError;

/// Rejects an archive larger than the sum of the original files.
///
/// Returns the number of bytes the archive saves (zero when sizes are equal).
pub fn check_compression(archive_size: u64, original_size: u64) -> Result<u64, PublishError> {
    if archive_size > original_size {
        return Err(PublishError::CompressionIneffective {
            archive_size,
            original_size,
        });
    }
    Ok(original_size - archive_size)
}
