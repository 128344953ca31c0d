//! Build directory enumeration.
//!
//! Recursively walks a build output directory and produces a
//! [`FileDescriptor`] per file, with target paths normalized to forward
//! slashes.

use std::path::Path;

use staticpub_protocol::FileDescriptor;

use crate::error::PublishError;

/// Scans `root` recursively and returns one descriptor per regular file.
///
/// Target paths are relative to `root` and use `/` as separator (even on
/// Windows). Entries are sorted by target path.
pub fn scan_build_dir(root: &Path) -> Result<Vec<FileDescriptor>, PublishError> {
    let mut files = Vec::new();
    walk_dir(root, root, &mut files)?;
    files.sort_by(|a, b| a.target_path.cmp(&b.target_path));
    Ok(files)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    files: &mut Vec<FileDescriptor>,
) -> Result<(), PublishError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            walk_dir(root, &path, files)?;
        } else if metadata.is_file() {
            let rel_path = path.strip_prefix(root).map_err(std::io::Error::other)?;
            let target_path = rel_path.to_string_lossy().replace('\\', "/");
            files.push(FileDescriptor::new(path.clone(), target_path, metadata.len()));
        }
    }

    Ok(())
}
