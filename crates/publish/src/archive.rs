//! Archive building for the single-archive strategy.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use staticpub_protocol::FileDescriptor;
use tracing::{debug, warn};
use uuid::Uuid;
use zip::write::SimpleFileOptions;

use crate::error::PublishError;

/// Builds one archive from a set of files.
///
/// Called on a blocking thread; implementations may do synchronous I/O.
pub trait ArchiveBuilder: Send + Sync {
    fn build(&self, files: &[FileDescriptor]) -> Result<BuiltArchive, PublishError>;
}

/// An archive on disk, ready for upload.
#[derive(Debug)]
pub struct BuiltArchive {
    path: PathBuf,
    size: u64,
    remove_on_drop: bool,
}

impl BuiltArchive {
    /// An archive that is deleted when this value is dropped.
    pub fn temporary(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            remove_on_drop: true,
        }
    }

    /// An archive owned by the caller; left in place on drop.
    pub fn persistent(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            remove_on_drop: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for BuiltArchive {
    fn drop(&mut self) {
        if !self.remove_on_drop {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove temporary archive");
        }
    }
}

/// Writes a deflated zip into the system temp directory.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiveBuilder {
    dir: Option<PathBuf>,
}

impl ZipArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places archives in `dir` instead of the system temp directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl ArchiveBuilder for ZipArchiveBuilder {
    fn build(&self, files: &[FileDescriptor]) -> Result<BuiltArchive, PublishError> {
        let dir = self.dir.clone().unwrap_or_else(std::env::temp_dir);
        let path = dir.join(format!("staticpub-{}.zip", Uuid::new_v4()));

        // Own the path before writing so a partial archive is cleaned up too.
        let mut archive = BuiltArchive::temporary(path, 0);
        write_zip(&archive.path, files)?;
        archive.size = std::fs::metadata(&archive.path)?.len();

        debug!(
            path = %archive.path.display(),
            files = files.len(),
            bytes = archive.size,
            "archive built"
        );
        Ok(archive)
    }
}

fn write_zip(path: &Path, files: &[FileDescriptor]) -> Result<(), PublishError> {
    let mut writer = zip::ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for file in files {
        let mut source = File::open(&file.local_path)?;
        writer.start_file(file.target_path.as_str(), options)?;
        io::copy(&mut source, &mut writer)?;
    }

    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn fixture(dir: &Path, target: &str, contents: &[u8]) -> FileDescriptor {
        let local = dir.join(target.replace('/', "_"));
        std::fs::write(&local, contents).unwrap();
        FileDescriptor::new(local, target, contents.len() as u64)
    }

    #[test]
    fn zip_contains_every_target_path() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let files = vec![
            fixture(src.path(), "index.html", &b"<html>".repeat(200)),
            fixture(src.path(), "assets/main.js", &b"let a = 1;".repeat(200)),
        ];

        let archive = ZipArchiveBuilder::in_dir(out.path()).build(&files).unwrap();
        assert!(archive.path().starts_with(out.path()));
        assert_eq!(archive.size(), std::fs::metadata(archive.path()).unwrap().len());
        assert!(archive.size() < 3000);

        let mut zip = zip::ZipArchive::new(File::open(archive.path()).unwrap()).unwrap();
        let mut body = String::new();
        zip.by_name("assets/main.js")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "let a = 1;".repeat(200));
        assert!(zip.by_name("index.html").is_ok());
    }

    #[test]
    fn temporary_archive_is_removed_on_drop() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let files = vec![fixture(src.path(), "a.txt", b"a")];

        let archive = ZipArchiveBuilder::in_dir(out.path()).build(&files).unwrap();
        let path = archive.path().to_path_buf();
        assert!(path.exists());

        drop(archive);
        assert!(!path.exists());
    }

    #[test]
    fn persistent_archive_survives_drop() {
        let out = TempDir::new().unwrap();
        let path = out.path().join("keep.zip");
        std::fs::write(&path, b"zip").unwrap();

        drop(BuiltArchive::persistent(path.clone(), 3));
        assert!(path.exists());
    }

    #[test]
    fn missing_source_fails_and_leaves_nothing_behind() {
        let out = TempDir::new().unwrap();
        let files = vec![FileDescriptor::new("/nonexistent/a.txt", "a.txt", 1)];

        let err = ZipArchiveBuilder::in_dir(out.path()).build(&files).unwrap_err();
        assert!(matches!(err, PublishError::Io(_)));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
