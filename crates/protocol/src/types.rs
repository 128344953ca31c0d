use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One artifact file to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Path of the file on the local disk.
    pub local_path: PathBuf,
    /// Destination-relative path, always `/`-separated.
    pub target_path: String,
    /// Size in bytes, as measured at enumeration time.
    pub content_length: u64,
}

impl FileDescriptor {
    pub fn new(
        local_path: impl Into<PathBuf>,
        target_path: impl Into<String>,
        content_length: u64,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            target_path: target_path.into(),
            content_length,
        }
    }
}

/// A file joined with the write location issued for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedFile {
    pub file: FileDescriptor,
    pub target_url: String,
    pub content_type: String,
}

impl TargetedFile {
    pub fn content_length(&self) -> u64 {
        self.file.content_length
    }
}

/// Sums the declared content length of `files`.
pub fn total_content_length(files: &[FileDescriptor]) -> u64 {
    files.iter().map(|f| f.content_length).sum()
}
