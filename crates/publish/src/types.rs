//! Data types for the publish flow.

use std::path::PathBuf;

/// Event emitted while publishing.
///
/// At most one of `Completed` / `Failed` is emitted per upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishEvent {
    /// Destinations were issued and transfers are about to begin.
    Started,
    /// Bytes sent so far in the current attempts, out of `total`.
    Progress { current: u64, total: u64 },
    /// Every byte was accepted (and, for archives, unpacked).
    Completed { uploaded_bytes: u64, domain: String },
    /// The upload failed; `path` names the local file at fault, if known.
    Failed {
        error: String,
        path: Option<PathBuf>,
    },
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub strategy: Strategy,
    /// Bytes transferred: the sum of the files, or the archive size.
    pub bytes: u64,
    /// Domain the build is served from.
    pub domain: String,
}

/// How the build is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One PUT per file.
    IndividualFiles,
    /// One PUT of a compressed archive, unpacked remotely.
    Archive,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndividualFiles => f.write_str("individual files"),
            Self::Archive => f.write_str("archive"),
        }
    }
}
