//! Publish error types.

use std::path::{Path, PathBuf};

use staticpub_transfer::{Aborted, SentinelError, TransferError};

/// Errors produced while publishing a build.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("{source}")]
    Sentinel {
        /// The archive whose unpack was being awaited.
        path: PathBuf,
        #[source]
        source: SentinelError,
    },

    #[error("archive ({archive_size} bytes) is larger than the individual files ({original_size} bytes)")]
    CompressionIneffective { archive_size: u64, original_size: u64 },

    #[error("destination issuance failed: {0}")]
    Issuer(String),

    #[error("no upload destination issued for {0}")]
    MissingDestination(String),

    #[error("destination issued for unknown target path {0}")]
    UnknownTarget(String),

    #[error("more than one file targets {0}")]
    DuplicateTarget(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Aborted(String),
}

impl PublishError {
    /// Local path the failure is attributed to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Transfer(e) => e.path(),
            Self::Sentinel { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether the failure came from the session's abort signal.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            Self::Aborted(_)
                | Self::Transfer(TransferError::Aborted(_))
                | Self::Sentinel {
                    source: SentinelError::Aborted(_),
                    ..
                }
        )
    }
}

impl From<Aborted> for PublishError {
    fn from(aborted: Aborted) -> Self {
        Self::Aborted(aborted.0)
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        Self::Issuer(e.to_string())
    }
}

impl From<zip::result::ZipError> for PublishError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}
