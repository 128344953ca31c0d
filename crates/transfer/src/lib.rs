//! Network primitives for publishing a build: retrying PUT uploads with
//! progress reporting, and polling of the remote unpack sentinel.
//!
//! Both operations observe an [`AbortSignal`] before every attempt and
//! abandon in-flight requests as soon as it fires.

mod abort;
mod progress;
mod retry;
mod sentinel;
mod upload;

use std::path::{Path, PathBuf};

pub use abort::{AbortSignal, Aborted};
pub use progress::{ProgressCallback, TransferProgress};
pub use retry::{Attempt, PollPolicy, RetryPolicy};
pub use sentinel::SentinelPoller;
pub use upload::Uploader;

/// Errors produced while uploading a payload.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to upload {}: {reason}", path.display())]
    Failed { path: PathBuf, reason: String },

    #[error("{0}")]
    Aborted(String),
}

impl TransferError {
    /// Local path of the payload the error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Failed { path, .. } => Some(path),
            Self::Aborted(_) => None,
        }
    }
}

impl From<Aborted> for TransferError {
    fn from(aborted: Aborted) -> Self {
        Self::Aborted(aborted.0)
    }
}

/// Errors produced while waiting for the remote unpack sentinel.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    /// The signed sentinel URL was rejected; polling again cannot help.
    #[error("provided signature expired")]
    ExpiredSignature,

    /// The sentinel never became readable within the poll budget.
    #[error("sentinel file not present: {0}")]
    Unavailable(String),

    /// The remote unpack step reported a failure.
    #[error("archive failed to unpack remotely (sentinel: {0:?})")]
    UnpackFailed(String),

    #[error("{0}")]
    Aborted(String),
}

impl From<Aborted> for SentinelError {
    fn from(aborted: Aborted) -> Self {
        Self::Aborted(aborted.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_error_exposes_local_path() {
        let err = TransferError::Failed {
            path: PathBuf::from("/build/main.js"),
            reason: "server responded with 500".into(),
        };
        assert_eq!(err.path(), Some(Path::new("/build/main.js")));
        assert!(err.to_string().contains("/build/main.js"));

        let aborted = TransferError::from(Aborted("user cancelled".into()));
        assert!(aborted.path().is_none());
        assert_eq!(aborted.to_string(), "user cancelled");
    }

    #[test]
    fn sentinel_unpack_failure_shows_body() {
        let err = SentinelError::UnpackFailed("ERROR".into());
        assert!(err.to_string().contains("\"ERROR\""));
    }
}
