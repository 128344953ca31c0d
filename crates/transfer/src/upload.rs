//! Retrying HTTP PUT of a local file with streamed progress.

use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::TransferError;
use crate::abort::AbortSignal;
use crate::progress::{ProgressCallback, TransferProgress, clamp_delta};
use crate::retry::{Attempt, RetryPolicy};

/// Uploads payloads to pre-signed URLs.
///
/// The destination does not support partial writes, so every attempt
/// re-sends the whole payload from the start.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: Client,
    retry: RetryPolicy,
}

impl Uploader {
    pub fn new(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// PUTs the file at `path` to `url`.
    ///
    /// `progress` receives a [`TransferProgress::Sent`] delta for every chunk
    /// read from disk and a [`TransferProgress::Restarted`] before each retry.
    /// Non-success responses and network errors are retried; on exhaustion the
    /// last [`TransferError::Failed`] is returned, naming `path`.
    pub async fn put_file(
        &self,
        url: &str,
        path: &Path,
        content_type: &str,
        content_length: u64,
        abort: &AbortSignal,
        progress: ProgressCallback,
    ) -> Result<(), TransferError> {
        debug!(path = %path.display(), bytes = content_length, url, "uploading");

        let result = self
            .retry
            .run(abort, |attempt| {
                let progress = Arc::clone(&progress);
                async move {
                    if attempt > 1 {
                        progress(TransferProgress::Restarted);
                    }
                    self.put_once(url, path, content_type, content_length, abort, progress)
                        .await
                }
            })
            .await;

        match &result {
            Ok(()) => debug!(path = %path.display(), "uploaded"),
            Err(TransferError::Aborted(reason)) => {
                debug!(path = %path.display(), %reason, "upload aborted")
            }
            Err(e) => warn!(path = %path.display(), error = %e, "upload failed"),
        }
        result
    }

    async fn put_once(
        &self,
        url: &str,
        path: &Path,
        content_type: &str,
        content_length: u64,
        abort: &AbortSignal,
        progress: ProgressCallback,
    ) -> Result<(), Attempt<TransferError>> {
        // A file that cannot be opened will not open on the next attempt either.
        let file = tokio::fs::File::open(path).await.map_err(|source| {
            Attempt::Bail(TransferError::Read {
                path: path.to_path_buf(),
                source,
            })
        })?;

        let mut sent: u64 = 0;
        let body = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                let delta = clamp_delta(&mut sent, bytes.len() as u64, content_length);
                if delta > 0 {
                    progress(TransferProgress::Sent(delta));
                }
            }
            chunk
        });

        let request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(Body::wrap_stream(body))
            .send();

        let response = tokio::select! {
            biased;
            _ = abort.aborted() => {
                return Err(Attempt::Bail(TransferError::Aborted(abort.reason())));
            }
            response = request => response,
        };

        let response = response.map_err(|e| Attempt::Retry(failed(path, e.to_string())))?;
        let status = response.status();
        if !status.is_success() {
            debug!(path = %path.display(), %status, "upload rejected");
            return Err(Attempt::Retry(failed(
                path,
                format!("server responded with {status}"),
            )));
        }

        Ok(())
    }
}

fn failed(path: &Path, reason: String) -> TransferError {
    TransferError::Failed {
        path: path.to_path_buf(),
        reason,
    }
}
