//! Upload orchestrator for both publish strategies.
//!
//! Acquires destinations, drives the transfers (and, for archives, the
//! unpack sentinel), aggregates progress, and reports exactly one terminal
//! event per upload.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use staticpub_protocol::constants::ARCHIVE_CONTENT_TYPE;
use staticpub_protocol::{
    FileDescriptor, TargetedFile, UploadTarget, ZipUploadUrl, total_content_length,
};
use staticpub_transfer::{AbortSignal, SentinelPoller, Uploader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveBuilder, BuiltArchive};
use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::issuer::DestinationIssuer;
use crate::progress::{ProgressAggregator, ProgressUpdate, forward_to};
use crate::strategy::check_compression;
use crate::types::{PublishEvent, Strategy, Uploaded};

/// An archive that passed the compression check, with its destination.
struct PreparedArchive {
    archive: BuiltArchive,
    destination: ZipUploadUrl,
}

/// Publishes one build.
pub struct Publisher {
    config: PublishConfig,
    issuer: Arc<dyn DestinationIssuer>,
    archiver: Arc<dyn ArchiveBuilder>,
    uploader: Uploader,
    poller: SentinelPoller,
    abort: AbortSignal,
}

impl Publisher {
    pub fn new(
        config: PublishConfig,
        client: Client,
        issuer: Arc<dyn DestinationIssuer>,
        archiver: Arc<dyn ArchiveBuilder>,
    ) -> Self {
        let uploader = Uploader::new(client.clone(), config.retry_policy());
        let poller = SentinelPoller::new(client, config.poll_policy());
        Self {
            config,
            issuer,
            archiver,
            uploader,
            poller,
            abort: AbortSignal::new(),
        }
    }

    /// Replaces the session's abort signal.
    pub fn with_abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// Signal that cancels every in-flight operation of this publisher.
    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    /// Publishes `files`, preferring the archive when configured to.
    ///
    /// If the archive cannot be prepared (including when it does not shrink
    /// the upload) the files are sent individually instead. Once the archive
    /// transfer has started, failures are final.
    pub async fn publish(
        &self,
        files: &[FileDescriptor],
        events: &mpsc::Sender<PublishEvent>,
    ) -> Result<Uploaded, PublishError> {
        if self.config.archive {
            match self.prepare_archive(files).await {
                Ok(prepared) => {
                    let result = self.send_archive(prepared, events).await;
                    return report(result, events).await;
                }
                Err(e) if e.is_aborted() => return report(Err(e), events).await,
                Err(e) => {
                    debug!(error = %e, "archive unavailable, uploading individual files");
                }
            }
        }
        self.upload_as_individual_files(files, events).await
    }

    /// Uploads every file to its own destination, all concurrently.
    pub async fn upload_as_individual_files(
        &self,
        files: &[FileDescriptor],
        events: &mpsc::Sender<PublishEvent>,
    ) -> Result<Uploaded, PublishError> {
        let result = self.send_files(files, events).await;
        report(result, events).await
    }

    /// Uploads `files` as one archive and waits for it to be unpacked.
    pub async fn upload_as_archive(
        &self,
        files: &[FileDescriptor],
        events: &mpsc::Sender<PublishEvent>,
    ) -> Result<Uploaded, PublishError> {
        let result = match self.prepare_archive(files).await {
            Ok(prepared) => self.send_archive(prepared, events).await,
            Err(e) => Err(e),
        };
        report(result, events).await
    }

    async fn send_files(
        &self,
        files: &[FileDescriptor],
        events: &mpsc::Sender<PublishEvent>,
    ) -> Result<Uploaded, PublishError> {
        self.abort.check()?;

        let paths = target_paths(files)?;
        let issued = self.issuer.upload_urls(&self.config.build_id, &paths).await?;
        let targets = join_destinations(files, issued.urls)?;

        let aggregator = ProgressAggregator::new(targets.iter().map(TargetedFile::content_length));
        let total = aggregator.total();
        debug!(files = targets.len(), bytes = total, "uploading individual files");
        let _ = events.send(PublishEvent::Started).await;

        let (tx, rx) = mpsc::unbounded_channel();
        let transfers = futures_util::future::try_join_all(targets.iter().enumerate().map(
            |(index, target)| {
                self.uploader.put_file(
                    &target.target_url,
                    &target.file.local_path,
                    &target.content_type,
                    target.content_length(),
                    &self.abort,
                    forward_to(tx.clone(), index),
                )
            },
        ));
        drop(tx);

        relay_progress(aggregator, rx, transfers, events).await?;

        Ok(Uploaded {
            strategy: Strategy::IndividualFiles,
            bytes: total,
            domain: issued.domain,
        })
    }

    /// Builds the archive, checks it is worth sending, and acquires its
    /// destination. Emits no events.
    async fn prepare_archive(
        &self,
        files: &[FileDescriptor],
    ) -> Result<PreparedArchive, PublishError> {
        self.abort.check()?;

        let original_size = total_content_length(files);
        let archiver = Arc::clone(&self.archiver);
        let owned = files.to_vec();
        let archive = tokio::task::spawn_blocking(move || archiver.build(&owned))
            .await
            .map_err(|e| PublishError::Archive(format!("archive task failed: {e}")))??;

        let saved = check_compression(archive.size(), original_size)?;
        debug!(
            archive_bytes = archive.size(),
            original_bytes = original_size,
            "compression reduced upload size by {saved} bytes"
        );

        let destination = self.issuer.zip_upload_url(&self.config.build_id).await?;
        Ok(PreparedArchive {
            archive,
            destination,
        })
    }

    async fn send_archive(
        &self,
        prepared: PreparedArchive,
        events: &mpsc::Sender<PublishEvent>,
    ) -> Result<Uploaded, PublishError> {
        let PreparedArchive {
            archive,
            destination,
        } = prepared;
        let size = archive.size();
        let _ = events.send(PublishEvent::Started).await;

        let (tx, rx) = mpsc::unbounded_channel();
        let transfer = self.uploader.put_file(
            &destination.url,
            archive.path(),
            ARCHIVE_CONTENT_TYPE,
            size,
            &self.abort,
            forward_to(tx, 0),
        );
        relay_progress(ProgressAggregator::new([size]), rx, transfer, events).await?;

        self.poller
            .wait_for_unpack(&destination.sentinel_url, &self.abort)
            .await
            .map_err(|source| PublishError::Sentinel {
                path: archive.path().to_path_buf(),
                source,
            })?;

        Ok(Uploaded {
            strategy: Strategy::Archive,
            bytes: size,
            domain: destination.domain,
        })
    }
}

/// Target paths of `files`, which must be unique.
fn target_paths(files: &[FileDescriptor]) -> Result<Vec<String>, PublishError> {
    let mut seen = HashSet::with_capacity(files.len());
    for file in files {
        if !seen.insert(file.target_path.as_str()) {
            return Err(PublishError::DuplicateTarget(file.target_path.clone()));
        }
    }
    Ok(files.iter().map(|f| f.target_path.clone()).collect())
}

/// Pairs each file with the destination issued for its target path.
fn join_destinations(
    files: &[FileDescriptor],
    issued: Vec<UploadTarget>,
) -> Result<Vec<TargetedFile>, PublishError> {
    let mut pending: HashMap<&str, &FileDescriptor> =
        files.iter().map(|f| (f.target_path.as_str(), f)).collect();

    let mut targets = Vec::with_capacity(issued.len());
    for destination in issued {
        let file = pending
            .remove(destination.path.as_str())
            .ok_or_else(|| PublishError::UnknownTarget(destination.path.clone()))?;
        targets.push(TargetedFile {
            file: file.clone(),
            target_url: destination.url,
            content_type: destination.content_type,
        });
    }

    if let Some(file) = files
        .iter()
        .find(|f| pending.contains_key(f.target_path.as_str()))
    {
        return Err(PublishError::MissingDestination(file.target_path.clone()));
    }
    Ok(targets)
}

/// Drives `transfer` while folding progress updates into `aggregator` and
/// forwarding the running total to `events`.
async fn relay_progress<F, T, E>(
    mut aggregator: ProgressAggregator,
    mut updates: mpsc::UnboundedReceiver<ProgressUpdate>,
    transfer: F,
    events: &mpsc::Sender<PublishEvent>,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let total = aggregator.total();
    tokio::pin!(transfer);

    let result = loop {
        tokio::select! {
            biased;
            Some(update) = updates.recv() => {
                emit_progress(events, aggregator.apply(update), total);
            }
            result = &mut transfer => break result,
        }
    };

    if result.is_ok() {
        while let Ok(update) = updates.try_recv() {
            emit_progress(events, aggregator.apply(update), total);
        }
    }
    result
}

fn emit_progress(events: &mpsc::Sender<PublishEvent>, current: u64, total: u64) {
    // A full channel drops this update; the next one carries the new total.
    let _ = events.try_send(PublishEvent::Progress { current, total });
}

/// Sends the terminal event for `result` and hands it back.
async fn report(
    result: Result<Uploaded, PublishError>,
    events: &mpsc::Sender<PublishEvent>,
) -> Result<Uploaded, PublishError> {
    let event = match &result {
        Ok(uploaded) => {
            info!(
                strategy = %uploaded.strategy,
                bytes = uploaded.bytes,
                domain = %uploaded.domain,
                "build published"
            );
            PublishEvent::Completed {
                uploaded_bytes: uploaded.bytes,
                domain: uploaded.domain.clone(),
            }
        }
        Err(e) => {
            if e.is_aborted() {
                info!(reason = %e, "publish aborted");
            } else {
                warn!(error = %e, "publish failed");
            }
            PublishEvent::Failed {
                error: e.to_string(),
                path: e.path().map(Path::to_path_buf),
            }
        }
    };
    let _ = events.send(event).await;
    result
}
