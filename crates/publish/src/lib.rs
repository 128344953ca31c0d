//! Build publish flow: scan, choose a strategy, upload, confirm.
//!
//! This crate implements the **orchestration** for publishing a static
//! build. It is a library crate with no UI; callers supply a
//! [`DestinationIssuer`] (or use [`GraphQlIssuer`]) and an
//! [`ArchiveBuilder`] (or use [`ZipArchiveBuilder`]), then listen on a
//! channel of [`PublishEvent`]s.
//!
//! # Pipeline
//!
//! 1. **Scan**: recursively walk the build directory
//! 2. **Issue**: request write URLs from the metadata service
//! 3. **Upload**: PUT every file concurrently, or one archive
//! 4. **Confirm**: for archives, poll the sentinel until the remote unpack reports `OK`

pub mod archive;
pub mod config;
pub mod error;
pub mod issuer;
pub mod progress;
pub mod publisher;
pub mod scanner;
pub mod strategy;
pub mod types;

// Re-export primary types for convenience.
pub use archive::{ArchiveBuilder, BuiltArchive, ZipArchiveBuilder};
pub use config::{ARCHIVE_ENV, PublishConfig, RETRIES_ENV};
pub use error::PublishError;
pub use issuer::{DestinationIssuer, GraphQlIssuer, IssuerFuture};
pub use progress::{ProgressAggregator, ProgressUpdate};
pub use publisher::Publisher;
pub use scanner::scan_build_dir;
pub use strategy::check_compression;
pub use types::{PublishEvent, Strategy, Uploaded};
