//! Wire types shared by the staticpub crates.
//!
//! Covers the destination-issuance queries (request variables, responses,
//! GraphQL envelope) and the artifact file descriptors that flow through
//! the upload pipeline.

pub mod constants;
pub mod messages;
pub mod types;

pub use messages::{
    GetUploadUrlsVariables, GetZipUploadUrlVariables, GraphQlError, GraphQlRequest,
    GraphQlResponse, UploadTarget, UploadUrls, UploadUrlsData, ZipUploadUrl, ZipUploadUrlData,
};
pub use types::{FileDescriptor, TargetedFile, total_content_length};
