//! Protocol constants.

/// Body of the sentinel file once the remote unpack step has succeeded.
///
/// Any other content (including an empty body) means the unpack failed.
pub const SENTINEL_SUCCESS_VALUE: &str = "OK";

/// Content type declared when uploading an archive.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Issues one write URL per requested target path.
pub const GET_UPLOAD_URLS_MUTATION: &str = r#"
  mutation GetUploadUrlsMutation($buildId: ObjID, $paths: [String!]!) {
    getUploadUrls(buildId: $buildId, paths: $paths) {
      domain
      urls {
        path
        url
        contentType
      }
    }
  }
"#;

/// Issues a single archive write URL plus the sentinel URL to poll.
pub const GET_ZIP_UPLOAD_URL_MUTATION: &str = r#"
  mutation GetZipUploadUrlMutation($buildId: ObjID) {
    getZipUploadUrl(buildId: $buildId) {
      domain
      url
      sentinelUrl
    }
  }
"#;
