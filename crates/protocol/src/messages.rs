use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GraphQL envelope
// ---------------------------------------------------------------------------

/// Body POSTed to the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphQlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

/// Response envelope returned by the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// A single error entry of a GraphQL response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Request variables
// ---------------------------------------------------------------------------

/// Variables of the `getUploadUrls` mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUploadUrlsVariables {
    pub build_id: String,
    pub paths: Vec<String>,
}

/// Variables of the `getZipUploadUrl` mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetZipUploadUrlVariables {
    pub build_id: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// `data` payload of the `getUploadUrls` mutation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlsData {
    pub get_upload_urls: UploadUrls,
}

/// Write locations issued for individual files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadUrls {
    pub domain: String,
    pub urls: Vec<UploadTarget>,
}

/// Write location for one target path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub path: String,
    pub url: String,
    pub content_type: String,
}

/// `data` payload of the `getZipUploadUrl` mutation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipUploadUrlData {
    pub get_zip_upload_url: ZipUploadUrl,
}

/// Write location for an archive, plus the sentinel to poll once uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipUploadUrl {
    pub domain: String,
    pub url: String,
    pub sentinel_url: String,
}
