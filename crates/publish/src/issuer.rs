//! Destination issuance: the metadata service that hands out write URLs.
//!
//! `DestinationIssuer` is the seam between the publish flow and the
//! metadata API. [`GraphQlIssuer`] talks to the real service; tests provide
//! their own implementations.

use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use staticpub_protocol::constants::{GET_UPLOAD_URLS_MUTATION, GET_ZIP_UPLOAD_URL_MUTATION};
use staticpub_protocol::{
    GetUploadUrlsVariables, GetZipUploadUrlVariables, GraphQlRequest, GraphQlResponse, UploadUrls,
    UploadUrlsData, ZipUploadUrl, ZipUploadUrlData,
};
use tracing::debug;

use crate::error::PublishError;

/// Boxed future returned by [`DestinationIssuer`] methods.
pub type IssuerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PublishError>> + Send + 'a>>;

/// Issues upload destinations for a build.
pub trait DestinationIssuer: Send + Sync {
    /// Requests one write URL per target path, in a single round trip.
    fn upload_urls<'a>(
        &'a self,
        build_id: &'a str,
        paths: &'a [String],
    ) -> IssuerFuture<'a, UploadUrls>;

    /// Requests a write URL for an archive plus the sentinel URL to poll.
    fn zip_upload_url<'a>(&'a self, build_id: &'a str) -> IssuerFuture<'a, ZipUploadUrl>;
}

/// [`DestinationIssuer`] backed by the GraphQL metadata API.
#[derive(Debug, Clone)]
pub struct GraphQlIssuer {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl GraphQlIssuer {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token: None,
        }
    }

    /// Sends `token` as a bearer credential with every query.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    async fn run_query<V, T>(&self, query: &str, variables: V) -> Result<T, PublishError>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&GraphQlRequest { query, variables });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response: GraphQlResponse<T> = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.errors.is_empty() {
            let messages: Vec<&str> = response.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(PublishError::Issuer(messages.join("; ")));
        }

        response
            .data
            .ok_or_else(|| PublishError::Issuer("response contained no data".into()))
    }
}

impl DestinationIssuer for GraphQlIssuer {
    fn upload_urls<'a>(
        &'a self,
        build_id: &'a str,
        paths: &'a [String],
    ) -> IssuerFuture<'a, UploadUrls> {
        Box::pin(async move {
            debug!(build_id, paths = paths.len(), "requesting upload urls");
            let variables = GetUploadUrlsVariables {
                build_id: build_id.to_string(),
                paths: paths.to_vec(),
            };
            let data: UploadUrlsData = self.run_query(GET_UPLOAD_URLS_MUTATION, variables).await?;
            Ok(data.get_upload_urls)
        })
    }

    fn zip_upload_url<'a>(&'a self, build_id: &'a str) -> IssuerFuture<'a, ZipUploadUrl> {
        Box::pin(async move {
            debug!(build_id, "requesting archive upload url");
            let variables = GetZipUploadUrlVariables {
                build_id: build_id.to_string(),
            };
            let data: ZipUploadUrlData =
                self.run_query(GET_ZIP_UPLOAD_URL_MUTATION, variables).await?;
            Ok(data.get_zip_upload_url)
        })
    }
}
