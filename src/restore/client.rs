//! Backup fetcher and object-store uploader.
//!
//! Each identifier is restored by streaming a GET from the backup store
//! straight into a PUT against the object store, without buffering the whole
//! body in memory.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};
use url::Url;

use super::error::RestoreError;

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// HTTP header the source used in place of a `Host` override when talking
/// to the object store; carried forward unchanged since peer deployments
/// key access control off of it.
pub const BUCKET_HEADER: &str = "Host1";

/// Reads object bodies from a backup store keyed by identifier.
///
/// Constructed once and reused across tasks, like the source's
/// `BackupClient`, so connections are pooled.
#[derive(Debug, Clone)]
pub struct BackupClient {
    client: Client,
    url_prefix: String,
}

impl BackupClient {
    /// Builds a client that requests `{url_prefix}{id}` for each fetch.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static timeout
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(url_prefix: impl Into<String>, timeout: Duration) -> Self {
        Self::new_with_timeout(url_prefix, timeout)
    }

    fn new_with_timeout(url_prefix: impl Into<String>, timeout: Duration) -> Self {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .expect("failed to build backup HTTP client");
        Self {
            client,
            url_prefix: url_prefix.into(),
        }
    }

    /// The absolute backup URL for `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured prefix and `id` do not combine into
    /// a well-formed URL.
    pub fn backup_url(&self, id: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}{id}", self.url_prefix))
    }

    /// Streams the backup body for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError::InvalidBackupUrl`] if the URL cannot be built,
    /// [`RestoreError::Fetch`] on transport failure, and
    /// [`RestoreError::FetchStatus`] if the server responds with a non-200
    /// status.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn fetch(&self, id: &str) -> Result<reqwest::Response, RestoreError> {
        let url = self
            .backup_url(id)
            .map_err(|e| RestoreError::invalid_backup_url(id, e))?;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| RestoreError::fetch(id, url.as_str(), e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(RestoreError::fetch_status(
                id,
                url.as_str(),
                response.status().as_u16(),
            ));
        }

        debug!(status = %response.status(), "backup fetch ok");
        Ok(response)
    }
}

/// Writes object bodies into an object store keyed by identifier.
///
/// Mirrors the source's `AmazonRestorer`: each PUT carries a bucket
/// identifier via [`BUCKET_HEADER`] instead of routing through a virtual
/// host.
#[derive(Debug, Clone)]
pub struct AmazonRestorer {
    client: Client,
    url_prefix: String,
    bucket: String,
}

impl AmazonRestorer {
    /// Builds a client that PUTs to `{url_prefix}/{id}` for each upload,
    /// tagging every request with `bucket` via [`BUCKET_HEADER`].
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static timeout
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(url_prefix: impl Into<String>, bucket: impl Into<String>, timeout: Duration) -> Self {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .expect("failed to build restore HTTP client");
        Self {
            client,
            url_prefix: url_prefix.into(),
            bucket: bucket.into(),
        }
    }

    /// The absolute upload URL for `id`, joined onto the prefix with a `/`
    /// (unlike [`BackupClient::backup_url`], whose prefix already carries
    /// its trailing separator).
    ///
    /// # Errors
    ///
    /// Returns an error if the configured prefix and `id` do not combine into
    /// a well-formed URL.
    pub fn upload_url(&self, id: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/{id}", self.url_prefix))
    }

    /// Streams `body` into the object store under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError::InvalidRestoreUrl`] if the URL cannot be
    /// built, [`RestoreError::Upload`] on transport failure, and
    /// [`RestoreError::UploadStatus`] if the server responds with a non-200
    /// status.
    #[instrument(skip(self, body), fields(id = %id))]
    pub async fn put_object(&self, id: &str, body: reqwest::Body) -> Result<(), RestoreError> {
        let url = self
            .upload_url(id)
            .map_err(|e| RestoreError::invalid_restore_url(id, e))?;

        let response = self
            .client
            .put(url.as_str())
            .header(BUCKET_HEADER, self.bucket.clone())
            .body(body)
            .send()
            .await
            .map_err(|e| RestoreError::upload(id, url.as_str(), e))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(RestoreError::upload_status(
                id,
                url.as_str(),
                response.status().as_u16(),
            ));
        }

        debug!(status = %response.status(), "upload ok");
        Ok(())
    }
}

/// Default request timeout applied when a config does not override it.
#[must_use]
pub fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_success_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/backup/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;

        let client = BackupClient::new(format!("{}/backup/", server.uri()), Duration::from_secs(5));
        let response = client.fetch("abc").await.unwrap();
        let bytes = response.bytes().await.unwrap();
        assert_eq!(&bytes[..], b"payload");
    }

    #[tokio::test]
    async fn fetch_non_200_is_fetch_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/backup/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = BackupClient::new(format!("{}/backup/", server.uri()), Duration::from_secs(5));
        let err = client.fetch("missing").await.unwrap_err();
        assert!(matches!(err, RestoreError::FetchStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn fetch_invalid_prefix_is_invalid_backup_url() {
        let client = BackupClient::new("not a url ", Duration::from_secs(5));
        let err = client.fetch("abc").await.unwrap_err();
        assert!(matches!(err, RestoreError::InvalidBackupUrl { .. }));
    }

    #[tokio::test]
    async fn fetch_server_down_is_transport_error() {
        let client = BackupClient::new("http://127.0.0.1:1/backup/", Duration::from_secs(2));
        let err = client.fetch("abc").await.unwrap_err();
        assert!(matches!(err, RestoreError::Fetch { .. }));
    }

    #[tokio::test]
    async fn fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/backup/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
            .mount(&server)
            .await;

        let client = BackupClient::new(format!("{}/backup/", server.uri()), Duration::from_millis(10));
        let err = client.fetch("slow").await.unwrap_err();
        assert!(matches!(err, RestoreError::Fetch { .. }));
    }

    #[tokio::test]
    async fn upload_success_sends_bucket_header() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/restore/abc"))
            .and(header(BUCKET_HEADER, "my-bucket"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = AmazonRestorer::new(
            format!("{}/restore", server.uri()),
            "my-bucket",
            Duration::from_secs(5),
        );
        client
            .put_object("abc", reqwest::Body::from("payload"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upload_wrong_bucket_header_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/restore/abc"))
            .and(header(BUCKET_HEADER, "expected-bucket"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/restore/abc"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = AmazonRestorer::new(
            format!("{}/restore", server.uri()),
            "wrong-bucket",
            Duration::from_secs(5),
        );
        let err = client
            .put_object("abc", reqwest::Body::from("payload"))
            .await
            .unwrap_err();
        assert!(matches!(err, RestoreError::UploadStatus { status: 403, .. }));
    }

    #[tokio::test]
    async fn upload_non_200_is_upload_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/restore/abc"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = AmazonRestorer::new(
            format!("{}/restore", server.uri()),
            "bucket",
            Duration::from_secs(5),
        );
        let err = client
            .put_object("abc", reqwest::Body::from("payload"))
            .await
            .unwrap_err();
        assert!(matches!(err, RestoreError::UploadStatus { status: 500, .. }));
    }
}
