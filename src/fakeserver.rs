//! In-process loopback HTTP server for load-testing the restore pipeline
//! without dialing real backup/object-store endpoints.
//!
//! `/backup/*` returns a fixed-size filler payload; `/restore/*` drains the
//! request body and returns 200. Mirrors the source's
//! `StartFakeServerFromConfig`, built on `wiremock` since this crate already
//! depends on it for the HTTP client test suite.

use crate::restore::BUCKET_HEADER;
use wiremock::matchers::{header_exists, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Size, in bytes, of the filler payload `/backup/*` returns.
const BACKUP_PAYLOAD_SIZE: usize = 10 * 1024;

/// A running fake backup + object-store server.
pub struct FakeServer {
    server: MockServer,
}

impl FakeServer {
    /// Starts the loopback server and mounts the backup/restore routes.
    pub async fn start() -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path_regex("^/backup/.+"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'0'; BACKUP_PAYLOAD_SIZE]))
            .mount(&server)
            .await;

        // Mirrors the real object store's Host1-keyed access control: a
        // restore PUT without it is rejected.
        Mock::given(method("PUT"))
            .and(path_regex("^/restore/.+"))
            .and(header_exists(BUCKET_HEADER))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex("^/restore/.+"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        Self { server }
    }

    /// The backup URL prefix to hand to [`crate::restore::BackupClient`].
    #[must_use]
    pub fn backup_url_prefix(&self) -> String {
        format!("{}/backup/", self.server.uri())
    }

    /// The restore URL prefix to hand to [`crate::restore::AmazonRestorer`].
    ///
    /// No trailing slash: [`crate::restore::AmazonRestorer::upload_url`]
    /// joins the prefix and id with its own `/`.
    #[must_use]
    pub fn restore_url_prefix(&self) -> String {
        format!("{}/restore", self.server.uri())
    }
}
