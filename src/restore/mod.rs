//! Backup-to-object-store restore action.
//!
//! Composes [`client::BackupClient`] and [`client::AmazonRestorer`] into the
//! single per-identifier action the worker pool invokes: stream a GET from
//! backup straight into a PUT against the object store.

pub mod client;
pub mod error;

use std::sync::Arc;

pub use client::{AmazonRestorer, BackupClient, BUCKET_HEADER};
pub use error::RestoreError;

/// Everything one restore action needs, bundled so it can be cloned cheaply
/// into a [`crate::worker::Callback`].
#[derive(Debug, Clone)]
pub struct Restorer {
    backup: Arc<BackupClient>,
    amazon: Arc<AmazonRestorer>,
}

impl Restorer {
    /// Pairs a backup reader with an object-store writer.
    #[must_use]
    pub fn new(backup: BackupClient, amazon: AmazonRestorer) -> Self {
        Self {
            backup: Arc::new(backup),
            amazon: Arc::new(amazon),
        }
    }

    /// Fetches `id` from backup and streams the response body straight into
    /// the object store, without buffering the full body in memory.
    ///
    /// # Errors
    ///
    /// Propagates any [`RestoreError`] from the fetch or the upload.
    pub async fn restore(&self, id: &str) -> Result<(), RestoreError> {
        let response = self.backup.fetch(id).await?;
        let body = reqwest::Body::wrap_stream(response.bytes_stream());
        self.amazon.put_object(id, body).await
    }
}
