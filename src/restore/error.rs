//! Errors surfaced by the backup fetcher and object-store uploader.
//!
//! Mirrors the source's error style: explicit variants carrying the context
//! (url, status) needed to act on the failure, rather than a blanket
//! `#[from] reqwest::Error` that would lose it.

use thiserror::Error;

/// Failure restoring a single identifier.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// The backup GET request could not be built (malformed prefix/id).
    #[error("invalid backup url for id {id}: {source}")]
    InvalidBackupUrl {
        /// The identifier being restored.
        id: String,
        /// The underlying URL parse failure.
        #[source]
        source: url::ParseError,
    },

    /// The restore PUT request could not be built (malformed prefix/id).
    #[error("invalid restore url for id {id}: {source}")]
    InvalidRestoreUrl {
        /// The identifier being restored.
        id: String,
        /// The underlying URL parse failure.
        #[source]
        source: url::ParseError,
    },

    /// A transport-level failure fetching the backup body (connection, DNS, TLS).
    #[error("fetching backup for id {id} ({url}): {source}")]
    Fetch {
        /// The identifier being restored.
        id: String,
        /// The backup URL requested.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The backup server responded with a non-200 status.
    #[error("backup for id {id} ({url}) returned status {status}")]
    FetchStatus {
        /// The identifier being restored.
        id: String,
        /// The backup URL requested.
        url: String,
        /// The HTTP status returned.
        status: u16,
    },

    /// A transport-level failure uploading to the object store.
    #[error("uploading restored object for id {id} ({url}): {source}")]
    Upload {
        /// The identifier being restored.
        id: String,
        /// The object-store URL requested.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The object store responded with a non-200 status.
    #[error("upload for id {id} ({url}) returned status {status}")]
    UploadStatus {
        /// The identifier being restored.
        id: String,
        /// The object-store URL requested.
        url: String,
        /// The HTTP status returned.
        status: u16,
    },
}

impl RestoreError {
    /// Builds an [`RestoreError::InvalidBackupUrl`].
    #[must_use]
    pub fn invalid_backup_url(id: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidBackupUrl {
            id: id.into(),
            source,
        }
    }

    /// Builds an [`RestoreError::InvalidRestoreUrl`].
    #[must_use]
    pub fn invalid_restore_url(id: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidRestoreUrl {
            id: id.into(),
            source,
        }
    }

    /// Builds a [`RestoreError::Fetch`].
    #[must_use]
    pub fn fetch(id: impl Into<String>, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Fetch {
            id: id.into(),
            url: url.into(),
            source,
        }
    }

    /// Builds a [`RestoreError::FetchStatus`].
    #[must_use]
    pub fn fetch_status(id: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self::FetchStatus {
            id: id.into(),
            url: url.into(),
            status,
        }
    }

    /// Builds a [`RestoreError::Upload`].
    #[must_use]
    pub fn upload(id: impl Into<String>, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Upload {
            id: id.into(),
            url: url.into(),
            source,
        }
    }

    /// Builds a [`RestoreError::UploadStatus`].
    #[must_use]
    pub fn upload_status(id: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self::UploadStatus {
            id: id.into(),
            url: url.into(),
            status,
        }
    }
}
