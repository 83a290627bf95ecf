//! Line-oriented input generator.
//!
//! Turns a byte stream into a lazy sequence of validated [`InputRecord`]s,
//! respecting an offset/limit window and cooperative cancellation. This is
//! the sole producer of identifiers fed into the [`crate::worker::pool::WorkerPool`].
//!
//! # Example
//!
//! ```no_run
//! use unfuckup_s3::generator::{CancelToken, Generator, GeneratorConfig};
//! use std::io::Cursor;
//!
//! # async fn example() {
//! let input = Cursor::new("1\n2\n3\n".to_string().into_bytes());
//! let (_token, watch) = CancelToken::new();
//! let gen = Generator::spawn(input, GeneratorConfig::default(), watch);
//! # }
//! ```

use std::io;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

/// One validated line from the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    /// 1-based position of this line within the input stream.
    pub line_number: u64,
    /// The identifier text, guaranteed non-empty and whitespace-free.
    pub id: String,
}

/// A malformed line or scanner failure encountered while generating input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The line at `line_number` contains whitespace, which is not a valid identifier.
    #[error("line {line_number}: file id may not contain spaces")]
    InvalidIdentifier {
        /// 1-based line number of the offending line.
        line_number: u64,
    },
    /// The underlying reader failed; `line_number` is always 0 for this variant.
    #[error("scan error: {message}")]
    ScanError {
        /// Description of the underlying I/O failure.
        message: String,
    },
}

impl InputError {
    /// Line number this error is attributed to (0 for scanner-level errors).
    #[must_use]
    pub fn line_number(&self) -> u64 {
        match self {
            Self::InvalidIdentifier { line_number } => *line_number,
            Self::ScanError { .. } => 0,
        }
    }
}

/// Tunables for a [`Generator`] run.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    /// Skip this many lines before emitting records.
    pub offset: u64,
    /// Stop after emitting this many records. `0` means unbounded.
    pub limit: u64,
    /// Capacity of the values channel.
    pub value_channel_capacity: usize,
    /// Capacity of the errors channel.
    pub error_channel_capacity: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 0,
            value_channel_capacity: 1024,
            error_channel_capacity: 0,
        }
    }
}

/// A cooperative cancellation switch shared between the orchestrator and the generator.
///
/// The generator checks this flag between scanned lines only, mirroring the
/// source behavior where a pending channel send can absorb one additional
/// item after cancellation is requested.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: watch::Sender<bool>,
}

/// The generator's view of a [`CancelToken`], used to observe cancellation.
#[derive(Debug, Clone)]
pub struct CancelWatch {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Creates a new, not-yet-cancelled token and its paired watch.
    #[must_use]
    pub fn new() -> (Self, CancelWatch) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, CancelWatch { rx })
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new().0
    }
}

impl CancelWatch {
    fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Handle to a running generator: its output channels and a join handle for
/// the producer task.
pub struct Generator {
    /// Receiver for validated input records.
    pub values: mpsc::Receiver<InputRecord>,
    /// Receiver for malformed-line / scan errors.
    pub errors: mpsc::Receiver<InputError>,
    /// Completes once the producer task has closed both channels.
    handle: JoinHandle<()>,
}

impl Generator {
    /// Spawns the producer task and returns a handle exposing its output channels.
    ///
    /// The caller must drain `errors` as well as `values`, or the producer may
    /// block forever on a full, unconsumed errors channel when
    /// `error_channel_capacity` is 0 (capacity-1 internally, since `mpsc`
    /// does not support true zero-capacity channels).
    pub fn spawn<R>(reader: R, config: GeneratorConfig, cancel: CancelWatch) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (value_tx, value_rx) = mpsc::channel(config.value_channel_capacity.max(1));
        let (error_tx, error_rx) = mpsc::channel(config.error_channel_capacity.max(1));

        let handle = tokio::spawn(run_generator(reader, config, cancel, value_tx, error_tx));

        Self {
            values: value_rx,
            errors: error_rx,
            handle,
        }
    }

    /// Awaits the producer task's completion. Call after both channels have
    /// been fully drained.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

#[instrument(skip(reader, cancel, value_tx, error_tx))]
async fn run_generator<R>(
    reader: R,
    config: GeneratorConfig,
    cancel: CancelWatch,
    value_tx: mpsc::Sender<InputRecord>,
    error_tx: mpsc::Sender<InputError>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut position: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            debug!(position, "generator cancelled");
            break;
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                let _ = error_tx
                    .send(InputError::ScanError {
                        message: err.to_string(),
                    })
                    .await;
                break;
            }
        };

        position += 1;

        if position <= config.offset {
            continue;
        }
        if config.limit > 0 && position > config.offset + config.limit {
            break;
        }
        if line.is_empty() {
            continue;
        }
        if line.chars().any(char::is_whitespace) {
            warn!(line_number = position, "malformed identifier rejected");
            let _ = error_tx
                .send(InputError::InvalidIdentifier {
                    line_number: position,
                })
                .await;
            break;
        }

        if value_tx
            .send(InputRecord {
                line_number: position,
                id: line,
            })
            .await
            .is_err()
        {
            // Consumer dropped the values channel; nothing left to do.
            break;
        }
    }

    debug!(position, "generator finished");
}

/// Maps a `std::io::Error` surfaced while opening the input file to a
/// terminal [`InputError`]. Kept separate from [`run_generator`] because
/// open failures happen before the producer task is spawned.
#[must_use]
pub fn scan_error_from_io(err: &io::Error) -> InputError {
    InputError::ScanError {
        message: err.to_string(),
    }
}
