//! Single task executor.
//!
//! A [`Worker`] pulls one [`Task`] at a time from its input channel, runs the
//! restore callback, and publishes exactly one [`WorkResult`] per task.

pub mod pool;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::instrument;

use crate::restore::error::RestoreError;

/// One unit of work: restore a single identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Line number this task originated from, for diagnostics.
    pub line_number: u64,
    /// The identifier to restore.
    pub id: String,
    /// Number of attempts already made at this task (0 on first submission).
    pub fail_count: u32,
}

/// The outcome of one attempt at a [`Task`].
#[derive(Debug, Clone)]
pub struct WorkResult {
    /// The task this result is for.
    pub task: Task,
    /// `None` on success.
    pub err: Option<RestoreError>,
}

/// The restore action a worker invokes for each task. Boxed so the pool can
/// share one callback across all workers without generic fan-out.
pub type Callback =
    Arc<dyn Fn(Task) -> Pin<Box<dyn Future<Output = Result<(), RestoreError>> + Send>> + Send + Sync>;

/// A single executor bound to its own unbuffered input/output channel pair.
pub struct Worker {
    input: mpsc::Receiver<Task>,
    output: mpsc::Sender<WorkResult>,
    callback: Callback,
    ident: usize,
}

impl Worker {
    /// Constructs a worker around a pre-wired input/output pair.
    #[must_use]
    pub fn new(
        ident: usize,
        input: mpsc::Receiver<Task>,
        output: mpsc::Sender<WorkResult>,
        callback: Callback,
    ) -> Self {
        Self {
            input,
            output,
            callback,
            ident,
        }
    }

    /// Runs the receive-execute-publish loop until `input` is closed.
    #[instrument(skip(self), fields(worker = self.ident))]
    pub async fn run(mut self) {
        while let Some(task) = self.input.recv().await {
            let err = (self.callback)(task.clone()).await.err();
            if self.output.send(WorkResult { task, err }).await.is_err() {
                break;
            }
        }
    }
}
