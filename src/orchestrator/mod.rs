//! Wires the generator to the worker pool, applies the retry policy, and
//! sequences shutdown.
//!
//! Runs a single select loop over generator values, generator errors, and
//! pool results. Termination is driven entirely by channel closure: when the
//! generator's values channel closes, the pool input is closed exactly once
//! (`stop_async`, consuming the running pool and returning a draining
//! handle); the loop exits once the pool's output channel closes in turn.
//!
//! Submission to the pool runs on its own task (see [`run_submitter`]),
//! never inline in the draining loop: this loop is the pool's only
//! consumer, so an inline `pool.submit(...).await` could block on a full
//! pool input that only drains by this same loop running its result
//! branches, a circular wait under sustained backpressure. Fresh tasks and
//! retries are instead handed to the submitter over an unbounded channel,
//! which never blocks the sender.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::generator::{Generator, InputError, InputRecord};
use crate::stats::Stats;
use crate::worker::pool::{PoolShutdown, WorkerPool};
use crate::worker::{Task, WorkResult};

/// Default number of attempts (including the first) before a task is
/// declared fatal.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Tunables for one orchestrator run.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Attempts allowed per task, including the first, before it is fatal.
    pub max_attempts: u32,
    /// Emit a stats dump every this many processed results. `0` disables it.
    pub stat_after_lines: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            stat_after_lines: 100_000,
        }
    }
}

/// Runs the generator-to-pool pipeline to completion.
///
/// Returns once the pool output channel has closed and the generator's
/// producer task has been joined. Shutdown (operator cancellation or input
/// exhaustion) is triggered by cancelling the `Generator`'s paired
/// `CancelToken` from the caller; this function only reacts to the
/// resulting channel closures.
pub async fn run(
    mut generator: Generator,
    pool: WorkerPool,
    stats: Arc<Stats>,
    config: OrchestratorConfig,
) {
    let (submit_tx, submit_rx) = mpsc::unbounded_channel::<Task>();
    let submitter = tokio::spawn(run_submitter(pool.input_sender(), submit_rx));
    let mut submit_tx = Some(submit_tx);

    let mut pool: Option<WorkerPool> = Some(pool);
    let mut shutdown: Option<PoolShutdown> = None;
    let mut errors_open = true;
    let mut processed: u64 = 0;

    loop {
        tokio::select! {
            v = generator.values.recv(), if pool.is_some() => {
                match v {
                    Some(record) => {
                        let tx = submit_tx.as_ref().expect("pool still accepting submissions");
                        submit_fresh(tx, &stats, record);
                    }
                    None => {
                        info!("generator values closed, draining pool");
                        // No more fresh tasks or retries will ever be enqueued past this
                        // point (see handle_result), so the submitter's clone of the pool
                        // input can close as soon as it drains what's already queued.
                        drop(submit_tx.take());
                        let running = pool.take().expect("guarded by pool.is_some()");
                        shutdown = Some(running.stop_async());
                    }
                }
            }
            e = generator.errors.recv(), if errors_open => {
                match e {
                    Some(err) => warn!(line = err.line_number(), %err, "malformed input line"),
                    None => errors_open = false,
                }
            }
            r = recv_from(pool.as_mut()), if pool.is_some() => {
                if let Some(result) = r {
                    handle_result(result, submit_tx.as_ref(), &stats, config.max_attempts);
                    processed += 1;
                    maybe_dump(&stats, &config, processed);
                }
            }
            r = recv_from_shutdown(shutdown.as_mut()), if shutdown.is_some() => {
                match r {
                    Some(result) => {
                        handle_result(result, None, &stats, config.max_attempts);
                        processed += 1;
                        maybe_dump(&stats, &config, processed);
                    }
                    None => break,
                }
            }
        }
    }

    let _ = submitter.await;
    if let Some(shutdown) = shutdown {
        shutdown.stop_blocking().await;
    }
    generator.join().await;
    stats.dump();
    info!(lines = processed, "exit after processing results");
}

async fn recv_from(pool: Option<&mut WorkerPool>) -> Option<WorkResult> {
    match pool {
        Some(pool) => pool.results().recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_from_shutdown(shutdown: Option<&mut PoolShutdown>) -> Option<WorkResult> {
    match shutdown {
        Some(shutdown) => shutdown.results().recv().await,
        None => std::future::pending().await,
    }
}

/// The sole caller of [`WorkerPool::submit`]-equivalent sends, running as
/// its own task so that a pending send against a full pool input never
/// blocks [`run`]'s draining loop. Forwards until `tasks` closes, at which
/// point its clone of the pool input sender drops too.
async fn run_submitter(pool_input: mpsc::Sender<Task>, mut tasks: mpsc::UnboundedReceiver<Task>) {
    while let Some(task) = tasks.recv().await {
        if pool_input.send(task).await.is_err() {
            break;
        }
    }
}

fn submit_fresh(submit_tx: &mpsc::UnboundedSender<Task>, stats: &Stats, record: InputRecord) {
    stats.add_input();
    let _ = submit_tx.send(Task {
        line_number: record.line_number,
        id: record.id,
        fail_count: 0,
    });
}

/// Applies the retry decision for one result.
///
/// `submit_tx` is `Some` only while the pool is still accepting
/// submissions (i.e. the generator has not yet closed); resubmitting past
/// that point would reach a submitter with no pool input left to forward
/// into, so a task that fails during drain is always declared fatal
/// instead of retried, matching the documented behavior.
fn handle_result(
    result: WorkResult,
    submit_tx: Option<&mpsc::UnboundedSender<Task>>,
    stats: &Stats,
    max_attempts: u32,
) {
    let WorkResult { mut task, err } = result;
    match err {
        None => stats.add_success(),
        Some(err) => {
            stats.add_fail();
            match submit_tx {
                Some(tx) => {
                    task.fail_count += 1;
                    if task.fail_count < max_attempts {
                        stats.add_retry();
                        let _ = tx.send(task);
                    } else {
                        stats.add_fatal();
                        error!(id = %task.id, line = task.line_number, %err, "task exhausted retries");
                    }
                }
                None => {
                    stats.add_fatal();
                    error!(id = %task.id, line = task.line_number, %err, "task failed during drain, not resubmitted");
                }
            }
        }
    }
}

fn maybe_dump(stats: &Stats, config: &OrchestratorConfig, processed: u64) {
    if config.stat_after_lines > 0 && processed % config.stat_after_lines == 0 {
        stats.dump();
    }
}
