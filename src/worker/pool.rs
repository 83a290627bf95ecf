//! Bounded worker pool: fans tasks out across `N` workers and fans their
//! results back into one output channel.
//!
//! Structure mirrors the source design: one shared pool input channel, one
//! shared pool output channel, a round-robin fan-out task, and a fan-in task
//! that merges every worker's output.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Callback, Task, WorkResult, Worker};

/// Construction parameters for a [`WorkerPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Number of concurrent workers.
    pub max_parallel: usize,
    /// Capacity of the shared pool input channel.
    pub input_channel_capacity: usize,
    /// Capacity of the shared pool output channel.
    pub output_channel_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_parallel: 100,
            input_channel_capacity: 0,
            output_channel_capacity: 0,
        }
    }
}

/// A running pool of workers with a single submission sink and result source.
pub struct WorkerPool {
    input: mpsc::Sender<Task>,
    output: mpsc::Receiver<WorkResult>,
    fan_out: JoinHandle<()>,
    fan_in: JoinHandle<()>,
}

impl WorkerPool {
    /// Spawns `config.max_parallel` workers plus the fan-out/fan-in
    /// coordination tasks, and returns a handle exposing `submit`/`results`.
    #[must_use]
    pub fn start(config: PoolConfig, callback: Callback) -> Self {
        let max_parallel = config.max_parallel.max(1);
        let (pool_input_tx, pool_input_rx) = mpsc::channel(config.input_channel_capacity.max(1));
        let (pool_output_tx, pool_output_rx) =
            mpsc::channel(config.output_channel_capacity.max(1));

        let mut worker_inputs = Vec::with_capacity(max_parallel);
        let mut worker_join = Vec::with_capacity(max_parallel);
        let mut forwarder_join = Vec::with_capacity(max_parallel);

        for ident in 0..max_parallel {
            // Capacity 1 approximates the source's unbuffered worker channels:
            // fan-out's send only proceeds once a worker is ready to receive.
            let (w_in_tx, w_in_rx) = mpsc::channel::<Task>(1);
            let (w_out_tx, mut w_out_rx) = mpsc::channel::<WorkResult>(1);

            let worker = Worker::new(ident, w_in_rx, w_out_tx, callback.clone());
            worker_join.push(tokio::spawn(worker.run()));

            let pool_output_tx = pool_output_tx.clone();
            forwarder_join.push(tokio::spawn(async move {
                while let Some(result) = w_out_rx.recv().await {
                    if pool_output_tx.send(result).await.is_err() {
                        break;
                    }
                }
            }));

            worker_inputs.push(w_in_tx);
        }
        drop(pool_output_tx);

        let fan_out = tokio::spawn(fan_out_loop(pool_input_rx, worker_inputs, worker_join));
        let fan_in = tokio::spawn(async move {
            for handle in forwarder_join {
                let _ = handle.await;
            }
            debug!("fan-in: all worker forwarders drained, pool output closing");
        });

        Self {
            input: pool_input_tx,
            output: pool_output_rx,
            fan_out,
            fan_in,
        }
    }

    /// Submits a task to the pool. Awaits if the pool input is at capacity.
    ///
    /// # Panics
    ///
    /// Panics if called after [`Self::stop_async`] (send-after-close), which
    /// the orchestrator must never do per the retry-in-flight invariant.
    pub async fn submit(&self, task: Task) {
        self.input
            .send(task)
            .await
            .expect("submit called after stop_async");
    }

    /// A clone of the pool's input sender.
    ///
    /// Lets a caller submit from a task other than the one holding this
    /// `WorkerPool` value, so a pending (backpressured) send never blocks
    /// whatever else that holder is doing concurrently.
    pub(crate) fn input_sender(&self) -> mpsc::Sender<Task> {
        self.input.clone()
    }

    /// The shared result stream. Callers must fully drain this to let the
    /// pool's tasks exit and avoid leaks.
    pub fn results(&mut self) -> &mut mpsc::Receiver<WorkResult> {
        &mut self.output
    }

    /// Closes the pool input, letting fan-out drain in-flight tasks and
    /// workers finish their current task before the pool output closes.
    /// Idempotent in effect (dropping an already-dropped sender is a no-op),
    /// but callers should still only call this once per the orchestrator's
    /// shutdown-guard flag.
    pub fn stop_async(self) -> PoolShutdown {
        let Self {
            input,
            output,
            fan_out,
            fan_in,
        } = self;
        drop(input);
        PoolShutdown {
            output,
            fan_out,
            fan_in,
        }
    }
}

/// A pool whose input has been closed; only draining `results` remains.
pub struct PoolShutdown {
    output: mpsc::Receiver<WorkResult>,
    fan_out: JoinHandle<()>,
    fan_in: JoinHandle<()>,
}

impl PoolShutdown {
    /// The shared result stream during drain.
    pub fn results(&mut self) -> &mut mpsc::Receiver<WorkResult> {
        &mut self.output
    }

    /// Blocks until the pool output channel closes (every worker has
    /// exited), draining any remaining results in the process.
    pub async fn stop_blocking(mut self) {
        while self.output.recv().await.is_some() {}
        let _ = self.fan_out.await;
        let _ = self.fan_in.await;
    }
}

async fn fan_out_loop(
    mut pool_input: mpsc::Receiver<Task>,
    worker_inputs: Vec<mpsc::Sender<Task>>,
    worker_join: Vec<JoinHandle<()>>,
) {
    let n = worker_inputs.len();
    let mut i = 0usize;
    while let Some(task) = pool_input.recv().await {
        if task.id.is_empty() {
            warn!("fan-out: empty task id from generator");
        }
        // Blocking send to the chosen worker is the backpressure mechanism:
        // it yields only once that worker is ready for its next task.
        if worker_inputs[i].send(task).await.is_err() {
            break;
        }
        i = (i + 1) % n;
    }
    // Pool input closed and drained: close every worker's input so each
    // worker finishes its in-flight task (if any) and exits.
    drop(worker_inputs);
    for handle in worker_join {
        let _ = handle.await;
    }
    debug!("fan-out: all workers exited");
}
