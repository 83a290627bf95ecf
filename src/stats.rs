//! Run-wide counters and periodic reporting.
//!
//! Mirrors the source's `Stat` type: a handful of atomically-updated
//! counters plus a `Dump` that logs a one-line summary. The only shared
//! mutable state in the whole pipeline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::info;

/// The run's five monotonic counters.
#[derive(Debug, Default)]
pub struct Stats {
    input: AtomicU64,
    success: AtomicU64,
    fail: AtomicU64,
    retry: AtomicU64,
    fatal: AtomicU64,
}

impl Stats {
    /// A fresh, zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one identifier read from the generator.
    pub fn add_input(&self) {
        self.input.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one successful restore.
    pub fn add_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one failed attempt (cumulative across retries).
    pub fn add_fail(&self) {
        self.fail.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one re-enqueue after a failed attempt.
    pub fn add_retry(&self) {
        self.retry.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one task that exhausted its attempt budget.
    pub fn add_fatal(&self) {
        self.fatal.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of `input`.
    #[must_use]
    pub fn input_count(&self) -> u64 {
        self.input.load(Ordering::Relaxed)
    }

    /// Current value of `success`.
    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    /// Current value of `fail`.
    #[must_use]
    pub fn fail_count(&self) -> u64 {
        self.fail.load(Ordering::Relaxed)
    }

    /// Current value of `retry`.
    #[must_use]
    pub fn retry_count(&self) -> u64 {
        self.retry.load(Ordering::Relaxed)
    }

    /// Current value of `fatal`.
    #[must_use]
    pub fn fatal_count(&self) -> u64 {
        self.fatal.load(Ordering::Relaxed)
    }

    /// Logs a one-line summary of every counter at the current instant.
    pub fn dump(&self) {
        info!(
            input = self.input_count(),
            success = self.success_count(),
            fail = self.fail_count(),
            retry = self.retry_count(),
            fatal = self.fatal_count(),
            "[STAT]"
        );
    }
}

/// Spawns a task that dumps `stats` every `period`, until `stats` is dropped
/// (detected by the `Weak` upgrade failing).
pub fn spawn_periodic_dumper(
    stats: std::sync::Arc<Stats>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    let weak = std::sync::Arc::downgrade(&stats);
    drop(stats);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(period).await;
            match weak.upgrade() {
                Some(stats) => stats.dump(),
                None => break,
            }
        }
    })
}
