//! CLI entry point for the `unfuckup-s3` restore tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use unfuckup_s3::cli::{Cli, Command};
use unfuckup_s3::config::{self, CliOverrides};
use unfuckup_s3::fakeserver::FakeServer;
use unfuckup_s3::generator::{CancelToken, Generator, GeneratorConfig};
use unfuckup_s3::orchestrator::{self, OrchestratorConfig};
use unfuckup_s3::restore::{AmazonRestorer, BackupClient, Restorer};
use unfuckup_s3::stats::{self, Stats};
use unfuckup_s3::worker::pool::{PoolConfig, WorkerPool};
use unfuckup_s3::worker::Callback;

#[tokio::main]
async fn main() -> Result<()> {
    // Parsed before logging is initialized so --help/--version never emit
    // log noise on the way out.
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?cli, "CLI arguments parsed");

    let Command::S3(s3_args) = cli.command;

    let file_config = config::load_file_config(Path::new(&cli.config))
        .with_context(|| format!("loading config file '{}'", cli.config))?;
    let resolved = config::resolve(
        &file_config,
        &CliOverrides {
            input: s3_args.input,
            offset: s3_args.offset,
            limit: s3_args.limit,
        },
    )?;

    info!(input = %resolved.input, "starting restore run");

    let input_path = PathBuf::from(&resolved.input);
    if !input_path.exists() {
        anyhow::bail!("input file {} does not exist", input_path.display());
    }
    let input_file = tokio::fs::File::open(&input_path)
        .await
        .with_context(|| format!("opening input file {}", input_path.display()))?;

    let mut fake_server = None;
    let (backup_url_prefix, restore_url_prefix) = if resolved.use_fake_server {
        let server = FakeServer::start().await;
        let prefixes = (server.backup_url_prefix(), server.restore_url_prefix());
        fake_server = Some(server);
        prefixes
    } else {
        (
            resolved.backup_url_prefix.clone(),
            resolved.restore_url_prefix.clone(),
        )
    };

    let timeout = Duration::from_secs(300);
    let restorer = Restorer::new(
        BackupClient::new(backup_url_prefix, timeout),
        AmazonRestorer::new(restore_url_prefix, resolved.bucket.clone(), timeout),
    );
    let callback: Callback = {
        let restorer = restorer.clone();
        Arc::new(move |task| {
            let restorer = restorer.clone();
            Box::pin(async move { restorer.restore(&task.id).await })
        })
    };

    let (cancel_token, cancel_watch) = CancelToken::new();
    spawn_signal_handler(cancel_token.clone());

    let generator = Generator::spawn(
        input_file,
        GeneratorConfig {
            offset: resolved.offset,
            limit: resolved.limit,
            value_channel_capacity: resolved.value_channel_capacity,
            error_channel_capacity: resolved.error_channel_capacity,
        },
        cancel_watch,
    );

    let pool = WorkerPool::start(
        PoolConfig {
            max_parallel: resolved.max_parallel,
            input_channel_capacity: resolved.input_channel_capacity,
            output_channel_capacity: resolved.output_channel_capacity,
        },
        callback,
    );

    let run_stats = Arc::new(Stats::new());
    let dumper = stats::spawn_periodic_dumper(
        run_stats.clone(),
        Duration::from_secs(resolved.stat_after_seconds),
    );

    orchestrator::run(
        generator,
        pool,
        run_stats,
        OrchestratorConfig {
            max_attempts: orchestrator::DEFAULT_MAX_ATTEMPTS,
            stat_after_lines: resolved.stat_after_lines,
        },
    )
    .await;

    dumper.abort();
    if let Some(server) = fake_server.take() {
        drop(server);
    }

    Ok(())
}

/// Spawns a task that cancels the generator on SIGINT or SIGTERM.
///
/// Unix-only: `tokio::signal::unix` has no Windows equivalent. The source
/// registers the same pair via `signal.Notify`.
#[cfg(unix)]
fn spawn_signal_handler(cancel: CancelToken) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGINT handler");
                return;
            }
        };
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
        cancel.cancel();
    });
}

#[cfg(not(unix))]
fn spawn_signal_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down");
            cancel.cancel();
        }
    });
}
