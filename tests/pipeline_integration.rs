//! Integration test exercising generator -> pool -> orchestrator end to end
//! against real HTTP mock servers, checking the stats invariants from the
//! testable-properties list (success + fatal == input, etc).

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use unfuckup_s3::generator::{CancelToken, Generator, GeneratorConfig};
use unfuckup_s3::orchestrator::{self, OrchestratorConfig};
use unfuckup_s3::restore::{AmazonRestorer, BackupClient, Restorer};
use unfuckup_s3::stats::Stats;
use unfuckup_s3::worker::pool::{PoolConfig, WorkerPool};
use unfuckup_s3::worker::Callback;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn full_pipeline_mixed_success_and_failure_respects_invariants() {
    let backup_server = MockServer::start().await;
    let restore_server = MockServer::start().await;

    // Every id ending in "-bad" gets a 500 from the backup store; the rest succeed.
    Mock::given(method("GET"))
        .and(path_regex(r"^/backup/.*-bad$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&backup_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex("^/backup/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
        .mount(&backup_server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex("^/restore/.+"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&restore_server)
        .await;

    let restorer = Restorer::new(
        BackupClient::new(format!("{}/backup/", backup_server.uri()), Duration::from_secs(5)),
        AmazonRestorer::new(
            format!("{}/restore", restore_server.uri()),
            "bucket",
            Duration::from_secs(5),
        ),
    );
    let callback: Callback = Arc::new(move |task| {
        let restorer = restorer.clone();
        Box::pin(async move { restorer.restore(&task.id).await })
    });

    let input = "id-1\nid-2-bad\nid-3\nid-4-bad\nid-5\n";
    let (_tok, watch) = CancelToken::new();
    let generator = Generator::spawn(
        Cursor::new(input.as_bytes().to_vec()),
        GeneratorConfig::default(),
        watch,
    );
    let pool = WorkerPool::start(
        PoolConfig {
            max_parallel: 4,
            ..PoolConfig::default()
        },
        callback,
    );
    let stats = Arc::new(Stats::new());

    orchestrator::run(generator, pool, stats.clone(), OrchestratorConfig::default()).await;

    assert_eq!(stats.input_count(), 5);
    assert_eq!(stats.success_count() + stats.fatal_count(), stats.input_count());
    assert!(stats.retry_count() <= stats.fail_count());
    assert!(stats.fatal_count() <= stats.fail_count());
    assert!(stats.success_count() + stats.fail_count() >= stats.input_count());
    // Two bad ids, each retried MAX_ATTEMPTS-1 times before going fatal.
    assert_eq!(stats.fatal_count(), 2);
    assert_eq!(stats.success_count(), 3);
}
