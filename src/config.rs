//! YAML-backed configuration for the `s3` subcommand.
//!
//! The wire format is fixed by the calling contract (unlike the TOML files
//! the rest of this codebase's tooling uses elsewhere), so this module loads
//! with `serde`/`serde_yaml` directly into a nested struct instead of the
//! hand-rolled `key = value` parser used for local tool defaults.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Root of `unfuckup.yaml`, keyed under `s3`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// The `s3` top-level key. Absent entirely is valid (all-defaults run).
    #[serde(default)]
    pub s3: S3Config,
}

/// Settings under the `s3` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Config {
    /// Input file path.
    pub input: Option<String>,
    /// Generator window and channel sizing.
    #[serde(default)]
    pub generator: GeneratorSection,
    /// Worker pool sizing.
    #[serde(default)]
    pub workerpool: WorkerPoolSection,
    /// Backup store endpoint.
    #[serde(default)]
    pub backup: BackupSection,
    /// Object store endpoint.
    #[serde(default)]
    pub restore: RestoreSection,
    /// Optional in-process loopback server, for load testing.
    #[serde(default)]
    pub fakeserver: FakeServerSection,
    /// Periodic stats reporting thresholds.
    #[serde(default)]
    pub stat: StatSection,
}

/// `s3.generator.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratorSection {
    /// Skip this many lines before emitting records.
    pub offset: Option<u64>,
    /// Stop after emitting this many records. `0`/absent means unbounded.
    pub limit: Option<u64>,
    /// Capacity of the generator's values channel.
    pub value_channel_capacity: Option<usize>,
    /// Capacity of the generator's errors channel.
    pub error_channel_capacity: Option<usize>,
}

/// `s3.workerpool.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerPoolSection {
    /// Concurrent workers.
    pub max_parallel: Option<usize>,
    /// Capacity of the pool's input channel.
    pub input_channel_capacity: Option<usize>,
    /// Capacity of the pool's output channel.
    pub output_channel_capacity: Option<usize>,
}

/// `s3.backup.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupSection {
    /// Mandatory unless `fakeserver.use_fake_server` is set.
    pub url_prefix: Option<String>,
}

/// `s3.restore.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestoreSection {
    /// Mandatory unless `fakeserver.use_fake_server` is set.
    pub url_prefix: Option<String>,
    /// Bucket identifier sent via the `Host1` header on every upload.
    pub bucket: Option<String>,
}

/// `s3.fakeserver.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FakeServerSection {
    /// When true, start an in-process loopback server instead of dialing
    /// `backup.url_prefix`/`restore.url_prefix`.
    pub use_fake_server: Option<bool>,
}

/// `s3.stat.*`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatSection {
    /// Emit a stats dump every this many processed results.
    pub after_lines: Option<u64>,
    /// Emit a stats dump every this many seconds.
    pub after_seconds: Option<u64>,
}

/// Fully resolved settings the orchestrator runs with, after merging CLI
/// overrides on top of the file config and defaults for everything else.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Input file path.
    pub input: String,
    /// Skip this many lines.
    pub offset: u64,
    /// Stop after this many emitted records (`0` = unbounded).
    pub limit: u64,
    /// Generator values channel capacity.
    pub value_channel_capacity: usize,
    /// Generator errors channel capacity.
    pub error_channel_capacity: usize,
    /// Concurrent workers.
    pub max_parallel: usize,
    /// Pool input channel capacity.
    pub input_channel_capacity: usize,
    /// Pool output channel capacity.
    pub output_channel_capacity: usize,
    /// Backup store URL prefix. Empty when `use_fake_server` is set.
    pub backup_url_prefix: String,
    /// Object store URL prefix. Empty when `use_fake_server` is set.
    pub restore_url_prefix: String,
    /// Bucket identifier for the `Host1` header.
    pub bucket: String,
    /// Start the in-process loopback server instead of dialing real endpoints.
    pub use_fake_server: bool,
    /// Periodic dump threshold, in processed results.
    pub stat_after_lines: u64,
    /// Periodic dump threshold, in seconds.
    pub stat_after_seconds: u64,
}

const DEFAULT_INPUT_FILE: &str = "testdata/file-id-5m.txt";
const DEFAULT_VALUE_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_ERROR_CHANNEL_CAPACITY: usize = 0;
const DEFAULT_MAX_PARALLEL: usize = 100;
const DEFAULT_STAT_AFTER_LINES: u64 = 100_000;
const DEFAULT_STAT_AFTER_SECONDS: u64 = 60;

/// CLI-supplied overrides, applied on top of the file config. `None` means
/// "use the file config / built-in default".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--input`
    pub input: Option<String>,
    /// `--offset`
    pub offset: Option<u64>,
    /// `--limit`
    pub limit: Option<u64>,
}

/// Reads and parses a YAML config file.
///
/// A missing file is not an error: callers that require it mandatory should
/// check existence explicitly. This matches the tolerant default-path
/// behavior used elsewhere in this codebase's config loading.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or does not
/// parse as valid YAML.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse config file '{}'", path.display()))
}

/// Merges `file` and `cli` into a fully resolved config, applying defaults
/// for anything neither specifies.
///
/// # Errors
///
/// Returns an error if neither `fakeserver.use_fake_server` nor both URL
/// prefixes are set.
pub fn resolve(file: &FileConfig, cli: &CliOverrides) -> Result<ResolvedConfig> {
    let s3 = &file.s3;
    let use_fake_server = s3.fakeserver.use_fake_server.unwrap_or(false);

    let backup_url_prefix = s3.backup.url_prefix.clone().unwrap_or_default();
    let restore_url_prefix = s3.restore.url_prefix.clone().unwrap_or_default();
    if !use_fake_server {
        if backup_url_prefix.is_empty() {
            bail!("s3.backup.url_prefix not set");
        }
        if restore_url_prefix.is_empty() {
            bail!("s3.restore.url_prefix not set");
        }
    }

    Ok(ResolvedConfig {
        input: cli
            .input
            .clone()
            .or_else(|| s3.input.clone())
            .unwrap_or_else(|| DEFAULT_INPUT_FILE.to_string()),
        offset: cli.offset.or(s3.generator.offset).unwrap_or(0),
        limit: cli.limit.or(s3.generator.limit).unwrap_or(0),
        value_channel_capacity: s3
            .generator
            .value_channel_capacity
            .unwrap_or(DEFAULT_VALUE_CHANNEL_CAPACITY),
        error_channel_capacity: s3
            .generator
            .error_channel_capacity
            .unwrap_or(DEFAULT_ERROR_CHANNEL_CAPACITY),
        max_parallel: s3.workerpool.max_parallel.unwrap_or(DEFAULT_MAX_PARALLEL),
        input_channel_capacity: s3.workerpool.input_channel_capacity.unwrap_or(1),
        output_channel_capacity: s3.workerpool.output_channel_capacity.unwrap_or(1),
        backup_url_prefix,
        restore_url_prefix,
        bucket: s3.restore.bucket.clone().unwrap_or_default(),
        use_fake_server,
        stat_after_lines: s3.stat.after_lines.unwrap_or(DEFAULT_STAT_AFTER_LINES),
        stat_after_seconds: s3.stat.after_seconds.unwrap_or(DEFAULT_STAT_AFTER_SECONDS),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_config_with_fake_server_resolves() {
        let file = FileConfig::default();
        let cli = CliOverrides::default();
        // Without fakeserver and without url prefixes, resolution must fail.
        assert!(resolve(&file, &cli).is_err());
    }

    #[test]
    fn fake_server_bypasses_mandatory_url_prefixes() {
        let yaml = "s3:\n  fakeserver:\n    use_fake_server: true\n";
        let file: FileConfig = serde_yaml::from_str(yaml).unwrap();
        let resolved = resolve(&file, &CliOverrides::default()).unwrap();
        assert!(resolved.use_fake_server);
        assert_eq!(resolved.input, DEFAULT_INPUT_FILE);
        assert_eq!(resolved.max_parallel, DEFAULT_MAX_PARALLEL);
    }

    #[test]
    fn cli_overrides_take_precedence_over_file() {
        let yaml = "s3:\n  input: from-file.txt\n  generator:\n    offset: 5\n  backup:\n    url_prefix: http://backup/\n  restore:\n    url_prefix: http://restore/\n";
        let file: FileConfig = serde_yaml::from_str(yaml).unwrap();
        let cli = CliOverrides {
            input: Some("from-cli.txt".to_string()),
            offset: Some(10),
            limit: None,
        };
        let resolved = resolve(&file, &cli).unwrap();
        assert_eq!(resolved.input, "from-cli.txt");
        assert_eq!(resolved.offset, 10);
    }

    #[test]
    fn missing_restore_url_prefix_is_rejected() {
        let yaml = "s3:\n  backup:\n    url_prefix: http://backup/\n";
        let file: FileConfig = serde_yaml::from_str(yaml).unwrap();
        let err = resolve(&file, &CliOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("restore.url_prefix"));
    }

    #[test]
    fn nonexistent_config_path_yields_defaults_only() {
        let file = load_file_config(Path::new("/nonexistent/unfuckup.yaml")).unwrap();
        assert!(file.s3.input.is_none());
    }
}
