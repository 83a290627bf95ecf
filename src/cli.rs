//! CLI argument definitions using clap derive macros.

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Restore a large pre-enumerated set of object ids into a blob store from backup.
#[derive(Parser, Debug)]
#[command(name = "unfuckup-s3")]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config file.
    #[arg(long, global = true, default_value = "unfuckup.yaml")]
    pub config: String,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Restore identifiers into S3-compatible object storage.
    S3(S3Args),
}

/// Flags for the `s3` subcommand.
#[derive(ClapArgs, Debug)]
pub struct S3Args {
    /// Input file of identifiers, one per line.
    #[arg(short = 'i', long)]
    pub input: Option<String>,

    /// Skip this many lines of the input file before restoring.
    #[arg(long)]
    pub offset: Option<u64>,

    /// Stop after restoring this many identifiers (0 = unbounded).
    #[arg(long)]
    pub limit: Option<u64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_applies_without_flag() {
        let cli = Cli::try_parse_from(["unfuckup-s3", "s3"]).unwrap();
        assert_eq!(cli.config, "unfuckup.yaml");
    }

    #[test]
    fn config_flag_overrides_default_path() {
        let cli = Cli::try_parse_from(["unfuckup-s3", "--config", "custom.yaml", "s3"]).unwrap();
        assert_eq!(cli.config, "custom.yaml");
    }

    #[test]
    fn s3_subcommand_flags_are_optional() {
        let cli = Cli::try_parse_from(["unfuckup-s3", "s3"]).unwrap();
        let Command::S3(args) = cli.command;
        assert!(args.input.is_none());
        assert!(args.offset.is_none());
        assert!(args.limit.is_none());
    }

    #[test]
    fn s3_subcommand_accepts_input_offset_limit() {
        let cli = Cli::try_parse_from([
            "unfuckup-s3",
            "s3",
            "--input",
            "ids.txt",
            "--offset",
            "10",
            "--limit",
            "5",
        ])
        .unwrap();
        let Command::S3(args) = cli.command;
        assert_eq!(args.input.as_deref(), Some("ids.txt"));
        assert_eq!(args.offset, Some(10));
        assert_eq!(args.limit, Some(5));
    }

    #[test]
    fn s3_subcommand_short_input_flag() {
        let cli = Cli::try_parse_from(["unfuckup-s3", "s3", "-i", "ids.txt"]).unwrap();
        let Command::S3(args) = cli.command;
        assert_eq!(args.input.as_deref(), Some("ids.txt"));
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        let result = Cli::try_parse_from(["unfuckup-s3"]);
        assert!(result.is_err());
    }

    #[test]
    fn help_flag_shows_usage() {
        let result = Cli::try_parse_from(["unfuckup-s3", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn version_flag_shows_version() {
        let result = Cli::try_parse_from(["unfuckup-s3", "--version"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let result = Cli::try_parse_from(["unfuckup-s3", "s3", "--bogus"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
