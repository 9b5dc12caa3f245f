//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry - event validation, durable queueing and batched delivery
#[derive(Parser, Debug)]
#[command(
    name = "telemetry",
    author,
    version,
    about = "Event telemetry pipeline tooling",
    long_about = "Tooling for the event telemetry pipeline.\n\n\
                  Validates tenant configuration, summarizes event schemas and \n\
                  replays recorded events through the validate, queue and \n\
                  dispatch stages."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Feed recorded events through the pipeline and drain the queue
    Replay(ReplayArgs),
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "telemetry.toml", env = "TELEMETRY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "telemetry.toml", env = "TELEMETRY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show parameter details for every event schema
    #[arg(long)]
    pub events: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "telemetry.toml", env = "TELEMETRY_CONFIG")]
    pub config: PathBuf,

    /// JSON lines file, one raw event per line
    #[arg(short, long)]
    pub events: PathBuf,

    /// Directory of the durable queue (overrides `store.path`)
    #[arg(long, env = "TELEMETRY_STORE")]
    pub store: Option<PathBuf>,

    /// Collection endpoint; events are logged instead when absent
    #[arg(long, env = "TELEMETRY_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Per-request timeout for the HTTP sender, in seconds
    #[arg(long, default_value = "10")]
    pub request_timeout: u64,

    /// Give up draining after this many seconds (0 = wait for one full cycle)
    #[arg(long, default_value = "0", env = "TELEMETRY_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TELEMETRY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay() {
        let cli = Cli::try_parse_from([
            "telemetry",
            "-v",
            "replay",
            "--config",
            "t.toml",
            "--events",
            "events.jsonl",
            "--store",
            "/tmp/q",
        ])
        .unwrap();
        assert_eq!(cli.log_level(), "debug");
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.events, PathBuf::from("events.jsonl"));
                assert_eq!(args.store, Some(PathBuf::from("/tmp/q")));
                assert!(args.endpoint.is_none());
                assert_eq!(args.metrics_port, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["telemetry", "-q", "-v", "info"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_replay_requires_events() {
        let result = Cli::try_parse_from(["telemetry", "replay", "--config", "t.toml"]);
        assert!(result.is_err());
    }
}
