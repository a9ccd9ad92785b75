//! Command line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use phoenix_ingest::UNSPECIFIED;

#[derive(Debug, Parser)]
#[command(name = "phoenix-cache", version, about = "Phoenix cache tools")]
pub struct Cli {
    /// Configuration file; `conf/phoenix.toml` is read when present
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    #[arg(long = "redis-url")]
    pub redis_url: Option<String>,

    /// Lock acquisition timeout in milliseconds
    #[arg(long = "lock-timeout-ms")]
    pub lock_timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a results document in the cache
    Import {
        /// Results JSON file, stdin when omitted
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
        /// Parse the document and report what would be written, without connecting
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the data source map
    DumpDsm,
    /// Print the device name -> data source host mapping of one cluster
    DeviceMap {
        #[arg(long, default_value = UNSPECIFIED)]
        grid: String,
        #[arg(long, default_value = UNSPECIFIED)]
        cluster: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from([
            "phoenix-cache",
            "--redis-url",
            "redis://cache:6379",
            "--lock-timeout-ms",
            "1500",
            "import",
            "--file",
            "results.json",
        ])
        .unwrap();

        assert_eq!(cli.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(cli.lock_timeout_ms, Some(1500));
        match cli.command {
            Command::Import { file, dry_run } => {
                assert_eq!(file, Some(PathBuf::from("results.json")));
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_import_dry_run() {
        let cli = Cli::try_parse_from(["phoenix-cache", "import", "--dry-run"]).unwrap();
        match cli.command {
            Command::Import { file, dry_run } => {
                assert_eq!(file, None);
                assert!(dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_device_map_defaults() {
        let cli = Cli::try_parse_from(["phoenix-cache", "device-map"]).unwrap();
        match cli.command {
            Command::DeviceMap { grid, cluster } => {
                assert_eq!(grid, "unspecified");
                assert_eq!(cluster, "unspecified");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["phoenix-cache"]).is_err());
    }
}
