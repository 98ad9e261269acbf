use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Background tagging worker for filevault uploads
#[derive(Parser, Debug, Clone)]
#[command(
    name = "filevault-worker",
    version,
    about = "Consumes the filevault tagging queue and writes tags back",
    after_help = "EXAMPLES:\n    \
        # Run a worker until Ctrl+C\n    \
        filevault-worker work --redis redis://localhost:6379\n\n    \
        # Re-queue a file for tagging\n    \
        filevault-worker enqueue 6f1c0e2a-...\n\n    \
        # Show queue depth and a file's tag state\n    \
        filevault-worker status 6f1c0e2a-..."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// JSON settings file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Redis URL for the queue and result cache (overrides settings)
    #[arg(long, global = true, value_name = "URL")]
    pub redis: Option<String>,

    /// SQLite database holding file records (overrides settings)
    #[arg(long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the tagging worker
    Work {
        /// Stop after this many queue entries
        #[arg(long, value_name = "NUM")]
        max_jobs: Option<u64>,
    },

    /// Push a tagging job for an existing file record
    Enqueue {
        #[arg(value_name = "FILE_ID")]
        file_id: String,
    },

    /// Show queue length, and a file's tag state when an id is given
    Status {
        #[arg(value_name = "FILE_ID")]
        file_id: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_work_with_globals() {
        let args = CliArgs::parse_from([
            "filevault-worker",
            "work",
            "--max-jobs",
            "3",
            "--redis",
            "redis://cache:6379",
            "--log-json",
        ]);
        assert!(matches!(args.command, Command::Work { max_jobs: Some(3) }));
        assert_eq!(args.redis.as_deref(), Some("redis://cache:6379"));
        assert!(args.log_json);
    }

    #[test]
    fn test_parse_status_without_id() {
        let args = CliArgs::parse_from(["filevault-worker", "status"]);
        assert!(matches!(args.command, Command::Status { file_id: None }));
        assert!(args.config.is_none());
    }

    #[test]
    fn test_enqueue_requires_id() {
        assert!(CliArgs::try_parse_from(["filevault-worker", "enqueue"]).is_err());
    }
}
