use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use shiftlog_core::stats::TimeRange;

#[derive(Parser)]
#[command(name = "shiftlog")]
#[command(about = "Log shifts and breaks from the command line, offline first")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Sync API base URL (overrides SHIFTLOG_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new shift
    Start,
    /// End the running shift
    End,
    /// Start or end a break on the running shift
    Break {
        #[command(subcommand)]
        command: BreakCommands,
    },
    /// Show the running shift
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow the running shift until interrupted
    Watch {
        /// Refresh interval in seconds
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..=60))]
        interval: u64,
    },
    /// List recent shifts
    List {
        /// Number of shifts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Worked time for the current week, month or year
    Stats {
        #[arg(long, value_enum, default_value_t = StatsRange::Week)]
        range: StatsRange,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configure the account used for sync
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Push local shifts to the sync server
    Sync,
    /// Fetch the account's shifts from the sync server
    Pull,
    /// Delete all local shifts and the account
    Wipe {
        /// Also delete the account's history on the sync server
        #[arg(long)]
        remote: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum BreakCommands {
    /// Start a break
    Start,
    /// End the running break
    End,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Set the account email; a new email pulls its remote history
    Set {
        /// Account email address
        email: String,
    },
    /// Show the configured account
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatsRange {
    Week,
    Month,
    Year,
}

impl From<StatsRange> for TimeRange {
    fn from(range: StatsRange) -> Self {
        match range {
            StatsRange::Week => Self::Week,
            StatsRange::Month => Self::Month,
            StatsRange::Year => Self::Year,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
