mod help_text;

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Track checksums of a directory tree over time and detect drift
#[derive(Parser, Debug)]
#[command(
    name = "smart-checksum",
    version,
    about,
    long_about = help_text::ROOT_LONG_ABOUT,
    after_help = help_text::AFTER_HELP
)]
pub struct Cli {
    /// Base directory with the files to be tracked
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Checksum algorithm: md5 (default) or sha256
    #[arg(long, visible_alias = "algorithm", value_name = "ALGO")]
    pub checksum: Option<String>,

    /// File name of the JSON checksum database, relative to TARGET
    /// [default: smart_checksums_db.json]
    #[arg(long, value_name = "FILENAME")]
    pub db: Option<String>,

    /// Verify files against the checksums recorded in the database
    #[arg(long)]
    pub check: bool,

    /// Recheck files whose last OK check is at least this old, as <integer><unit>
    /// with unit d (days), w (weeks), m (months of 30 days) or y (years of 365
    /// days) [default: 1m]
    #[arg(long = "max_age", visible_alias = "max-age", value_name = "AGE")]
    pub max_age: Option<String>,

    /// Report when files that failed verification were last seen OK
    #[arg(long)]
    pub lastok: bool,

    /// Recalculate and overwrite existing baseline checksums
    #[arg(long)]
    pub force: bool,

    /// Save the database after every computed checksum
    #[arg(long = "save_often", visible_alias = "save-often")]
    pub save_often: bool,

    /// Write a plain `<digest>  <path>` checksum file into TARGET and exit
    #[arg(
        long = "gen_plain_checksum_file",
        visible_alias = "gen-plain-checksum-file"
    )]
    pub gen_plain_checksum_file: bool,

    /// Digest backend: builtin (in-process hashing) or system (md5sum/sha256sum)
    #[arg(long, value_name = "BACKEND")]
    pub digest_backend: Option<String>,

    /// TOML settings file providing defaults for the options above
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug). Takes precedence over RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "log_level")]
    pub verbose: u8,

    /// Set the log level explicitly. Takes precedence over RUST_LOG.
    #[arg(long, value_name = "LEVEL", value_enum)]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
