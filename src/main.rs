mod cli;
mod config;
mod digest;
mod history;
mod interrupt;
mod max_age;
mod report;
mod scan;
mod store;
mod timestamp;
mod walk;

use cli::{Cli, LogLevel};
use config::{Config, Mode};
use interrupt::{CancelToken, install_sigint_handler};
use scan::ScanEngine;
use std::fmt as stdfmt;
use std::io::{IsTerminal, stderr};
use std::process::ExitCode;
use store::ChecksumStore;
use tracing::{Event, Level, Subscriber, error, info, warn};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

struct RunExitCode;

impl RunExitCode {
    /// Exit code for invalid configuration (target, algorithm, max age, ...).
    fn configuration_error() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code for failures during the run (corrupt database, I/O errors).
    fn any_error() -> ExitCode {
        ExitCode::from(2)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level);

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return RunExitCode::configuration_error();
        }
    };

    let cancel = CancelToken::new();
    if let Err(err) = install_sigint_handler(&cancel) {
        warn!("Could not install Ctrl-C handler: {err}");
    }

    match run(&config, cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            RunExitCode::any_error()
        }
    }
}

fn run(config: &Config, cancel: CancelToken) -> anyhow::Result<()> {
    let mut store = ChecksumStore::load(&config.db_path)?;
    let rebased = store.rebase_keys(&config.target);
    if rebased > 0 {
        info!(
            "Rewrote {} database keys relative to {}",
            rebased,
            config.target.display()
        );
    }
    info!(
        "Loaded {} records from {}",
        store.len(),
        config.db_path.display()
    );

    match config.mode {
        Mode::ExportPlain => {
            let (path, written) = history::write_plain_checksum_file(
                &store,
                config.algorithm,
                &config.target,
                timestamp::now(),
            )?;
            report::print_lines(&report::format_export(&path, written));
        }
        Mode::Check { then_last_ok } => {
            let provider = config.backend.provider();
            let engine = ScanEngine::new(config, provider.as_ref(), cancel);
            let outcome = engine.check(&mut store)?;
            report::print_lines(&report::format_check_outcome(&outcome));

            if then_last_ok {
                print_last_known_good(&store);
            }
        }
        Mode::LastOk => print_last_known_good(&store),
        Mode::Calculate => {
            let provider = config.backend.provider();
            let engine = ScanEngine::new(config, provider.as_ref(), cancel);
            let summary = engine.calculate(&mut store)?;
            report::print_lines(&report::format_calculate_summary(&summary));
        }
    }

    Ok(())
}

fn print_last_known_good(store: &ChecksumStore) {
    let entries = history::find_last_known_good(store);
    report::print_lines(&report::format_last_known_good(&entries));
}

/// Explicit flags win over RUST_LOG, which wins over the `warn` default.
fn log_filter_directive(verbose: u8, log_level: Option<LogLevel>) -> Option<&'static str> {
    match (log_level, verbose) {
        (Some(level), _) => Some(level.as_filter()),
        (None, 0) => None,
        (None, 1) => Some("info"),
        (None, _) => Some("debug"),
    }
}

fn init_tracing(verbose: u8, log_level: Option<LogLevel>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = LevelPrefixFormatter { stderr_is_terminal };

    let filter = match log_filter_directive(verbose, log_level) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Prefix for a log line: a glyph on a terminal, the level name otherwise so
/// redirected logs stay plain ASCII.
fn level_prefix(level: Level, terminal: bool) -> &'static str {
    match (level, terminal) {
        (Level::ERROR, true) => "❌️ ",
        (Level::WARN, true) => "⚠️  ",
        (Level::INFO, true) => "ℹ️ ",
        (Level::DEBUG, true) => "🔍 ",
        (_, true) => "🔬 ",
        (Level::ERROR, false) => "ERROR: ",
        (Level::WARN, false) => "WARN: ",
        (Level::INFO, false) => "INFO: ",
        (Level::DEBUG, false) => "DEBUG: ",
        (_, false) => "TRACE: ",
    }
}

struct LevelPrefixFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for LevelPrefixFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        writer.write_str(level_prefix(
            *event.metadata().level(),
            self.stderr_is_terminal,
        ))?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
