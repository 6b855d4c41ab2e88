//! Photo Organizer - command line front end
//!
//! Parses arguments, sets up logging, wires Ctrl-C to cancellation and
//! prints the end-of-run summary.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use photo_organizer::progress::format_duration;
use photo_organizer::{
    AcceptAll, Cli, Config, ConfirmPolicy, Processor, ProgressSnapshot, RejectAll,
    RelocationOutcome, RemovalPolicy, RunObserver, RunSummary,
};
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colours and layout for terminal output

    use crossterm::{
        ExecutableCommand,
        cursor::MoveToColumn,
        style::{Color, Print, Stylize, style},
        terminal::{Clear, ClearType},
    };
    use std::io::{stderr, stdout};

    /// CLI theme colours
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    /// Centered bold title
    pub fn print_title(title: &str) {
        let width: usize = 60;
        let padding = width.saturating_sub(title.len()) / 2;
        let left_pad = " ".repeat(padding.saturating_sub(1));

        let _ = stdout().execute(Print(&format!(
            "{}{} {}{}\n",
            left_pad,
            "╔".bold(),
            title.bold(),
            "╗".bold(),
        )));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_hint(msg: &str) {
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str, value_color: Option<Color>) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = match value_color {
            Some(color) => style(value).with(color),
            None => style(value).bold(),
        };
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let key_styled = style(key).with(CliTheme::HINT);
        let value_styled = style(value).with(color).bold();
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(key_styled));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(value_styled));
        let _ = stdout().execute(Print("\n"));
    }

    /// Overwrite the current stderr line with the progress counters
    pub fn print_progress(processed: usize, total: usize, failed: usize, eta: &str) {
        let mut err = stderr();
        let _ = err.execute(MoveToColumn(0));
        let _ = err.execute(Clear(ClearType::CurrentLine));
        let _ = err.execute(Print(style(format!("{}/{}", processed + failed, total)).bold()));
        let _ = err.execute(Print(style("  ok ").with(CliTheme::HINT)));
        let _ = err.execute(Print(style(processed).with(CliTheme::SUCCESS)));
        let _ = err.execute(Print(style("  failed ").with(CliTheme::HINT)));
        let _ = err.execute(Print(style(failed).with(CliTheme::ERROR)));
        let _ = err.execute(Print(style("  eta ").with(CliTheme::HINT)));
        let _ = err.execute(Print(eta));
    }

    /// Finish the progress line
    pub fn end_progress() {
        let _ = stderr().execute(Print("\n"));
    }

    /// Print a status line above the progress line
    pub fn print_status(line: &str) {
        let mut err = stderr();
        let _ = err.execute(MoveToColumn(0));
        let _ = err.execute(Clear(ClearType::CurrentLine));
        let _ = err.execute(Print(format!("{}\n", line)));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print("\n"));
        let _ = stdout().execute(Print(style("  📁 ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(style("Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

/// Progress line on stderr, status lines in verbose mode
struct TerminalObserver {
    verbose: bool,
}

impl RunObserver for TerminalObserver {
    fn on_progress(&self, snapshot: &ProgressSnapshot) {
        let eta = match snapshot.eta {
            Some(eta) => format_duration(eta),
            None => "--".to_string(),
        };
        cli_output::print_progress(snapshot.processed, snapshot.total, snapshot.failed, &eta);
    }

    fn on_log(&self, line: &str) {
        debug!(target: "photo_organizer::status", "{}", line);
        if self.verbose {
            cli_output::print_status(line);
        }
    }
}

/// Asks on the terminal before removing each hidden/system file
struct TerminalPrompt;

impl RemovalPolicy for TerminalPrompt {
    fn confirm(&self, path: &Path) -> bool {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            info!(?path, "Not a terminal, keeping file");
            return false;
        }

        let mut input = stdin.lock();
        loop {
            eprint!("\nRemove file {}? (y/n): ", path.display());
            let _ = std::io::stderr().flush();

            let mut answer = String::new();
            match input.read_line(&mut answer) {
                Ok(0) | Err(_) => return false,
                Ok(_) => {}
            }
            match answer.trim().to_lowercase().as_str() {
                "y" => return true,
                "n" => return false,
                _ => continue,
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.init_config {
        std::fs::write(path, Config::sample_config())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Sample configuration written to {}", path.display());
        return Ok(());
    }

    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Photo Organizer starting"
    );

    let config = load_config(&cli, &exe_dir)?;
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    let cancel = setup_cancellation();
    let processor = Processor::new(config)?;
    let config = processor.config();
    let observer = TerminalObserver {
        verbose: config.verbose,
    };

    let policy: Box<dyn RemovalPolicy> = match config.confirm_removal {
        ConfirmPolicy::Ask => Box::new(TerminalPrompt),
        ConfirmPolicy::Always => Box::new(AcceptAll),
        ConfirmPolicy::Never => Box::new(RejectAll),
    };

    let result = processor.run(&observer, policy.as_ref(), &cancel);
    cli_output::end_progress();

    match result {
        Ok(summary) => {
            print_summary(&summary, config.verbose);
            cli_output::print_separator();
            cli_output::print_log_path(&log_path.display().to_string());
            info!(log_file = %log_path.display(), "Processing complete. Log saved to");

            if summary.cancelled {
                std::process::exit(130);
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Processing failed");
            cli_output::print_error(&format!("Error: {}", e));
            std::process::exit(1);
        }
    }
}

fn print_summary(summary: &RunSummary, verbose: bool) {
    use cli_output::*;

    let stats = &summary.statistics;

    print_separator();
    print_title("Processing Complete");
    print_separator();

    print_blank();
    print_stat("Total files", &stats.total.to_string(), CliTheme::ACCENT);
    print_stat("Processed", &stats.processed.to_string(), CliTheme::SUCCESS);
    print_stat("Failed", &stats.failed.to_string(), CliTheme::ERROR);
    print_stat("Processing time", &format_duration(summary.elapsed), CliTheme::ACCENT);
    if let Some(ref reclaim) = summary.reclaim {
        print_stat(
            "Empty folders removed",
            &reclaim.removed_dirs.to_string(),
            CliTheme::WARNING,
        );
    }
    print_blank();

    if verbose {
        let skipped = summary
            .records
            .iter()
            .filter(|r| matches!(r.outcome, RelocationOutcome::SkippedDuplicate { .. }))
            .count();
        if skipped > 0 {
            print_hint(&format!("{} files already existed at the destination", skipped));
        }
    }

    if !stats.failures.is_empty() {
        print_separator();
        print_error(&format!("Failed files: {}", stats.failures.len()));
        print_blank();
        for failure in &stats.failures {
            print_key_value(
                &failure.path.display().to_string(),
                &failure.reason,
                Some(CliTheme::ERROR),
            );
        }
    }

    if summary.cancelled {
        print_separator();
        print_warning("Cancelled - remaining files were left in place");
    }
}

/// Ctrl-C requests a stop at the next file boundary
fn setup_cancellation() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        eprintln!("\nInterrupt received, stopping after the current file...");
    }) {
        error!(error = %e, "Failed to install Ctrl-C handler");
    }

    cancel
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| exe_dir.join("Log"));
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        let config_log_dir = log_dir.join(&config_name);
        let log_filename = format!("{}_{}.log", config_name, timestamp);
        config_log_dir.join(log_filename)
    } else {
        let log_filename = format!("CLIRun_{}.log", timestamp);
        log_dir.join(log_filename)
    }
}

/// Resolve config path - supports shorthand syntax
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let config_dir = exe_dir.join("Config");
    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());

    let mut in_config_dir = config_dir.join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    if config.source_dir.as_os_str().is_empty() {
        anyhow::bail!("No source directory given (use --source or a config file)");
    }
    if config.destination_dir.as_os_str().is_empty() {
        anyhow::bail!("No destination directory given (use --destination or a config file)");
    }

    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    // Console only gets warnings so the progress line stays readable
    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(LevelFilter::WARN),
            )
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(LevelFilter::WARN),
            )
            .init();
    }

    Ok(Some(guard))
}
