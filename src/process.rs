//! Run orchestration
//!
//! Handles the core loop of:
//! - Scanning the source directory
//! - Resolving capture dates
//! - Moving files into the destination tree
//! - Tracking progress and failures
//! - Removing folders left empty in the source

use crate::classify::{FileClassifier, FileEntry};
use crate::config::{Config, Granularity};
use crate::error::{Error, Result};
use crate::progress::{ProgressTracker, RunObserver, RunStatistics, format_duration};
use crate::reclaim::{EmptyDirectoryReclaimer, ReclaimReport, RemovalPolicy};
use crate::relocate::{RelocationEngine, RelocationOutcome};
use crate::time::DateResolver;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, debug, info, span, warn};
use walkdir::WalkDir;

/// Outcome of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub source: PathBuf,
    pub outcome: RelocationOutcome,
}

/// Everything a caller needs to report a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub statistics: RunStatistics,
    /// One record per visited file, in processing order
    pub records: Vec<FileRecord>,
    /// `None` when cleanup was disabled or the run was cancelled
    pub reclaim: Option<ReclaimReport>,
    pub elapsed: Duration,
    /// Stopped early; unvisited files were left untouched
    pub cancelled: bool,
}

/// Main processor for organizing media files
pub struct Processor {
    config: Config,
    classifier: FileClassifier,
    resolver: DateResolver,
    engine: RelocationEngine,
}

impl Processor {
    /// Create a processor using the default metadata readers
    pub fn new(config: Config) -> Result<Self> {
        Self::with_resolver(config, DateResolver::new())
    }

    /// Create a processor with a custom date resolver
    pub fn with_resolver(config: Config, resolver: DateResolver) -> Result<Self> {
        if config.source_dir.as_os_str().is_empty() {
            return Err(Error::Config("source directory is not set".into()));
        }
        if config.destination_dir.as_os_str().is_empty() {
            return Err(Error::Config("destination directory is not set".into()));
        }

        Ok(Self {
            classifier: FileClassifier::new(config.formats.clone()),
            engine: RelocationEngine::new(&config.destination_dir, config.granularity),
            resolver,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline.
    ///
    /// Fails before touching any file if the source is missing or the
    /// destination cannot be created. Per-file problems never abort the run.
    /// `cancel` is checked between files.
    pub fn run(
        &self,
        observer: &dyn RunObserver,
        policy: &dyn RemovalPolicy,
        cancel: &AtomicBool,
    ) -> Result<RunSummary> {
        let _span = span!(Level::INFO, "processor_run").entered();
        let started = Instant::now();

        let source = self.check_source()?;
        let destination = self.prepare_destination()?;

        info!(?source, "Scanning source directory...");
        observer.on_log("Scanning source folder for files...");
        let files = self.collect_files(&source, &destination);
        info!(count = files.len(), "Found media files");

        let mut tracker = ProgressTracker::new(files.len());
        observer.on_progress(&tracker.snapshot());
        for line in self.task_summary_lines(files.len()) {
            observer.on_log(&line);
        }

        if files.is_empty() {
            observer.on_log(" • No files found to process.");
        }

        let mut records = Vec::with_capacity(files.len());
        let mut cancelled = false;

        for entry in &files {
            if cancel.load(Ordering::SeqCst) {
                warn!(remaining = tracker.statistics().remaining(), "Run cancelled");
                observer.on_log(" • Cancelled, remaining files left in place.");
                cancelled = true;
                break;
            }

            let _file_span = span!(Level::DEBUG, "process_file", path = ?entry.path).entered();
            let file_started = Instant::now();
            let name = display_name(&entry.path);
            observer.on_log(&format!(" • Processing: {}", name));

            let outcome = self.process_file(entry);
            let elapsed = file_started.elapsed();

            let timed = matches!(outcome, RelocationOutcome::Moved { .. });
            tracker.record(&entry.path, &outcome, timed.then_some(elapsed));
            observer.on_log(&outcome_line(&name, &outcome));
            observer.on_progress(&tracker.snapshot());

            records.push(FileRecord {
                source: entry.path.clone(),
                outcome,
            });
        }

        let statistics = tracker.into_statistics();
        info!("{}", statistics.summary());
        for line in finished_lines(&statistics, started.elapsed()) {
            observer.on_log(&line);
        }

        let reclaim = if self.config.remove_empty && !cancelled {
            if cancel.load(Ordering::SeqCst) {
                cancelled = true;
                None
            } else {
                Some(self.reclaim(&source, &destination, observer, policy))
            }
        } else {
            None
        };

        Ok(RunSummary {
            statistics,
            records,
            reclaim,
            elapsed: started.elapsed(),
            cancelled,
        })
    }

    /// Resolve the date and move; every error becomes an outcome
    fn process_file(&self, entry: &FileEntry) -> RelocationOutcome {
        match self.resolver.resolve_detailed(entry) {
            Ok(date) => self.engine.relocate(entry, date),
            Err(e) => {
                warn!(path = ?entry.path, error = %e, "No date found");
                RelocationOutcome::FailedNoDate {
                    reason: format!("No date found: {}", e),
                }
            }
        }
    }

    fn check_source(&self) -> Result<PathBuf> {
        let source = &self.config.source_dir;
        let metadata = fs::metadata(source).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::SourceMissing(source.clone()),
            _ => Error::Io(e),
        })?;
        if !metadata.is_dir() {
            return Err(Error::SourceNotDirectory(source.clone()));
        }
        Ok(fs::canonicalize(source)?)
    }

    fn prepare_destination(&self) -> Result<PathBuf> {
        let destination = &self.config.destination_dir;
        fs::create_dir_all(destination)
            .and_then(|_| fs::canonicalize(destination))
            .map_err(|e| Error::DestinationUnavailable {
                path: destination.clone(),
                source: e,
            })
    }

    /// Collect eligible files, skipping the destination tree when it is
    /// nested inside the source. The result is fixed for the run.
    fn collect_files(&self, source: &Path, destination: &Path) -> Vec<FileEntry> {
        let nested = source != destination;
        WalkDir::new(source)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                let inside_destination = nested
                    && e.depth() > 0
                    && e.file_type().is_dir()
                    && e.path().starts_with(destination);
                if inside_destination {
                    debug!(path = ?e.path(), "Skipping destination tree");
                }
                !inside_destination
            })
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "Cannot read directory entry");
                    None
                }
            })
            .filter(|e| !e.file_type().is_dir())
            .filter_map(|e| self.classifier.entry(e.path()))
            .collect()
    }

    /// Remove emptied source folders, leaving a nested destination alone
    fn reclaim(
        &self,
        source: &Path,
        destination: &Path,
        observer: &dyn RunObserver,
        policy: &dyn RemovalPolicy,
    ) -> ReclaimReport {
        observer.on_log("Cleanup - Removing empty folders:");
        observer.on_log("");

        let mut reclaimer = EmptyDirectoryReclaimer::new(self.config.formats.clone());
        if destination != source && destination.starts_with(source) {
            reclaimer = reclaimer.protecting(destination);
        }
        let report = reclaimer.reclaim(source, policy);

        for path in &report.declined {
            observer.on_log(&format!(" • Skipped removing file: {}", path.display()));
        }
        for failure in &report.failures {
            observer.on_log(&format!(
                " • Failed to remove {}: {}",
                failure.path.display(),
                failure.reason
            ));
        }
        if report.removed_dirs == 0 {
            observer.on_log(" • No empty folders found.");
        } else {
            observer.on_log(&format!(" • Empty folders removed : {}", report.removed_dirs));
        }

        report
    }

    fn task_summary_lines(&self, total: usize) -> Vec<String> {
        let granularity = match self.config.granularity {
            Granularity::Month => "YYYY/MM",
            Granularity::Day => "YYYY/MM/DD",
        };
        vec![
            "-".repeat(50),
            "Photo Organizer Task Summary".to_string(),
            "-".repeat(50),
            format!("Source folder       : {}", self.config.source_dir.display()),
            format!("Destination folder  : {}", self.config.destination_dir.display()),
            format!("Folder layout       : {}", granularity),
            format!(
                "Remove empty folders: {}",
                if self.config.remove_empty { "Yes" } else { "No" }
            ),
            format!("Total files found   : {}", total),
            "-".repeat(50),
            String::new(),
        ]
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn outcome_line(name: &str, outcome: &RelocationOutcome) -> String {
    match outcome {
        RelocationOutcome::Moved { destination } => {
            format!("   Moved {} to {}", name, destination.display())
        }
        RelocationOutcome::SkippedDuplicate { existing } => {
            let folder = existing.parent().unwrap_or(existing);
            format!("   File {} already exists in {}, skipping.", name, folder.display())
        }
        RelocationOutcome::FailedNoDate { reason } => {
            format!("   ✗ {} for {}", reason, name)
        }
        RelocationOutcome::FailedMoveError { reason } => {
            format!("   ✗ Failed to move {}: {}", name, reason)
        }
    }
}

/// Closing summary: counts, timings and the failed files
fn finished_lines(stats: &RunStatistics, total_time: Duration) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "-".repeat(50),
        "Sorting completed:".to_string(),
        String::new(),
        format!(" • Total files processed : {}", stats.processed),
        format!(" • Total files failed    : {}", stats.failed),
        format!(" • Processing time       : {}", format_duration(total_time)),
    ];
    if stats.total > 0 {
        let average = total_time / stats.total as u32;
        lines.push(format!(" • Average per file      : {}", format_duration(average)));
    }
    lines.push(String::new());

    if !stats.failures.is_empty() {
        lines.push("Failed files:".to_string());
        for failure in &stats.failures {
            lines.push(format!("   • {}: {}", failure.path.display(), failure.reason));
        }
    }
    lines.push("-".repeat(50));
    lines
}
