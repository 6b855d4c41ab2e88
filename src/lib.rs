//! Photo Organizer - move media files into a date organized tree
//!
//! This library provides functionality for relocating photos and videos
//! based on the capture date stored in their metadata:
//! - File eligibility checks (extension sets, hidden and sidecar files)
//! - EXIF date extraction for images
//! - MediaInfo-based date extraction for videos
//! - Skip-on-exists moves into YYYY/MM[/DD] folders
//! - Removal of source folders left empty
//! - Progress counters with a rolling-average ETA

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod os;
pub mod process;
pub mod progress;
pub mod reclaim;
pub mod relocate;
pub mod time;

pub use classify::{FileClassifier, FileEntry, MediaCategory};
pub use cli::Cli;
pub use config::{Config, ConfigError, ConfirmPolicy, Granularity, MediaFormats};
pub use error::{Error, Result};
pub use process::{FileRecord, Processor, RunSummary};
pub use progress::{
    ProgressSnapshot, ProgressTracker, RunObserver, RunStatistics, SilentObserver,
};
pub use reclaim::{
    AcceptAll, DecisionMap, EmptyDirectoryReclaimer, ReclaimReport, RejectAll, RemovalPolicy,
};
pub use relocate::{RelocationEngine, RelocationOutcome};
pub use time::DateResolver;
