//! Moving dated files into the destination tree

use crate::classify::FileEntry;
use crate::config::Granularity;
use chrono::{Datelike, NaiveDate};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Result of handling one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocationOutcome {
    /// File now lives at `destination`
    Moved { destination: PathBuf },
    /// A file with the same name already exists at `existing`; source untouched
    SkippedDuplicate { existing: PathBuf },
    /// No usable date in the metadata; source untouched
    FailedNoDate { reason: String },
    /// The move itself failed; source untouched
    FailedMoveError { reason: String },
}

impl RelocationOutcome {
    /// Moved or skipped as duplicate
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Moved { .. } | Self::SkippedDuplicate { .. })
    }

    pub fn is_failed(&self) -> bool {
        !self.is_processed()
    }

    /// Failure reason, `None` for processed outcomes
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::FailedNoDate { reason } | Self::FailedMoveError { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Computes destination paths and performs the moves
#[derive(Debug, Clone)]
pub struct RelocationEngine {
    destination_root: PathBuf,
    granularity: Granularity,
}

impl RelocationEngine {
    pub fn new(destination_root: impl Into<PathBuf>, granularity: Granularity) -> Self {
        Self {
            destination_root: destination_root.into(),
            granularity,
        }
    }

    /// Folder for a date: `root/YYYY/MM` or `root/YYYY/MM/DD`
    pub fn destination_dir(&self, date: NaiveDate) -> PathBuf {
        let mut dest = self.destination_root.clone();
        dest.push(format!("{}", date.year()));
        dest.push(format!("{:02}", date.month()));
        if self.granularity == Granularity::Day {
            dest.push(format!("{:02}", date.day()));
        }
        dest
    }

    /// Move the file into its date folder.
    ///
    /// Never overwrites: an occupied target yields `SkippedDuplicate`. Every
    /// failure leaves the source file where it was.
    pub fn relocate(&self, entry: &FileEntry, date: NaiveDate) -> RelocationOutcome {
        let source = entry.path.as_path();
        let Some(filename) = entry.file_name() else {
            return RelocationOutcome::FailedMoveError {
                reason: "Invalid source filename".to_string(),
            };
        };

        let dest_dir = self.destination_dir(date);
        if let Err(e) = fs::create_dir_all(&dest_dir) {
            error!(?source, ?dest_dir, error = %e, "Failed to create destination folder");
            return RelocationOutcome::FailedMoveError {
                reason: format!("Cannot create {}: {}", dest_dir.display(), e),
            };
        }

        let target = dest_dir.join(filename);
        // symlink_metadata so that a dangling link also counts as occupied
        if fs::symlink_metadata(&target).is_ok() {
            debug!(?source, ?target, "File already exists at destination, skipping");
            return RelocationOutcome::SkippedDuplicate { existing: target };
        }

        match move_file(source, &target) {
            Ok(()) => {
                info!(source = ?source, destination = ?target, %date, "Moved file");
                RelocationOutcome::Moved {
                    destination: target,
                }
            }
            Err(e) => {
                error!(?source, ?target, error = %e, "Failed to move file");
                RelocationOutcome::FailedMoveError {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Rename, falling back to copy + delete across filesystems
fn move_file(source: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(?source, error = %e, "Rename failed, copying instead");
            copy_then_remove(source, dest)
        }
    }
}

/// Copy with the source mtime, then delete the source.
///
/// On any failure the copy is discarded so only the source remains.
fn copy_then_remove(source: &Path, dest: &Path) -> io::Result<()> {
    if let Err(e) = copy_file(source, dest) {
        if e.kind() != io::ErrorKind::AlreadyExists {
            discard_partial_copy(dest);
        }
        return Err(e);
    }

    // Preserve modification time
    if let Ok(metadata) = fs::metadata(source)
        && let Ok(mtime) = metadata.modified()
    {
        let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime));
    }

    if let Err(e) = fs::remove_file(source) {
        // Keep exactly one copy, at the source
        discard_partial_copy(dest);
        return Err(e);
    }

    Ok(())
}

fn discard_partial_copy(dest: &Path) {
    if let Err(e) = fs::remove_file(dest)
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!(?dest, error = %e, "Failed to remove partial copy");
    }
}

/// Copy file with buffered I/O; refuses to replace an existing file
fn copy_file(source: &Path, dest: &Path) -> io::Result<()> {
    let src_file = File::open(source)?;
    let dest_file = File::options().write(true).create_new(true).open(dest)?;

    let mut reader = BufReader::with_capacity(256 * 1024, src_file);
    let mut writer = BufWriter::with_capacity(256 * 1024, dest_file);

    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }

    writer.flush()?;
    Ok(())
}
