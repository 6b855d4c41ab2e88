//! Removal of source folders left empty after relocation
//!
//! Folders are visited bottom-up and passes repeat until one removes
//! nothing. Hidden/system leftovers (Thumbs.db, .DS_Store, ...) are only
//! deleted after the [`RemovalPolicy`] agrees; a declined file keeps its
//! folder alive.

use crate::config::MediaFormats;
use crate::os::is_hidden_or_system;
use crate::progress::FailureRecord;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Decides whether a residual hidden/system file may be deleted
pub trait RemovalPolicy {
    fn confirm(&self, path: &Path) -> bool;
}

impl<F> RemovalPolicy for F
where
    F: Fn(&Path) -> bool,
{
    fn confirm(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Remove every residual file
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl RemovalPolicy for AcceptAll {
    fn confirm(&self, _path: &Path) -> bool {
        true
    }
}

/// Keep every residual file
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAll;

impl RemovalPolicy for RejectAll {
    fn confirm(&self, _path: &Path) -> bool {
        false
    }
}

/// Answers collected ahead of time, e.g. for the list returned by
/// [`EmptyDirectoryReclaimer::pending_confirmations`]. Unknown paths are declined.
#[derive(Debug, Default, Clone)]
pub struct DecisionMap {
    decisions: HashMap<PathBuf, bool>,
}

impl DecisionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, remove: bool) {
        self.decisions.insert(path.into(), remove);
    }
}

impl FromIterator<(PathBuf, bool)> for DecisionMap {
    fn from_iter<I: IntoIterator<Item = (PathBuf, bool)>>(iter: I) -> Self {
        Self {
            decisions: iter.into_iter().collect(),
        }
    }
}

impl RemovalPolicy for DecisionMap {
    fn confirm(&self, path: &Path) -> bool {
        self.decisions.get(path).copied().unwrap_or(false)
    }
}

/// What a reclamation did
#[derive(Debug, Clone, Default)]
pub struct ReclaimReport {
    /// Folders removed across all passes
    pub removed_dirs: usize,
    /// Hidden/system files removed after confirmation
    pub removed_files: usize,
    /// Files the policy refused to remove
    pub declined: Vec<PathBuf>,
    /// Files or folders whose removal failed
    pub failures: Vec<FailureRecord>,
}

enum DirContents {
    /// Holds a regular file or a sub-folder
    Occupied,
    /// Only hidden/system files (possibly none)
    Residual(Vec<PathBuf>),
}

/// Deletes empty folders under a root, never the root itself
#[derive(Debug, Clone)]
pub struct EmptyDirectoryReclaimer {
    formats: MediaFormats,
    /// Subtree left alone, e.g. a destination nested in the source
    protected: Option<PathBuf>,
}

impl EmptyDirectoryReclaimer {
    pub fn new(formats: MediaFormats) -> Self {
        Self {
            formats,
            protected: None,
        }
    }

    /// Never enter or remove `dir` and anything below it.
    ///
    /// Compared by path prefix, so pass the same form (canonical or not)
    /// as the reclaim root.
    pub fn protecting(mut self, dir: impl Into<PathBuf>) -> Self {
        self.protected = Some(dir.into());
        self
    }

    fn is_protected(&self, path: &Path) -> bool {
        self.protected
            .as_deref()
            .is_some_and(|protected| path.starts_with(protected))
    }

    /// Remove empty folders below `root` until a pass removes none
    pub fn reclaim(&self, root: &Path, policy: &dyn RemovalPolicy) -> ReclaimReport {
        let mut report = ReclaimReport::default();
        // Declined or failed paths are not retried within this call
        let mut settled: HashSet<PathBuf> = HashSet::new();

        loop {
            let mut removed = 0;
            for dir in self.directories(root) {
                if settled.contains(&dir) {
                    continue;
                }
                match self.reclaim_dir(&dir, policy, &mut settled, &mut report) {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(?dir, error = %e, "Failed to remove folder");
                        report.failures.push(FailureRecord {
                            path: dir.clone(),
                            reason: e.to_string(),
                        });
                        settled.insert(dir);
                    }
                }
            }

            report.removed_dirs += removed;
            if removed == 0 {
                info!(removed = report.removed_dirs, "No more empty folders found");
                break;
            }
        }

        report
    }

    /// Residual hidden/system files that would be asked about by
    /// [`reclaim`](Self::reclaim), without modifying anything
    pub fn pending_confirmations(&self, root: &Path) -> Vec<PathBuf> {
        let mut pending = Vec::new();
        if let Ok(entries) = fs::read_dir(root) {
            let mut subdirs: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|path| !self.is_protected(path))
                .collect();
            subdirs.sort();
            for dir in subdirs {
                self.collect_pending(&dir, &mut pending);
            }
        }
        pending
    }

    /// Returns whether `dir` would end up empty
    fn collect_pending(&self, dir: &Path, pending: &mut Vec<PathBuf>) -> bool {
        let Ok(entries) = fs::read_dir(dir) else {
            return false;
        };

        let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.file_name());

        let mut empties = true;
        let mut residual = Vec::new();
        for entry in entries {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir && self.is_protected(&path) {
                empties = false;
            } else if is_dir {
                empties &= self.collect_pending(&path, pending);
            } else if is_hidden_or_system(&path, &self.formats) {
                residual.push(path);
            } else {
                empties = false;
            }
        }

        if empties {
            pending.extend(residual);
        }
        empties
    }

    /// All folders below `root`, children before parents
    fn directories(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .min_depth(1)
            .contents_first(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Cannot read folder");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir() && !self.is_protected(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    }

    fn inspect(&self, dir: &Path) -> io::Result<DirContents> {
        let mut residual = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() || !is_hidden_or_system(&path, &self.formats) {
                return Ok(DirContents::Occupied);
            }
            residual.push(path);
        }
        residual.sort();
        Ok(DirContents::Residual(residual))
    }

    /// Clear confirmed residual files, then remove the folder if empty
    fn reclaim_dir(
        &self,
        dir: &Path,
        policy: &dyn RemovalPolicy,
        settled: &mut HashSet<PathBuf>,
        report: &mut ReclaimReport,
    ) -> io::Result<bool> {
        let DirContents::Residual(files) = self.inspect(dir)? else {
            return Ok(false);
        };

        for file in files {
            if settled.contains(&file) {
                continue;
            }
            if !policy.confirm(&file) {
                info!(?file, "Skipped removing file");
                settled.insert(file.clone());
                report.declined.push(file);
                continue;
            }
            match fs::remove_file(&file) {
                Ok(()) => {
                    info!(?file, "Removed file");
                    report.removed_files += 1;
                }
                Err(e) => {
                    warn!(?file, error = %e, "Failed to remove file");
                    report.failures.push(FailureRecord {
                        path: file.clone(),
                        reason: e.to_string(),
                    });
                    settled.insert(file);
                }
            }
        }

        if fs::read_dir(dir)?.next().is_some() {
            return Ok(false);
        }

        fs::remove_dir(dir)?;
        debug!(?dir, "Removed empty folder");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn reclaimer() -> EmptyDirectoryReclaimer {
        EmptyDirectoryReclaimer::new(MediaFormats::default())
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_nested_empty_folders_removed_root_kept() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("a/b/c/d")).unwrap();
        fs::create_dir_all(root.path().join("e")).unwrap();

        let report = reclaimer().reclaim(root.path(), &RejectAll);

        assert_eq!(report.removed_dirs, 5);
        assert!(root.path().exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_folders_with_regular_files_survive() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("keep/notes.txt"));
        fs::create_dir_all(root.path().join("keep/empty")).unwrap();

        let report = reclaimer().reclaim(root.path(), &AcceptAll);

        assert_eq!(report.removed_dirs, 1);
        assert!(root.path().join("keep/notes.txt").exists());
        assert!(!root.path().join("keep/empty").exists());
    }

    #[test]
    fn test_accepted_residual_files_are_removed() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("trip/Thumbs.db"));
        touch(&root.path().join("trip/day1/.DS_Store"));

        let report = reclaimer().reclaim(root.path(), &AcceptAll);

        assert_eq!(report.removed_dirs, 2);
        assert_eq!(report.removed_files, 2);
        assert!(!root.path().join("trip").exists());
    }

    #[test]
    fn test_declined_file_keeps_folder_and_is_asked_once() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("trip/desktop.ini"));
        fs::create_dir_all(root.path().join("other/empty")).unwrap();

        let asked = RefCell::new(Vec::new());
        let policy = |path: &Path| {
            asked.borrow_mut().push(path.to_path_buf());
            false
        };
        let report = reclaimer().reclaim(root.path(), &policy);

        assert_eq!(report.removed_dirs, 2);
        assert_eq!(report.declined, vec![root.path().join("trip/desktop.ini")]);
        assert_eq!(asked.borrow().len(), 1);
        assert!(root.path().join("trip/desktop.ini").exists());
        assert!(!root.path().join("other").exists());
    }

    #[test]
    fn test_residual_next_to_occupied_subfolder_not_asked() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("trip/Thumbs.db"));
        touch(&root.path().join("trip/day1/keep.txt"));

        let policy = |_: &Path| -> bool { panic!("should not be asked") };
        let report = reclaimer().reclaim(root.path(), &policy);

        assert_eq!(report.removed_dirs, 0);
        assert!(root.path().join("trip/Thumbs.db").exists());
    }

    #[test]
    fn test_two_phase_confirmation() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("a/Thumbs.db"));
        touch(&root.path().join("b/.DS_Store"));
        touch(&root.path().join("c/photo.txt"));
        touch(&root.path().join("c/Thumbs.db"));
        touch(&root.path().join("root-level/.hidden"));
        touch(&root.path().join(".root-file"));

        let r = reclaimer();
        let pending = r.pending_confirmations(root.path());
        assert_eq!(
            pending,
            vec![
                root.path().join("a/Thumbs.db"),
                root.path().join("b/.DS_Store"),
                root.path().join("root-level/.hidden"),
            ]
        );
        // Nothing touched yet
        assert!(root.path().join("a/Thumbs.db").exists());

        let decisions: DecisionMap = pending
            .into_iter()
            .map(|p| {
                let remove = !p.ends_with(".DS_Store");
                (p, remove)
            })
            .collect();
        let report = r.reclaim(root.path(), &decisions);

        assert_eq!(report.removed_dirs, 2);
        assert!(!root.path().join("a").exists());
        assert!(root.path().join("b/.DS_Store").exists());
        assert!(root.path().join("c/Thumbs.db").exists());
        assert!(root.path().join(".root-file").exists());
    }

    #[test]
    fn test_pending_sees_through_nested_empty_folders() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("a/Thumbs.db"));
        fs::create_dir_all(root.path().join("a/b/c")).unwrap();
        touch(&root.path().join("a/b/.picasa.ini"));

        let pending = reclaimer().pending_confirmations(root.path());
        assert_eq!(
            pending,
            vec![
                root.path().join("a/b/.picasa.ini"),
                root.path().join("a/Thumbs.db"),
            ]
        );
    }

    #[test]
    fn test_protected_subtree_is_left_alone() {
        let root = TempDir::new().unwrap();
        let library = root.path().join("Organized");
        fs::create_dir_all(library.join("2020/01")).unwrap();
        touch(&library.join("2021/.DS_Store"));
        fs::create_dir_all(root.path().join("old/empty")).unwrap();

        let reclaimer = reclaimer().protecting(&library);
        assert!(reclaimer.pending_confirmations(root.path()).is_empty());

        let report = reclaimer.reclaim(root.path(), &AcceptAll);

        assert_eq!(report.removed_dirs, 2);
        assert_eq!(report.removed_files, 0);
        assert!(library.join("2020/01").is_dir());
        assert!(library.join("2021/.DS_Store").exists());
        assert!(!root.path().join("old").exists());
    }

    #[test]
    fn test_decision_map_defaults_to_decline() {
        let mut map = DecisionMap::new();
        map.insert("/x/Thumbs.db", true);
        assert!(map.confirm(Path::new("/x/Thumbs.db")));
        assert!(!map.confirm(Path::new("/y/Thumbs.db")));
    }
}
