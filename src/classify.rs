//! Eligibility checks for files found while scanning the source tree

use crate::config::MediaFormats;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Kind of media, decided from the extension only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Image,
    Video,
    Ineligible,
}

/// A file accepted for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path of the file in the source tree
    pub path: PathBuf,
    /// Lower-case extension without the dot
    pub extension: String,
    /// Size in bytes, `None` when the size check was skipped
    pub size: Option<u64>,
    /// Image or video
    pub category: MediaCategory,
}

impl FileEntry {
    /// File name used at the destination
    pub fn file_name(&self) -> Option<&std::ffi::OsStr> {
        self.path.file_name()
    }
}

/// Decides which filesystem entries are processed
#[derive(Debug, Clone)]
pub struct FileClassifier {
    formats: MediaFormats,
}

impl FileClassifier {
    pub fn new(formats: MediaFormats) -> Self {
        Self { formats }
    }

    /// Category for an extension (case-insensitive)
    pub fn category(&self, ext: &str) -> MediaCategory {
        if self.formats.is_image(ext) {
            MediaCategory::Image
        } else if self.formats.is_video(ext) {
            MediaCategory::Video
        } else {
            MediaCategory::Ineligible
        }
    }

    pub fn is_eligible(&self, path: &Path) -> bool {
        self.entry(path).is_some()
    }

    /// Build a [`FileEntry`] if the path passes every check.
    ///
    /// Rejects non-files, dot and `~$` names, excluded sidecar names,
    /// unsupported extensions and zero-byte files (except size-check-exempt
    /// raw formats).
    pub fn entry(&self, path: &Path) -> Option<FileEntry> {
        // Lossy so that names which are not valid UTF-8 are still processed
        let name = path.file_name()?.to_string_lossy();

        if name.starts_with('.') || name.starts_with("~$") {
            trace!(?path, "Hidden or lock file");
            return None;
        }

        if self.formats.is_excluded_name(&name) {
            trace!(?path, "Excluded sidecar file");
            return None;
        }

        let extension = path.extension()?.to_string_lossy().to_lowercase();
        let category = self.category(&extension);
        if category == MediaCategory::Ineligible {
            trace!(?path, "Unsupported extension");
            return None;
        }

        // Follows symlinks: a link to a file is accepted, a link to a directory is not
        let metadata = fs::metadata(path).ok()?;
        if !metadata.is_file() {
            return None;
        }

        let size = if self.formats.skips_size_check(&extension) {
            None
        } else {
            let len = metadata.len();
            if len == 0 {
                trace!(?path, "Empty file");
                return None;
            }
            Some(len)
        };

        Some(FileEntry {
            path: path.to_path_buf(),
            extension,
            size,
            category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn classifier() -> FileClassifier {
        FileClassifier::new(MediaFormats::default())
    }

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_category_by_extension() {
        let c = classifier();
        assert_eq!(c.category("JPG"), MediaCategory::Image);
        assert_eq!(c.category("heic"), MediaCategory::Image);
        assert_eq!(c.category("Mov"), MediaCategory::Video);
        assert_eq!(c.category("txt"), MediaCategory::Ineligible);
    }

    #[test]
    fn test_regular_media_file_is_eligible() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "IMG_0001.JPG", b"data");
        let entry = classifier().entry(&path).unwrap();
        assert_eq!(entry.extension, "jpg");
        assert_eq!(entry.size, Some(4));
        assert_eq!(entry.category, MediaCategory::Image);
    }

    #[test]
    fn test_hidden_lock_and_sidecar_files_rejected() {
        let dir = TempDir::new().unwrap();
        let c = classifier();
        assert!(!c.is_eligible(&write(&dir, ".hidden.jpg", b"x")));
        assert!(!c.is_eligible(&write(&dir, "~$lock.jpg", b"x")));
        assert!(!c.is_eligible(&write(&dir, "Thumbs.db", b"x")));
        assert!(!c.is_eligible(&write(&dir, "desktop.ini", b"x")));
        assert!(!c.is_eligible(&write(&dir, "notes.txt", b"x")));
        assert!(!c.is_eligible(&write(&dir, "noextension", b"x")));
    }

    #[test]
    fn test_directories_rejected() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("album.jpg");
        fs::create_dir(&sub).unwrap();
        assert!(!classifier().is_eligible(&sub));
    }

    #[test]
    fn test_zero_byte_files_rejected_except_raw() {
        let dir = TempDir::new().unwrap();
        let c = classifier();
        assert!(!c.is_eligible(&write(&dir, "empty.jpg", b"")));
        assert!(!c.is_eligible(&write(&dir, "empty.mp4", b"")));

        // Raw formats skip the size check entirely
        let raw = c.entry(&write(&dir, "empty.CR2", b"")).unwrap();
        assert_eq!(raw.size, None);
        assert_eq!(raw.category, MediaCategory::Image);
    }

    #[test]
    fn test_custom_formats() {
        let dir = TempDir::new().unwrap();
        let formats = MediaFormats {
            image_extensions: vec!["png".into()],
            video_extensions: vec!["mts".into()],
            size_check_exempt_extensions: vec![],
            excluded_names: vec!["cover.png".into()],
        };
        let c = FileClassifier::new(formats);
        assert!(!c.is_eligible(&write(&dir, "a.jpg", b"x")));
        assert!(!c.is_eligible(&write(&dir, "cover.png", b"x")));
        assert_eq!(
            c.entry(&write(&dir, "clip.MTS", b"x")).unwrap().category,
            MediaCategory::Video
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_is_eligible() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"IMG_\xff.JPG"));
        fs::write(&path, b"data").unwrap();

        let entry = classifier().entry(&path).unwrap();
        assert_eq!(entry.extension, "jpg");
        assert_eq!(entry.category, MediaCategory::Image);
        assert_eq!(entry.file_name(), Some(OsStr::from_bytes(b"IMG_\xff.JPG")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks() {
        let dir = TempDir::new().unwrap();
        let target = write(&dir, "real.jpg", b"x");
        let file_link = dir.path().join("link.jpg");
        std::os::unix::fs::symlink(&target, &file_link).unwrap();
        assert!(classifier().is_eligible(&file_link));

        let sub = dir.path().join("folder");
        fs::create_dir(&sub).unwrap();
        let dir_link = dir.path().join("folder.jpg");
        std::os::unix::fs::symlink(&sub, &dir_link).unwrap();
        assert!(!classifier().is_eligible(&dir_link));
    }
}
