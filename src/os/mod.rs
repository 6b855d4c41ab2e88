//! Platform-specific module for operating system features.

#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub mod unix;

use crate::config::MediaFormats;
use std::path::Path;

/// Check whether a file is hidden or system-flagged.
///
/// A leading dot or a name from the excluded sidecar list counts on every
/// platform; on Windows the hidden/system attribute bits count as well.
pub fn is_hidden_or_system(path: &Path, formats: &MediaFormats) -> bool {
    let by_name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .map(|name| name.starts_with('.') || formats.is_excluded_name(&name))
        .unwrap_or(false);

    by_name || has_hidden_attribute(path)
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    windows::has_hidden_or_system_attribute(path)
}

#[cfg(unix)]
fn has_hidden_attribute(path: &Path) -> bool {
    unix::has_hidden_or_system_attribute(path)
}
