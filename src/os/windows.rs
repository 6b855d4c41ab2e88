//! Windows-specific operating system features.

use std::os::windows::fs::MetadataExt;
use std::path::Path;
use winapi::um::winnt::{FILE_ATTRIBUTE_HIDDEN, FILE_ATTRIBUTE_SYSTEM};

/// Check the hidden and system bits of the file attributes.
///
/// Files whose attributes cannot be read are treated as regular files.
pub fn has_hidden_or_system_attribute(path: &Path) -> bool {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) => {
            metadata.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0
        }
        Err(_) => false,
    }
}
