//! Unix-specific operating system features.

use std::path::Path;

/// Unix has no hidden/system attribute; visibility is carried by the name alone.
pub fn has_hidden_or_system_attribute(_path: &Path) -> bool {
    false
}
