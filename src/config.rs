//! Configuration types for the photo organizer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Depth of the date folders created under the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// destination/YYYY/MM/
    #[default]
    Month,
    /// destination/YYYY/MM/DD/
    Day,
}

/// How residual hidden/system files are handled during empty folder cleanup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmPolicy {
    /// Ask on the terminal for every file
    #[default]
    Ask,
    /// Remove without asking
    Always,
    /// Never remove, folders holding such files are kept
    Never,
}

/// Extension and file name sets used to decide what gets processed.
///
/// Extensions are stored lower-case without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaFormats {
    /// Image extensions (raster, HEIF, raw)
    pub image_extensions: Vec<String>,

    /// Video container extensions
    pub video_extensions: Vec<String>,

    /// Raw formats for which the zero-byte check is not performed
    pub size_check_exempt_extensions: Vec<String>,

    /// OS generated sidecar files that are never processed
    pub excluded_names: Vec<String>,
}

impl Default for MediaFormats {
    fn default() -> Self {
        Self {
            image_extensions: vec![
                "jpg".into(),
                "jpeg".into(),
                "png".into(),
                "tiff".into(),
                "tif".into(),
                "webp".into(),
                "heic".into(),
                "heif".into(),
                "cr2".into(),
                "arw".into(),
                "dng".into(),
                "avif".into(),
            ],
            video_extensions: vec!["mp4".into(), "avi".into(), "mov".into(), "mkv".into()],
            size_check_exempt_extensions: vec!["cr2".into(), "arw".into(), "dng".into()],
            excluded_names: vec!["Thumbs.db".into(), "desktop.ini".into()],
        }
    }
}

impl MediaFormats {
    /// Check if a file extension is a supported image format
    pub fn is_image(&self, ext: &str) -> bool {
        contains_ignore_case(&self.image_extensions, ext)
    }

    /// Check if a file extension is a supported video format
    pub fn is_video(&self, ext: &str) -> bool {
        contains_ignore_case(&self.video_extensions, ext)
    }

    /// Check if zero-byte files of this extension are still accepted
    pub fn skips_size_check(&self, ext: &str) -> bool {
        contains_ignore_case(&self.size_check_exempt_extensions, ext)
    }

    /// Check if a file name is one of the excluded sidecar files
    pub fn is_excluded_name(&self, name: &str) -> bool {
        self.excluded_names.iter().any(|n| n == name)
    }
}

fn contains_ignore_case(set: &[String], ext: &str) -> bool {
    let ext = ext.trim_start_matches('.');
    set.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Configuration for a relocation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned recursively for media files
    #[serde(default)]
    pub source_dir: PathBuf,

    /// Root of the date organized tree
    #[serde(default)]
    pub destination_dir: PathBuf,

    /// Folder depth under the destination
    #[serde(default)]
    pub granularity: Granularity,

    /// Remove folders left empty in the source after relocation
    #[serde(default = "default_remove_empty")]
    pub remove_empty: bool,

    /// Handling of hidden/system files blocking empty folder removal
    #[serde(default)]
    pub confirm_removal: ConfirmPolicy,

    /// Verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Supported formats and exclusions
    #[serde(default)]
    pub formats: MediaFormats,
}

fn default_remove_empty() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            destination_dir: PathBuf::new(),
            granularity: Granularity::default(),
            remove_empty: true,
            confirm_removal: ConfirmPolicy::default(),
            verbose: false,
            formats: MediaFormats::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Photo Organizer Configuration File
# This file uses TOML format (https://toml.io)

# Folder scanned recursively for photos and videos
source_dir = "D:/Camera Uploads"

# Root of the organized tree; files land in destination_dir/YYYY/MM[/DD]/
destination_dir = "D:/Photos"

# Folder depth: "month" (YYYY/MM/) or "day" (YYYY/MM/DD/)
granularity = "month"

# Remove folders left empty in the source folder after moving
remove_empty = true

# Hidden/system files (Thumbs.db, desktop.ini, ...) keeping a folder alive:
# - ask: prompt for every file
# - always: remove them
# - never: keep them (and the folder)
confirm_removal = "ask"

# Verbose output - show every file as it is handled
verbose = false

[formats]
image_extensions = ["jpg", "jpeg", "png", "tiff", "tif", "webp", "heic", "heif", "cr2", "arw", "dng", "avif"]
video_extensions = ["mp4", "avi", "mov", "mkv"]
# Zero-byte files with these extensions are not filtered out
size_check_exempt_extensions = ["cr2", "arw", "dng"]
excluded_names = ["Thumbs.db", "desktop.ini"]
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
