//! Error types for the photo organizer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo organizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo organizer
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source directory does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("Source path is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    #[error("Cannot create destination directory {path}: {source}")]
    DestinationUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read metadata from {path}: {message}")]
    MetadataUnreadable { path: PathBuf, message: String },

    #[error("Unparseable date in {path}: {message}")]
    DateUnparseable { path: PathBuf, message: String },

    #[error("No date tag found in {0}")]
    NoDateTag(PathBuf),

    #[error("mediainfo not found. Please install MediaInfo and ensure mediainfo is in PATH")]
    MediaInfoNotFound,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
