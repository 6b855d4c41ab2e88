//! CLI argument parsing with clap

use crate::config::{Config, ConfirmPolicy, Granularity};
use clap::Parser;
use std::path::PathBuf;

/// Photo Organizer - move photos and videos into date folders
///
/// Reads the capture date from EXIF tags (images) or container metadata
/// (videos) and moves each file to destination/YYYY/MM[/DD]/. Files without
/// a usable date stay where they are.
#[derive(Parser, Debug)]
#[command(name = "photo-organizer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Folder scanned recursively for media files
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Root of the date organized tree
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Folder depth: month (YYYY/MM) or day (YYYY/MM/DD)
    #[arg(short, long, value_enum)]
    pub granularity: Option<Granularity>,

    /// Keep folders left empty in the source
    #[arg(long)]
    pub keep_empty: bool,

    /// Handling of hidden/system files blocking folder removal
    #[arg(long, value_enum)]
    pub confirm: Option<ConfirmPolicy>,

    /// Write a sample configuration file to this path and exit
    #[arg(long, value_name = "FILE")]
    pub init_config: Option<PathBuf>,

    /// Directory for log files (default: Log/ next to the executable)
    #[arg(long, env = "PHOTO_ORGANIZER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref source) = self.source {
            config.source_dir = source.clone();
        }
        if let Some(ref destination) = self.destination {
            config.destination_dir = destination.clone();
        }
        if let Some(granularity) = self.granularity {
            config.granularity = granularity;
        }
        if self.keep_empty {
            config.remove_empty = false;
        }
        if let Some(confirm) = self.confirm {
            config.confirm_removal = confirm;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
