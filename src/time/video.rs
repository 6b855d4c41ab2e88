//! Video metadata extraction via MediaInfo

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, trace, warn};

/// Container-level track type
pub const GENERAL_TRACK: &str = "General";

/// Accepted datetime layouts, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
];

/// Date-only layout, tried last
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One metadata track as reported by MediaInfo
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaTrack {
    #[serde(rename = "@type", default)]
    pub track_type: String,
    #[serde(rename = "Recorded_Date", default)]
    pub recorded_date: Option<String>,
    #[serde(rename = "Encoded_Date", default)]
    pub encoded_date: Option<String>,
    #[serde(rename = "Tagged_Date", default)]
    pub tagged_date: Option<String>,
    /// Modification date as stored by MediaInfo, last resort
    #[serde(rename = "File_Modified_Date", default)]
    pub file_modified_date: Option<String>,
}

impl MediaTrack {
    /// Date fields in priority order
    pub fn date_fields(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("recorded_date", self.recorded_date.as_deref()),
            ("encoded_date", self.encoded_date.as_deref()),
            ("tagged_date", self.tagged_date.as_deref()),
            ("file_modified_date", self.file_modified_date.as_deref()),
        ]
    }
}

/// Reads the metadata tracks of a video container
pub trait TrackReader {
    fn read_tracks(&self, path: &Path) -> Result<Vec<MediaTrack>>;
}

#[derive(Debug, Deserialize)]
struct MediaInfoOutput {
    media: Option<MediaInfoMedia>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoMedia {
    #[serde(default)]
    track: Vec<MediaTrack>,
}

/// Cached mediainfo availability check
static MEDIAINFO_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Check if mediainfo is available (cached)
fn is_mediainfo_available() -> bool {
    *MEDIAINFO_AVAILABLE.get_or_init(|| Command::new("mediainfo").arg("--Version").output().is_ok())
}

/// [`TrackReader`] running `mediainfo --Output=JSON`
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaInfoReader;

impl TrackReader for MediaInfoReader {
    fn read_tracks(&self, path: &Path) -> Result<Vec<MediaTrack>> {
        if !is_mediainfo_available() {
            return Err(Error::MediaInfoNotFound);
        }

        let output = Command::new("mediainfo")
            .arg("--Output=JSON")
            .arg(path)
            .output()
            .map_err(|e| Error::MetadataUnreadable {
                path: path.to_path_buf(),
                message: format!("Failed to execute mediainfo: {}", e),
            })?;

        if !output.status.success() {
            return Err(Error::MetadataUnreadable {
                path: path.to_path_buf(),
                message: format!(
                    "mediainfo failed: {}",
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        let json = String::from_utf8_lossy(&output.stdout);
        trace!(?path, "mediainfo output: {}", json);
        parse_mediainfo_json(&json).map_err(|e| Error::MetadataUnreadable {
            path: path.to_path_buf(),
            message: format!("Failed to parse mediainfo JSON: {}", e),
        })
    }
}

/// Parse the JSON document printed by `mediainfo --Output=JSON`
pub fn parse_mediainfo_json(json: &str) -> Result<Vec<MediaTrack>> {
    let output: MediaInfoOutput = serde_json::from_str(json)?;
    Ok(output.media.map(|m| m.track).unwrap_or_default())
}

/// Pick the capture date out of the General track.
///
/// Fields are tried in priority order and the first one that parses wins.
pub fn date_from_tracks(tracks: &[MediaTrack], path: &Path) -> Result<NaiveDate> {
    let general = tracks
        .iter()
        .find(|t| t.track_type == GENERAL_TRACK)
        .ok_or_else(|| Error::MetadataUnreadable {
            path: path.to_path_buf(),
            message: "No General track in container".to_string(),
        })?;

    let mut rejected: Option<String> = None;
    for (field, value) in general.date_fields() {
        let Some(value) = value else {
            continue;
        };
        if let Some(date) = parse_video_date(value) {
            debug!(?path, field, %date, "Found video date");
            return Ok(date);
        }
        debug!(?path, field, value, "Unrecognized video date format");
        rejected.get_or_insert_with(|| format!("{} '{}'", field, value));
    }

    warn!(?path, "No valid date found in video metadata");
    match rejected {
        Some(message) => Err(Error::DateUnparseable {
            path: path.to_path_buf(),
            message,
        }),
        None => Err(Error::NoDateTag(path.to_path_buf())),
    }
}

/// Parse a video date value, ignoring a leading or trailing `UTC` marker
pub fn parse_video_date(value: &str) -> Option<NaiveDate> {
    let value = strip_utc(value);

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.date());
        }
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn strip_utc(value: &str) -> &str {
    let value = value.trim();
    let value = value.strip_prefix("UTC").map(str::trim_start).unwrap_or(value);
    value.strip_suffix("UTC").map(str::trim_end).unwrap_or(value)
}
