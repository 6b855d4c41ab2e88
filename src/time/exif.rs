//! EXIF date extraction for images

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use exif::{Context, In, Reader, Tag, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Tag holding the offset of the EXIF sub-IFD
pub const EXIF_IFD_POINTER: u16 = 0x8769;

/// DateTimeOriginal, looked up in the EXIF sub-IFD
pub const DATE_TIME_ORIGINAL: u16 = 36867;

/// DateTime, looked up in the primary IFD
pub const DATE_TIME: u16 = 306;

/// EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// ASCII tags of an image, keyed by numeric tag id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTable {
    /// Tags of the primary IFD (IFD0)
    pub primary: BTreeMap<u16, String>,
    /// Tags of the EXIF sub-IFD, `None` when the image has no such block
    pub exif: Option<BTreeMap<u16, String>>,
}

impl TagTable {
    /// Log every tag at trace level
    pub fn trace_tags(&self, path: &Path) {
        for (tag, value) in &self.primary {
            trace!(?path, tag, value = value.as_str(), "Primary tag");
        }
        for (tag, value) in self.exif.iter().flatten() {
            trace!(?path, tag, value = value.as_str(), "EXIF sub-IFD tag");
        }
    }
}

/// Reads the embedded tag table of an image file
pub trait TagReader {
    /// `Ok(None)` when the file carries no tag table at all
    fn read_tags(&self, path: &Path) -> Result<Option<TagTable>>;
}

/// [`TagReader`] backed by kamadak-exif (JPEG, TIFF, HEIF, PNG, WebP, TIFF-based raw)
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifTagReader;

impl TagReader for ExifTagReader {
    fn read_tags(&self, path: &Path) -> Result<Option<TagTable>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let exif = match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(None),
            Err(e) => {
                return Err(Error::MetadataUnreadable {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        };

        let mut table = TagTable::default();
        for field in exif.fields() {
            if field.ifd_num != In::PRIMARY {
                continue;
            }
            if field.tag == Tag::ExifIFDPointer {
                table.exif.get_or_insert_with(BTreeMap::new);
                continue;
            }
            let Some(text) = ascii_value(&field.value) else {
                continue;
            };
            match field.tag.context() {
                Context::Tiff => {
                    table.primary.insert(field.tag.number(), text);
                }
                Context::Exif => {
                    table
                        .exif
                        .get_or_insert_with(BTreeMap::new)
                        .insert(field.tag.number(), text);
                }
                _ => {}
            }
        }

        Ok(Some(table))
    }
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Pick the capture date out of a tag table.
///
/// DateTimeOriginal in the EXIF sub-IFD wins; if it is missing or does not
/// parse, DateTime from the primary IFD is used. Nothing else is consulted.
pub fn date_from_tags(table: &TagTable, path: &Path) -> Result<NaiveDate> {
    let mut rejected: Option<String> = None;

    if let Some(value) = table
        .exif
        .as_ref()
        .and_then(|sub| sub.get(&DATE_TIME_ORIGINAL))
    {
        match parse_exif_date(value) {
            Some(date) => {
                debug!(?path, %date, "Date from DateTimeOriginal");
                return Ok(date);
            }
            None => {
                warn!(?path, value = value.as_str(), "Invalid DateTimeOriginal format");
                rejected = Some(format!("DateTimeOriginal '{}'", value));
            }
        }
    }

    debug!(?path, "Falling back to DateTime tag");
    if let Some(value) = table.primary.get(&DATE_TIME) {
        if let Some(date) = parse_exif_date(value) {
            debug!(?path, %date, "Date from DateTime");
            return Ok(date);
        }
        debug!(?path, value = value.as_str(), "Invalid DateTime format");
        rejected = Some(format!("DateTime '{}'", value));
    }

    match rejected {
        Some(message) => Err(Error::DateUnparseable {
            path: path.to_path_buf(),
            message,
        }),
        None => Err(Error::NoDateTag(path.to_path_buf())),
    }
}

/// Parse an EXIF datetime value and keep the date part
pub fn parse_exif_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    NaiveDateTime::parse_from_str(value, EXIF_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.date())
}
