//! Capture date resolution
//!
//! Images are dated from their EXIF tags, videos from the container-level
//! metadata track. The category fixed by the extension decides which
//! strategy runs; there is no cross-category fallback and no fallback to
//! filesystem timestamps.

pub mod exif;
pub mod video;

use crate::classify::{FileEntry, MediaCategory};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{debug, warn};

pub use self::exif::{ExifTagReader, TagReader, TagTable};
pub use self::video::{MediaInfoReader, MediaTrack, TrackReader};

/// Resolves the capture date of image and video files
pub struct DateResolver {
    tags: Box<dyn TagReader>,
    tracks: Box<dyn TrackReader>,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DateResolver {
    /// Resolver using kamadak-exif for images and mediainfo for videos
    pub fn new() -> Self {
        Self::with_readers(Box::new(ExifTagReader), Box::new(MediaInfoReader))
    }

    pub fn with_readers(tags: Box<dyn TagReader>, tracks: Box<dyn TrackReader>) -> Self {
        Self { tags, tracks }
    }

    /// Capture date of the file, `None` when no usable date exists
    pub fn resolve(&self, entry: &FileEntry) -> Option<NaiveDate> {
        match self.resolve_detailed(entry) {
            Ok(date) => Some(date),
            Err(e) => {
                debug!(path = ?entry.path, error = %e, "No date resolved");
                None
            }
        }
    }

    /// Same decision as [`resolve`](Self::resolve), keeping the reason on failure
    pub fn resolve_detailed(&self, entry: &FileEntry) -> Result<NaiveDate> {
        let path = entry.path.as_path();
        match entry.category {
            MediaCategory::Image => {
                let table = self
                    .tags
                    .read_tags(path)
                    .map_err(|e| reading_failed(path, e))?
                    .ok_or_else(|| {
                        debug!(?path, "No EXIF data found in image");
                        Error::NoDateTag(path.to_path_buf())
                    })?;
                table.trace_tags(path);
                exif::date_from_tags(&table, path)
            }
            MediaCategory::Video => {
                let tracks = self
                    .tracks
                    .read_tracks(path)
                    .map_err(|e| reading_failed(path, e))?;
                video::date_from_tracks(&tracks, path)
            }
            MediaCategory::Ineligible => Err(Error::NoDateTag(path.to_path_buf())),
        }
    }
}

/// Normalize a collaborator failure into a metadata error
fn reading_failed(path: &Path, error: Error) -> Error {
    warn!(?path, error = %error, "Error reading metadata");
    match error {
        Error::MetadataUnreadable { .. } | Error::MediaInfoNotFound => error,
        other => Error::MetadataUnreadable {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    struct FixedTags(Option<TagTable>);

    impl TagReader for FixedTags {
        fn read_tags(&self, _path: &Path) -> Result<Option<TagTable>> {
            Ok(self.0.clone())
        }
    }

    struct FailingTags;

    impl TagReader for FailingTags {
        fn read_tags(&self, _path: &Path) -> Result<Option<TagTable>> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    struct FixedTracks(Vec<MediaTrack>);

    impl TrackReader for FixedTracks {
        fn read_tracks(&self, _path: &Path) -> Result<Vec<MediaTrack>> {
            Ok(self.0.clone())
        }
    }

    fn entry(name: &str, category: MediaCategory) -> FileEntry {
        FileEntry {
            path: PathBuf::from(name),
            extension: name.rsplit('.').next().unwrap_or_default().to_string(),
            size: Some(1),
            category,
        }
    }

    fn image_table() -> TagTable {
        let mut exif = BTreeMap::new();
        exif.insert(super::exif::DATE_TIME_ORIGINAL, "2023:07:04 10:15:00".to_string());
        TagTable {
            primary: BTreeMap::new(),
            exif: Some(exif),
        }
    }

    fn video_track() -> MediaTrack {
        MediaTrack {
            track_type: super::video::GENERAL_TRACK.into(),
            encoded_date: Some("2021-12-24 18:00:00 UTC".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_image_strategy() {
        let resolver = DateResolver::with_readers(
            Box::new(FixedTags(Some(image_table()))),
            Box::new(FixedTracks(vec![video_track()])),
        );
        assert_eq!(
            resolver.resolve(&entry("a.jpg", MediaCategory::Image)),
            NaiveDate::from_ymd_opt(2023, 7, 4)
        );
    }

    #[test]
    fn test_video_strategy() {
        let resolver = DateResolver::with_readers(
            Box::new(FixedTags(Some(image_table()))),
            Box::new(FixedTracks(vec![video_track()])),
        );
        assert_eq!(
            resolver.resolve(&entry("a.mov", MediaCategory::Video)),
            NaiveDate::from_ymd_opt(2021, 12, 24)
        );
    }

    #[test]
    fn test_image_without_tags_does_not_try_video() {
        let resolver = DateResolver::with_readers(
            Box::new(FixedTags(None)),
            Box::new(FixedTracks(vec![video_track()])),
        );
        let e = entry("a.jpg", MediaCategory::Image);
        assert_eq!(resolver.resolve(&e), None);
        assert!(matches!(resolver.resolve_detailed(&e), Err(Error::NoDateTag(_))));
    }

    #[test]
    fn test_reader_error_becomes_absent() {
        let resolver = DateResolver::with_readers(
            Box::new(FailingTags),
            Box::new(FixedTracks(vec![])),
        );
        let e = entry("a.jpg", MediaCategory::Image);
        assert_eq!(resolver.resolve(&e), None);
        assert!(matches!(
            resolver.resolve_detailed(&e),
            Err(Error::MetadataUnreadable { .. })
        ));
    }

    #[test]
    fn test_ineligible_never_resolves() {
        let resolver = DateResolver::with_readers(
            Box::new(FixedTags(Some(image_table()))),
            Box::new(FixedTracks(vec![video_track()])),
        );
        assert_eq!(resolver.resolve(&entry("a.txt", MediaCategory::Ineligible)), None);
    }
}
