pub mod exif;
pub mod video;

use std::path::Path;

use chrono::{Datelike, Local, NaiveDate};

use crate::media::MediaKind;

/// Inclusive range of years accepted as real capture dates.
/// Anything outside it is a bad camera clock or a zeroed epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    /// `[min_year, current year + 1]`
    pub fn up_to_next_year(min_year: i32) -> Self {
        Self {
            min: min_year,
            max: Local::now().year() + 1,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.min..=self.max).contains(&date.year())
    }
}

/// Something that can tell the calendar date a media file was captured.
///
/// Implementations never fail: unreadable or corrupt metadata is `None`.
pub trait DateSource: Send + Sync {
    fn extract(&self, path: &Path, kind: MediaKind) -> Option<NaiveDate>;
}

/// Reads EXIF for stills and `mvhd` for videos, rejecting implausible years.
#[derive(Debug, Clone)]
pub struct MetadataDates {
    pub years: YearRange,
}

impl MetadataDates {
    pub fn new(years: YearRange) -> Self {
        Self { years }
    }
}

impl DateSource for MetadataDates {
    fn extract(&self, path: &Path, kind: MediaKind) -> Option<NaiveDate> {
        let date = match kind {
            MediaKind::Image => exif::extract_exif_date(path),
            MediaKind::Video => video::extract_video_date(path),
            MediaKind::Ignored => None,
        }?;

        if self.years.contains(date) {
            Some(date)
        } else {
            tracing::debug!("Rejected implausible date {} in {}", date, path.display());
            None
        }
    }
}

/// Filesystem modification date, for files with no usable metadata.
pub fn modified_date(path: &Path, years: YearRange) -> Option<NaiveDate> {
    let meta = std::fs::metadata(path).ok()?;
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    let local = chrono::DateTime::from_timestamp(mtime.unix_seconds(), 0)?.with_timezone(&Local);
    let date = local.date_naive();
    years.contains(date).then_some(date)
}
