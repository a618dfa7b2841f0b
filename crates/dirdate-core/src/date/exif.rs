use chrono::NaiveDate;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Capture time first, then the last-modified tag.
const DATE_TAGS: [Tag; 2] = [Tag::DateTimeOriginal, Tag::DateTime];

/// Read the capture date from an image's EXIF block.
/// EXIF datetimes carry no timezone, only the calendar date is kept.
pub fn extract_exif_date(path: &Path) -> Option<NaiveDate> {
    let file = File::open(path).ok()?;
    let reader = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;

    // An unparseable capture time (cameras write `0000:00:00 00:00:00` when
    // the clock was never set) falls through to the next tag like a missing one.
    for tag in DATE_TAGS {
        if let Some(field) = reader.get_field(tag, In::PRIMARY) {
            let raw = match field.value {
                Value::Ascii(ref parts) => parts
                    .first()
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            }
            .unwrap_or_else(|| field.display_value().to_string());

            if let Some(date) = parse_exif_date(&raw) {
                return Some(date);
            }
        }
    }

    None
}

/// Parse `YYYY:MM:DD[ HH:MM:SS]`, tolerating `-`, `/` and `.` separators,
/// an ISO `T` separator and a trailing zone suffix.
pub fn parse_exif_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim().trim_matches('"');
    let date_part = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()?
        .split(['+', 'Z'])
        .next()?;

    let cleaned = date_part.replace(['-', '/', '.'], ":");
    NaiveDate::parse_from_str(&cleaned, "%Y:%m:%d").ok()
}
