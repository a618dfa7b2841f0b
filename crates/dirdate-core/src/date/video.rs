//! Container-level creation time for ISO base media files (MP4, MOV, M4V, 3GP).
//!
//! Only the `moov/mvhd` box is read. Other boxes, including a multi-gigabyte
//! `mdat`, are skipped by seeking over them.
#![cfg_attr(not(feature = "video"), allow(dead_code, unused_imports))]

use chrono::{DateTime, NaiveDate};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01.
const QUICKTIME_EPOCH_OFFSET: i64 = 2_082_844_800;

/// Sibling boxes walked per level before giving up on a corrupt file.
const MAX_BOXES: usize = 4096;

/// Returns whether this build can read dates from video containers.
pub const fn is_supported() -> bool {
    cfg!(feature = "video")
}

#[cfg(feature = "video")]
pub fn extract_video_date(path: &Path) -> Option<NaiveDate> {
    let file = File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    let mut reader = BufReader::new(file);
    let secs = read_mvhd_creation(&mut reader, len)?;
    if secs == 0 {
        return None;
    }
    let unix = i64::try_from(secs).ok()? - QUICKTIME_EPOCH_OFFSET;
    DateTime::from_timestamp(unix, 0).map(|dt| dt.date_naive())
}

#[cfg(not(feature = "video"))]
pub fn extract_video_date(_path: &Path) -> Option<NaiveDate> {
    None
}

struct BoxHeader {
    kind: [u8; 4],
    /// Offset of the payload
    body_start: u64,
    /// Offset one past the end of the box
    end: u64,
}

fn read_box_header<R: Read + Seek>(reader: &mut R, limit: u64) -> Option<BoxHeader> {
    let start = reader.stream_position().ok()?;
    if start + 8 > limit {
        return None;
    }
    let mut header = [0u8; 8];
    reader.read_exact(&mut header).ok()?;
    let size32 = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let kind = [header[4], header[5], header[6], header[7]];

    let (size, body_start) = match size32 {
        0 => (limit - start, start + 8),
        1 => {
            let mut large = [0u8; 8];
            reader.read_exact(&mut large).ok()?;
            (u64::from_be_bytes(large), start + 16)
        }
        n => (u64::from(n), start + 8),
    };

    let end = start.checked_add(size)?;
    if end < body_start || end > limit {
        return None;
    }
    Some(BoxHeader { kind, body_start, end })
}

/// Walk sibling boxes in `[position, limit)` and return the first of `kind`.
fn find_box<R: Read + Seek>(reader: &mut R, kind: &[u8; 4], limit: u64) -> Option<BoxHeader> {
    for _ in 0..MAX_BOXES {
        let header = read_box_header(reader, limit)?;
        if &header.kind == kind {
            return Some(header);
        }
        reader.seek(SeekFrom::Start(header.end)).ok()?;
    }
    None
}

fn read_mvhd_creation<R: Read + Seek>(reader: &mut R, len: u64) -> Option<u64> {
    let moov = find_box(reader, b"moov", len)?;
    reader.seek(SeekFrom::Start(moov.body_start)).ok()?;
    let mvhd = find_box(reader, b"mvhd", moov.end)?;
    reader.seek(SeekFrom::Start(mvhd.body_start)).ok()?;

    let mut version_flags = [0u8; 4];
    reader.read_exact(&mut version_flags).ok()?;
    match version_flags[0] {
        0 => {
            let mut secs = [0u8; 4];
            reader.read_exact(&mut secs).ok()?;
            Some(u64::from(u32::from_be_bytes(secs)))
        }
        1 => {
            let mut secs = [0u8; 8];
            reader.read_exact(&mut secs).ok()?;
            Some(u64::from_be_bytes(secs))
        }
        _ => None,
    }
}
