#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// Little-endian TIFF block with a single `DateTimeOriginal` in the Exif IFD.
fn tiff_with_date_original(datetime: &str) -> Vec<u8> {
    let mut value = datetime.as_bytes().to_vec();
    value.push(0);
    let count = value.len() as u32;

    let mut t = Vec::new();
    t.extend_from_slice(b"II");
    t.extend_from_slice(&42u16.to_le_bytes());
    t.extend_from_slice(&8u32.to_le_bytes());

    // IFD0 at 8: one entry pointing at the Exif IFD at 26
    t.extend_from_slice(&1u16.to_le_bytes());
    t.extend_from_slice(&0x8769u16.to_le_bytes());
    t.extend_from_slice(&4u16.to_le_bytes()); // LONG
    t.extend_from_slice(&1u32.to_le_bytes());
    t.extend_from_slice(&26u32.to_le_bytes());
    t.extend_from_slice(&0u32.to_le_bytes());

    // Exif IFD at 26: DateTimeOriginal, value at 44
    t.extend_from_slice(&1u16.to_le_bytes());
    t.extend_from_slice(&0x9003u16.to_le_bytes());
    t.extend_from_slice(&2u16.to_le_bytes()); // ASCII
    t.extend_from_slice(&count.to_le_bytes());
    t.extend_from_slice(&44u32.to_le_bytes());
    t.extend_from_slice(&0u32.to_le_bytes());

    assert_eq!(t.len(), 44);
    t.extend_from_slice(&value);
    t
}

/// Little-endian TIFF block with only the IFD0 `DateTime` tag.
fn tiff_with_date_modified(datetime: &str) -> Vec<u8> {
    let mut value = datetime.as_bytes().to_vec();
    value.push(0);
    let count = value.len() as u32;

    let mut t = Vec::new();
    t.extend_from_slice(b"II");
    t.extend_from_slice(&42u16.to_le_bytes());
    t.extend_from_slice(&8u32.to_le_bytes());

    t.extend_from_slice(&1u16.to_le_bytes());
    t.extend_from_slice(&0x0132u16.to_le_bytes());
    t.extend_from_slice(&2u16.to_le_bytes());
    t.extend_from_slice(&count.to_le_bytes());
    t.extend_from_slice(&26u32.to_le_bytes());
    t.extend_from_slice(&0u32.to_le_bytes());

    assert_eq!(t.len(), 26);
    t.extend_from_slice(&value);
    t
}

/// Little-endian TIFF block with both `DateTime` in IFD0 and a raw
/// `DateTimeOriginal` value in the Exif IFD.
fn tiff_with_both_dates(original_raw: &str, modified: &str) -> Vec<u8> {
    let mut modified_value = modified.as_bytes().to_vec();
    modified_value.push(0);
    let mut original_value = original_raw.as_bytes().to_vec();
    original_value.push(0);

    // IFD0 (2 entries) at 8..38, Exif IFD (1 entry) at 38..56, then the values
    let modified_at = 56u32;
    let original_at = modified_at + modified_value.len() as u32;

    let mut t = Vec::new();
    t.extend_from_slice(b"II");
    t.extend_from_slice(&42u16.to_le_bytes());
    t.extend_from_slice(&8u32.to_le_bytes());

    t.extend_from_slice(&2u16.to_le_bytes());
    t.extend_from_slice(&0x0132u16.to_le_bytes());
    t.extend_from_slice(&2u16.to_le_bytes());
    t.extend_from_slice(&(modified_value.len() as u32).to_le_bytes());
    t.extend_from_slice(&modified_at.to_le_bytes());
    t.extend_from_slice(&0x8769u16.to_le_bytes());
    t.extend_from_slice(&4u16.to_le_bytes());
    t.extend_from_slice(&1u32.to_le_bytes());
    t.extend_from_slice(&38u32.to_le_bytes());
    t.extend_from_slice(&0u32.to_le_bytes());

    t.extend_from_slice(&1u16.to_le_bytes());
    t.extend_from_slice(&0x9003u16.to_le_bytes());
    t.extend_from_slice(&2u16.to_le_bytes());
    t.extend_from_slice(&(original_value.len() as u32).to_le_bytes());
    t.extend_from_slice(&original_at.to_le_bytes());
    t.extend_from_slice(&0u32.to_le_bytes());

    assert_eq!(t.len(), 56);
    t.extend_from_slice(&modified_value);
    t.extend_from_slice(&original_value);
    t
}

fn jpeg_around(tiff: &[u8]) -> Vec<u8> {
    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend_from_slice(tiff);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&app1);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

fn write(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// JPEG whose capture time is `date` (`YYYY-MM-DD`).
pub fn jpeg_taken(path: &Path, date: &str) {
    let exif_date = format!("{} 12:00:00", date.replace('-', ":"));
    write(path, &jpeg_around(&tiff_with_date_original(&exif_date)));
}

/// JPEG carrying only the modification-time tag.
pub fn jpeg_modified(path: &Path, date: &str) {
    let exif_date = format!("{} 12:00:00", date.replace('-', ":"));
    write(path, &jpeg_around(&tiff_with_date_modified(&exif_date)));
}

/// JPEG with a raw `DateTimeOriginal` string and a valid `DateTime` on `modified`.
pub fn jpeg_with_both(path: &Path, original_raw: &str, modified: &str) {
    let exif_modified = format!("{} 12:00:00", modified.replace('-', ":"));
    write(path, &jpeg_around(&tiff_with_both_dates(original_raw, &exif_modified)));
}

/// A file with an image extension and no metadata at all.
pub fn jpeg_without_exif(path: &Path) {
    write(path, &[0xFF, 0xD8, 0xFF, 0xD9]);
}

fn mp4_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

/// Minimal MP4 whose `mvhd` creation time is noon UTC on `date`.
pub fn mp4_created(path: &Path, date: &str) {
    let day = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    let unix = day.and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp();
    let creation = (unix + 2_082_844_800) as u32;

    let mut mvhd = vec![0u8; 4];
    mvhd.extend_from_slice(&creation.to_be_bytes());
    mvhd.extend_from_slice(&creation.to_be_bytes());
    mvhd.extend_from_slice(&[0u8; 88]);

    let mut file = mp4_box(b"ftyp", b"isom\0\0\0\0");
    file.extend(mp4_box(b"moov", &mp4_box(b"mvhd", &mvhd)));
    write(path, &file);
}

/// `count` JPEGs named `<prefix>NNN.jpg` taken on `date`.
pub fn photos(dir: &Path, prefix: &str, date: &str, count: usize) {
    for i in 0..count {
        jpeg_taken(&dir.join(format!("{}{:03}.jpg", prefix, i)), date);
    }
}

/// Subdirectory names of `dir`, sorted.
pub fn folder_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
