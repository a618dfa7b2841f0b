use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "heic", "heif"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "3gp", "m4v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Ignored,
}

impl MediaKind {
    /// Classify a path by its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = lowercase_extension(path) else {
            return MediaKind::Ignored;
        };
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Ignored
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Absolute path of the file
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFile {
    pub fn new(path: PathBuf) -> Self {
        let kind = MediaKind::from_path(&path);
        Self { path, kind }
    }
}

/// Extension without the dot, lowercased.
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(MediaKind::from_path(Path::new("a/IMG_0001.JPG")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("b.heic")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("clip.MOV")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), MediaKind::Ignored);
        assert_eq!(MediaKind::from_path(Path::new("README")), MediaKind::Ignored);
    }
}
