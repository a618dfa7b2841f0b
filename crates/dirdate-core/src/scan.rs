use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use walkdir::WalkDir;

use crate::date::{self, DateSource, YearRange};
use crate::media::{lowercase_extension, MediaFile, MediaKind};

pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "@eaDir",    // Synology thumbnails
    "#recycle",  // Synology recycle bin
    ".DS_Store",
    "venv",
    ".git",
    "lost+found",
    "Thumbs.db",
];

/// Matched as substrings of the file name.
pub const DEFAULT_IGNORED_FILES: &[&str] = &["SYNOFILE_THUMB", "desktop.ini", ".DS_Store", "Thumbs.db"];

/// Extensions without the dot.
pub const DEFAULT_IGNORED_EXT: &[&str] = &["db", "tmp", "ini", "txt", "log", "json", "sh", "py"];

/// Folder and file filters applied while walking a folder.
#[derive(Debug, Clone)]
pub struct ScanRules {
    pub ignored_dirs: HashSet<String>,
    pub ignored_files: Vec<String>,
    /// Lowercase, no leading dot
    pub ignored_ext: HashSet<String>,
    /// Stop once this many files produced a date
    pub sample_cap: usize,
    /// When set, files without metadata fall back to their modification date.
    pub mtime_fallback: Option<YearRange>,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self {
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
            ignored_files: DEFAULT_IGNORED_FILES.iter().map(|s| s.to_string()).collect(),
            ignored_ext: DEFAULT_IGNORED_EXT.iter().map(|s| s.to_string()).collect(),
            sample_cap: 50,
            mtime_fallback: None,
        }
    }
}

impl ScanRules {
    /// Defaults plus user-supplied extras. Extensions may be given as `.ext` or `ext`.
    pub fn with_extras(extra_dirs: &[String], extra_files: &[String], extra_ext: &[String]) -> Self {
        let mut rules = Self::default();
        rules.ignored_dirs.extend(extra_dirs.iter().cloned());
        rules.ignored_files.extend(extra_files.iter().cloned());
        rules.ignored_ext.extend(
            extra_ext
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty()),
        );
        rules
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.contains(name)
    }

    pub fn is_ignored_file(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if self.ignored_files.iter().any(|pattern| name.contains(pattern.as_str())) {
            return true;
        }
        lowercase_extension(path).is_some_and(|ext| self.ignored_ext.contains(&ext))
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: usize,
    first_seen: usize,
}

/// Occurrence count per capture date, for one folder.
#[derive(Debug, Clone, Default)]
pub struct DateHistogram {
    buckets: HashMap<NaiveDate, Bucket>,
    dated: usize,
    /// Files handed to the date source, dated or not
    pub total_scanned: usize,
}

impl DateHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, date: NaiveDate) {
        let next = self.buckets.len();
        self.buckets
            .entry(date)
            .or_insert(Bucket { count: 0, first_seen: next })
            .count += 1;
        self.dated += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[cfg(test)]
    pub fn count(&self, date: NaiveDate) -> usize {
        self.buckets.get(&date).map_or(0, |b| b.count)
    }

    /// Number of files that produced a date.
    pub fn dated(&self) -> usize {
        self.dated
    }

    /// Most frequent date and its count. Ties go to the date recorded first.
    pub fn mode(&self) -> Option<(NaiveDate, usize)> {
        self.buckets
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.count
                    .cmp(&b.count)
                    .then_with(|| b.first_seen.cmp(&a.first_seen))
            })
            .map(|(date, bucket)| (*date, bucket.count))
    }

    /// Dates ordered by first appearance, with counts.
    #[cfg(test)]
    pub fn entries(&self) -> Vec<(NaiveDate, usize)> {
        let mut entries: Vec<_> = self.buckets.iter().map(|(d, b)| (*d, *b)).collect();
        entries.sort_by_key(|(_, b)| b.first_seen);
        entries.into_iter().map(|(d, b)| (d, b.count)).collect()
    }
}

/// Media files under `folder`, stills first, then videos, each in walk order.
/// Ignored directories are pruned before descending into them.
pub fn collect_media(folder: &Path, rules: &ScanRules) -> Vec<MediaFile> {
    let mut images: Vec<MediaFile> = Vec::new();
    let mut videos: Vec<MediaFile> = Vec::new();

    let walker = WalkDir::new(folder)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !rules.is_ignored_dir(&e.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", folder.display(), err);
                continue;
            }
        };
        // Links are not descended into, but a link to a media file is read like the file
        let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file || rules.is_ignored_file(entry.path()) {
            continue;
        }
        let media = MediaFile::new(entry.into_path());
        match media.kind {
            MediaKind::Image => images.push(media),
            MediaKind::Video => videos.push(media),
            MediaKind::Ignored => {}
        }
    }

    images.extend(videos);
    images
}

/// Build the date histogram for one folder.
///
/// Scanning stops once `rules.sample_cap` files have produced a date, so a
/// folder with thousands of photos costs at most a few dozen metadata reads
/// when its files agree. An empty histogram is the normal "no evidence" result.
pub fn scan_folder(folder: &Path, rules: &ScanRules, source: &dyn DateSource) -> DateHistogram {
    let mut histogram = DateHistogram::new();
    let candidates = collect_media(folder, rules);
    if candidates.is_empty() {
        tracing::debug!("No media files in {}", folder.display());
        return histogram;
    }

    for media in &candidates {
        if histogram.dated() >= rules.sample_cap {
            break;
        }

        let found = source.extract(&media.path, media.kind).or_else(|| {
            rules
                .mtime_fallback
                .and_then(|years| date::modified_date(&media.path, years))
        });
        histogram.total_scanned += 1;

        if let Some(date) = found {
            histogram.record(date);
        } else {
            tracing::debug!("No date in {}", media.path.display());
        }
    }

    tracing::debug!(
        "Scanned {} of {} media files in {}, {} dated",
        histogram.total_scanned,
        candidates.len(),
        folder.display(),
        histogram.dated()
    );
    histogram
}
