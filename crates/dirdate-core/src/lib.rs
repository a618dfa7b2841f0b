pub mod cancel;
pub mod date;
pub mod decide;
pub mod media;
pub mod naming;
pub mod organizer;
pub mod rename;
pub mod report;
pub mod scan;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// Re-export the types callers need for a run
pub use cancel::{CancellationToken, CancelledError};
pub use date::{DateSource, MetadataDates, YearRange};
pub use naming::CaseStyle;
pub use organizer::{organize, organize_with_control, RunOutcome};
pub use report::{FolderResult, FolderStatus, StatusCounts};

fn default_workers() -> usize {
    4
}

fn default_confidence() -> f64 {
    0.6
}

fn default_sample_cap() -> usize {
    50
}

fn default_min_year() -> i32 {
    2000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// What to do with media files that carry no date metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDatePolicy {
    /// Leave them out of the histogram
    #[default]
    Skip,
    /// Use the file's modification date instead
    FileModified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeOptions {
    /// Directory whose immediate subfolders are renamed
    pub target: PathBuf,
    /// Rename for real; otherwise only report what would happen
    #[serde(default)]
    pub live: bool,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Minimum share of scanned files that must agree on one date
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub case: CaseStyle,
    /// Extra directory names to skip, on top of the built-in list
    #[serde(default)]
    pub ignore_dirs: Vec<String>,
    /// Extra file-name substrings to skip
    #[serde(default)]
    pub ignore_files: Vec<String>,
    /// Extra extensions to skip, with or without the dot
    #[serde(default)]
    pub ignore_ext: Vec<String>,
    /// Dated files to collect per folder before stopping
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
    /// Dates before this year are treated as bad clocks
    #[serde(default = "default_min_year")]
    pub min_year: i32,
    #[serde(default)]
    pub missing_date_policy: MissingDatePolicy,
    /// Where the report and undo script are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl OrganizeOptions {
    /// Options with every default, in dry-run mode.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            live: false,
            workers: default_workers(),
            confidence: default_confidence(),
            case: CaseStyle::default(),
            ignore_dirs: Vec::new(),
            ignore_files: Vec::new(),
            ignore_ext: Vec::new(),
            sample_cap: default_sample_cap(),
            min_year: default_min_year(),
            missing_date_policy: MissingDatePolicy::default(),
            output_dir: default_output_dir(),
        }
    }

    /// Reject settings the run cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            anyhow::bail!("Confidence must be between 0 and 1, got {}", self.confidence);
        }
        if self.workers == 0 {
            anyhow::bail!("Worker count must be at least 1");
        }
        if self.sample_cap == 0 {
            anyhow::bail!("Sample cap must be at least 1");
        }
        if !self.target.exists() {
            anyhow::bail!("Target directory not found: {}", self.target.display());
        }
        if !self.target.is_dir() {
            anyhow::bail!("Target is not a directory: {}", self.target.display());
        }
        Ok(())
    }
}

/// Control options for a run (cancellation, injected date source).
#[derive(Clone, Default)]
pub struct OrganizeControl {
    pub cancel_token: Option<CancellationToken>,
    /// Replaces the metadata reader, mostly for tests
    pub date_source: Option<Arc<dyn DateSource>>,
}

impl OrganizeControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn with_date_source(mut self, source: Arc<dyn DateSource>) -> Self {
        self.date_source = Some(source);
        self
    }
}

/// One finished folder: `done` of `total`, the latest being `folder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderProgress<'a> {
    pub done: usize,
    pub total: usize,
    pub folder: &'a str,
}

/// May borrow from the caller, e.g. a progress bar on its stack.
pub type ProgressCallback<'a> = dyn Fn(FolderProgress<'_>) + Send + Sync + 'a;

/// Counts finished folders and forwards them at most every 200ms.
/// The last folder of the run is always forwarded.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    total: usize,
    done: usize,
    last_emit: Option<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    const INTERVAL: Duration = Duration::from_millis(200);

    pub fn new(inner: &'a ProgressCallback<'a>, total: usize) -> Self {
        Self {
            inner,
            total,
            done: 0,
            last_emit: None,
        }
    }

    pub fn folder_done(&mut self, folder: &str) {
        self.done += 1;
        let is_last = self.done >= self.total;
        if !is_last && self.last_emit.is_some_and(|t| t.elapsed() < Self::INTERVAL) {
            return;
        }
        self.last_emit = Some(Instant::now());
        (self.inner)(FolderProgress {
            done: self.done,
            total: self.total,
            folder,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_options_defaults_from_json() {
        let options: OrganizeOptions = serde_json::from_str(r#"{"target": "/photos"}"#).unwrap();
        assert_eq!(options.workers, 4);
        assert_eq!(options.confidence, 0.6);
        assert_eq!(options.sample_cap, 50);
        assert_eq!(options.min_year, 2000);
        assert_eq!(options.case, CaseStyle::Title);
        assert_eq!(options.missing_date_policy, MissingDatePolicy::Skip);
        assert!(!options.live);
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = OrganizeOptions::new(dir.path());
        assert!(options.validate().is_ok());

        options.confidence = 1.5;
        assert!(options.validate().is_err());
        options.confidence = 0.6;

        options.workers = 0;
        assert!(options.validate().is_err());
        options.workers = 2;

        options.target = dir.path().join("missing");
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_throttled_progress_forwards_first_and_last() {
        let seen = Mutex::new(Vec::new());
        let cb: &ProgressCallback<'_> = &|p| {
            seen.lock().unwrap().push((p.done, p.folder.to_string()));
        };
        let mut tp = ThrottledProgress::new(cb, 100);
        for i in 0..100 {
            tp.folder_done(&format!("f{}", i));
        }

        let seen = seen.lock().unwrap();
        assert!(seen.len() >= 2 && seen.len() < 100, "{}", seen.len());
        assert_eq!(seen.first(), Some(&(1, "f0".to_string())));
        assert_eq!(seen.last(), Some(&(100, "f99".to_string())));
    }
}
