use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::OrganizeOptions;

/// Skip reasons shown in the end-of-run summary.
pub const SKIP_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderStatus {
    Renamed,
    DryRun,
    Unchanged,
    Skipped,
    Error,
}

/// Outcome of processing one top-level folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderResult {
    pub name: String,
    pub status: FolderStatus,
    /// Set for skipped and error
    #[serde(default)]
    pub reason: Option<String>,
    pub original_path: PathBuf,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub full_new_path: Option<PathBuf>,
    /// Share of scanned files agreeing on the chosen date
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl FolderResult {
    pub fn new(name: String, original_path: PathBuf, status: FolderStatus) -> Self {
        Self {
            name,
            status,
            reason: None,
            original_path,
            new_name: None,
            full_new_path: None,
            confidence: None,
        }
    }
}

/// Per-status tally for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub renamed: u64,
    pub dry_run: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub error: u64,
    /// Workers that panicked
    pub crash: u64,
    /// Folders never started because the run was cancelled
    pub cancelled: u64,
}

impl StatusCounts {
    pub fn record(&mut self, status: FolderStatus) {
        match status {
            FolderStatus::Renamed => self.renamed += 1,
            FolderStatus::DryRun => self.dry_run += 1,
            FolderStatus::Unchanged => self.unchanged += 1,
            FolderStatus::Skipped => self.skipped += 1,
            FolderStatus::Error => self.error += 1,
        }
    }
}

/// The JSON document written at the end of a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub target: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub live: bool,
    pub options: OrganizeOptions,
    pub summary: StatusCounts,
    pub folders: Vec<FolderResult>,
}

/// File name stem shared by the log, report and undo script of a target,
/// e.g. `/volume1/Photos/2025` becomes `volume1_Photos_2025`.
pub fn artifact_prefix(target: &Path) -> String {
    let raw = target.to_string_lossy();
    let prefix: String = raw
        .trim()
        .trim_matches(|c: char| c == '/' || c == '\\')
        .replace(['/', '\\'], "_")
        .replace(':', "");
    if prefix.is_empty() {
        "dirdate_root".to_string()
    } else {
        prefix
    }
}

pub fn report_path(output_dir: &Path, target: &Path) -> PathBuf {
    output_dir.join(format!("{}_report.json", artifact_prefix(target)))
}

/// `<prefix>_undo.sh`, or `<prefix>_undo_2.sh`, `_3`, ... while earlier
/// scripts for the same target are still around. Older scripts undo older
/// runs and are never overwritten.
pub fn undo_path(output_dir: &Path, target: &Path) -> PathBuf {
    let prefix = artifact_prefix(target);
    let first = output_dir.join(format!("{}_undo.sh", prefix));
    if fs::symlink_metadata(&first).is_err() {
        return first;
    }
    let mut n = 2u32;
    loop {
        let candidate = output_dir.join(format!("{}_undo_{}.sh", prefix, n));
        if fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        n += 1;
    }
}

/// Write the report as pretty JSON.
pub fn write_report(report: &RunReport, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;
    Ok(())
}

/// Quote for POSIX shells: wrap in single quotes, escaping embedded ones.
fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Write a script that moves every renamed folder back, newest rename first.
/// Returns `Ok(false)` without creating a file when nothing was renamed.
pub fn write_undo_script(results: &[FolderResult], target: &Path, path: &Path) -> anyhow::Result<bool> {
    let renamed: Vec<(&Path, &Path)> = results
        .iter()
        .filter(|r| r.status == FolderStatus::Renamed)
        .filter_map(|r| Some((r.full_new_path.as_deref()?, r.original_path.as_path())))
        .collect();
    if renamed.is_empty() {
        return Ok(false);
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "#!/bin/bash")?;
    writeln!(writer, "# Undo script for target: {}", target.display())?;
    writeln!(writer, "# Generated {}", Utc::now().to_rfc3339())?;
    writeln!(writer)?;
    for (new_path, old_path) in renamed.iter().rev() {
        writeln!(writer, "mv -- {} {}", shell_quote(new_path), shell_quote(old_path))?;
    }
    writer.flush()?;
    drop(writer);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(true)
}
