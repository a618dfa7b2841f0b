use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use anyhow::Context;
use chrono::Utc;

use crate::date::{DateSource, MetadataDates, YearRange};
use crate::decide::{decide, Decision};
use crate::rename::{RenameExecutor, RenameOutcome};
use crate::report::{self, FolderResult, FolderStatus, RunReport, StatusCounts, SKIP_SAMPLE_SIZE};
use crate::scan::{scan_folder, ScanRules};
use crate::{
    CancellationToken, MissingDatePolicy, OrganizeControl, OrganizeOptions, ProgressCallback, ThrottledProgress,
};

/// Everything a job needs, shared read-only across workers.
/// The executor's lock is the only mutable state.
pub struct RunContext {
    pub options: OrganizeOptions,
    pub rules: ScanRules,
    pub source: Arc<dyn DateSource>,
    pub executor: RenameExecutor,
    pub cancel_token: Option<CancellationToken>,
}

impl RunContext {
    pub fn new(options: OrganizeOptions, control: &OrganizeControl) -> Self {
        let years = YearRange::up_to_next_year(options.min_year);
        let mut rules = ScanRules::with_extras(&options.ignore_dirs, &options.ignore_files, &options.ignore_ext);
        rules.sample_cap = options.sample_cap;
        if options.missing_date_policy == MissingDatePolicy::FileModified {
            rules.mtime_fallback = Some(years);
        }

        let source = control
            .date_source
            .clone()
            .unwrap_or_else(|| Arc::new(MetadataDates::new(years)));

        Self {
            options,
            rules,
            source,
            executor: RenameExecutor::new(),
            cancel_token: control.cancel_token.clone(),
        }
    }
}

/// What came back from one worker.
enum JobOutcome {
    Done(FolderResult),
    /// Not started because the run was cancelled
    Cancelled(PathBuf),
    /// The job panicked
    Crashed { folder: PathBuf, message: String },
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunOutcome {
    pub total_folders: usize,
    pub counts: StatusCounts,
    /// In completion order
    pub results: Vec<FolderResult>,
    /// `name (reason)` for the first few skipped folders
    pub skipped_samples: Vec<String>,
    pub skipped_total: usize,
    pub report_path: PathBuf,
    pub undo_path: Option<PathBuf>,
    pub cancelled: bool,
}

/// Immediate subdirectories of `target`, minus ignored names, sorted by name.
/// Symlinks to directories count as folders; the link itself is what gets renamed.
pub fn list_folders(target: &Path, rules: &ScanRules) -> anyhow::Result<Vec<PathBuf>> {
    let mut folders = Vec::new();
    let entries = fs::read_dir(target).with_context(|| format!("Failed to read {}", target.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if rules.is_ignored_dir(&entry.file_name().to_string_lossy()) {
            continue;
        }
        folders.push(entry.path());
    }
    folders.sort();
    Ok(folders)
}

/// Scan, decide and rename one folder.
pub fn process_folder(folder: &Path, ctx: &RunContext) -> FolderResult {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut result = FolderResult::new(name.clone(), folder.to_path_buf(), FolderStatus::Skipped);

    let histogram = scan_folder(folder, &ctx.rules, ctx.source.as_ref());
    let options = &ctx.options;

    let proposed_name = match decide(&histogram, &name, options.confidence, options.case) {
        Decision::Skip { reason, confidence } => {
            result.reason = Some(reason);
            result.confidence = confidence;
            return result;
        }
        Decision::Unchanged {
            proposed_name,
            confidence,
        } => {
            result.status = FolderStatus::Unchanged;
            result.new_name = Some(proposed_name);
            result.full_new_path = Some(folder.to_path_buf());
            result.confidence = Some(confidence);
            return result;
        }
        Decision::Rename {
            date,
            proposed_name,
            confidence,
        } => {
            tracing::debug!("{}: {} agrees at {:.2}", name, date, confidence);
            result.confidence = Some(confidence);
            proposed_name
        }
    };

    match ctx.executor.execute(folder, &proposed_name, options.live) {
        RenameOutcome::Renamed { final_name, final_path } => {
            result.status = FolderStatus::Renamed;
            result.new_name = Some(final_name);
            result.full_new_path = Some(final_path);
        }
        RenameOutcome::Planned { final_name, final_path } => {
            result.status = FolderStatus::DryRun;
            result.new_name = Some(final_name);
            result.full_new_path = Some(final_path);
        }
        RenameOutcome::Unchanged { name } => {
            result.status = FolderStatus::Unchanged;
            result.new_name = Some(name);
            result.full_new_path = Some(folder.to_path_buf());
        }
        RenameOutcome::Failed { reason } => {
            result.status = FolderStatus::Error;
            result.reason = Some(reason);
        }
    }
    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run_job(folder: PathBuf, ctx: &RunContext) -> JobOutcome {
    if let Some(Err(err)) = ctx.cancel_token.as_ref().map(CancellationToken::check) {
        tracing::debug!("Not started ({}): {}", err, folder.display());
        return JobOutcome::Cancelled(folder);
    }
    match panic::catch_unwind(AssertUnwindSafe(|| process_folder(&folder, ctx))) {
        Ok(result) => JobOutcome::Done(result),
        Err(payload) => JobOutcome::Crashed {
            folder,
            message: panic_message(payload.as_ref()),
        },
    }
}

/// Run over every subfolder of `options.target` with progress reporting.
pub fn organize(options: &OrganizeOptions, progress_callback: &ProgressCallback<'_>) -> anyhow::Result<RunOutcome> {
    organize_with_control(options, &OrganizeControl::default(), progress_callback)
}

/// Run over every subfolder of `options.target` with progress reporting and control options.
pub fn organize_with_control(
    options: &OrganizeOptions,
    control: &OrganizeControl,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<RunOutcome> {
    options.validate()?;

    let target = fs::canonicalize(&options.target)
        .with_context(|| format!("Failed to resolve {}", options.target.display()))?;
    let mut run_options = options.clone();
    run_options.target = target.clone();
    let ctx = Arc::new(RunContext::new(run_options, control));

    let folders = list_folders(&target, &ctx.rules)?;
    let total = folders.len();
    let mut progress = ThrottledProgress::new(progress_callback, total);
    tracing::info!(
        "Processing {} folders under {} ({}, {} workers)",
        total,
        target.display(),
        if options.live { "live" } else { "dry run" },
        options.workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .thread_name(|i| format!("dirdate-worker-{}", i))
        .build()?;

    let (tx, rx) = mpsc::channel();
    for folder in folders {
        let tx = tx.clone();
        let ctx = Arc::clone(&ctx);
        pool.spawn(move || {
            let _ = tx.send(run_job(folder, &ctx));
        });
    }
    drop(tx);

    let mut counts = StatusCounts::default();
    let mut results: Vec<FolderResult> = Vec::with_capacity(total);
    let mut skipped_details: Vec<String> = Vec::new();

    for outcome in rx {
        let label = match outcome {
            JobOutcome::Done(result) => {
                counts.record(result.status);
                let new_name = result.new_name.as_deref().unwrap_or("");
                let reason = result.reason.as_deref().unwrap_or("");
                match result.status {
                    FolderStatus::Renamed => tracing::info!("Renamed {} -> {}", result.name, new_name),
                    FolderStatus::DryRun => tracing::info!("Would rename {} -> {}", result.name, new_name),
                    FolderStatus::Unchanged => tracing::info!("Unchanged {}", result.name),
                    FolderStatus::Skipped => {
                        tracing::info!("Skipped {}: {}", result.name, reason);
                        skipped_details.push(format!("{} ({})", result.name, reason));
                    }
                    FolderStatus::Error => tracing::error!("Failed to rename {}: {}", result.name, reason),
                }
                let label = result.name.clone();
                results.push(result);
                label
            }
            JobOutcome::Cancelled(folder) => {
                counts.cancelled += 1;
                folder.display().to_string()
            }
            JobOutcome::Crashed { folder, message } => {
                counts.crash += 1;
                tracing::error!("Worker crashed on {}: {}", folder.display(), message);
                folder.display().to_string()
            }
        };
        progress.folder_done(&label);
    }

    let undo_path = report::undo_path(&options.output_dir, &target);
    let report_path = report::report_path(&options.output_dir, &target);
    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("Failed to create {}", options.output_dir.display()))?;

    let wrote_undo = report::write_undo_script(&results, &target, &undo_path)
        .with_context(|| format!("Failed to write undo script {}", undo_path.display()))?;
    if wrote_undo {
        tracing::info!("Undo script saved to {}", undo_path.display());
    }

    let run_report = RunReport {
        target: target.clone(),
        generated_at: Utc::now(),
        live: options.live,
        options: ctx.options.clone(),
        summary: counts,
        folders: results,
    };
    report::write_report(&run_report, &report_path)
        .with_context(|| format!("Failed to write report {}", report_path.display()))?;
    tracing::info!("Report saved to {}", report_path.display());

    let skipped_total = skipped_details.len();
    skipped_details.truncate(SKIP_SAMPLE_SIZE);

    Ok(RunOutcome {
        total_folders: total,
        counts: run_report.summary,
        results: run_report.folders,
        skipped_samples: skipped_details,
        skipped_total,
        report_path,
        undo_path: wrote_undo.then_some(undo_path),
        cancelled: ctx.cancel_token.as_ref().is_some_and(|t| t.is_cancelled()),
    })
}
