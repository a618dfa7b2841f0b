use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use dirdate_core::{
    CancellationToken, CaseStyle, MissingDatePolicy, OrganizeControl, OrganizeOptions, RunOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "dirdate", version, about = "Rename media folders to the date their photos and videos were taken")]
struct Cli {
    /// Directory whose subfolders are renamed
    path: PathBuf,

    /// Rename for real (default is a dry run)
    #[arg(long)]
    live: bool,

    /// Number of folders processed in parallel
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Minimum share of scanned files that must agree on one date (0-1)
    #[arg(long, default_value_t = 0.6)]
    confidence: f64,

    /// Casing of the descriptive part of the name
    #[arg(long, value_enum, default_value_t = CaseStyle::Title)]
    case: CaseStyle,

    /// Extra directory names to ignore
    #[arg(long, num_args = 1..)]
    ignore_dirs: Vec<String>,

    /// Extra file-name substrings to ignore
    #[arg(long, num_args = 1..)]
    ignore_files: Vec<String>,

    /// Extra file extensions to ignore
    #[arg(long, num_args = 1..)]
    ignore_ext: Vec<String>,

    /// Stop scanning a folder after this many dated files
    #[arg(long, default_value_t = 50)]
    sample_cap: usize,

    /// Dates before this year are treated as bad camera clocks
    #[arg(long, default_value_t = 2000)]
    min_year: i32,

    /// What to do with files that carry no date metadata
    #[arg(long, value_enum, default_value_t = MissingDatePolicy::Skip)]
    missing_date: MissingDatePolicy,

    /// Directory for the log, report and undo script
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Verbose log file
    #[arg(long)]
    debug: bool,
}

/// Full log to `<output>/<prefix>.log`, warnings and errors to stderr.
fn init_logging(log_path: &Path, debug: bool) -> anyhow::Result<()> {
    let file = File::create(log_path)?;
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .init();
    Ok(())
}

fn print_summary(outcome: &RunOutcome) {
    let counts = &outcome.counts;
    println!();
    println!("{}", "=".repeat(40));
    println!("          FINAL REPORT");
    println!("{}", "=".repeat(40));
    println!("Total folders : {}", outcome.total_folders);
    println!("Renamed       : {}", counts.renamed);
    println!("Dry run       : {}", counts.dry_run);
    println!("Unchanged     : {}", counts.unchanged);
    println!("Skipped       : {}", counts.skipped);
    println!("Errors        : {}", counts.error);
    if counts.crash > 0 {
        println!("Crashed       : {}", counts.crash);
    }
    if counts.cancelled > 0 {
        println!("Not started   : {} (cancelled)", counts.cancelled);
    }
    println!("{}", "-".repeat(40));
    println!("Full report   : {}", outcome.report_path.display());
    if let Some(undo) = &outcome.undo_path {
        println!("Undo script   : {}", undo.display());
    }

    if !outcome.skipped_samples.is_empty() {
        println!("{}", "-".repeat(40));
        println!("Skipped samples:");
        for sample in &outcome.skipped_samples {
            println!(" - {}", sample);
        }
        let rest = outcome.skipped_total - outcome.skipped_samples.len();
        if rest > 0 {
            println!("   ... and {} more (see report).", rest);
        }
    }
    println!("{}", "=".repeat(40));
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let options = OrganizeOptions {
        target: cli.path,
        live: cli.live,
        workers: cli.workers,
        confidence: cli.confidence,
        case: cli.case,
        ignore_dirs: cli.ignore_dirs,
        ignore_files: cli.ignore_files,
        ignore_ext: cli.ignore_ext,
        sample_cap: cli.sample_cap,
        min_year: cli.min_year,
        missing_date_policy: cli.missing_date,
        output_dir: cli.output_dir,
    };
    options.validate()?;

    std::fs::create_dir_all(&options.output_dir)?;
    let resolved = std::fs::canonicalize(&options.target)?;
    let log_path = options
        .output_dir
        .join(format!("{}.log", dirdate_core::report::artifact_prefix(&resolved)));
    init_logging(&log_path, cli.debug)?;

    if !dirdate_core::date::video::is_supported() {
        tracing::warn!("Built without video support, videos will not be dated");
    }

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, finishing folders already in progress...");
        handler_token.cancel();
    })?;

    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} dirs {wide_msg}")?);

    let control = OrganizeControl::new().with_cancel_token(token);
    let outcome = dirdate_core::organize_with_control(&options, &control, &|progress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.done as u64);
        bar.set_message(progress.folder.to_string());
    })?;
    bar.finish_and_clear();

    print_summary(&outcome);
    eprintln!(
        "Done in {:.2}s{}. Log: {}",
        t_total.elapsed().as_secs_f64(),
        if outcome.cancelled { " (cancelled)" } else { "" },
        log_path.display()
    );

    Ok(())
}
