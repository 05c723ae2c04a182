//! # CLI Module
//!
//! Command-line interface for the media archiver.
//!
//! ## Usage
//! ```bash
//! # Archive the inbox, quarantining duplicates
//! media-archive organize --source ~/Inbox --destination ~/Archive --duplicates ~/Duplicates
//!
//! # Settings from a file, flags override it
//! media-archive organize --config archive.toml --review ~/Review
//!
//! # See what would happen, without touching anything
//! media-archive plan --config archive.toml --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use media_archiver::config::{ArchiveConfig, ConfigOverrides};
use media_archiver::core::pipeline::{DivertOutcome, Disposition, Pipeline, RunPlan, RunReport};
use media_archiver::error::Result;
use media_archiver::events::{
    Event, EventChannel, AnalyzeEvent, PipelineEvent, PipelinePhase, PlaceEvent, ScanEvent,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;

/// Media Archiver - Sort photos and videos into a clean monthly archive
#[derive(Parser, Debug)]
#[command(name = "media-archive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deduplicate, rename and move files into the archive
    Organize(CommonArgs),
    /// Show what organize would do, without changing anything
    Plan(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Config file (default: <config dir>/media-archiver/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Flat folder of files to archive
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Archive root holding the month folders
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Quarantine for duplicates; without it they are deleted
    #[arg(long)]
    duplicates: Option<PathBuf>,

    /// Folder for files without a capture date
    #[arg(long)]
    unsorted: Option<PathBuf>,

    /// Folder for files that cannot be decoded
    #[arg(long)]
    broken: Option<PathBuf>,

    /// Folder for duplicates that need a human look
    #[arg(long)]
    review: Option<PathBuf>,

    /// Formats from least to most preferred, e.g. jpg,heic; unlisted
    /// formats are never replaced
    #[arg(long, value_delimiter = ',')]
    quality_order: Option<Vec<String>>,

    /// Treat images already in the archive as originals
    #[arg(long)]
    seed_from_archive: bool,

    /// Path to the ffprobe binary
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl CommonArgs {
    fn resolve_config(&self) -> Result<ArchiveConfig> {
        let overrides = ConfigOverrides {
            source: self.source.clone(),
            destination: self.destination.clone(),
            duplicates: self.duplicates.clone(),
            unsorted: self.unsorted.clone(),
            broken: self.broken.clone(),
            review: self.review.clone(),
            quality_order: self.quality_order.clone(),
            seed_from_archive: self.seed_from_archive,
            ffprobe: self.ffprobe.clone(),
        };
        Ok(ArchiveConfig::resolve(self.config.as_deref(), overrides)?)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Organize(args) => run_organize(args),
        Commands::Plan(args) => run_plan(args),
    }
}

fn run_organize(args: CommonArgs) -> Result<()> {
    media_archiver::init_tracing(args.verbose);
    let config = args.resolve_config()?;
    let term = Term::stderr();
    let pretty = matches!(args.output, OutputFormat::Pretty);

    if pretty {
        print_header(&term, &config);
    }
    if config.buckets.duplicates.is_none() {
        term.write_line(&format!(
            "{} No duplicates folder configured: duplicates and lower-quality copies will be {}.",
            style("!").yellow().bold(),
            style("permanently deleted").red().bold()
        ))
        .ok();
    }

    let pipeline = Pipeline::builder(config).build();

    let (sender, receiver) = EventChannel::new();
    let progress = pretty.then(new_progress_bar);
    let progress_clone = progress.clone();
    let verbose = args.verbose;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            receiver.iter().for_each(drop);
            return;
        };
        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(phase.to_string());
                    if phase == PipelinePhase::Placing {
                        pb.set_position(0);
                    }
                }
                Event::Scan(ScanEvent::Completed { total_files }) => {
                    pb.set_length(total_files as u64);
                }
                Event::Analyze(AnalyzeEvent::Progress {
                    completed,
                    current_path,
                    ..
                }) => {
                    pb.set_position(completed as u64);
                    if verbose {
                        pb.set_message(file_name(&current_path));
                    }
                }
                Event::Place(PlaceEvent::Placed { .. }) | Event::Place(PlaceEvent::Diverted { .. }) => {
                    pb.inc(1);
                }
                Event::Place(PlaceEvent::Error { path, message }) => {
                    pb.println(format!(
                        "{} {}: {}",
                        style("✗").red(),
                        file_name(&path),
                        message
                    ));
                }
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    // Run the pipeline
    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = result?;
    match args.output {
        OutputFormat::Pretty => print_pretty_report(&term, &report, args.verbose),
        OutputFormat::Json => print_json(&report),
    }

    Ok(())
}

fn run_plan(args: CommonArgs) -> Result<()> {
    media_archiver::init_tracing(args.verbose);
    let config = args.resolve_config()?;
    let term = Term::stderr();

    if matches!(args.output, OutputFormat::Pretty) {
        print_header(&term, &config);
    }

    let plan = Pipeline::builder(config).build().plan()?;

    match args.output {
        OutputFormat::Pretty => print_pretty_plan(&term, &plan),
        OutputFormat::Json => print_json(&plan),
    }

    Ok(())
}

fn new_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}

fn print_header(term: &Term, config: &ArchiveConfig) {
    term.write_line(&format!(
        "{} {}",
        style("Media Archiver").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line(&format!(
        "  {} → {}",
        display_path(&config.source),
        display_path(&config.destination)
    ))
    .ok();
    term.write_line("").ok();
}

fn print_pretty_report(term: &Term, report: &RunReport, verbose: bool) {
    let summary = report.summary();

    term.write_line("").ok();
    if report.cancelled {
        term.write_line(&format!("{} Run cancelled", style("!").yellow().bold()))
            .ok();
    } else {
        term.write_line(&format!("{} Archive Complete", style("✓").green().bold()))
            .ok();
    }
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files in {:.1}s",
        style(summary.total_files).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    let rows = [
        ("placed", summary.placed),
        ("duplicates", summary.duplicates),
        ("need review", summary.unresolved),
        ("unsorted (no date)", summary.unsorted),
        ("broken", summary.broken),
        ("skipped", summary.skipped),
    ];
    for (label, count) in rows {
        if count > 0 {
            term.write_line(&format!("  {} {}", style(count).cyan(), label))
                .ok();
        }
    }

    let deleted = report
        .duplicates
        .iter()
        .filter(|d| d.outcome == DivertOutcome::Deleted)
        .count();
    if deleted > 0 {
        term.write_line(&format!(
            "  {} {}",
            style(deleted).red().bold(),
            style("files permanently deleted").red()
        ))
        .ok();
    }

    let left: Vec<_> = report
        .review
        .iter()
        .chain(&report.unsorted)
        .chain(&report.broken)
        .filter(|d| d.outcome == DivertOutcome::LeftInSource)
        .collect();
    if !left.is_empty() {
        term.write_line(&format!(
            "  {} files left in the source (no folder configured)",
            style(left.len()).yellow()
        ))
        .ok();
    }

    if !report.folders_created.is_empty() || !report.folders_merged.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Folders:").bold().underlined()))
            .ok();
        for folder in &report.folders_created {
            term.write_line(&format!("  {} {}", style("+").green(), file_name(folder)))
                .ok();
        }
        for merge in &report.folders_merged {
            term.write_line(&format!(
                "  {} {} → {}",
                style("~").yellow(),
                file_name(&merge.from),
                file_name(&merge.to)
            ))
            .ok();
        }
    }

    if verbose && !report.issues.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Issues:").bold().underlined()))
            .ok();
        for issue in &report.issues {
            term.write_line(&format!(
                "  {} {} ({:?}): {}",
                style("•").dim(),
                display_path(&issue.path),
                issue.kind,
                issue.detail
            ))
            .ok();
        }
    } else if !report.issues.is_empty() {
        term.write_line(&format!(
            "\n  {}",
            style(format!(
                "{} files had issues; run with --verbose to list them",
                report.issues.len()
            ))
            .dim()
        ))
        .ok();
    }
}

fn print_pretty_plan(term: &Term, plan: &RunPlan) {
    if plan.cancelled {
        term.write_line(&format!("{} Plan cancelled", style("!").yellow().bold()))
            .ok();
        return;
    }
    term.write_line(&format!("{}", style("Plan:").bold().underlined()))
        .ok();

    for entry in &plan.entries {
        let marker = match entry.disposition {
            Disposition::Place => style("→").green(),
            Disposition::Duplicate => style("=").yellow(),
            Disposition::Review => style("?").magenta(),
            Disposition::Unsorted => style("·").dim(),
            Disposition::Broken => style("✗").red(),
        };
        let detail = match (&entry.target_name, &entry.duplicate_of) {
            (Some(target), _) => target.clone(),
            (None, Some(original)) => format!("duplicate of {}", original),
            (None, None) => entry.disposition.to_string(),
        };
        term.write_line(&format!("  {} {} {}", marker, entry.name, style(detail).dim()))
            .ok();
    }

    term.write_line("").ok();
    term.write_line(&format!(
        "  {} to place, {} duplicates, {} to review, {} unsorted, {} broken",
        style(plan.count(Disposition::Place)).cyan(),
        style(plan.count(Disposition::Duplicate)).cyan(),
        style(plan.count(Disposition::Review)).cyan(),
        style(plan.count(Disposition::Unsorted)).cyan(),
        style(plan.count(Disposition::Broken)).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "{}",
        style("Nothing was changed. Run `organize` to apply.").dim()
    ))
    .ok();
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to encode output: {}", e),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

fn display_path(path: &Path) -> String {
    let home = dirs::home_dir().unwrap_or_default();
    match path.strip_prefix(&home) {
        Ok(rest) if !home.as_os_str().is_empty() => format!("~/{}", rest.display()),
        _ => path.display().to_string(),
    }
}
