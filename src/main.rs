use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use moobot_queue::config::PipelineConfig;
use moobot_queue::models::{ScanStats, Snapshot};
use moobot_queue::pipeline::{Pipeline, ScanMode};
use moobot_queue::progress::{format_duration, set_log_only, ReplayProgress};
use moobot_queue::safety::validate_data_path;
use moobot_queue::store::SongStore;

#[derive(Parser)]
#[command(name = "moobot-queue")]
#[command(about = "Merge Moobot song-queue page snapshots into the daily song store")]
struct Args {
    /// Snapshot JSON files, or directories of them (replayed in name order)
    #[arg(required = true)]
    snapshots: Vec<PathBuf>,

    /// Daily song store
    #[arg(long, default_value = "output/songs_data.json")]
    data: PathBuf,

    /// Pipeline config JSON (defaults for anything missing)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Store under this date instead of the capture date
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long, value_enum, default_value = "first-match")]
    mode: Mode,

    /// Extract and merge, but do not write the store
    #[arg(long)]
    dry_run: bool,

    /// Write scan statistics as JSON to this file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Hide progress bars, print periodic progress lines instead
    #[arg(long)]
    log_only: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    FirstMatch,
    AllStrategies,
}

impl From<Mode> for ScanMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::FirstMatch => ScanMode::FirstMatch,
            Mode::AllStrategies => ScanMode::AllStrategies,
        }
    }
}

/// Expand directories to their `.json` files, sorted by name.
fn collect_snapshot_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("Failed to list {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
                .collect();
            entries.sort();
            paths.extend(entries);
        } else if input.exists() {
            paths.push(input.clone());
        } else {
            bail!("Snapshot not found: {}", input.display());
        }
    }
    Ok(paths)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        },
    );
    clog.init();
    set_log_only(args.log_only);

    let start = Instant::now();

    let inputs: Vec<&Path> = args
        .snapshots
        .iter()
        .map(PathBuf::as_path)
        .chain(args.config.as_deref())
        .collect();
    validate_data_path(&args.data, &inputs)?;

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let pipeline = Pipeline::new(&config)?;

    let snapshot_paths = collect_snapshot_paths(&args.snapshots)?;
    if snapshot_paths.is_empty() {
        bail!("No snapshot files found");
    }
    println!("Replaying {} snapshot(s) into {:?}", snapshot_paths.len(), args.data);

    let mut store = SongStore::open(&args.data)?;
    let mut stats = ScanStats::default();
    let progress = ReplayProgress::new("scan", snapshot_paths.len() as u64);

    for path in &snapshot_paths {
        let label = file_label(path);
        let snapshot = match Snapshot::from_json_file(path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Skipping {}: {:#}", label, e);
                stats.failed_snapshots += 1;
                progress.tick(&label);
                continue;
            }
        };

        let now = snapshot
            .captured_at
            .unwrap_or_else(|| Local::now().naive_local());
        let date = args.date.unwrap_or_else(|| now.date());
        let existing = store.collection(date);

        let outcome = pipeline.scan(&snapshot, &existing, args.mode.into(), now);
        stats.record_extraction(&outcome.extraction);
        stats.songs_added += outcome.report.added;
        stats.songs_updated += outcome.report.updated;
        stats.links_backfilled += outcome.report.links_backfilled;
        stats.candidates_rejected += outcome.report.rejected;

        if outcome.extraction.success {
            info!(
                "{}: {} candidates via {}, {} new, {} updated",
                label,
                outcome.extraction.len(),
                outcome
                    .extraction
                    .strategy
                    .map(|s| s.as_str())
                    .unwrap_or("-"),
                outcome.report.added,
                outcome.report.updated
            );
        } else {
            progress.println(&format!("{}: no songs found", label));
        }

        store.replace(outcome.collection);
        progress.tick(&label);
    }
    progress.finish();

    if args.dry_run {
        println!("Dry run: store not written");
    } else {
        store.save()?;
    }

    let elapsed = start.elapsed();
    stats.total_songs = store.total_songs();
    stats.elapsed_seconds = elapsed.as_secs_f64();
    if args.log_only {
        stats.log_phase("final");
    }
    if let Some(path) = &args.stats {
        stats.write_to_file(path)?;
    }

    println!("\n{:=<60}", "");
    println!("Scan complete!");
    println!("  Snapshots: {} ({} failed, {} empty)", stats.snapshots, stats.failed_snapshots, stats.unsuccessful_scans);
    println!("  Songs: {} new, {} updated, {} links backfilled", stats.songs_added, stats.songs_updated, stats.links_backfilled);
    println!("  Store: {} songs across {} day(s)", stats.total_songs, store.dates().len());
    println!("  Elapsed: {}", format_duration(elapsed));
    println!("{:=<60}", "");

    Ok(())
}
