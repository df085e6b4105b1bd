use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::Context;
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use zarrs::{filesystem::FilesystemStore, group::Group};
use zarrs_migrate::{
    migrate_path, progress::ProgressCallback, progress::ProgressEvent, MigrateOptions,
    MigrationReport, MigrationState,
};

/// Migrate a Zarr V2 hierarchy to a sharded Zarr V3 hierarchy with consolidated metadata.
///
/// Every array in the root group of SOURCE is copied to TARGET.
/// Non-leading axes are chunked at their full extent, and arrays with 3 or more dimensions are sharded along the leading axis.
/// Data is stored uncompressed.
#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    #[command(flatten)]
    options: MigrateOptions,

    /// The Zarr V2 hierarchy input directory.
    source: PathBuf,

    /// The Zarr V3 hierarchy output directory. Any existing content is erased.
    target: PathBuf,

    /// Print debug logs and the consolidated metadata.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    /// Hide progress bars.
    #[arg(long, short, default_value_t = false)]
    quiet: bool,
}

fn bar_style_run() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}/{duration_precise}] {bar:40.black/bold} {pos}/{len} ({percent}%) {prefix} {msg}",
    )
    .unwrap_or(ProgressStyle::default_bar())
}

fn bar_style_finish() -> ProgressStyle {
    ProgressStyle::with_template("[{elapsed_precise}/{elapsed_precise}] {prefix} {msg}")
        .unwrap_or(ProgressStyle::default_bar())
}

fn print_summary(report: &MigrationReport) {
    for array in &report.arrays {
        println!(
            "{}: shape {:?} chunks {:?} shards {} dimension_names {} ({:.2}MB, read {:.2}s, write {:.2}s)",
            array.name,
            array.shape,
            array.geometry.chunks,
            array
                .geometry
                .shards
                .as_ref()
                .map_or_else(|| "none".to_string(), |shards| format!("{shards:?}")),
            array
                .dimension_names
                .as_ref()
                .map_or_else(|| "none".to_string(), |names| format!("{names:?}")),
            array.bytes as f32 / 1e6,
            array.duration_read.as_secs_f32(),
            array.duration_write.as_secs_f32(),
        );
    }
    println!(
        "Migrated {} arrays ({:.2}MB) in {:.2}s",
        report.arrays.len(),
        report.bytes() as f32 / 1e6,
        report.duration.as_secs_f32()
    );
}

fn try_main() -> anyhow::Result<()> {
    let args = Args::parse();

    FmtSubscriber::builder()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    tracing::debug!(
        "options: {}",
        serde_json::to_string(&args.options).unwrap_or_default()
    );

    let multi_progress = MultiProgress::new();
    if args.quiet || args.verbose {
        multi_progress.set_draw_target(ProgressDrawTarget::hidden());
    }
    let bars: Mutex<HashMap<String, ProgressBar>> = Mutex::new(HashMap::new());
    let update = |event: ProgressEvent| {
        let mut bars = bars.lock().unwrap_or_else(PoisonError::into_inner);
        match event {
            ProgressEvent::StateChanged(state) => {
                if state == MigrationState::Consolidated {
                    multi_progress.println("Consolidated metadata").ok();
                }
            }
            ProgressEvent::ArrayStarted {
                index,
                num_arrays,
                name,
                shape,
                size_bytes,
            } => {
                let bar = multi_progress.add(ProgressBar::new(0));
                bar.set_style(bar_style_run());
                bar.set_prefix(format!(
                    "{}/{} {name} {shape:?}{}",
                    index + 1,
                    num_arrays,
                    size_bytes.map_or_else(String::new, |size| format!(
                        " {:.2}MB",
                        size as f32 / 1e6
                    ))
                ));
                bars.insert(name.to_string(), bar);
            }
            ProgressEvent::WindowCopied { name, stats, .. } => {
                if let Some(bar) = bars.get(name) {
                    bar.set_length(stats.num_steps as u64);
                    bar.set_position(stats.step as u64);
                    bar.set_message(format!(
                        "rw:{:.2}/{:.2}",
                        stats.read.as_secs_f32(),
                        stats.write.as_secs_f32(),
                    ));
                }
            }
            ProgressEvent::ArrayFinished { name, stats } => {
                if let Some(bar) = bars.remove(name) {
                    bar.set_style(bar_style_finish());
                    bar.finish_with_message(format!(
                        "rw:{:.2}/{:.2}",
                        stats.read.as_secs_f32(),
                        stats.write.as_secs_f32(),
                    ));
                }
            }
        }
    };
    let progress_callback = ProgressCallback::new(&update);

    let report = migrate_path(&args.source, &args.target, &args.options, &progress_callback)
        .with_context(|| {
            format!(
                "migration of {} to {} failed, the target is invalid",
                args.source.display(),
                args.target.display()
            )
        })?;
    print_summary(&report);

    // Reopen the result through its consolidated metadata
    let storage = Arc::new(FilesystemStore::new(&args.target)?);
    let group = Group::open(storage, "/")?;
    let consolidated = group
        .consolidated_metadata()
        .context("the target has no consolidated metadata")?;
    let num_arrays = consolidated.metadata.len();
    println!(
        "{} is valid with {num_arrays} consolidated arrays",
        args.target.display()
    );
    if args.verbose {
        println!("{}", serde_json::to_string_pretty(&consolidated)?);
    }

    Ok(())
}

fn main() -> std::process::ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:?}");
        std::process::ExitCode::FAILURE
    } else {
        std::process::ExitCode::SUCCESS
    }
}
