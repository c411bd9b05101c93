use anyhow::{Context, Result};
use c3dkit::container::Compression;
use c3dkit::naming::C3dNaming;
use c3dkit::packer::{self, PackOptions, PackSummary};
use c3dkit::progress::{format_duration, ProgressConfig, ProgressMode, ProgressReporter};
use clap::Parser;
use indicatif::HumanBytes;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "c3d-pack",
    version,
    about = "Pack per-window C3D feature blobs into one .npz container per video"
)]
struct Cli {
    /// Root directory holding one sub-directory of blobs per video
    root_dir: PathBuf,

    /// Directory receiving '<video_id>.npz' containers
    output_dir: PathBuf,

    /// Feature (blob extension) to pack; repeatable. Default: every feature found
    #[arg(short = 'f', long = "feature")]
    features: Vec<String>,

    /// Keep each blob's (num, channels, length, height, width) shape
    #[arg(long, default_value_t = false)]
    keep_shape: bool,

    /// Deflate container entries instead of storing them
    #[arg(long, default_value_t = false)]
    compress: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Progress display mode: auto (TTY-aware), rich, plain, quiet.
    #[arg(long, value_enum, default_value_t = ProgressMode::Auto)]
    progress: ProgressMode,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = PackOptions {
        features: cli.features,
        keep_shape: cli.keep_shape,
        compression: if cli.compress {
            Compression::Deflated
        } else {
            Compression::Stored
        },
    };

    let mut progress = ProgressReporter::new("pack", "videos", 0, ProgressConfig::new(cli.progress));
    let summary = packer::pack_directory(
        &cli.root_dir,
        &cli.output_dir,
        &options,
        &C3dNaming,
        &mut progress,
    )?;
    let outcome = progress.finish("packing complete");

    if let Some(path) = &cli.report {
        packer::write_report(path, &summary)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }

    print_pack_summary(&summary, outcome.elapsed, &outcome.warnings, outcome.warning_count);
    Ok(())
}

fn print_pack_summary(
    summary: &PackSummary,
    elapsed: Duration,
    warnings: &[String],
    warning_count: usize,
) {
    println!(
        "Pack summary: root={} output={} duration={} videos={} containers={} windows={} ignored_files={} read={} written={} warnings={}",
        summary.root_dir.display(),
        summary.output_dir.display(),
        format_duration(elapsed),
        summary.videos_seen,
        summary.containers_written,
        summary.windows_packed,
        summary.ignored_files,
        HumanBytes(summary.bytes_read),
        HumanBytes(summary.container_bytes),
        warning_count,
    );
    for warning in warnings {
        println!("  warning: {}", warning);
    }
}
