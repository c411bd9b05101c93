use anyhow::{bail, Context, Result};
use c3dkit::annotations::{self, LabelOptions, DEFAULT_BACKGROUND_LABEL};
use c3dkit::check::{self, CheckOptions, CheckReport, CheckTarget};
use c3dkit::lists::{self, ListCounts, ListFormat, DEFAULT_PAD_WIDTH};
use c3dkit::manifest;
use c3dkit::progress::{format_duration, ProgressConfig, ProgressMode, ProgressReporter};
use c3dkit::sampling::{self, SamplingConfig, TrailingPolicy};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "c3d-lists",
    version,
    about = "Build and maintain the input/output lists consumed by the C3D feature extractor"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Densely sample every manifest video into input and output lists
    Generate {
        /// Manifest with one '<video_path> <frame_count>' per line
        manifest: PathBuf,

        /// Input list to write ('<video_path> <start_frame>' per window)
        #[arg(long)]
        input_list: PathBuf,

        /// Output list to write ('<video_path>/<window index>' per window)
        #[arg(long)]
        output_list: PathBuf,

        /// Frames between the starts of consecutive windows
        #[arg(short = 's', long, default_value_t = 16, allow_negative_numbers = true)]
        stride: i64,

        /// Frames per window
        #[arg(short = 'w', long, default_value_t = 16, allow_negative_numbers = true)]
        window_length: i64,

        /// Use this frame count for every video; manifest lines are then bare paths
        #[arg(long)]
        frame_count: Option<u64>,

        /// Number of the first frame on disk (1 for 1-based frame folders)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        first_frame: i64,

        /// Trailing frames policy: strict drops them, partial adds one last window
        #[arg(long, value_enum, default_value_t = TrailingPolicy::Strict)]
        trailing: TrailingPolicy,

        /// Zero-padding width of the window index in the output list
        #[arg(long, default_value_t = DEFAULT_PAD_WIDTH)]
        pad_width: usize,

        /// Constant label appended as a third input-list column
        #[arg(long, allow_negative_numbers = true)]
        label: Option<i64>,

        /// Label windows from '<video_path> <f_init> <f_end> <label>' segments
        #[arg(long, conflicts_with = "label")]
        annotations: Option<PathBuf>,

        /// Label of windows overlapping no segment by at least half a window
        #[arg(long, default_value_t = DEFAULT_BACKGROUND_LABEL, allow_negative_numbers = true)]
        background_label: i64,

        /// Keep videos without annotations (all background) instead of dropping them
        #[arg(long, default_value_t = false)]
        keep_unannotated: bool,

        /// Prefix prepended to every input-list line
        #[arg(long)]
        input_prefix: Option<String>,

        /// Prefix prepended to every output-list line
        #[arg(long)]
        output_prefix: Option<String>,

        /// Progress display mode: auto (TTY-aware), rich, plain, quiet.
        #[arg(long, value_enum, default_value_t = ProgressMode::Auto)]
        progress: ProgressMode,
    },

    /// Prepend prefixes to every line of both lists, in place (not idempotent)
    Prefix {
        input_list: PathBuf,
        output_list: PathBuf,

        /// Prefix for the input list
        #[arg(long, default_value = "")]
        prefix_in: String,

        /// Prefix for the output list
        #[arg(long, default_value = "")]
        prefix_out: String,
    },

    /// Report missing frames (input list) or missing blobs (output list)
    Check {
        list: PathBuf,

        /// The list is an output list; check '<line>.<feature>' blobs
        #[arg(long, default_value_t = false)]
        outputs: bool,

        /// Blob extension written by the extractor
        #[arg(long, default_value = "fc6-1")]
        feature: String,

        /// Only require the video directories, not every frame image of each window
        #[arg(long, default_value_t = false)]
        skip_frames: bool,

        /// Input-list lines carry a trailing label column
        #[arg(long, default_value_t = false)]
        labelled: bool,

        /// Frames per window when checking frame images
        #[arg(short = 'w', long, default_value_t = 16)]
        window_length: u64,

        /// Zero-padding width of frame image names
        #[arg(long, default_value_t = 6)]
        frame_digits: usize,

        /// Frame image extension
        #[arg(long, default_value = "png")]
        frame_ext: String,

        /// Keep going after a missing video directory or blob (missing frames never stop)
        #[arg(long, default_value_t = false)]
        no_stop: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Generate {
            manifest,
            input_list,
            output_list,
            stride,
            window_length,
            frame_count,
            first_frame,
            trailing,
            pad_width,
            label,
            annotations,
            background_label,
            keep_unannotated,
            input_prefix,
            output_prefix,
            progress,
        } => {
            let sampling = SamplingConfig::new(stride, window_length, first_frame, trailing)?;
            let format = ListFormat { pad_width, label };
            let labels = annotations.map(|path| {
                (
                    path,
                    LabelOptions {
                        background: background_label,
                        keep_unannotated,
                    },
                )
            });
            let summary = generate(
                &manifest,
                &input_list,
                &output_list,
                &sampling,
                &format,
                frame_count,
                labels.as_ref().map(|(path, opts)| (path.as_path(), opts)),
                ProgressConfig::new(progress),
            )?;

            let prefix_in = input_prefix.unwrap_or_default();
            let prefix_out = output_prefix.unwrap_or_default();
            if !prefix_in.is_empty() || !prefix_out.is_empty() {
                lists::prefix_lists(&input_list, &output_list, &prefix_in, &prefix_out)
                    .context("failed to prefix generated lists")?;
            }
            print_generate_summary(&summary, &input_list, &output_list);
        }

        Commands::Prefix {
            input_list,
            output_list,
            prefix_in,
            prefix_out,
        } => {
            let (n_in, n_out) =
                lists::prefix_lists(&input_list, &output_list, &prefix_in, &prefix_out)?;
            println!(
                "Prefix summary: input_list={} lines={} output_list={} lines={}",
                input_list.display(),
                n_in,
                output_list.display(),
                n_out
            );
        }

        Commands::Check {
            list,
            outputs,
            feature,
            skip_frames,
            labelled,
            window_length,
            frame_digits,
            frame_ext,
            no_stop,
        } => {
            let target = if outputs {
                CheckTarget::Outputs { feature }
            } else {
                CheckTarget::Inputs {
                    labelled,
                    check_frames: !skip_frames,
                    window_length,
                    frame_digits,
                    frame_ext,
                }
            };
            let report = check::check_list(&list, &CheckOptions { target, no_stop })?;
            print_check_report(&list, &report);
            if !report.is_complete() {
                bail!("{} path(s) referenced by {} are missing", report.missing.len(), list.display());
            }
        }
    }

    Ok(())
}

struct GenerateSummary {
    videos: usize,
    videos_sampled: usize,
    videos_unannotated: usize,
    counts: ListCounts,
    elapsed: Duration,
}

#[allow(clippy::too_many_arguments)]
fn generate(
    manifest_path: &Path,
    input_list: &Path,
    output_list: &Path,
    sampling: &SamplingConfig,
    format: &ListFormat,
    frame_count: Option<u64>,
    labels: Option<(&Path, &LabelOptions)>,
    progress_cfg: ProgressConfig,
) -> Result<GenerateSummary> {
    let mut progress = ProgressReporter::new("generate", "videos", 0, progress_cfg);

    progress.set_stage("read manifest");
    let videos = manifest::read_manifest(manifest_path, frame_count)
        .with_context(|| format!("failed to load manifest {}", manifest_path.display()))?;
    let labels = match labels {
        Some((path, options)) => {
            let segments = annotations::read_annotations(path)
                .with_context(|| format!("failed to load annotations {}", path.display()))?;
            Some((segments, options))
        }
        None => None,
    };
    progress.set_total(videos.len() as u64);

    progress.set_stage("sample");
    let windows = sampling::dense_sampling(&videos, sampling);
    let short = videos
        .iter()
        .filter(|v| sampling::window_offsets(v.frame_count, sampling).is_empty())
        .count();
    if short > 0 {
        progress.log(format!(
            "{} video(s) shorter than one window produced no lines",
            short
        ));
    }

    let mut videos_unannotated = 0;
    let windows = match &labels {
        Some((segments, options)) => {
            progress.set_stage("label");
            let labelled =
                annotations::label_windows(windows, segments, sampling.window_length, options);
            if labelled.dropped_videos > 0 {
                progress.log(format!(
                    "{} video(s) without annotations were dropped",
                    labelled.dropped_videos
                ));
            }
            videos_unannotated = labelled.dropped_videos;
            labelled.windows
        }
        None => windows,
    };

    progress.set_stage("write lists");
    let counts = lists::write_lists(&windows, format, input_list, output_list)?;
    progress.inc(videos.len() as u64);

    let outcome = progress.finish("lists written");
    Ok(GenerateSummary {
        videos: videos.len(),
        videos_sampled: counts.videos,
        videos_unannotated,
        counts,
        elapsed: outcome.elapsed,
    })
}

fn print_generate_summary(summary: &GenerateSummary, input_list: &Path, output_list: &Path) {
    println!(
        "Generate summary: videos={} sampled={} skipped={} unannotated={} windows={} input_list={} output_list={} duration={}",
        summary.videos,
        summary.videos_sampled,
        summary
            .videos
            .saturating_sub(summary.videos_sampled + summary.videos_unannotated),
        summary.videos_unannotated,
        summary.counts.lines,
        input_list.display(),
        output_list.display(),
        format_duration(summary.elapsed),
    );
}

fn print_check_report(list: &Path, report: &CheckReport) {
    for path in &report.missing {
        println!("{}", path.display());
    }
    println!(
        "Check summary: list={} lines_checked={} missing={}",
        list.display(),
        report.lines_checked,
        report.missing.len()
    );
}
