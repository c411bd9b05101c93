use crate::blob::{self, Blob};
use crate::container::{self, Compression, CONTAINER_EXT};
use crate::error::{KitError, PackWarning};
use crate::naming::{BinaryName, NamingConvention};
use crate::progress::ProgressReporter;

use anyhow::{Context, Result};
use ndarray::{ArrayD, IxDyn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Feature names to pack; empty packs everything discovered.
    pub features: Vec<String>,
    /// Keep the blob's 5-d shape behind the window axis instead of flattening.
    pub keep_shape: bool,
    pub compression: Compression,
}

impl PackOptions {
    pub fn wants(&self, feature: &str) -> bool {
        self.features.is_empty() || self.features.iter().any(|f| f == feature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFile {
    pub name: BinaryName,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Every video directory under the root, blobs or not, sorted.
    pub videos: Vec<String>,
    pub files: Vec<BinaryFile>,
    /// Files the naming convention did not recognise.
    pub ignored: usize,
}

/// video_id -> feature_name -> blobs in window order.
pub type FeatureGroups = BTreeMap<String, BTreeMap<String, Vec<BinaryFile>>>;

#[derive(Debug, Clone, Serialize)]
pub struct VideoReport {
    pub video_id: String,
    pub container: Option<PathBuf>,
    /// Windows written per feature.
    pub windows: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackSummary {
    pub root_dir: PathBuf,
    pub output_dir: PathBuf,
    pub videos_seen: usize,
    pub containers_written: usize,
    pub windows_packed: usize,
    pub ignored_files: usize,
    pub bytes_read: u64,
    pub container_bytes: u64,
    pub elapsed_ms: u64,
    pub videos: Vec<VideoReport>,
    pub warnings: Vec<PackWarning>,
}

/// Scans `root` one directory level deep. A top-level directory whose
/// canonical path equals `skip` (the packer's own output directory when it
/// lives under the root) is not treated as a video.
pub fn discover(
    root: &Path,
    naming: &dyn NamingConvention,
    skip: Option<&Path>,
) -> Result<Discovery> {
    let mut discovery = Discovery::default();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .follow_links(true)
        .sort_by_file_name();
    let mut skipped_dir: Option<PathBuf> = None;

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
        let path = entry.path();
        if entry.depth() == 1 && entry.file_type().is_dir() && skip.is_some() {
            let canonical = path.canonicalize().ok();
            if canonical.as_deref() == skip {
                skipped_dir = Some(path.to_path_buf());
                continue;
            }
        }
        if skipped_dir.as_deref().is_some_and(|dir| path.starts_with(dir)) {
            continue;
        }
        if entry.depth() == 1 {
            if entry.file_type().is_dir() {
                discovery
                    .videos
                    .push(entry.file_name().to_string_lossy().to_string());
            } else {
                discovery.ignored += 1;
            }
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = path.strip_prefix(root)?;
        match naming.parse(rel) {
            Some(name) => discovery.files.push(BinaryFile {
                name,
                path: path.to_path_buf(),
            }),
            None => discovery.ignored += 1,
        }
    }
    Ok(discovery)
}

/// Groups blobs by video then feature, each group sorted by window index
/// (ties broken by path so the result does not depend on scan order).
pub fn group_binaries(files: impl IntoIterator<Item = BinaryFile>) -> FeatureGroups {
    let mut groups: FeatureGroups = BTreeMap::new();
    for file in files {
        groups
            .entry(file.name.video_id.clone())
            .or_default()
            .entry(file.name.feature_name.clone())
            .or_default()
            .push(file);
    }
    for features in groups.values_mut() {
        for group in features.values_mut() {
            group.sort_by(|a, b| {
                a.name
                    .window_index
                    .cmp(&b.name.window_index)
                    .then_with(|| a.path.cmp(&b.path))
            });
        }
    }
    groups
}

/// Runs of indices absent from `0..=max(indices)`, as inclusive
/// `(first, last)` pairs. Input must be sorted ascending.
pub fn find_gaps(indices: &[u64]) -> Vec<(u64, u64)> {
    let mut runs = Vec::new();
    let mut expected = Some(0u64);
    for &idx in indices {
        // `None` once u64::MAX has been seen: nothing can follow it.
        let Some(next) = expected else {
            break;
        };
        if idx < next {
            continue;
        }
        if idx > next {
            runs.push((next, idx - 1));
        }
        expected = idx.checked_add(1);
    }
    runs
}

#[derive(Debug)]
pub struct StackedFeature {
    pub array: ArrayD<f32>,
    pub windows: usize,
    pub bytes_read: u64,
}

/// Decodes one (video, feature) group and stacks it along a new leading
/// window axis. Corrupt, mismatched or repeated blobs are dropped with a
/// warning; `None` when nothing usable is left.
pub fn stack_group(
    video_id: &str,
    feature: &str,
    files: &[BinaryFile],
    keep_shape: bool,
    warnings: &mut Vec<PackWarning>,
) -> Result<Option<StackedFeature>> {
    let mut first: Option<Blob> = None;
    let mut data: Vec<f32> = Vec::new();
    let mut kept_indices: Vec<u64> = Vec::with_capacity(files.len());
    let mut bytes_read = 0u64;

    for file in files {
        if kept_indices.last() == Some(&file.name.window_index) {
            warnings.push(PackWarning::DuplicateWindow {
                path: file.path.clone(),
                window_index: file.name.window_index,
            });
            continue;
        }

        let blob = match blob::read_blob(&file.path) {
            Ok(blob) => blob,
            Err(KitError::CorruptBinary { path, reason }) => {
                warnings.push(PackWarning::CorruptBinary { path, reason });
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        bytes_read += (blob::HEADER_LEN + blob.len() * 4) as u64;

        if let Some(reference) = &first {
            if reference.len() != blob.len() {
                warnings.push(PackWarning::ShapeMismatch {
                    path: file.path.clone(),
                    expected: reference.len(),
                    found: blob.len(),
                });
                continue;
            }
        }

        if first.is_none() {
            data.reserve(blob.len() * files.len());
        }
        data.extend_from_slice(&blob.data);
        kept_indices.push(file.name.window_index);
        if first.is_none() {
            first = Some(blob);
        }
    }

    let Some(reference) = first else {
        return Ok(None);
    };

    let missing = find_gaps(&kept_indices);
    if !missing.is_empty() {
        warnings.push(PackWarning::MissingWindow {
            video_id: video_id.to_string(),
            feature: feature.to_string(),
            missing,
        });
    }

    let windows = kept_indices.len();
    let mut shape = vec![windows];
    if keep_shape {
        shape.extend_from_slice(&reference.shape);
    } else {
        shape.push(reference.len());
    }
    let array = ArrayD::from_shape_vec(IxDyn(&shape), data)
        .with_context(|| format!("failed to stack {}/{}", video_id, feature))?;

    Ok(Some(StackedFeature {
        array,
        windows,
        bytes_read,
    }))
}

#[derive(Debug)]
pub struct VideoPack {
    pub report: VideoReport,
    pub bytes_read: u64,
    pub container_bytes: u64,
    pub warnings: Vec<PackWarning>,
}

/// Packs every feature group of one video into `<output_dir>/<video_id>.npz`.
/// No container is written when no group yields a window.
pub fn pack_video(
    video_id: &str,
    features: &BTreeMap<String, Vec<BinaryFile>>,
    output_dir: &Path,
    options: &PackOptions,
) -> Result<VideoPack> {
    let mut warnings = Vec::new();
    let mut entries = BTreeMap::new();
    let mut windows = BTreeMap::new();
    let mut bytes_read = 0u64;

    for (feature, files) in features {
        if let Some(stacked) =
            stack_group(video_id, feature, files, options.keep_shape, &mut warnings)?
        {
            bytes_read += stacked.bytes_read;
            windows.insert(feature.clone(), stacked.windows);
            entries.insert(feature.clone(), stacked.array);
        }
    }

    let mut report = VideoReport {
        video_id: video_id.to_string(),
        container: None,
        windows,
    };
    if entries.is_empty() {
        warnings.push(PackWarning::EmptyGroup {
            video_id: video_id.to_string(),
        });
        return Ok(VideoPack {
            report,
            bytes_read,
            container_bytes: 0,
            warnings,
        });
    }

    let path = container_path(output_dir, video_id);
    let container_bytes = container::write_container(&path, &entries, options.compression)?;
    report.container = Some(path);

    Ok(VideoPack {
        report,
        bytes_read,
        container_bytes,
        warnings,
    })
}

pub fn container_path(output_dir: &Path, video_id: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", video_id, CONTAINER_EXT))
}

pub fn pack_directory(
    root: &Path,
    output_dir: &Path,
    options: &PackOptions,
    naming: &dyn NamingConvention,
    progress: &mut ProgressReporter,
) -> Result<PackSummary> {
    if !root.is_dir() {
        return Err(KitError::config(format!(
            "root directory {} does not exist or is not a directory",
            root.display()
        ))
        .into());
    }
    let started = Instant::now();
    std::fs::create_dir_all(output_dir)
        .map_err(|e| KitError::io(output_dir, e))?;

    progress.set_stage("scan");
    let skip = output_dir.canonicalize().ok();
    let discovery = discover(root, naming, skip.as_deref())?;
    if discovery.ignored > 0 {
        progress.log(format!(
            "ignored {} file(s) not matching the blob naming convention",
            discovery.ignored
        ));
    }
    let selected: Vec<BinaryFile> = discovery
        .files
        .into_iter()
        .filter(|f| options.wants(&f.name.feature_name))
        .collect();
    let occupied: BTreeSet<String> = selected
        .iter()
        .filter_map(|f| top_level_dir(root, &f.path))
        .collect();
    let groups = group_binaries(selected);

    // Grouped video ids come from the naming convention and need not match
    // directory names; directories that held no selected blob are still
    // visited so they surface as EmptyGroup.
    let video_ids: BTreeSet<String> = groups
        .keys()
        .cloned()
        .chain(
            discovery
                .videos
                .into_iter()
                .filter(|dir| !occupied.contains(dir)),
        )
        .collect();

    progress.set_total(video_ids.len() as u64);
    progress.set_stage("pack");

    let empty = BTreeMap::new();
    let mut summary = PackSummary {
        root_dir: root.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        videos_seen: video_ids.len(),
        containers_written: 0,
        windows_packed: 0,
        ignored_files: discovery.ignored,
        bytes_read: 0,
        container_bytes: 0,
        elapsed_ms: 0,
        videos: Vec::with_capacity(video_ids.len()),
        warnings: Vec::new(),
    };

    for video_id in &video_ids {
        let features = groups.get(video_id).unwrap_or(&empty);
        let packed = pack_video(video_id, features, output_dir, options)
            .with_context(|| format!("failed to pack video {}", video_id))?;

        for warning in packed.warnings {
            progress.warn(warning.to_string());
            summary.warnings.push(warning);
        }
        if packed.report.container.is_some() {
            summary.containers_written += 1;
        }
        summary.windows_packed += packed.report.windows.values().sum::<usize>();
        summary.bytes_read += packed.bytes_read;
        summary.container_bytes += packed.container_bytes;
        summary.videos.push(packed.report);
        progress.inc(1);
    }

    summary.elapsed_ms = started.elapsed().as_millis() as u64;
    Ok(summary)
}

fn top_level_dir(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let first = rel.components().next()?;
    Some(first.as_os_str().to_string_lossy().to_string())
}

pub fn write_report(path: &Path, summary: &PackSummary) -> Result<()> {
    let json = serde_json::to_vec_pretty(summary)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report {}", path.display()))
}
