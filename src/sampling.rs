use crate::error::KitError;
use crate::manifest::VideoRecord;
use clap::ValueEnum;

/// What to do with frames left over after the last full window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "lower")]
pub enum TrailingPolicy {
    /// Only windows that fit completely inside the video.
    #[default]
    Strict,
    /// Add one trailing window covering the leftover frames.
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    pub stride: u64,
    pub window_length: u64,
    pub first_frame: u64,
    pub trailing: TrailingPolicy,
}

impl SamplingConfig {
    /// Validates raw command-line values. Signed inputs so that negative
    /// values surface as configuration errors rather than parse errors.
    pub fn new(
        stride: i64,
        window_length: i64,
        first_frame: i64,
        trailing: TrailingPolicy,
    ) -> Result<Self, KitError> {
        if stride <= 0 {
            return Err(KitError::config(format!(
                "stride must be positive, got {}",
                stride
            )));
        }
        if window_length <= 0 {
            return Err(KitError::config(format!(
                "window length must be positive, got {}",
                window_length
            )));
        }
        if first_frame < 0 {
            return Err(KitError::config(format!(
                "first frame must be non-negative, got {}",
                first_frame
            )));
        }
        Ok(Self {
            stride: stride as u64,
            window_length: window_length as u64,
            first_frame: first_frame as u64,
            trailing,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingWindow {
    pub video_path: String,
    pub start_frame: u64,
    /// Zero-based position of the window within its own video.
    pub index: usize,
    /// Per-window class label, set from annotations.
    pub label: Option<i64>,
}

/// Offsets (relative to the first frame) of every window of a video.
pub fn window_offsets(frame_count: u64, cfg: &SamplingConfig) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(strict_window_count(frame_count, cfg));
    let mut offset = 0u64;
    while offset + cfg.window_length <= frame_count {
        offsets.push(offset);
        offset += cfg.stride;
    }

    if cfg.trailing == TrailingPolicy::Partial {
        let covered = offsets
            .last()
            .map(|last| last + cfg.window_length)
            .unwrap_or(0);
        if covered < frame_count && offset < frame_count {
            offsets.push(offset);
        }
    }
    offsets
}

/// `max(0, floor((F - W) / S) + 1)`
pub fn strict_window_count(frame_count: u64, cfg: &SamplingConfig) -> usize {
    if frame_count < cfg.window_length {
        return 0;
    }
    ((frame_count - cfg.window_length) / cfg.stride + 1) as usize
}

/// Dense sampling over the whole manifest: videos in manifest order, windows
/// in increasing start order, indices local to each video.
pub fn dense_sampling(videos: &[VideoRecord], cfg: &SamplingConfig) -> Vec<SamplingWindow> {
    let mut windows = Vec::new();
    for video in videos {
        for (index, offset) in window_offsets(video.frame_count, cfg)
            .into_iter()
            .enumerate()
        {
            windows.push(SamplingWindow {
                video_path: video.path.clone(),
                start_frame: cfg.first_frame + offset,
                index,
                label: None,
            });
        }
    }
    windows
}
