use crate::error::KitError;
use crate::sampling::SamplingWindow;
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_BACKGROUND_LABEL: i64 = 201;

/// One annotated instance: frames `start..=end` of a video carry `label`.
/// Frame numbers use the same numbering as the emitted start frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
    pub label: i64,
}

/// video path -> segments in file order.
pub type Annotations = BTreeMap<String, Vec<Segment>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelOptions {
    /// Label for windows that overlap no segment by at least half a window.
    pub background: i64,
    /// Keep videos with no annotation (all background) instead of dropping them.
    pub keep_unannotated: bool,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND_LABEL,
            keep_unannotated: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelledWindows {
    pub windows: Vec<SamplingWindow>,
    /// Videos dropped for having no annotation.
    pub dropped_videos: usize,
}

pub fn read_annotations(path: &Path) -> Result<Annotations, KitError> {
    let text = std::fs::read_to_string(path).map_err(|e| KitError::io(path, e))?;
    parse_annotations(&text)
}

/// Parses `<video_path> <f_init> <f_end> <label>` lines. The three numeric
/// columns are taken from the right, so paths may contain spaces.
pub fn parse_annotations(text: &str) -> Result<Annotations, KitError> {
    let mut annotations = Annotations::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parse_err = |reason: String| KitError::AnnotationParse {
            line: line_no,
            reason,
        };

        let columns = split_last(line)
            .and_then(|(rest, label)| split_last(rest).map(|(rest, end)| (rest, end, label)))
            .and_then(|(rest, end, label)| {
                split_last(rest).map(|(video, start)| (video, start, end, label))
            });
        let Some((video, start, end, label)) = columns else {
            return Err(parse_err(
                "expected '<video_path> <f_init> <f_end> <label>'".to_string(),
            ));
        };

        let start: u64 = start
            .parse()
            .map_err(|_| parse_err(format!("f_init '{}' is not a non-negative integer", start)))?;
        let end: u64 = end
            .parse()
            .map_err(|_| parse_err(format!("f_end '{}' is not a non-negative integer", end)))?;
        let label: i64 = label
            .parse()
            .map_err(|_| parse_err(format!("label '{}' is not an integer", label)))?;
        if end < start {
            return Err(parse_err(format!("f_end {} precedes f_init {}", end, start)));
        }

        annotations
            .entry(video.to_string())
            .or_default()
            .push(Segment { start, end, label });
    }
    Ok(annotations)
}

fn split_last(text: &str) -> Option<(&str, &str)> {
    let (head, last) = text.rsplit_once(char::is_whitespace)?;
    let head = head.trim_end();
    if head.is_empty() {
        return None;
    }
    Some((head, last))
}

/// Frames shared by two inclusive ranges.
pub fn intersection_length(a: (u64, u64), b: (u64, u64)) -> u64 {
    let lo = a.0.max(b.0);
    let hi = a.1.min(b.1);
    if hi < lo {
        0
    } else {
        hi - lo + 1
    }
}

/// Label of the segment overlapping `start..start + window_length` the most
/// (the earliest one on ties), or `background` when that overlap is shorter
/// than half a window.
pub fn window_label(start: u64, window_length: u64, segments: &[Segment], background: i64) -> i64 {
    let window = (start, start.saturating_add(window_length.saturating_sub(1)));
    let mut best: Option<(u64, i64)> = None;
    for segment in segments {
        let overlap = intersection_length((segment.start, segment.end), window);
        if best.map_or(true, |(most, _)| overlap > most) {
            best = Some((overlap, segment.label));
        }
    }
    match best {
        Some((overlap, label)) if overlap.saturating_mul(2) >= window_length => label,
        _ => background,
    }
}

/// Gives every window its overlap label.
pub fn label_windows(
    windows: Vec<SamplingWindow>,
    annotations: &Annotations,
    window_length: u64,
    options: &LabelOptions,
) -> LabelledWindows {
    let mut out = LabelledWindows {
        windows: Vec::with_capacity(windows.len()),
        dropped_videos: 0,
    };
    for mut window in windows {
        let segments: &[Segment] = match annotations.get(&window.video_path) {
            Some(segments) => segments.as_slice(),
            None if options.keep_unannotated => &[],
            None => {
                if window.index == 0 {
                    out.dropped_videos += 1;
                }
                continue;
            }
        };
        window.label = Some(window_label(
            window.start_frame,
            window_length,
            segments,
            options.background,
        ));
        out.windows.push(window);
    }
    out
}
