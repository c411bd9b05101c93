use crate::error::KitError;
use crate::sampling::SamplingWindow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DEFAULT_PAD_WIDTH: usize = 6;

/// Line layout shared by the input and output lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFormat {
    pub pad_width: usize,
    /// Constant third column of the input list, when the extractor wants one.
    pub label: Option<i64>,
}

impl Default for ListFormat {
    fn default() -> Self {
        Self {
            pad_width: DEFAULT_PAD_WIDTH,
            label: None,
        }
    }
}

/// A per-window label takes precedence over the constant one.
pub fn input_line(window: &SamplingWindow, format: &ListFormat) -> String {
    match window.label.or(format.label) {
        Some(label) => format!("{} {} {}", window.video_path, window.start_frame, label),
        None => format!("{} {}", window.video_path, window.start_frame),
    }
}

pub fn output_line(window: &SamplingWindow, format: &ListFormat) -> String {
    format!(
        "{}/{:0width$}",
        window.video_path.trim_end_matches('/'),
        window.index,
        width = format.pad_width
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListCounts {
    pub lines: usize,
    pub videos: usize,
}

pub fn write_lists(
    windows: &[SamplingWindow],
    format: &ListFormat,
    input_list: &Path,
    output_list: &Path,
) -> Result<ListCounts, KitError> {
    let mut inputs = create_writer(input_list)?;
    let mut outputs = create_writer(output_list)?;

    let mut videos = 0usize;
    for window in windows {
        if window.index == 0 {
            videos += 1;
        }
        writeln!(inputs, "{}", input_line(window, format))
            .map_err(|e| KitError::io(input_list, e))?;
        writeln!(outputs, "{}", output_line(window, format))
            .map_err(|e| KitError::io(output_list, e))?;
    }
    inputs.flush().map_err(|e| KitError::io(input_list, e))?;
    outputs.flush().map_err(|e| KitError::io(output_list, e))?;

    Ok(ListCounts {
        lines: windows.len(),
        videos,
    })
}

fn create_writer(path: &Path) -> Result<BufWriter<File>, KitError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| KitError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| KitError::io(path, e))?;
    Ok(BufWriter::new(file))
}

/// Prepends `prefix` to every line. Not idempotent: applying it twice doubles
/// the prefix.
pub fn prefix_lines(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len() + prefix.len() * 64);
    for line in text.lines() {
        out.push_str(prefix);
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Rewrites a list file in place with `prefix` in front of every line.
/// Returns the number of lines rewritten.
pub fn prefix_list_file(path: &Path, prefix: &str) -> Result<usize, KitError> {
    let text = std::fs::read_to_string(path).map_err(|e| KitError::io(path, e))?;
    if prefix.is_empty() {
        return Ok(text.lines().count());
    }
    let rewritten = prefix_lines(&text, prefix);
    std::fs::write(path, rewritten).map_err(|e| KitError::io(path, e))?;
    Ok(text.lines().count())
}

/// Relocates both lists to the extractor's path layout, each with its own
/// prefix.
pub fn prefix_lists(
    input_list: &Path,
    output_list: &Path,
    prefix_in: &str,
    prefix_out: &str,
) -> Result<(usize, usize), KitError> {
    let n_in = prefix_list_file(input_list, prefix_in)?;
    let n_out = prefix_list_file(output_list, prefix_out)?;
    Ok((n_in, n_out))
}
