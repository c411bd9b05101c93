use crate::error::KitError;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRecord {
    pub path: String,
    pub frame_count: u64,
}

pub fn read_manifest(
    path: &Path,
    frame_count_override: Option<u64>,
) -> Result<Vec<VideoRecord>, KitError> {
    let text = std::fs::read_to_string(path).map_err(|e| KitError::io(path, e))?;
    parse_manifest(&text, frame_count_override)
}

/// Parses `<video_path> <frame_count>` lines. The last whitespace-separated
/// token is the count, so paths may contain spaces. With an override every
/// line is taken whole as the path: there is no count column.
pub fn parse_manifest(
    text: &str,
    frame_count_override: Option<u64>,
) -> Result<Vec<VideoRecord>, KitError> {
    let mut videos = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(frames) = frame_count_override {
            videos.push(VideoRecord {
                path: line.to_string(),
                frame_count: frames,
            });
            continue;
        }

        let (path, count) = line
            .rsplit_once(char::is_whitespace)
            .ok_or_else(|| KitError::ManifestParse {
                line: line_no,
                reason: "expected '<video_path> <frame_count>'".to_string(),
            })?;
        let frame_count = count.parse::<u64>().map_err(|_| KitError::ManifestParse {
            line: line_no,
            reason: format!("frame count '{}' is not a non-negative integer", count),
        })?;
        let record = VideoRecord {
            path: path.trim_end().to_string(),
            frame_count,
        };
        videos.push(record);
    }
    Ok(videos)
}
