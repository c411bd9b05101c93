use crate::error::KitError;
use std::path::{Path, PathBuf};

/// Which side of the extraction a list describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckTarget {
    /// Input list: `<video_dir> <start_frame>[ <label>]`. The video path may
    /// contain spaces; the numeric columns are taken from the right.
    Inputs {
        /// Every line carries a trailing label column.
        labelled: bool,
        /// Also require every frame image of each window.
        check_frames: bool,
        window_length: u64,
        frame_digits: usize,
        frame_ext: String,
    },
    /// Output list: `<stem>`, the blob being `<stem>.<feature>`.
    Outputs { feature: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    pub target: CheckTarget,
    /// Keep going after the first missing video directory or blob. A missing
    /// frame image never stops the run.
    pub no_stop: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub lines_checked: usize,
    pub missing: Vec<PathBuf>,
}

impl CheckReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub fn check_list(list: &Path, options: &CheckOptions) -> Result<CheckReport, KitError> {
    let text = std::fs::read_to_string(list).map_err(|e| KitError::io(list, e))?;
    let mut report = CheckReport::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        report.lines_checked += 1;

        let stop = match &options.target {
            CheckTarget::Outputs { feature } => {
                let blob = PathBuf::from(format!("{}.{}", line, feature));
                let absent = !blob.is_file();
                if absent {
                    report.missing.push(blob);
                }
                absent
            }
            CheckTarget::Inputs {
                labelled,
                check_frames,
                window_length,
                frame_digits,
                frame_ext,
            } => {
                let (video, start) = split_input_line(line, *labelled).ok_or_else(|| {
                    KitError::config(format!(
                        "{} line {}: expected '<video> <start_frame>{}'",
                        list.display(),
                        idx + 1,
                        if *labelled { " <label>" } else { "" }
                    ))
                })?;
                let video_dir = PathBuf::from(video);
                if !video_dir.is_dir() {
                    report.missing.push(video_dir);
                    true
                } else {
                    if *check_frames {
                        if let Some(image) = first_missing_frame(
                            &video_dir,
                            start,
                            *window_length,
                            *frame_digits,
                            frame_ext,
                        ) {
                            report.missing.push(image);
                        }
                    }
                    false
                }
            }
        };

        if stop && !options.no_stop {
            break;
        }
    }
    Ok(report)
}

/// Only the first absent frame of a window is reported.
fn first_missing_frame(
    video_dir: &Path,
    start: u64,
    window_length: u64,
    frame_digits: usize,
    frame_ext: &str,
) -> Option<PathBuf> {
    (start..start.saturating_add(window_length))
        .map(|frame| {
            video_dir.join(format!("{:0width$}.{}", frame, frame_ext, width = frame_digits))
        })
        .find(|image| !image.is_file())
}

fn split_input_line(line: &str, labelled: bool) -> Option<(&str, u64)> {
    let mut rest = line;
    if labelled {
        let (head, label) = rest.rsplit_once(char::is_whitespace)?;
        label.parse::<i64>().ok()?;
        rest = head.trim_end();
    }
    let (video, start) = rest.rsplit_once(char::is_whitespace)?;
    let video = video.trim_end();
    if video.is_empty() {
        return None;
    }
    Some((video, start.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_input_lines_with_optional_label() {
        assert_eq!(split_input_line("vid/a 32", false), Some(("vid/a", 32)));
        assert_eq!(split_input_line("vid/a 32 200", true), Some(("vid/a", 32)));
        assert_eq!(split_input_line("vid/a", false), None);
        assert_eq!(split_input_line("vid/a x", false), None);
        assert_eq!(split_input_line("vid/a 32", true), None);
    }

    #[test]
    fn input_paths_may_contain_spaces() {
        assert_eq!(
            split_input_line("my videos/clip one 0", false),
            Some(("my videos/clip one", 0))
        );
        assert_eq!(
            split_input_line("my videos/clip one  16\t200", true),
            Some(("my videos/clip one", 16))
        );

        let tmp = tempfile::TempDir::new().unwrap();
        let video = tmp.path().join("my videos").join("clip one");
        std::fs::create_dir_all(&video).unwrap();
        for frame in 0..4 {
            std::fs::write(video.join(format!("{:06}.png", frame)), b"").unwrap();
        }
        let list = tmp.path().join("in.lst");
        std::fs::write(&list, format!("{} 0\n", video.display())).unwrap();

        let options = CheckOptions {
            target: CheckTarget::Inputs {
                labelled: false,
                check_frames: true,
                window_length: 4,
                frame_digits: 6,
                frame_ext: "png".into(),
            },
            no_stop: false,
        };
        let report = check_list(&list, &options).unwrap();
        assert_eq!(report.lines_checked, 1);
        assert!(report.is_complete(), "{:?}", report.missing);
    }

    #[test]
    fn output_check_stops_at_first_missing_unless_told_otherwise() {
        let tmp = tempfile::TempDir::new().unwrap();
        let present = tmp.path().join("v/000000");
        std::fs::create_dir_all(tmp.path().join("v")).unwrap();
        std::fs::write(format!("{}.fc6-1", present.display()), b"x").unwrap();

        let list = tmp.path().join("out.lst");
        let lines = [
            present.display().to_string(),
            tmp.path().join("v/000001").display().to_string(),
            tmp.path().join("v/000002").display().to_string(),
        ];
        std::fs::write(&list, lines.join("\n")).unwrap();

        let mut options = CheckOptions {
            target: CheckTarget::Outputs {
                feature: "fc6-1".into(),
            },
            no_stop: false,
        };
        let report = check_list(&list, &options).unwrap();
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.lines_checked, 2);

        options.no_stop = true;
        let report = check_list(&list, &options).unwrap();
        assert_eq!(report.missing.len(), 2);
        assert_eq!(report.lines_checked, 3);
        assert!(!report.is_complete());
    }

    #[test]
    fn input_check_finds_first_missing_frame() {
        let tmp = tempfile::TempDir::new().unwrap();
        let video = tmp.path().join("clip");
        std::fs::create_dir_all(&video).unwrap();
        for frame in 0..3 {
            std::fs::write(video.join(format!("{:06}.png", frame)), b"").unwrap();
        }
        let list = tmp.path().join("in.lst");
        std::fs::write(&list, format!("{} 0\n", video.display())).unwrap();

        let options = CheckOptions {
            target: CheckTarget::Inputs {
                labelled: false,
                check_frames: true,
                window_length: 4,
                frame_digits: 6,
                frame_ext: "png".into(),
            },
            no_stop: true,
        };
        let report = check_list(&list, &options).unwrap();
        assert_eq!(report.missing, vec![video.join("000003.png")]);
    }

    #[test]
    fn missing_frames_do_not_stop_but_missing_videos_do() {
        let tmp = tempfile::TempDir::new().unwrap();
        let video = tmp.path().join("clip");
        std::fs::create_dir_all(&video).unwrap();
        std::fs::write(video.join("000000.png"), b"").unwrap();
        let gone = tmp.path().join("gone");

        let list = tmp.path().join("in.lst");
        std::fs::write(
            &list,
            format!(
                "{v} 0\n{v} 8\n{g} 0\n{v} 16\n",
                v = video.display(),
                g = gone.display()
            ),
        )
        .unwrap();

        let options = CheckOptions {
            target: CheckTarget::Inputs {
                labelled: false,
                check_frames: true,
                window_length: 2,
                frame_digits: 6,
                frame_ext: "png".into(),
            },
            no_stop: false,
        };
        let report = check_list(&list, &options).unwrap();
        assert_eq!(report.lines_checked, 3);
        assert_eq!(
            report.missing,
            vec![video.join("000001.png"), video.join("000008.png"), gone]
        );
    }
}
