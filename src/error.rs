use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KitError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("manifest line {line}: {reason}")]
    ManifestParse { line: usize, reason: String },

    #[error("annotation line {line}: {reason}")]
    AnnotationParse { line: usize, reason: String },

    #[error("corrupt blob {}: {reason}", path.display())]
    CorruptBinary { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KitError {
    pub fn config(msg: impl Into<String>) -> Self {
        KitError::InvalidConfiguration(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        KitError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Non-fatal conditions met while packing. They are logged when they happen
/// and carried into the run summary; they never change the exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackWarning {
    MissingWindow {
        video_id: String,
        feature: String,
        /// Inclusive `(first, last)` runs of absent indices.
        missing: Vec<(u64, u64)>,
    },
    EmptyGroup {
        video_id: String,
    },
    CorruptBinary {
        path: PathBuf,
        reason: String,
    },
    ShapeMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },
    DuplicateWindow {
        path: PathBuf,
        window_index: u64,
    },
}

impl fmt::Display for PackWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackWarning::MissingWindow {
                video_id,
                feature,
                missing,
            } => {
                let absent = missing
                    .iter()
                    .fold(0u64, |acc, (a, b)| acc.saturating_add(b - a).saturating_add(1));
                let shown = missing
                    .iter()
                    .take(8)
                    .map(|(a, b)| if a == b { a.to_string() } else { format!("{}-{}", a, b) })
                    .collect::<Vec<_>>()
                    .join(",");
                let more = if missing.len() > 8 { ",..." } else { "" };
                write!(
                    f,
                    "missing windows in {}/{}: {} absent [{}{}]",
                    video_id, feature, absent, shown, more
                )
            }
            PackWarning::EmptyGroup { video_id } => {
                write!(f, "no blobs found for video {}; skipped", video_id)
            }
            PackWarning::CorruptBinary { path, reason } => {
                write!(f, "corrupt blob {} skipped: {}", path.display(), reason)
            }
            PackWarning::ShapeMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "blob {} has {} values, group expects {}; skipped",
                path.display(),
                found,
                expected
            ),
            PackWarning::DuplicateWindow { path, window_index } => write!(
                f,
                "blob {} repeats window {}; skipped",
                path.display(),
                window_index
            ),
        }
    }
}
