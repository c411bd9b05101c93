use std::path::{Component, Path};

/// Identity of one blob as encoded in its path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BinaryName {
    pub video_id: String,
    pub window_index: u64,
    pub feature_name: String,
}

/// How the extractor names its per-window outputs. Paths are relative to the
/// packer's root directory.
pub trait NamingConvention {
    fn parse(&self, relative: &Path) -> Option<BinaryName>;
}

/// `<video_id>/<window digits>.<feature_name>`, e.g. `v_abc/000032.fc6-1`,
/// which is what C3D writes for an output-list line `<video_id>/000032`.
#[derive(Debug, Clone, Copy, Default)]
pub struct C3dNaming;

impl NamingConvention for C3dNaming {
    fn parse(&self, relative: &Path) -> Option<BinaryName> {
        let mut parts = relative.components().map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        });
        let video_id = parts.next()??;
        let file_name = parts.next()??;
        if parts.next().is_some() {
            return None;
        }

        let (stem, feature) = file_name.split_once('.')?;
        if stem.is_empty() || feature.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let window_index = stem.parse().ok()?;

        Some(BinaryName {
            video_id: video_id.to_string(),
            window_index,
            feature_name: feature.to_string(),
        })
    }
}
