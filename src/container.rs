use anyhow::{Context, Result};
use ndarray::ArrayD;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

pub const CONTAINER_EXT: &str = "npz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Stored,
    Deflated,
}

/// Writes one `.npz` archive holding one array per feature name. The file is
/// truncated first and every entry carries the same fixed timestamp, so the
/// same input always yields the same bytes. Returns the container size.
pub fn write_container(
    path: &Path,
    entries: &BTreeMap<String, ArrayD<f32>>,
    compression: Compression,
) -> Result<u64> {
    let file = File::create(path)
        .with_context(|| format!("failed to create container {}", path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let options = match compression {
        Compression::Stored => FileOptions::default().compression_method(CompressionMethod::Stored),
        Compression::Deflated => FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9)),
    }
    .last_modified_time(DateTime::default())
    .unix_permissions(0o644)
    .large_file(true);

    for (name, array) in entries {
        zip.start_file(format!("{}.npy", name), options)
            .with_context(|| format!("failed to add entry {} to {}", name, path.display()))?;
        array
            .write_npy(&mut zip)
            .with_context(|| format!("failed to write entry {} to {}", name, path.display()))?;
    }

    let mut writer = zip
        .finish()
        .with_context(|| format!("failed to finalize container {}", path.display()))?;
    writer.flush()?;
    drop(writer);

    let size = std::fs::metadata(path)
        .with_context(|| format!("failed to stat container {}", path.display()))?
        .len();
    Ok(size)
}

/// Reads every entry of a container back, keyed by feature name.
pub fn read_container(path: &Path) -> Result<BTreeMap<String, ArrayD<f32>>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open container {}", path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("{} is not a zip archive", path.display()))?;

    let mut out = BTreeMap::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let key = name.strip_suffix(".npy").unwrap_or(&name).to_string();
        let array = ArrayD::<f32>::read_npy(entry)
            .with_context(|| format!("failed to read entry {} of {}", name, path.display()))?;
        out.insert(key, array);
    }
    Ok(out)
}
