use crate::error::KitError;
use std::path::Path;

// Blob layout (little endian):
//   num      i32
//   channels i32
//   length   i32
//   height   i32
//   width    i32
//   data     f32 * (num * channels * length * height * width)
pub const SHAPE_DIMS: usize = 5;
pub const HEADER_LEN: usize = SHAPE_DIMS * 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub shape: [usize; SHAPE_DIMS],
    pub data: Vec<f32>,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decodes a blob, rejecting it when the header disagrees with the payload.
/// The error string is the reason only; callers attach the path.
pub fn decode_blob(bytes: &[u8]) -> Result<Blob, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        ));
    }

    let mut shape = [0usize; SHAPE_DIMS];
    for (i, dim) in shape.iter_mut().enumerate() {
        let raw = i32::from_le_bytes([
            bytes[i * 4],
            bytes[i * 4 + 1],
            bytes[i * 4 + 2],
            bytes[i * 4 + 3],
        ]);
        if raw < 0 {
            return Err(format!("negative dimension {} at position {}", raw, i));
        }
        *dim = raw as usize;
    }

    let count = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| format!("shape {:?} overflows", shape))?;
    let expected = count
        .checked_mul(4)
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or_else(|| format!("shape {:?} overflows", shape))?;
    if expected != bytes.len() {
        return Err(format!(
            "header shape {:?} needs {} bytes, file has {}",
            shape,
            expected,
            bytes.len()
        ));
    }

    let data = bytes[HEADER_LEN..]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(Blob { shape, data })
}

pub fn read_blob(path: &Path) -> Result<Blob, KitError> {
    let bytes = std::fs::read(path).map_err(|e| KitError::io(path, e))?;
    decode_blob(&bytes).map_err(|reason| KitError::CorruptBinary {
        path: path.to_path_buf(),
        reason,
    })
}

/// Serializes a blob in the extractor's layout. Used to produce fixtures.
pub fn encode_blob(shape: [usize; SHAPE_DIMS], data: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + data.len() * 4);
    for dim in shape {
        out.extend_from_slice(&(dim as i32).to_le_bytes());
    }
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}
