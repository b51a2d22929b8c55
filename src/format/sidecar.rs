//! Binary sidecar files referenced from the JSON document.
//!
//! - Bitmaps (`*.bin`): raw bytes, one write per outer-axis row. A bitmap of
//!   width `w` and height `h` is `w` rows of `h` bytes; the size lives in the
//!   JSON document, not in the file.
//! - Scribble lists (`*_scribb_*.ser`): `SCRB`, version byte, `u32` count,
//!   then `(i32 x, i32 y, u8 kind)` records, little endian.
//! - Polygon vertices (`*_map_obj_*.ser`): `POLY`, version byte, `u32` count,
//!   then `(i32 x, i32 y)` records, little endian.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::format::error::GroundTruthError;
use crate::model::{Bitmap, ScribbleKind, ScribblePoint};

const SCRIBBLE_MAGIC: &[u8; 4] = b"SCRB";
const POLYGON_MAGIC: &[u8; 4] = b"POLY";
const SIDECAR_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 4;
const SCRIBBLE_RECORD_LEN: usize = 4 + 4 + 1;
const VERTEX_RECORD_LEN: usize = 4 + 4;

/// Write a bitmap as raw rows.
pub fn write_bitmap(path: &Path, map: &Bitmap) -> Result<(), GroundTruthError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in map.rows() {
        match row.as_slice() {
            Some(bytes) => writer.write_all(bytes)?,
            None => writer.write_all(&row.to_vec())?,
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read a raw bitmap of known size.
pub fn read_bitmap(path: &Path, width: u32, height: u32) -> Result<Bitmap, GroundTruthError> {
    let bytes = std::fs::read(path)?;
    let expected = width as usize * height as usize;
    if bytes.len() != expected {
        return Err(GroundTruthError::DimensionMismatch {
            path: path.to_path_buf(),
            expected,
            found: bytes.len(),
        });
    }
    Array2::from_shape_vec((width as usize, height as usize), bytes)
        .map_err(|e| GroundTruthError::invalid_sidecar(path, e.to_string()))
}

fn encode_header(magic: &[u8; 4], count: usize, out: &mut Vec<u8>) -> Result<(), String> {
    let count = u32::try_from(count).map_err(|_| format!("{} records do not fit", count))?;
    out.extend_from_slice(magic);
    out.push(SIDECAR_VERSION);
    out.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

/// Validate the header and return the record section.
fn decode_header<'a>(
    magic: &[u8; 4],
    record_len: usize,
    bytes: &'a [u8],
) -> Result<&'a [u8], String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("truncated header ({} bytes)", bytes.len()));
    }
    let (header, records) = bytes.split_at(HEADER_LEN);
    if &header[..4] != magic {
        return Err("bad magic".to_string());
    }
    if header[4] != SIDECAR_VERSION {
        return Err(format!("unsupported version {}", header[4]));
    }
    let count = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
    if records.len() != count * record_len {
        return Err(format!(
            "expected {} records ({} bytes), found {} bytes",
            count,
            count * record_len,
            records.len()
        ));
    }
    Ok(records)
}

fn read_i32(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Encode a scribble list.
pub fn encode_scribbles(points: &[ScribblePoint]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(HEADER_LEN + points.len() * SCRIBBLE_RECORD_LEN);
    encode_header(SCRIBBLE_MAGIC, points.len(), &mut out)?;
    for p in points {
        out.extend_from_slice(&p.x.to_le_bytes());
        out.extend_from_slice(&p.y.to_le_bytes());
        out.push(p.kind.to_tag());
    }
    Ok(out)
}

/// Decode a scribble list.
pub fn decode_scribbles(bytes: &[u8]) -> Result<Vec<ScribblePoint>, String> {
    let records = decode_header(SCRIBBLE_MAGIC, SCRIBBLE_RECORD_LEN, bytes)?;
    records
        .chunks_exact(SCRIBBLE_RECORD_LEN)
        .map(|record| {
            let kind = ScribbleKind::from_tag(record[8])
                .ok_or_else(|| format!("unknown scribble kind {}", record[8]))?;
            Ok(ScribblePoint::new(
                read_i32(&record[0..4]),
                read_i32(&record[4..8]),
                kind,
            ))
        })
        .collect()
}

/// Encode a polygon vertex list.
pub fn encode_vertices(vertices: &[(i32, i32)]) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(HEADER_LEN + vertices.len() * VERTEX_RECORD_LEN);
    encode_header(POLYGON_MAGIC, vertices.len(), &mut out)?;
    for &(x, y) in vertices {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
    }
    Ok(out)
}

/// Decode a polygon vertex list.
pub fn decode_vertices(bytes: &[u8]) -> Result<Vec<(i32, i32)>, String> {
    let records = decode_header(POLYGON_MAGIC, VERTEX_RECORD_LEN, bytes)?;
    Ok(records
        .chunks_exact(VERTEX_RECORD_LEN)
        .map(|record| (read_i32(&record[0..4]), read_i32(&record[4..8])))
        .collect())
}

/// Write a scribble sidecar file.
pub fn write_scribbles(path: &Path, points: &[ScribblePoint]) -> Result<(), GroundTruthError> {
    let bytes = encode_scribbles(points).map_err(|e| GroundTruthError::invalid_sidecar(path, e))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Read a scribble sidecar file.
pub fn read_scribbles(path: &Path) -> Result<Vec<ScribblePoint>, GroundTruthError> {
    let bytes = std::fs::read(path)?;
    decode_scribbles(&bytes).map_err(|e| GroundTruthError::invalid_sidecar(path, e))
}

/// Write a polygon sidecar file.
pub fn write_vertices(path: &Path, vertices: &[(i32, i32)]) -> Result<(), GroundTruthError> {
    let bytes = encode_vertices(vertices).map_err(|e| GroundTruthError::invalid_sidecar(path, e))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Read a polygon sidecar file.
pub fn read_vertices(path: &Path) -> Result<Vec<(i32, i32)>, GroundTruthError> {
    let bytes = std::fs::read(path)?;
    decode_vertices(&bytes).map_err(|e| GroundTruthError::invalid_sidecar(path, e))
}
