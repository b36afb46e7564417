//! Baked reference grid file codec.
//!
//! Each resolution tier has one precomputed file of `(gid, lat, lon)`
//! triples. Layout: a 16-byte header (`GGRD` magic, little-endian u32
//! version, little-endian u64 record count) followed by packed 24-byte
//! records. The layout is a convention of this crate, not a public
//! interchange format.

use std::io::Write;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use geogrid_common::{GridPoint, ResolutionTier};

use crate::error::{GridIndexError, Result};

const MAGIC: [u8; 4] = *b"GGRD";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 16;
const RECORD_LEN: usize = std::mem::size_of::<BakedRecord>();

/// On-disk record. Field order and packing are part of the file format.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct BakedRecord {
    gid: u64,
    lat: f64,
    lon: f64,
}

/// Read all grid points from a baked file.
///
/// Fails with `GridDataUnavailable` when the file cannot be read and
/// `GridDataCorrupt` when the header or body is structurally invalid.
pub fn read_baked(tier: ResolutionTier, path: &Path) -> Result<Vec<GridPoint>> {
    let bytes = std::fs::read(path).map_err(|e| {
        GridIndexError::unavailable(tier, format!("{}: {}", path.display(), e))
    })?;

    if bytes.len() < HEADER_LEN {
        return Err(GridIndexError::corrupt(tier, "file shorter than header"));
    }
    if bytes[0..4] != MAGIC {
        return Err(GridIndexError::corrupt(tier, "bad magic"));
    }

    let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    if version != VERSION {
        return Err(GridIndexError::corrupt(
            tier,
            format!("unsupported version {}", version),
        ));
    }

    let count = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
    let body = &bytes[HEADER_LEN..];
    // The count is an untrusted header field; reject values whose byte
    // length cannot even be represented rather than overflowing.
    let expected_len = count.checked_mul(RECORD_LEN as u64).ok_or_else(|| {
        GridIndexError::corrupt(tier, format!("implausible record count {}", count))
    })?;
    if body.len() as u64 != expected_len {
        return Err(GridIndexError::corrupt(
            tier,
            format!(
                "body length {} does not match {} records of {} bytes",
                body.len(),
                count,
                RECORD_LEN
            ),
        ));
    }

    // The file buffer carries no alignment guarantee, so read each record
    // unaligned instead of casting the slice.
    let points = body
        .chunks_exact(RECORD_LEN)
        .map(|chunk| {
            let rec: BakedRecord = bytemuck::pod_read_unaligned(chunk);
            GridPoint::new(rec.gid, rec.lat, rec.lon)
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        tier = %tier,
        path = %path.display(),
        points = points.len(),
        "loaded baked reference grid"
    );

    Ok(points)
}

/// Write grid points to a baked file.
///
/// Used for baking fixtures and regenerating tier sources; the store
/// write path never calls this.
pub fn write_baked(path: &Path, points: &[GridPoint]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)?;
    file.write_all(&MAGIC)?;
    file.write_all(&VERSION.to_le_bytes())?;
    file.write_all(&(points.len() as u64).to_le_bytes())?;
    for p in points {
        let rec = BakedRecord {
            gid: p.gid,
            lat: p.lat,
            lon: p.lon,
        };
        file.write_all(bytemuck::bytes_of(&rec))?;
    }
    file.flush()
}
