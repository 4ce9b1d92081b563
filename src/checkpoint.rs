//! Binary checkpoint records
//!
//! Layout of one record:
//!
//! ```text
//! magic (8 bytes) | version u32 LE | flags u8 | payload length u64 LE | payload
//! ```
//!
//! The payload is the `bincode` (standard config, serde mode) encoding of
//! the value. With flag bit 0 set the payload is LZ4 block-compressed,
//! which requires the `compression` feature on both sides.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// Magic of an integrator state record
pub const INTEGRATOR_MAGIC: &[u8; 8] = b"ARTTSINT";
/// Magic of a manager record
pub const MANAGER_MAGIC: &[u8; 8] = b"ARTTSMGR";
/// Record format version
pub const FORMAT_VERSION: u32 = 1;

const FLAG_LZ4: u8 = 0b1;

/// Write one record.
///
/// # Errors
///
/// Returns an encode or IO error.
pub fn write_record<W: Write, T: Serialize>(w: &mut W, magic: &[u8; 8], value: &T) -> Result<()> {
    let encoded = bincode::serde::encode_to_vec(value, bincode::config::standard())?;
    let (flags, payload) = compress(encoded);
    let length = u64::try_from(payload.len()).map_err(|e| Error::Checkpoint(e.to_string()))?;

    w.write_all(magic)?;
    w.write_all(&FORMAT_VERSION.to_le_bytes())?;
    w.write_all(&[flags])?;
    w.write_all(&length.to_le_bytes())?;
    w.write_all(&payload)?;
    Ok(())
}

/// Read one record written by [`write_record`] with the same `magic`.
///
/// # Errors
///
/// Returns [`Error::Checkpoint`] for a wrong magic, version or flag, and a
/// decode or IO error otherwise.
pub fn read_record<R: Read, T: DeserializeOwned>(r: &mut R, magic: &[u8; 8]) -> Result<T> {
    let mut found = [0u8; 8];
    r.read_exact(&mut found)?;
    if &found != magic {
        return Err(Error::Checkpoint(format!(
            "invalid magic bytes: expected {:?}, found {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&found)
        )));
    }

    let mut version = [0u8; 4];
    r.read_exact(&mut version)?;
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(Error::Checkpoint(format!("unsupported version {version}")));
    }

    let mut flags = [0u8; 1];
    r.read_exact(&mut flags)?;

    let mut length = [0u8; 8];
    r.read_exact(&mut length)?;
    let length = u64::from_le_bytes(length);

    // the length is untrusted; grow the buffer only as bytes arrive
    let mut payload = Vec::new();
    let read = Read::take(&mut *r, length).read_to_end(&mut payload)?;
    if u64::try_from(read).map_or(true, |read| read != length) {
        return Err(Error::Checkpoint(format!(
            "truncated record: header claims {length} bytes, found {read}"
        )));
    }
    let payload = decompress(flags[0], payload)?;

    let (value, _) = bincode::serde::decode_from_slice(&payload, bincode::config::standard())?;
    Ok(value)
}

#[cfg(feature = "compression")]
fn compress(encoded: Vec<u8>) -> (u8, Vec<u8>) {
    (FLAG_LZ4, lz4_flex::compress_prepend_size(&encoded))
}

#[cfg(not(feature = "compression"))]
fn compress(encoded: Vec<u8>) -> (u8, Vec<u8>) {
    (0, encoded)
}

fn decompress(flags: u8, payload: Vec<u8>) -> Result<Vec<u8>> {
    if flags & !FLAG_LZ4 != 0 {
        return Err(Error::Checkpoint(format!("unknown flags {flags:#04x}")));
    }
    if flags & FLAG_LZ4 == 0 {
        return Ok(payload);
    }
    decompress_lz4(&payload)
}

/// Largest output an LZ4 block can expand to per input byte.
#[cfg(feature = "compression")]
const LZ4_MAX_RATIO: usize = 255;

#[cfg(feature = "compression")]
fn decompress_lz4(payload: &[u8]) -> Result<Vec<u8>> {
    let Some((size, block)) = payload.split_first_chunk::<4>() else {
        return Err(Error::Checkpoint("LZ4 payload has no size prefix".to_string()));
    };
    let size = usize::try_from(u32::from_le_bytes(*size))
        .map_err(|e| Error::Checkpoint(e.to_string()))?;
    if size > block.len().saturating_mul(LZ4_MAX_RATIO) {
        return Err(Error::Checkpoint(format!(
            "LZ4 size prefix {size} exceeds what {} compressed bytes can hold",
            block.len()
        )));
    }
    lz4_flex::decompress(block, size)
        .map_err(|e| Error::Checkpoint(format!("LZ4 decompression failed: {e}")))
}

#[cfg(not(feature = "compression"))]
fn decompress_lz4(_payload: &[u8]) -> Result<Vec<u8>> {
    Err(Error::Checkpoint(
        "record is LZ4-compressed; rebuild with the `compression` feature".to_string(),
    ))
}
