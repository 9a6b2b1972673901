//! Frame Error Control Field: CRC-16-CCITT over the octets preceding it.
//!
//! Uses the `crc` crate the same way this crate's own Space Packet lineage
//! does (`Crc::<u16>::new(&ALGO)`). `CRC_16_IBM_3740` is CRC-16/CCITT-FALSE:
//! polynomial `0x1021`, initial value `0xFFFF`, no input/output reflection,
//! no final XOR.

use crc::{Crc, CRC_16_IBM_3740};
use tracing::warn;

use crate::error::{Result, TmFrameError};

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Size in octets of a serialized FECF.
pub const FECF_SIZE: usize = 2;

/// Compute the CRC-16-CCITT over `data`.
pub fn checksum(data: &[u8]) -> u16 {
    CRC.checksum(data)
}

/// Compute the FECF for the frame octets preceding the CRC slot and append
/// it as 2 big-endian octets to `out`. `preceding` must be every octet of
/// the frame written so far (i.e. `[start, cursor)`).
pub fn insert(preceding: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&checksum(preceding).to_be_bytes());
}

/// Verify that the trailing 2 octets of `frame` match the CRC-16-CCITT of
/// the octets preceding them. Fails with [TmFrameError::CrcMismatch] on
/// mismatch, or [TmFrameError::SizeMismatch] if `frame` has fewer than 2
/// octets.
pub fn verify(frame: &[u8]) -> Result<()> {
    if frame.len() < FECF_SIZE {
        return Err(TmFrameError::SizeMismatch {
            expected: FECF_SIZE,
            actual: frame.len(),
        });
    }
    let (body, trailer) = frame.split_at(frame.len() - FECF_SIZE);
    let expected = u16::from_be_bytes([trailer[0], trailer[1]]);
    let computed = checksum(body);
    if expected != computed {
        warn!(?expected, ?computed, "frame FECF mismatch");
        return Err(TmFrameError::CrcMismatch { expected, computed });
    }
    Ok(())
}
