//! Additive packet checksum
//!
//! The checksum byte makes the modulo-256 sum of header, payload and
//! checksum equal zero. It is not a CRC and misses some multi-byte
//! corruptions; the firmware uses the same scheme, so it stays as is.

use crate::constants::HEADER_LEN;
use crate::error::PacketError;

/// Byte that brings the sum of `region` to zero
pub fn compute(region: &[u8]) -> u8 {
    region
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_sub(b))
}

/// Offset of the checksum byte, from the header's `len` field
fn checksum_offset(packet: &[u8]) -> Result<usize, PacketError> {
    if packet.len() < HEADER_LEN {
        return Err(PacketError::TooShort { len: packet.len() });
    }
    let offset = HEADER_LEN + packet[3] as usize;
    if packet.len() <= offset {
        return Err(PacketError::LengthMismatch {
            expected: offset + 1,
            actual: packet.len(),
        });
    }
    Ok(offset)
}

/// Write the checksum after header and payload; returns the written byte
pub fn fill(packet: &mut [u8]) -> Result<u8, PacketError> {
    let offset = checksum_offset(packet)?;
    let sum = compute(&packet[..offset]);
    packet[offset] = sum;
    Ok(sum)
}

/// True when header, payload and checksum sum to zero
pub fn verify(packet: &[u8]) -> bool {
    match checksum_offset(packet) {
        Ok(offset) => residue(&packet[..=offset]) == 0,
        Err(_) => false,
    }
}

/// Modulo-256 sum of a region (zero for an intact packet)
pub fn residue(region: &[u8]) -> u8 {
    region.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}
