//! # CRC-16/CCITT Implementation
//!
//! Reflected (LSB-first) CRC-16/CCITT checksum for telemetry packets.
//!
//! **Polynomial**: 0x8408 (0x1021 bit-reversed)
//! **Initial Value**: 0xFFFF
//! **Final XOR**: none
//!
//! The checksum always covers every byte of the packet except the trailing two,
//! both when writing and when verifying.

use super::protocol::CHECKSUM_SIZE;
use crate::error::{CcsdsError, Result};

/// Reflected CRC-16/CCITT polynomial
const CRC16_POLY: u16 = 0x8408;

/// Accumulator seed
const CRC16_INIT: u16 = 0xFFFF;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u16;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate CRC-16/CCITT checksum using lookup table
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for
///
/// # Returns
///
/// * `u16` - Calculated checksum
///
/// # Examples
///
/// ```
/// use ccsds_link::ccsds::crc::crc16_ccitt;
///
/// assert_eq!(crc16_ccitt(b"123456789"), 0x6F91);
/// ```
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc = (crc >> 8) ^ CRC16_TABLE[((crc ^ byte as u16) & 0xFF) as usize];
    }

    crc
}

/// Bit-by-bit CRC-16/CCITT, used to cross-check the lookup table
#[allow(dead_code)]
fn crc16_ccitt_slow(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;

    for &byte in data {
        crc ^= byte as u16;

        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Write the checksum of `packet[..len - 2]` big-endian into the last two bytes
///
/// Whatever the last two bytes held before is overwritten.
///
/// # Errors
///
/// Returns [`CcsdsError::Truncated`] if the packet is shorter than the checksum itself
pub fn append_checksum(packet: &mut [u8]) -> Result<()> {
    let len = packet.len();
    if len < CHECKSUM_SIZE {
        return Err(CcsdsError::Truncated {
            needed: CHECKSUM_SIZE,
            actual: len,
        });
    }

    let crc = crc16_ccitt(&packet[..len - CHECKSUM_SIZE]);
    packet[len - CHECKSUM_SIZE..].copy_from_slice(&crc.to_be_bytes());

    Ok(())
}

/// Recompute the checksum and compare it against the trailing two bytes
///
/// A mismatch is a normal outcome on a lossy link, not a fault. Packets too
/// short to carry a checksum never verify.
pub fn verify_checksum(packet: &[u8]) -> bool {
    let len = packet.len();
    if len < CHECKSUM_SIZE {
        return false;
    }

    let crc = crc16_ccitt(&packet[..len - CHECKSUM_SIZE]);
    packet[len - CHECKSUM_SIZE..] == crc.to_be_bytes()
}
