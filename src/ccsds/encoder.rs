//! # CCSDS Packet Encoder
//!
//! Assembles telemetry and telecommand packets from header fields and values.
//!
//! Telemetry packets carry a trailing CRC-16; telecommand packets do not.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use super::crc::append_checksum;
use super::header::{build_primary_header, build_primary_header_for, build_secondary_header};
use super::protocol::*;
use super::values::serialize_text;
use crate::error::{CcsdsError, Result};

/// Assemble a telemetry packet with CRC from comma-delimited text values
///
/// # Arguments
///
/// * `apid` - Application process identifier (masked to 11 bits)
/// * `sequence_count` - Packet index (masked to 14 bits)
/// * `epoch_time` - Seconds since the mission epoch
/// * `subseconds` - 1/65536 fraction of a second
/// * `values` - Comma-delimited values, see [`serialize_text`]
///
/// # Returns
///
/// * `Result<Vec<u8>>` - `[primary:6][secondary:6][payload][crc:2]`
///
/// # Errors
///
/// Returns [`CcsdsError::PayloadTooLarge`] if the serialized values exceed 244 bytes
///
/// # Examples
///
/// ```
/// use ccsds_link::ccsds::encoder::assemble_telemetry;
/// use ccsds_link::ccsds::crc::verify_checksum;
///
/// let packet = assemble_telemetry(42, 1, 1_000_000, 0, "56.95,24.11,120.5")?;
/// assert_eq!(packet.len(), 12 + 12 + 2);
/// assert!(verify_checksum(&packet));
/// # Ok::<(), ccsds_link::error::CcsdsError>(())
/// ```
pub fn assemble_telemetry(
    apid: u16,
    sequence_count: u16,
    epoch_time: u32,
    subseconds: u16,
    values: &str,
) -> Result<Vec<u8>> {
    let payload = serialize_text(values);
    assemble_telemetry_from_bytes(apid, sequence_count, epoch_time, subseconds, &payload)
}

/// Assemble a telemetry packet with CRC around an already serialized payload
pub fn assemble_telemetry_from_bytes(
    apid: u16,
    sequence_count: u16,
    epoch_time: u32,
    subseconds: u16,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let mut packet = build_telemetry(apid, sequence_count, epoch_time, subseconds, payload, CHECKSUM_SIZE)?;
    append_checksum(&mut packet)?;

    trace!(apid, sequence_count, len = packet.len(), "assembled telemetry packet");
    Ok(packet)
}

/// Assemble a telemetry packet without a trailing checksum
///
/// Matches the older framing still produced by some flight units:
/// `[primary:6][secondary:6][payload]`.
pub fn assemble_telemetry_unchecked(
    apid: u16,
    sequence_count: u16,
    epoch_time: u32,
    subseconds: u16,
    values: &str,
) -> Result<Vec<u8>> {
    let payload = serialize_text(values);
    build_telemetry(apid, sequence_count, epoch_time, subseconds, &payload, 0)
}

/// Assemble a telecommand packet from comma-delimited text values
///
/// Layout: `[primary:6][packet_id:2][payload]`, no checksum.
///
/// # Errors
///
/// Returns [`CcsdsError::PayloadTooLarge`] if the serialized values exceed 248 bytes
pub fn assemble_telecommand(apid: u16, sequence_count: u16, packet_id: u16, values: &str) -> Result<Vec<u8>> {
    let payload = serialize_text(values);
    assemble_telecommand_from_bytes(apid, sequence_count, packet_id, &payload)
}

/// Assemble a telecommand packet around an already serialized payload
pub fn assemble_telecommand_from_bytes(
    apid: u16,
    sequence_count: u16,
    packet_id: u16,
    payload: &[u8],
) -> Result<Vec<u8>> {
    check_payload_size(payload.len(), MAX_TELECOMMAND_PAYLOAD)?;

    let primary = build_primary_header_for(
        PacketType::Telecommand,
        apid,
        sequence_count,
        payload.len() as u16,
    );

    let mut packet = BytesMut::with_capacity(TELECOMMAND_HEADER_SIZE + payload.len());
    packet.put_slice(&primary);
    packet.put_u16(packet_id);
    packet.put_slice(payload);

    trace!(apid, sequence_count, packet_id, len = packet.len(), "assembled telecommand packet");
    Ok(packet.to_vec())
}

/// Headers + payload + `trailer` zeroed bytes reserved for a checksum
fn build_telemetry(
    apid: u16,
    sequence_count: u16,
    epoch_time: u32,
    subseconds: u16,
    payload: &[u8],
    trailer: usize,
) -> Result<Vec<u8>> {
    check_payload_size(payload.len(), MAX_TELEMETRY_PAYLOAD)?;

    let primary = build_primary_header(apid, sequence_count, payload.len() as u16);
    let secondary = build_secondary_header(epoch_time, subseconds);

    let mut packet = BytesMut::with_capacity(TELEMETRY_HEADER_SIZE + payload.len() + trailer);
    packet.put_slice(&primary);
    packet.put_slice(&secondary);
    packet.put_slice(payload);
    packet.put_bytes(0, trailer);

    Ok(packet.to_vec())
}

fn check_payload_size(size: usize, max: usize) -> Result<()> {
    if size > max {
        return Err(CcsdsError::PayloadTooLarge { size, max });
    }
    Ok(())
}

/// Wrapping 14-bit packet sequence counter for a single APID
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    next: u16,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary count (masked to 14 bits)
    pub fn starting_at(count: u16) -> Self {
        Self {
            next: count & SEQUENCE_COUNT_MASK,
        }
    }

    /// Return the current count and advance, wrapping 16383 -> 0
    pub fn next_count(&mut self) -> u16 {
        let current = self.next;
        self.next = (self.next + 1) & SEQUENCE_COUNT_MASK;
        current
    }

    /// Count the next call to [`next_count`](Self::next_count) will return
    pub fn peek(&self) -> u16 {
        self.next
    }
}
