//! # CCSDS Packet Decoder
//!
//! Decomposes received buffers into header fields and payload.
//!
//! The parsers never check the CRC. Call
//! [`verify_checksum`](super::crc::verify_checksum) first and decide what to do
//! with a mismatch. The packet type bit is not inspected either, so either parser
//! can be applied to any buffer; the caller knows which kind it expects.

use serde::Serialize;
use tracing::trace;

use super::protocol::*;
use super::values::{extract, FormatDescriptor, ValueType};
use crate::error::{CcsdsError, Result};

/// Latitude, longitude and altitude as carried in a position telemetry payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Latitude in degrees
    pub latitude: f32,

    /// Longitude in degrees
    pub longitude: f32,

    /// Altitude in meters
    pub altitude: f32,
}

/// Parse a telemetry packet
///
/// Reads the payload length from the primary header and copies that many bytes
/// starting at offset 12. Trailing bytes (the checksum, if any) are ignored.
///
/// # Arguments
///
/// * `packet` - Received packet bytes
///
/// # Returns
///
/// * `Result<TelemetryPacket>` - Decoded header fields and payload
///
/// # Errors
///
/// Returns [`CcsdsError::Truncated`] if the buffer is shorter than 12 bytes or
/// shorter than the header plus the advertised data length
pub fn parse_telemetry(packet: &[u8]) -> Result<TelemetryPacket> {
    require_len(packet, TELEMETRY_HEADER_SIZE)?;

    let primary = PrimaryHeader::decode(packet)?;
    let secondary = SecondaryHeader::decode(&packet[PRIMARY_HEADER_SIZE..])?;
    let payload = read_payload(packet, TELEMETRY_HEADER_SIZE, primary.data_length)?;

    trace!(apid = primary.apid, data_length = primary.data_length, "parsed telemetry packet");

    Ok(TelemetryPacket {
        apid: primary.apid,
        sequence_count: primary.sequence_count,
        epoch_time: secondary.epoch_time,
        subseconds: secondary.subseconds,
        payload,
        data_length: primary.data_length,
    })
}

/// Parse a telecommand packet
///
/// Same as [`parse_telemetry`] but reads a 16-bit packet id at offset 6 and the
/// payload from offset 8.
///
/// # Errors
///
/// Returns [`CcsdsError::Truncated`] if the buffer is shorter than 8 bytes or
/// shorter than the header plus the advertised data length
pub fn parse_telecommand(packet: &[u8]) -> Result<TelecommandPacket> {
    require_len(packet, TELECOMMAND_HEADER_SIZE)?;

    let primary = PrimaryHeader::decode(packet)?;
    let packet_id = u16::from_be_bytes([packet[PRIMARY_HEADER_SIZE], packet[PRIMARY_HEADER_SIZE + 1]]);
    let payload = read_payload(packet, TELECOMMAND_HEADER_SIZE, primary.data_length)?;

    trace!(apid = primary.apid, packet_id, "parsed telecommand packet");

    Ok(TelecommandPacket {
        apid: primary.apid,
        sequence_count: primary.sequence_count,
        packet_id,
        payload,
        data_length: primary.data_length,
    })
}

/// Decode a `float,float,float` position payload
///
/// # Errors
///
/// Returns [`CcsdsError::PayloadUnderrun`] if the payload holds fewer than 12 bytes
pub fn decode_position(payload: &[u8]) -> Result<Position> {
    let format = FormatDescriptor::new(vec![ValueType::Float32; 3]);
    require_payload(payload, format.byte_len())?;

    let values = extract(payload, &format)?;
    let field = |i: usize| values.get(i).and_then(|v| v.as_f32()).unwrap_or_default();

    Ok(Position {
        latitude: field(0),
        longitude: field(1),
        altitude: field(2),
    })
}

fn require_len(packet: &[u8], needed: usize) -> Result<()> {
    if packet.len() < needed {
        return Err(CcsdsError::Truncated {
            needed,
            actual: packet.len(),
        });
    }
    Ok(())
}

fn require_payload(payload: &[u8], needed: usize) -> Result<()> {
    if payload.len() < needed {
        return Err(CcsdsError::PayloadUnderrun {
            needed,
            available: payload.len(),
        });
    }
    Ok(())
}

/// Copy `data_length` bytes from `offset`; a zero length yields `None`
fn read_payload(packet: &[u8], offset: usize, data_length: u16) -> Result<Option<Vec<u8>>> {
    if data_length == 0 {
        return Ok(None);
    }

    let end = offset + data_length as usize;
    require_len(packet, end)?;

    Ok(Some(packet[offset..end].to_vec()))
}
