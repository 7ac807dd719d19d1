//! # CCSDS Protocol Constants and Types
//!
//! Core definitions for the CCSDS space packet framing used on the radio link.
//!
//! Telemetry wire layout (big-endian throughout):
//! ```text
//! [primary:6][secondary:6][payload:0..244][crc:2]
//! ```
//!
//! Telecommand wire layout:
//! ```text
//! [primary:6][packet_id:2][payload:0..248]
//! ```

use serde::Serialize;

/// Maximum transport frame size assumed for the radio link
pub const MAX_FRAME_SIZE: usize = 256;

/// Primary header size in bytes
pub const PRIMARY_HEADER_SIZE: usize = 6;

/// Secondary header size in bytes (32-bit time + 16-bit subseconds)
pub const SECONDARY_HEADER_SIZE: usize = 6;

/// Telecommand packet-id field size in bytes
pub const PACKET_ID_SIZE: usize = 2;

/// Trailing CRC-16 size in bytes
pub const CHECKSUM_SIZE: usize = 2;

/// Offset of the payload in a telemetry packet
pub const TELEMETRY_HEADER_SIZE: usize = PRIMARY_HEADER_SIZE + SECONDARY_HEADER_SIZE;

/// Offset of the payload in a telecommand packet
pub const TELECOMMAND_HEADER_SIZE: usize = PRIMARY_HEADER_SIZE + PACKET_ID_SIZE;

/// Maximum telemetry payload (256 - 12 header bytes)
pub const MAX_TELEMETRY_PAYLOAD: usize = MAX_FRAME_SIZE - TELEMETRY_HEADER_SIZE;

/// Maximum telecommand payload (256 - 8 header bytes)
pub const MAX_TELECOMMAND_PAYLOAD: usize = MAX_FRAME_SIZE - TELECOMMAND_HEADER_SIZE;

/// Largest telemetry packet the codec produces (header + full payload + CRC)
///
/// A full 244-byte payload with its checksum runs two bytes past
/// [`MAX_FRAME_SIZE`]; receive buffers are sized for this value.
pub const MAX_TELEMETRY_PACKET_SIZE: usize = TELEMETRY_HEADER_SIZE + MAX_TELEMETRY_PAYLOAD + CHECKSUM_SIZE;

/// Largest telemetry payload whose checksummed packet fits in [`MAX_FRAME_SIZE`]
pub const MAX_FRAMED_TELEMETRY_PAYLOAD: usize = MAX_FRAME_SIZE - TELEMETRY_HEADER_SIZE - CHECKSUM_SIZE;

/// Packet version number (3 bits, always 0)
pub const PACKET_VERSION: u8 = 0;

/// APID mask (11 bits: 0-2047)
pub const APID_MASK: u16 = 0x07FF;

/// Sequence count mask (14 bits: 0-16383)
pub const SEQUENCE_COUNT_MASK: u16 = 0x3FFF;

/// Sequence flags for a single unsegmented packet (binary 11)
pub const SEQUENCE_FLAGS_UNSEGMENTED: u8 = 0b11;

/// Packet type bit of the primary header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketType {
    /// Downlink sensor/status data (type bit 0)
    Telemetry,
    /// Uplink control instruction (type bit 1)
    Telecommand,
}

impl PacketType {
    /// Value of the 1-bit type field
    pub fn bit(self) -> u16 {
        match self {
            PacketType::Telemetry => 0,
            PacketType::Telecommand => 1,
        }
    }

    /// Interpret a 1-bit type field
    pub fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            PacketType::Telemetry
        } else {
            PacketType::Telecommand
        }
    }
}

/// Decoded 6-byte CCSDS primary header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrimaryHeader {
    /// Packet version number (3 bits)
    pub version: u8,

    /// Telemetry or telecommand
    pub packet_type: PacketType,

    /// Secondary header flag (1 bit)
    pub secondary_header: bool,

    /// Application process identifier (11 bits)
    pub apid: u16,

    /// Sequence flags (2 bits)
    pub sequence_flags: u8,

    /// Packet sequence count (14 bits)
    pub sequence_count: u16,

    /// Byte count of the payload following the header region, checksum excluded
    pub data_length: u16,
}

/// Decoded 6-byte secondary header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecondaryHeader {
    /// Seconds since the mission epoch
    pub epoch_time: u32,

    /// Fraction of a second in 1/65536 units
    pub subseconds: u16,
}

/// Parsed telemetry packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryPacket {
    pub apid: u16,
    pub sequence_count: u16,
    pub epoch_time: u32,
    pub subseconds: u16,

    /// `None` when the header advertises a zero-length payload
    pub payload: Option<Vec<u8>>,

    /// Payload length as read from the primary header
    pub data_length: u16,
}

impl TelemetryPacket {
    /// Payload bytes, empty when absent
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }
}

/// Parsed telecommand packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelecommandPacket {
    pub apid: u16,
    pub sequence_count: u16,
    pub packet_id: u16,

    /// `None` when the header advertises a zero-length payload
    pub payload: Option<Vec<u8>>,

    /// Payload length as read from the primary header
    pub data_length: u16,
}

impl TelecommandPacket {
    /// Payload bytes, empty when absent
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_sizes() {
        assert_eq!(TELEMETRY_HEADER_SIZE, 12);
        assert_eq!(TELECOMMAND_HEADER_SIZE, 8);
        assert_eq!(MAX_TELEMETRY_PAYLOAD, 244);
        assert_eq!(MAX_TELECOMMAND_PAYLOAD, 248);
        assert_eq!(MAX_TELEMETRY_PACKET_SIZE, 258);
        assert_eq!(MAX_FRAMED_TELEMETRY_PAYLOAD, 242);
    }

    #[test]
    fn test_field_masks() {
        assert_eq!(APID_MASK, 2047);
        assert_eq!(SEQUENCE_COUNT_MASK, 16383);
        assert_eq!(SEQUENCE_FLAGS_UNSEGMENTED, 3);
    }

    #[test]
    fn test_packet_type_bit() {
        assert_eq!(PacketType::Telemetry.bit(), 0);
        assert_eq!(PacketType::Telecommand.bit(), 1);
        assert_eq!(PacketType::from_bit(0), PacketType::Telemetry);
        assert_eq!(PacketType::from_bit(1), PacketType::Telecommand);
    }

    #[test]
    fn test_empty_payload_accessor() {
        let packet = TelemetryPacket {
            apid: 1,
            sequence_count: 0,
            epoch_time: 0,
            subseconds: 0,
            payload: None,
            data_length: 0,
        };
        assert!(packet.payload_bytes().is_empty());
    }
}
