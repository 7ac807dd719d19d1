//! # CCSDS Header Builder
//!
//! Packs and unpacks the 6-byte primary header and the 6-byte secondary header.
//!
//! Primary header bit layout (MSB first):
//! ```text
//! | version:3 | type:1 | sec_hdr:1 | apid:11 | seq_flags:2 | seq_count:14 | data_length:16 |
//! ```
//!
//! Out-of-range APID and sequence count values are masked, never rejected.

use bytes::Buf;

use super::protocol::*;
use crate::error::{CcsdsError, Result};

/// Build a telemetry primary header
///
/// # Arguments
///
/// * `apid` - Application process identifier (masked to 11 bits)
/// * `sequence_count` - Packet index (masked to 14 bits)
/// * `data_length` - Payload byte count, checksum excluded
///
/// # Examples
///
/// ```
/// use ccsds_link::ccsds::header::build_primary_header;
///
/// let header = build_primary_header(0xFFFF, 0xFFFF, 10);
/// assert_eq!(header, [0x0F, 0xFF, 0xFF, 0xFF, 0x00, 0x0A]);
/// ```
pub fn build_primary_header(apid: u16, sequence_count: u16, data_length: u16) -> [u8; PRIMARY_HEADER_SIZE] {
    build_primary_header_for(PacketType::Telemetry, apid, sequence_count, data_length)
}

/// Build a primary header with an explicit packet type
pub fn build_primary_header_for(
    packet_type: PacketType,
    apid: u16,
    sequence_count: u16,
    data_length: u16,
) -> [u8; PRIMARY_HEADER_SIZE] {
    // type:1 | sec_hdr:1 | apid:11
    let identification = (packet_type.bit() << 12) | (1 << 11) | (apid & APID_MASK);

    // seq_flags:2 | seq_count:14
    let sequence_control =
        ((SEQUENCE_FLAGS_UNSEGMENTED as u16) << 14) | (sequence_count & SEQUENCE_COUNT_MASK);

    let identification = identification.to_be_bytes();
    let sequence_control = sequence_control.to_be_bytes();
    let length = data_length.to_be_bytes();

    [
        (PACKET_VERSION << 5) | (identification[0] & 0x1F),
        identification[1],
        sequence_control[0],
        sequence_control[1],
        length[0],
        length[1],
    ]
}

/// Build a secondary header: 32-bit time followed by 16-bit subseconds
pub fn build_secondary_header(epoch_time: u32, subseconds: u16) -> [u8; SECONDARY_HEADER_SIZE] {
    let time = epoch_time.to_be_bytes();
    let sub = subseconds.to_be_bytes();

    [time[0], time[1], time[2], time[3], sub[0], sub[1]]
}

impl PrimaryHeader {
    /// Decode the first 6 bytes of `bytes`
    ///
    /// # Errors
    ///
    /// Returns [`CcsdsError::Truncated`] if fewer than 6 bytes are available
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PRIMARY_HEADER_SIZE {
            return Err(CcsdsError::Truncated {
                needed: PRIMARY_HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..PRIMARY_HEADER_SIZE];
        let identification = buf.get_u16();
        let sequence_control = buf.get_u16();
        let data_length = buf.get_u16();

        Ok(Self {
            version: (identification >> 13) as u8 & 0x07,
            packet_type: PacketType::from_bit((identification >> 12) as u8),
            secondary_header: (identification >> 11) & 1 == 1,
            apid: identification & APID_MASK,
            sequence_flags: (sequence_control >> 14) as u8,
            sequence_count: sequence_control & SEQUENCE_COUNT_MASK,
            data_length,
        })
    }

    /// Re-encode this header
    pub fn encode(&self) -> [u8; PRIMARY_HEADER_SIZE] {
        build_primary_header_for(self.packet_type, self.apid, self.sequence_count, self.data_length)
    }
}

impl SecondaryHeader {
    /// Decode 6 bytes starting at the beginning of `bytes`
    ///
    /// # Errors
    ///
    /// Returns [`CcsdsError::Truncated`] if fewer than 6 bytes are available
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SECONDARY_HEADER_SIZE {
            return Err(CcsdsError::Truncated {
                needed: SECONDARY_HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = &bytes[..SECONDARY_HEADER_SIZE];
        Ok(Self {
            epoch_time: buf.get_u32(),
            subseconds: buf.get_u16(),
        })
    }

    pub fn encode(&self) -> [u8; SECONDARY_HEADER_SIZE] {
        build_secondary_header(self.epoch_time, self.subseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_header_masks_out_of_range_fields() {
        // apid 0xFFFF -> 0x7FF, seq 0xFFFF -> 0x3FFF
        // byte 0: version 000 | type 0 | sec_hdr 1 | apid[10:8] 111 = 0x0F
        // byte 1: apid[7:0] = 0xFF
        // bytes 2-3: flags 11 | seq 0x3FFF = 0xFFFF
        // bytes 4-5: length 10
        let header = build_primary_header(0xFFFF, 0xFFFF, 10);
        assert_eq!(header, [0x0F, 0xFF, 0xFF, 0xFF, 0x00, 0x0A]);
    }

    #[test]
    fn test_primary_header_field_placement() {
        let header = build_primary_header(0x123, 0x0042, 0x0102);
        assert_eq!(header[0], 0x08 | 0x01);
        assert_eq!(header[1], 0x23);
        assert_eq!(header[2], 0xC0);
        assert_eq!(header[3], 0x42);
        assert_eq!(header[4], 0x01);
        assert_eq!(header[5], 0x02);
    }

    #[test]
    fn test_primary_header_zero_fields() {
        let header = build_primary_header(0, 0, 0);
        assert_eq!(header, [0x08, 0x00, 0xC0, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_telecommand_type_bit() {
        let header = build_primary_header_for(PacketType::Telecommand, 0x7FF, 0, 0);
        assert_eq!(header[0], 0x1F);
        assert_eq!(header[1], 0xFF);
    }

    #[test]
    fn test_secondary_header_big_endian() {
        let header = build_secondary_header(0x01020304, 0xA0B0);
        assert_eq!(header, [0x01, 0x02, 0x03, 0x04, 0xA0, 0xB0]);
    }

    #[test]
    fn test_decode_primary_header() {
        let header = PrimaryHeader::decode(&build_primary_header(2047, 16383, 244)).unwrap();
        assert_eq!(header.version, 0);
        assert_eq!(header.packet_type, PacketType::Telemetry);
        assert!(header.secondary_header);
        assert_eq!(header.apid, 2047);
        assert_eq!(header.sequence_flags, 0b11);
        assert_eq!(header.sequence_count, 16383);
        assert_eq!(header.data_length, 244);
    }

    #[test]
    fn test_decode_primary_header_reencodes() {
        let bytes = build_primary_header_for(PacketType::Telecommand, 17, 99, 3);
        let header = PrimaryHeader::decode(&bytes).unwrap();
        assert_eq!(header.packet_type, PacketType::Telecommand);
        assert_eq!(header.encode(), bytes);
    }

    #[test]
    fn test_decode_primary_header_too_short() {
        let result = PrimaryHeader::decode(&[0x08, 0x00, 0xC0]);
        assert!(matches!(
            result,
            Err(CcsdsError::Truncated { needed: 6, actual: 3 })
        ));
    }

    #[test]
    fn test_decode_secondary_header() {
        let header = SecondaryHeader::decode(&[0xDE, 0xAD, 0xBE, 0xEF, 0x80, 0x00]).unwrap();
        assert_eq!(header.epoch_time, 0xDEADBEEF);
        assert_eq!(header.subseconds, 0x8000);
        assert_eq!(header.encode(), [0xDE, 0xAD, 0xBE, 0xEF, 0x80, 0x00]);
    }

    #[test]
    fn test_decode_secondary_header_too_short() {
        assert!(SecondaryHeader::decode(&[0u8; 5]).is_err());
    }
}
