//! # Telemetry Receiver
//!
//! Turns raw frames from the link into [`TelemetryRecord`]s.

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::TelemetryRecord;
use crate::ccsds::crc::verify_checksum;
use crate::ccsds::decoder::parse_telemetry;
use crate::ccsds::protocol::SEQUENCE_COUNT_MASK;
use crate::ccsds::time::from_mission_time;
use crate::ccsds::values::{extract, FormatDescriptor};
use crate::error::CcsdsError;

/// Result of handling one received frame
#[derive(Debug)]
pub enum ReceiveOutcome {
    /// Checksum verified, packet parsed and values extracted
    Accepted(TelemetryRecord),

    /// Trailing CRC did not match; the frame was dropped
    ChecksumMismatch,

    /// Checksum matched but the packet could not be decoded
    Malformed(CcsdsError),
}

/// Running counters for a receiver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub accepted: u64,
    pub checksum_failures: u64,
    pub malformed: u64,

    /// Packets presumed lost, inferred from jumps in each APID's sequence count
    pub sequence_gaps: u64,
}

/// Verifies, parses and decodes telemetry frames for one payload layout
#[derive(Debug)]
pub struct TelemetryReceiver {
    format: FormatDescriptor,
    stats: ReceiverStats,
    last_sequence: HashMap<u16, u16>,
}

impl TelemetryReceiver {
    pub fn new(format: FormatDescriptor) -> Self {
        Self {
            format,
            stats: ReceiverStats::default(),
            last_sequence: HashMap::new(),
        }
    }

    /// Handle one received frame
    ///
    /// # Arguments
    ///
    /// * `frame` - Complete telemetry packet including the trailing CRC
    ///
    /// # Returns
    ///
    /// * `ReceiveOutcome` - Decoded record, or why the frame was dropped
    pub fn handle_frame(&mut self, frame: &[u8]) -> ReceiveOutcome {
        if !verify_checksum(frame) {
            self.stats.checksum_failures += 1;
            warn!("Dropped frame with checksum mismatch ({} bytes)", frame.len());
            return ReceiveOutcome::ChecksumMismatch;
        }

        let packet = match parse_telemetry(frame) {
            Ok(packet) => packet,
            Err(e) => return self.malformed(e),
        };

        let values = match extract(packet.payload_bytes(), &self.format) {
            Ok(values) => values,
            Err(e) => return self.malformed(e),
        };

        self.track_sequence(packet.apid, packet.sequence_count);
        self.stats.accepted += 1;

        debug!(
            apid = packet.apid,
            sequence_count = packet.sequence_count,
            values = values.len(),
            "Accepted telemetry packet"
        );

        ReceiveOutcome::Accepted(TelemetryRecord {
            received_at: Utc::now(),
            apid: packet.apid,
            sequence_count: packet.sequence_count,
            mission_time: from_mission_time(packet.epoch_time, packet.subseconds),
            data_length: packet.data_length,
            values,
        })
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    fn malformed(&mut self, error: CcsdsError) -> ReceiveOutcome {
        self.stats.malformed += 1;
        warn!("Dropped malformed packet: {}", error);
        ReceiveOutcome::Malformed(error)
    }

    /// Sequence counts run independently per APID
    fn track_sequence(&mut self, apid: u16, sequence_count: u16) {
        if let Some(last) = self.last_sequence.insert(apid, sequence_count) {
            let expected = (last + 1) & SEQUENCE_COUNT_MASK;
            let missed = sequence_count.wrapping_sub(expected) & SEQUENCE_COUNT_MASK;
            if missed != 0 {
                debug!(apid, expected, received = sequence_count, missed, "Sequence gap");
                self.stats.sequence_gaps += missed as u64;
            }
        }
    }
}
