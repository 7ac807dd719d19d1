//! # Downlink
//!
//! Stamps, sequences and transmits packets over a [`FramePort`].

use tracing::{debug, warn};

use super::port_trait::FramePort;
use crate::ccsds::encoder::{assemble_telecommand, assemble_telemetry, SequenceCounter};
use crate::ccsds::protocol::MAX_FRAME_SIZE;
use crate::ccsds::time;
use crate::error::Result;

/// Packet transmitter for a single APID
///
/// Every send consumes a sequence count, including sends that fail at the
/// transport, so the receiving side sees the loss as a sequence gap.
pub struct Downlink<P> {
    port: P,
    apid: u16,
    sequence: SequenceCounter,
    packets_sent: u64,
}

impl<P: FramePort> Downlink<P> {
    pub fn new(port: P, apid: u16) -> Self {
        Self {
            port,
            apid,
            sequence: SequenceCounter::new(),
            packets_sent: 0,
        }
    }

    /// Send a telemetry packet stamped with the current mission time
    ///
    /// # Returns
    ///
    /// * `Result<u16>` - Sequence count used for the packet
    pub async fn send_telemetry(&mut self, values: &str) -> Result<u16> {
        let (epoch_time, subseconds) = time::now();
        self.send_telemetry_at(epoch_time, subseconds, values).await
    }

    /// Send a telemetry packet with an explicit timestamp
    pub async fn send_telemetry_at(&mut self, epoch_time: u32, subseconds: u16, values: &str) -> Result<u16> {
        let sequence_count = self.sequence.next_count();
        let packet = assemble_telemetry(self.apid, sequence_count, epoch_time, subseconds, values)?;
        if packet.len() > MAX_FRAME_SIZE {
            warn!(
                "Telemetry packet of {} bytes exceeds the {}-byte transport frame",
                packet.len(),
                MAX_FRAME_SIZE
            );
        }

        self.port.write_frame(&packet).await?;
        self.packets_sent += 1;

        debug!(
            apid = self.apid,
            sequence_count,
            len = packet.len(),
            "Sent telemetry packet"
        );
        Ok(sequence_count)
    }

    /// Send a telecommand packet (no checksum on this framing)
    pub async fn send_telecommand(&mut self, packet_id: u16, values: &str) -> Result<u16> {
        let sequence_count = self.sequence.next_count();
        let packet = assemble_telecommand(self.apid, sequence_count, packet_id, values)?;

        self.port.write_frame(&packet).await?;
        self.packets_sent += 1;

        debug!(apid = self.apid, sequence_count, packet_id, "Sent telecommand packet");
        Ok(sequence_count)
    }

    /// Packets successfully handed to the transport
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn apid(&self) -> u16 {
        self.apid
    }

    pub fn into_inner(self) -> P {
        self.port
    }
}
