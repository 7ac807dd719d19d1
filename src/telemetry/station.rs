//! # Ground Station
//!
//! Pulls frames off a [`FramePort`], runs them through a [`TelemetryReceiver`]
//! and logs every accepted record.

use std::io;
use std::time::Duration;
use tracing::{info, warn};

use super::{ReceiveOutcome, TelemetryLogger, TelemetryReceiver};
use crate::ccsds::protocol::MAX_TELEMETRY_PACKET_SIZE;
use crate::error::{CcsdsError, Result};
use crate::link::port_trait::FramePort;

/// Consecutive transport errors tolerated before giving up
pub const MAX_CONSECUTIVE_READ_ERRORS: u32 = 10;

/// Base delay after a transport error, multiplied by the error streak
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Upper bound for the retry delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);

/// What one call to [`GroundStation::next_event`] produced
#[derive(Debug)]
pub enum StationEvent {
    /// A frame was read and handled
    Frame(ReceiveOutcome),

    /// The transport failed; the station backed off and can be polled again
    ReadError,

    /// The stream reached end of file
    Closed,
}

/// Receive loop state for ground mode
pub struct GroundStation<P> {
    port: P,
    receiver: TelemetryReceiver,
    logger: Option<TelemetryLogger>,
    buf: [u8; MAX_TELEMETRY_PACKET_SIZE],
    read_errors: u32,
    retry_delay: Duration,
}

impl<P: FramePort> GroundStation<P> {
    pub fn new(port: P, receiver: TelemetryReceiver, logger: Option<TelemetryLogger>) -> Self {
        Self {
            port,
            receiver,
            logger,
            buf: [0u8; MAX_TELEMETRY_PACKET_SIZE],
            read_errors: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Override the base delay applied after a transport error
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Read and handle one frame
    ///
    /// Transport errors are logged and followed by a growing delay. A malformed
    /// length field (`InvalidData`) is not a device fault and is retried at once.
    ///
    /// # Errors
    ///
    /// Returns [`CcsdsError::Io`] once [`MAX_CONSECUTIVE_READ_ERRORS`] reads in
    /// a row have failed
    pub async fn next_event(&mut self) -> Result<StationEvent> {
        let len = match self.port.read_frame(&mut self.buf).await {
            Ok(0) => return Ok(StationEvent::Closed),
            Ok(len) => len,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Discarded unframeable data: {}", e);
                return Ok(StationEvent::ReadError);
            }
            Err(e) => return self.read_failed(e).await,
        };

        self.read_errors = 0;
        let outcome = self.receiver.handle_frame(&self.buf[..len]);

        if let ReceiveOutcome::Accepted(record) = &outcome {
            info!(
                apid = record.apid,
                sequence_count = record.sequence_count,
                "Telemetry: {:?}",
                record.values
            );
            if let Some(logger) = self.logger.as_mut() {
                if let Err(e) = logger.log(record) {
                    warn!("Failed to log telemetry record: {}", e);
                }
            }
        }

        Ok(StationEvent::Frame(outcome))
    }

    pub fn receiver(&self) -> &TelemetryReceiver {
        &self.receiver
    }

    /// Transport errors in the current streak
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }

    async fn read_failed(&mut self, error: io::Error) -> Result<StationEvent> {
        self.read_errors += 1;
        warn!(
            "Failed to read frame ({}/{}): {}",
            self.read_errors, MAX_CONSECUTIVE_READ_ERRORS, error
        );

        if self.read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
            return Err(CcsdsError::Io(error));
        }

        let delay = self.retry_delay.saturating_mul(self.read_errors).min(MAX_RETRY_DELAY);
        tokio::time::sleep(delay).await;
        Ok(StationEvent::ReadError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccsds::encoder::assemble_telemetry;
    use crate::ccsds::values::FormatDescriptor;
    use crate::link::port_trait::MockFramePort;
    use mockall::Sequence;

    fn station(port: MockFramePort, logger: Option<TelemetryLogger>) -> GroundStation<MockFramePort> {
        let receiver = TelemetryReceiver::new(FormatDescriptor::parse("float,float,float").unwrap());
        GroundStation::new(port, receiver, logger).with_retry_delay(Duration::ZERO)
    }

    fn device_gone() -> io::Error {
        io::Error::new(io::ErrorKind::Other, "Input/output error")
    }

    fn expect_frame(port: &mut MockFramePort, seq: &mut Sequence, frame: Vec<u8>) {
        port.expect_read_frame()
            .times(1)
            .in_sequence(seq)
            .returning(move |buf: &mut [u8]| {
                buf[..frame.len()].copy_from_slice(&frame);
                Ok(frame.len())
            });
    }

    #[tokio::test]
    async fn test_persistent_read_error_gives_up() {
        let mut port = MockFramePort::new();
        port.expect_read_frame()
            .times(MAX_CONSECUTIVE_READ_ERRORS as usize)
            .returning(|_| Err(device_gone()));

        let mut station = station(port, None);
        for attempt in 1..MAX_CONSECUTIVE_READ_ERRORS {
            assert!(matches!(station.next_event().await, Ok(StationEvent::ReadError)));
            assert_eq!(station.read_errors(), attempt);
        }

        assert!(matches!(station.next_event().await, Err(CcsdsError::Io(_))));
    }

    #[tokio::test]
    async fn test_read_error_streak_resets_on_frame() {
        let mut port = MockFramePort::new();
        let mut seq = Sequence::new();
        port.expect_read_frame()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(device_gone()));
        expect_frame(&mut port, &mut seq, assemble_telemetry(7, 0, 0, 0, "1.0,2.0,3.0").unwrap());

        let mut station = station(port, None);
        station.next_event().await.unwrap();
        station.next_event().await.unwrap();
        assert_eq!(station.read_errors(), 2);

        let event = station.next_event().await.unwrap();
        assert!(matches!(event, StationEvent::Frame(ReceiveOutcome::Accepted(_))));
        assert_eq!(station.read_errors(), 0);
    }

    #[tokio::test]
    async fn test_invalid_data_does_not_count_as_device_fault() {
        let mut port = MockFramePort::new();
        port.expect_read_frame()
            .times(MAX_CONSECUTIVE_READ_ERRORS as usize + 1)
            .returning(|_| Err(io::Error::new(io::ErrorKind::InvalidData, "bad length")));

        let mut station = station(port, None);
        for _ in 0..=MAX_CONSECUTIVE_READ_ERRORS {
            assert!(matches!(station.next_event().await, Ok(StationEvent::ReadError)));
        }
        assert_eq!(station.read_errors(), 0);
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let mut port = MockFramePort::new();
        port.expect_read_frame().returning(|_| Ok(0));

        let mut station = station(port, None);
        assert!(matches!(station.next_event().await, Ok(StationEvent::Closed)));
    }

    #[tokio::test]
    async fn test_accepted_frames_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TelemetryLogger::new(dir.path(), 100, 1).unwrap();

        let mut corrupted = assemble_telemetry(7, 1, 0, 0, "4.0,5.0,6.0").unwrap();
        corrupted[13] ^= 0x80;

        let mut port = MockFramePort::new();
        let mut seq = Sequence::new();
        expect_frame(&mut port, &mut seq, assemble_telemetry(7, 0, 0, 0, "1.0,2.0,3.0").unwrap());
        expect_frame(&mut port, &mut seq, corrupted);

        let mut station = station(port, Some(logger));
        station.next_event().await.unwrap();
        let event = station.next_event().await.unwrap();
        assert!(matches!(event, StationEvent::Frame(ReceiveOutcome::ChecksumMismatch)));

        let stats = station.receiver().stats();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.checksum_failures, 1);

        let path = station.logger.as_ref().unwrap().current_path().unwrap().to_path_buf();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
