//! # Telemetry Module
//!
//! Ground-side handling of received telemetry.
//!
//! This module handles:
//! - Verifying the CRC of each received frame
//! - Parsing the packet and extracting typed values
//! - Tracking sequence gaps and checksum failures
//! - Writing decoded records to rotating JSON Lines files
//! - Driving the receive loop with backoff on transport errors

pub mod logger;
pub mod receiver;
pub mod station;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ccsds::values::Value;

pub use logger::TelemetryLogger;
pub use receiver::{ReceiveOutcome, ReceiverStats, TelemetryReceiver};
pub use station::{GroundStation, StationEvent};

/// One decoded telemetry packet, as written to the log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Wall-clock time the frame arrived at the ground station
    pub received_at: DateTime<Utc>,

    pub apid: u16,
    pub sequence_count: u16,

    /// Onboard timestamp from the secondary header
    pub mission_time: DateTime<Utc>,

    pub data_length: u16,

    /// Values extracted with the configured format
    pub values: Vec<Value>,
}
