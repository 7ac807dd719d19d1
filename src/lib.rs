//! # CCSDS Link Library
//!
//! CCSDS telemetry/telecommand packet codec for constrained radio links.
//!
//! This library provides the packet codec and its CRC-16/CCITT integrity layer,
//! plus the ground-side plumbing around it: a byte transport adapter, a
//! telemetry receiver and a JSON Lines telemetry logger.

pub mod config;
pub mod error;
pub mod ccsds;
pub mod link;
pub mod telemetry;
