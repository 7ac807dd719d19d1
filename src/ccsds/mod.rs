//! # CCSDS Packet Module
//!
//! Implementation of the CCSDS space packet framing used on the radio link.
//!
//! This module handles:
//! - Primary (APID, sequence count, data length) and secondary (time) headers
//! - Text and typed value serialization into big-endian payloads
//! - Telemetry assembly with CRC-16/CCITT, telecommand assembly without
//! - Packet parsing and typed value extraction

pub mod protocol;
pub mod header;
pub mod values;
pub mod encoder;
pub mod decoder;
pub mod crc;
pub mod time;
