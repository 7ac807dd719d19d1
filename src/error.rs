//! # Error Types
//!
//! Custom error types for CCSDS Link using `thiserror`.
//!
//! Checksum mismatches are not errors here; [`crate::ccsds::crc`] reports them
//! as a plain `bool`.

use thiserror::Error;

/// Main error type for CCSDS Link
#[derive(Debug, Error)]
pub enum CcsdsError {
    /// Buffer is shorter than the header, or than header + advertised data length
    #[error("Truncated packet: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    /// Serialized payload does not fit in a single transport frame
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Format descriptor asks for more bytes than the payload holds
    #[error("Payload underrun: format needs {needed} bytes, payload has {available}")]
    PayloadUnderrun { needed: usize, available: usize },

    /// Format descriptor contains a tag outside float/uint8/uint16/uint32
    #[error("Unknown format tag: {0:?}")]
    UnknownFormatTag(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry log serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial transport errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),
}

/// Result type alias for CCSDS Link
pub type Result<T> = std::result::Result<T, CcsdsError>;
