//! # Link Module
//!
//! Byte transport between the codec and the radio modem.
//!
//! This module handles:
//! - Opening the modem's UART (8N1, no flow control)
//! - Writing and reading whole packets as opaque byte buffers
//! - Sequencing and transmitting telemetry on the downlink
//!
//! Retransmission and modem configuration are left to the modem firmware.

pub mod port_trait;
pub mod downlink;

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::{CcsdsError, Result};
use port_trait::{FramePort, StreamPort};

pub use downlink::Downlink;

/// Fallback device paths tried after the configured one
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Serial connection to the radio modem
pub struct SerialLink {
    port: StreamPort<tokio_serial::SerialStream>,
    device_path: String,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialLink {
    /// Open the configured port, falling back to the common device paths
    ///
    /// # Errors
    ///
    /// Returns [`CcsdsError::SerialPortNotFound`] if no candidate could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ccsds_link::config::Config;
    /// use ccsds_link::link::SerialLink;
    ///
    /// let config = Config::default();
    /// let link = SerialLink::open(&config.link)?;
    /// println!("Connected to: {}", link.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let mut paths = vec![config.port.as_str()];
        for path in DEFAULT_DEVICE_PATHS {
            if !paths.contains(path) {
                paths.push(*path);
            }
        }

        Self::open_with_paths(&paths, config.baud_rate, Duration::from_millis(config.timeout_ms))
    }

    /// Open the first device in `paths` that accepts a connection
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try in order
    /// * `baud_rate` - UART speed
    /// * `write_timeout` - Upper bound for writing one frame
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, write_timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(stream) => {
                    info!("Opened radio modem at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port: StreamPort::new(stream, write_timeout),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(CcsdsError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| CcsdsError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Path of the device that was opened
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl FramePort for SerialLink {
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.port.write_frame(frame).await?;
        debug!("Sent frame ({} bytes)", frame.len());
        Ok(())
    }

    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read_frame(buf).await
    }
}
