//! Trait abstraction for frame transport to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ccsds::protocol::{
    CHECKSUM_SIZE, MAX_TELEMETRY_PAYLOAD, PRIMARY_HEADER_SIZE, SECONDARY_HEADER_SIZE,
};

/// A transport that moves whole packets as opaque byte buffers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FramePort: Send {
    /// Write one complete frame and flush it
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Read one frame into `buf`, returning its length
    ///
    /// A return of 0 means the stream has closed.
    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Frame port over any async byte stream
///
/// Reads are framed as telemetry packets: the primary header's data length
/// says how many secondary header, payload and checksum bytes follow, however
/// the stream happens to split or join them.
pub struct StreamPort<S> {
    stream: S,
    write_timeout: Duration,
}

impl<S> StreamPort<S> {
    pub fn new(stream: S, write_timeout: Duration) -> Self {
        Self {
            stream,
            write_timeout,
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[async_trait]
impl<S> FramePort for StreamPort<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(frame).await?;
            stream.flush().await
        };

        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "frame write timed out"))?
    }

    async fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.len() < PRIMARY_HEADER_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "frame buffer too small"));
        }

        // A clean EOF before the first header byte means the stream closed
        if self.stream.read(&mut buf[..1]).await? == 0 {
            return Ok(0);
        }
        self.stream.read_exact(&mut buf[1..PRIMARY_HEADER_SIZE]).await?;

        let data_length = u16::from_be_bytes([buf[4], buf[5]]) as usize;
        if data_length > MAX_TELEMETRY_PAYLOAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("data length {} exceeds maximum {}", data_length, MAX_TELEMETRY_PAYLOAD),
            ));
        }

        let frame_len = PRIMARY_HEADER_SIZE + SECONDARY_HEADER_SIZE + data_length + CHECKSUM_SIZE;
        if buf.len() < frame_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes does not fit buffer of {}", frame_len, buf.len()),
            ));
        }

        self.stream.read_exact(&mut buf[PRIMARY_HEADER_SIZE..frame_len]).await?;
        Ok(frame_len)
    }
}
