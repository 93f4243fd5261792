//! Stream accessor trait for the meter input

use ams_core::{AmsError, AmsResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read side of a physical stream coming from a meter.
///
/// Meter output ports are transmit-only, so there is no write path.
#[async_trait]
pub trait StreamAccessor: Send {
    /// Set the read timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> AmsResult<()>;

    /// Read data from the stream
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> AmsResult<usize>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream
    async fn close(&mut self) -> AmsResult<()>;
}

/// Transport layer trait that extends StreamAccessor
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical layer connection
    async fn open(&mut self) -> AmsResult<()>;
}

/// Read with an optional timeout, mapping expiry to [`AmsError::Timeout`]
pub(crate) async fn read_with_timeout<R>(
    reader: &mut R,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> AmsResult<usize>
where
    R: AsyncRead + Unpin + Send,
{
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, reader.read(buf))
            .await
            .map_err(|_| AmsError::Timeout)?
            .map_err(AmsError::Connection),
        None => reader.read(buf).await.map_err(AmsError::Connection),
    }
}

/// [`StreamAccessor`] over any async reader.
///
/// Covers serial bridges exposed as sockets and replay of captured meter
/// output from a file.
#[derive(Debug)]
pub struct IoStream<R> {
    reader: Option<R>,
    timeout: Option<Duration>,
}

impl<R> IoStream<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            timeout: None,
        }
    }
}

#[async_trait]
impl<R> StreamAccessor for IoStream<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> AmsResult<()> {
        self.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> AmsResult<usize> {
        let reader = self.reader.as_mut().ok_or_else(|| {
            AmsError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Stream has been closed",
            ))
        })?;

        let n = read_with_timeout(reader, buf, self.timeout).await?;
        if n == 0 {
            self.reader = None;
        }
        Ok(n)
    }

    fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    async fn close(&mut self) -> AmsResult<()> {
        self.reader = None;
        Ok(())
    }
}
