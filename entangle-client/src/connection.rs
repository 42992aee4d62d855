//! Connection management.

use crate::error::ClientError;
use crate::transport::Transport;
use entangle_protocol::{decode_message, Decoder, Encoder, Message};
use std::io;
use std::time::Duration;

/// Default read chunk size (4 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;

/// Minimum read chunk size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read chunk size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default number of extra connect attempts after the first one fails.
pub const DEFAULT_RECONNECT_LIMIT: u32 = 3;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address as `host:port`.
    pub addr: String,
    /// Timeout for each connect attempt.
    pub connect_timeout: Duration,
    /// Extra connect attempts made when establishing a connection fails.
    pub reconnect_limit: u32,
    /// Chunk size for socket reads.
    pub read_buffer_size: usize,
}

impl ConnectionConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: Duration::from_secs(10),
            reconnect_limit: DEFAULT_RECONNECT_LIMIT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect_limit(mut self, limit: u32) -> Self {
        self.reconnect_limit = limit;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

/// A connection to an Entangle peer over one transport.
///
/// Not safe for concurrent use; a connection belongs to exactly one client.
pub struct Connection<T: Transport> {
    transport: T,
    decoder: Decoder,
    read_buffer_size: usize,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            decoder: Decoder::new(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    /// Sends a request frame.
    pub fn send_request(
        &mut self,
        message_id: u32,
        method: &str,
        arguments: &[u8],
        trace: bool,
    ) -> Result<(), ClientError> {
        let encoded = Encoder::encode_request(message_id, method, arguments, trace)?;
        tracing::debug!(
            "Sending request id={} method={} ({} bytes)",
            message_id,
            method,
            encoded.len()
        );
        self.send_all(&encoded)
    }

    /// Sends a notification frame.
    pub fn send_notification(
        &mut self,
        message_id: u32,
        method: &str,
        arguments: &[u8],
    ) -> Result<(), ClientError> {
        let encoded = Encoder::encode_notification(message_id, method, arguments)?;
        tracing::debug!(
            "Sending notification id={} method={} ({} bytes)",
            message_id,
            method,
            encoded.len()
        );
        self.send_all(&encoded)
    }

    /// Blocks until one complete message has been received.
    pub fn receive(&mut self) -> Result<Message, ClientError> {
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            if let Some(value) = self.decoder.decode_value()? {
                let message = decode_message(value)?;
                tracing::debug!(
                    "Decoded {} message id={}",
                    message.opcode(),
                    message.message_id()
                );
                return Ok(message);
            }

            let n = match self.transport.receive(&mut buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ClientError::Io(e)),
            };

            if n == 0 {
                tracing::debug!("Connection closed (0 bytes)");
                return Err(ClientError::ConnectionLost);
            }

            self.decoder.extend(&buf[..n]);
            tracing::trace!(
                "Read {} bytes, decoder buffer now has {} bytes",
                n,
                self.decoder.buffered()
            );
        }
    }

    /// Closes the underlying transport.
    pub fn close(&mut self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection");
        self.decoder.clear();
        self.transport.close()?;
        Ok(())
    }

    fn send_all(&mut self, mut data: &[u8]) -> Result<(), ClientError> {
        while !data.is_empty() {
            match self.transport.send(data) {
                Ok(0) => return Err(ClientError::ConnectionLost),
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    tracing::debug!("Broken pipe while sending");
                    return Err(ClientError::ConnectionLost);
                }
                Err(e) => return Err(ClientError::Io(e)),
            }
        }
        Ok(())
    }
}
