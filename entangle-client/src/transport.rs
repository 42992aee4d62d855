//! Byte-stream transports and the connectors that open them.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A duplex byte stream.
pub trait Transport {
    /// Writes some bytes, returning how many were accepted.
    fn send(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Reads into `buf`. `Ok(0)` means the peer closed the stream.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        self.write(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Opens new transports for a client.
pub trait Connector {
    type Transport: Transport;

    fn connect(&mut self) -> io::Result<Self::Transport>;
}

/// Connects over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Connector for TcpConnector {
    type Transport = TcpStream;

    /// Tries every resolved address in turn. Only the connect honors the
    /// timeout; reads on the returned stream block indefinitely.
    fn connect(&mut self) -> io::Result<TcpStream> {
        let mut last_err = None;

        for addr in self.addr.to_socket_addrs()? {
            tracing::debug!("Connecting to {}...", addr);
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true).ok();
                    stream.set_read_timeout(None)?;
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("Connection to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("could not resolve {}", self.addr),
            )
        }))
    }
}
