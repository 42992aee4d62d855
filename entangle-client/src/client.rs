//! Blocking client with call correlation.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use crate::transport::{Connector, TcpConnector};
use entangle_protocol::{ExceptionMessage, Message, RemoteError, ResponseMessage};
use rmpv::Value;

/// Allocates message IDs: `1, 2, ..., u32::MAX, 0, 1, ...`.
#[derive(Debug, Clone, Default)]
pub struct MessageIds {
    current: u32,
}

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn starting_after(current: u32) -> Self {
        Self { current }
    }

    pub fn next_id(&mut self) -> u32 {
        self.current = self.current.wrapping_add(1);
        self.current
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Ask the peer to attach a trace to the reply. Ignored for notifications.
    pub trace: bool,
    /// Send a notification and do not wait for a reply.
    pub notify: bool,
}

impl CallOptions {
    pub fn request() -> Self {
        Self::default()
    }

    pub fn notification() -> Self {
        Self {
            trace: false,
            notify: true,
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/// The reply correlated to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Response(ResponseMessage),
    Exception(ExceptionMessage),
}

impl Reply {
    pub fn message_id(&self) -> u32 {
        match self {
            Reply::Response(r) => r.message_id,
            Reply::Exception(e) => e.message_id,
        }
    }

    /// Returns the result, lifting an exception into a [`RemoteError`].
    pub fn into_result(self) -> Result<Value, RemoteError> {
        match self {
            Reply::Response(r) => Ok(r.result),
            Reply::Exception(e) => Err(e.to_error()),
        }
    }
}

/// Blocking Entangle client.
///
/// Holds at most one connection, created on first use and dropped after any
/// failure. Calls run one at a time.
pub struct Client<C: Connector = TcpConnector> {
    connector: C,
    config: ConnectionConfig,
    message_ids: MessageIds,
    conn: Option<Connection<C::Transport>>,
}

impl Client<TcpConnector> {
    /// Creates a new TCP client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        let connector = TcpConnector::new(config.addr.clone(), config.connect_timeout);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> Client<C> {
    pub fn with_connector(config: ConnectionConfig, connector: C) -> Self {
        Self {
            connector,
            config,
            message_ids: MessageIds::new(),
            conn: None,
        }
    }

    /// Returns whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Closes the current connection, if any.
    pub fn close(&mut self) -> Result<(), ClientError> {
        match self.conn.take() {
            Some(mut conn) => conn.close(),
            None => Ok(()),
        }
    }

    /// Calls a method.
    ///
    /// `arguments` is a packed argument array, see
    /// [`Encoder::encode_arguments`](entangle_protocol::Encoder::encode_arguments).
    /// Returns `Ok(None)` for notifications, which are fire-and-forget.
    ///
    /// Any failure drops the connection before the error is returned; the
    /// call itself is never retried.
    pub fn call(
        &mut self,
        method: &str,
        arguments: &[u8],
        options: CallOptions,
    ) -> Result<Option<Reply>, ClientError> {
        let message_id = self.message_ids.next_id();
        let conn = self.connection()?;

        match Self::exchange(conn, message_id, method, arguments, options) {
            Ok(reply) => Ok(reply),
            Err(err) => {
                tracing::debug!("Call id={} failed: {}, dropping connection", message_id, err);
                self.discard_connection();
                Err(err)
            }
        }
    }

    /// Calls a method and returns its result, lifting remote exceptions into
    /// [`ClientError::Remote`].
    pub fn request(&mut self, method: &str, arguments: &[u8]) -> Result<Value, ClientError> {
        match self.call(method, arguments, CallOptions::request())? {
            Some(reply) => Ok(reply.into_result()?),
            None => Err(ClientError::UnexpectedMessage(
                "no reply to a request".to_string(),
            )),
        }
    }

    /// Sends a notification.
    pub fn notify(&mut self, method: &str, arguments: &[u8]) -> Result<(), ClientError> {
        self.call(method, arguments, CallOptions::notification())?;
        Ok(())
    }

    fn exchange(
        conn: &mut Connection<C::Transport>,
        message_id: u32,
        method: &str,
        arguments: &[u8],
        options: CallOptions,
    ) -> Result<Option<Reply>, ClientError> {
        if options.notify {
            conn.send_notification(message_id, method, arguments)?;
            return Ok(None);
        }

        conn.send_request(message_id, method, arguments, options.trace)?;

        let reply = match conn.receive()? {
            Message::Response(r) => Reply::Response(r),
            Message::Exception(e) => Reply::Exception(e),
            other => {
                return Err(ClientError::UnexpectedMessage(format!(
                    "unexpected {} message in reply to request {}",
                    other.opcode(),
                    message_id
                )))
            }
        };

        if reply.message_id() != message_id {
            return Err(ClientError::UnexpectedMessage(format!(
                "expected response to have message ID {}, but it has message ID {}",
                message_id,
                reply.message_id()
            )));
        }

        Ok(Some(reply))
    }

    /// Returns the current connection, establishing one if needed.
    fn connection(&mut self) -> Result<&mut Connection<C::Transport>, ClientError> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let transport = self.connect()?;
                Connection::new(transport).with_read_buffer_size(self.config.read_buffer_size)
            }
        };
        Ok(self.conn.insert(conn))
    }

    /// Makes up to `reconnect_limit + 1` connect attempts without delay.
    fn connect(&mut self) -> Result<C::Transport, ClientError> {
        let mut attempt = 0;
        loop {
            match self.connector.connect() {
                Ok(transport) => {
                    tracing::debug!("Connected to {}", self.config.addr);
                    return Ok(transport);
                }
                Err(e) if attempt < self.config.reconnect_limit => {
                    attempt += 1;
                    tracing::debug!(
                        "Connect to {} failed ({}), retry {}/{}",
                        self.config.addr,
                        e,
                        attempt,
                        self.config.reconnect_limit
                    );
                }
                Err(e) => return Err(ClientError::Io(e)),
            }
        }
    }

    fn discard_connection(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if let Err(e) = conn.close() {
                tracing::debug!("Error closing connection: {}", e);
            }
        }
    }
}
