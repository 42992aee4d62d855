//! Client error types.

use entangle_protocol::{DeserializationError, PackingError, ProtocolError, RemoteError};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("connection lost")]
    ConnectionLost,

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("packing error: {0}")]
    Packing(#[from] PackingError),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] DeserializationError),
}

impl ClientError {
    /// Returns whether retrying the call on a fresh connection may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Io(_) | ClientError::ConnectionLost)
    }

    /// Returns whether the peer sent a frame that violates the protocol.
    pub fn is_bad_message(&self) -> bool {
        matches!(self, ClientError::Protocol(e) if e.is_bad_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entangle_protocol::parse_exception;

    #[test]
    fn test_retryable() {
        assert!(ClientError::ConnectionLost.is_retryable());
        assert!(ClientError::Io(std::io::ErrorKind::ConnectionRefused.into()).is_retryable());
        assert!(!ClientError::UnexpectedMessage("x".into()).is_retryable());
        assert!(!ClientError::Remote(parse_exception("a", "b", "c")).is_retryable());
        assert!(!ClientError::Protocol(ProtocolError::bad_message("x")).is_retryable());
    }

    #[test]
    fn test_bad_message() {
        assert!(ClientError::Protocol(ProtocolError::bad_message("x")).is_bad_message());
        assert!(!ClientError::ConnectionLost.is_bad_message());
    }

    #[test]
    fn test_display() {
        let err = ClientError::Remote(parse_exception("entangle", "InvalidArgument", "bad input"));
        assert_eq!(
            err.to_string(),
            "remote error: entangle.InvalidArgument: bad input"
        );
        assert_eq!(ClientError::ConnectionLost.to_string(), "connection lost");
    }
}
