//! Protocol error types.

use rmpv::Value;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed underlying cause of a [`ProtocolError::BadMessage`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// A value could not be packed into the requested scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PackingError {
    message: String,
}

impl PackingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn kind_mismatch(value: &Value, target: &str) -> Self {
        Self::new(format!("cannot pack {} to {}", value, target))
    }

    pub(crate) fn out_of_range(value: &Value, target: &str) -> Self {
        Self::new(format!("{} out of range for {}", value, target))
    }
}

/// A decoded value does not satisfy the expected scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DeserializationError {
    message: String,
}

impl DeserializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn kind_mismatch(value: &Value, target: &str) -> Self {
        Self::new(format!("cannot deserialize {} to {}", value, target))
    }

    pub(crate) fn out_of_range(value: &Value, target: &str) -> Self {
        Self::new(format!("{} out of range for {}", value, target))
    }
}

/// Errors raised while encoding or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("bad message: {reason}")]
    BadMessage {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("encode error: {0}")]
    Encode(String),

    #[error("packing error: {0}")]
    Packing(#[from] PackingError),
}

impl ProtocolError {
    pub fn bad_message(reason: impl Into<String>) -> Self {
        ProtocolError::BadMessage {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn bad_message_with(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ProtocolError::BadMessage {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    /// Returns whether the peer sent a frame that violates the protocol.
    pub fn is_bad_message(&self) -> bool {
        matches!(self, ProtocolError::BadMessage { .. })
    }
}

pub(crate) fn encode_error<E: std::fmt::Display>(err: E) -> ProtocolError {
    ProtocolError::Encode(err.to_string())
}
