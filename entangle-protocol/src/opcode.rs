//! Frame opcodes and compression methods.

use crate::error::{DeserializationError, ProtocolError};
use crate::scalar::deserialize_int64;
use crate::MAX_MESSAGE_SIZE;
use rmpv::Value;
use std::fmt;

/// Tag identifying the kind of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Request = 0,
    Notification = 1,
    Response = 2,
    Exception = 3,
    NotificationAcknowledgement = 4,
    CompressedMessage = 0x7f,
}

impl Opcode {
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(Opcode::Request),
            1 => Some(Opcode::Notification),
            2 => Some(Opcode::Response),
            3 => Some(Opcode::Exception),
            4 => Some(Opcode::NotificationAcknowledgement),
            0x7f => Some(Opcode::CompressedMessage),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Deserializes an opcode from a decoded value.
    pub fn deserialize(value: &Value) -> Result<Self, DeserializationError> {
        let tag = deserialize_int64(value)?;
        Self::from_tag(tag)
            .ok_or_else(|| DeserializationError::new(format!("{} is not a valid Opcode value", tag)))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Request => write!(f, "request"),
            Opcode::Notification => write!(f, "notification"),
            Opcode::Response => write!(f, "response"),
            Opcode::Exception => write!(f, "exception"),
            Opcode::NotificationAcknowledgement => write!(f, "notification_acknowledgement"),
            Opcode::CompressedMessage => write!(f, "compressed_message"),
        }
    }
}

/// Compression applied to the payload of a compressed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionMethod {
    Snappy = 0,
}

impl CompressionMethod {
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(CompressionMethod::Snappy),
            _ => None,
        }
    }

    pub fn deserialize(value: &Value) -> Result<Self, DeserializationError> {
        let tag = deserialize_int64(value)?;
        Self::from_tag(tag).ok_or_else(|| {
            DeserializationError::new(format!("{} is not a valid CompressionMethod value", tag))
        })
    }

    /// Decompresses a payload. Snappy payloads use the raw (unframed) format.
    ///
    /// The declared size is checked against [`MAX_MESSAGE_SIZE`] before
    /// anything is allocated.
    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        match self {
            CompressionMethod::Snappy => {
                let len = snap::raw::decompress_len(data)
                    .map_err(|e| ProtocolError::bad_message_with("decompression error", e))?;
                if len > MAX_MESSAGE_SIZE {
                    return Err(ProtocolError::bad_message(format!(
                        "decompressed size {} exceeds the {} byte limit",
                        len, MAX_MESSAGE_SIZE
                    )));
                }
                snap::raw::Decoder::new()
                    .decompress_vec(data)
                    .map_err(|e| ProtocolError::bad_message_with("decompression error", e))
            }
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::Snappy => write!(f, "snappy"),
        }
    }
}
