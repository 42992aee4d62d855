//! # entangle-protocol
//!
//! Wire protocol implementation for Entangle RPC.
//!
//! This crate provides:
//! - Width- and kind-checked scalar packing/deserialization
//! - Opcodes, compression methods and typed messages
//! - Request/notification encoding and incremental, recursive decoding
//! - The remote exception taxonomy

pub mod codec;
pub mod error;
pub mod exception;
pub mod message;
pub mod opcode;
pub mod scalar;
mod scan;

pub use codec::{decode_message, Decoder, Encoder};
pub use error::{DeserializationError, PackingError, ProtocolError};
pub use exception::{parse_exception, RemoteError, PROTOCOL_NAMESPACE};
pub use message::{
    ExceptionMessage, Message, NotificationMessage, RequestMessage, ResponseMessage, Trace,
};
pub use opcode::{CompressionMethod, Opcode};

/// Maximum number of nested compressed-message layers accepted on decode.
pub const MAX_COMPRESSION_DEPTH: usize = 8;

/// Maximum size of one encoded message, and of one decompressed payload (16 MiB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
