//! Encoder and decoder for Entangle frames.
//!
//! A frame is a single MessagePack array `[opcode, message_id, fields...]`.
//! There is no length prefix: the decoder accumulates bytes until one complete
//! MessagePack object can be read, then dispatches on the opcode.

use crate::error::{encode_error, ProtocolError};
use crate::message::{
    ExceptionMessage, Message, NotificationMessage, RequestMessage, ResponseMessage, Trace,
};
use crate::opcode::{CompressionMethod, Opcode};
use crate::scalar::{deserialize_binary, deserialize_bool, deserialize_string, deserialize_uint32};
use crate::scan::{scan_value, Scan, ScanState};
use crate::{MAX_COMPRESSION_DEPTH, MAX_MESSAGE_SIZE};
use bytes::{BufMut, Bytes, BytesMut};
use rmpv::Value;
use std::io::{Cursor, Write};

/// Encodes outbound requests and notifications.
pub struct Encoder;

impl Encoder {
    /// Encodes `[request, message_id, method, arguments, trace]`.
    ///
    /// `arguments` must already be a packed MessagePack array and is spliced
    /// into the frame verbatim.
    pub fn encode_request(
        message_id: u32,
        method: &str,
        arguments: &[u8],
        trace: bool,
    ) -> Result<BytesMut, ProtocolError> {
        let mut wr = Self::start(5, Opcode::Request, message_id, method, arguments)?;
        rmp::encode::write_bool(&mut wr, trace).map_err(encode_error)?;
        Ok(wr.into_inner())
    }

    /// Encodes `[notification, message_id, method, arguments]`.
    pub fn encode_notification(
        message_id: u32,
        method: &str,
        arguments: &[u8],
    ) -> Result<BytesMut, ProtocolError> {
        let wr = Self::start(4, Opcode::Notification, message_id, method, arguments)?;
        Ok(wr.into_inner())
    }

    /// Packs a sequence of already-packed values into an argument array.
    pub fn encode_arguments<I, B>(packed: I) -> Result<Bytes, ProtocolError>
    where
        I: IntoIterator<Item = B>,
        I::IntoIter: ExactSizeIterator,
        B: AsRef<[u8]>,
    {
        let packed = packed.into_iter();
        let len = u32::try_from(packed.len())
            .map_err(|_| ProtocolError::Encode("too many arguments".to_string()))?;

        let mut wr = BytesMut::new().writer();
        rmp::encode::write_array_len(&mut wr, len).map_err(encode_error)?;
        for value in packed {
            wr.write_all(value.as_ref()).map_err(encode_error)?;
        }
        Ok(wr.into_inner().freeze())
    }

    fn start(
        len: u32,
        opcode: Opcode,
        message_id: u32,
        method: &str,
        arguments: &[u8],
    ) -> Result<bytes::buf::Writer<BytesMut>, ProtocolError> {
        let capacity = 16 + method.len() + arguments.len();
        let mut wr = BytesMut::with_capacity(capacity).writer();

        rmp::encode::write_array_len(&mut wr, len).map_err(encode_error)?;
        rmp::encode::write_uint(&mut wr, u64::from(opcode.tag())).map_err(encode_error)?;
        rmp::encode::write_uint(&mut wr, u64::from(message_id)).map_err(encode_error)?;
        rmp::encode::write_str(&mut wr, method).map_err(encode_error)?;
        wr.write_all(arguments).map_err(encode_error)?;

        Ok(wr)
    }
}

/// Incrementally decodes frames from a byte stream.
///
/// Bytes already scanned are not looked at again while a message is still
/// incomplete, so receiving a large message in many chunks stays linear.
pub struct Decoder {
    buffer: BytesMut,
    scan: ScanState,
    needed: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            scan: ScanState::default(),
            needed: 1,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to read the next complete generic value from the buffer.
    ///
    /// Returns `Ok(None)` if more data is needed. Bytes of a decoded value are
    /// consumed; bytes following it stay buffered. A value that would exceed
    /// [`MAX_MESSAGE_SIZE`] is rejected as soon as its size is known.
    pub fn decode_value(&mut self) -> Result<Option<Value>, ProtocolError> {
        if self.buffer.len() < self.needed {
            return Ok(None);
        }

        let len = match scan_value(&self.buffer, self.scan) {
            Scan::Complete(len) => len,
            Scan::Incomplete { resume, needed } => {
                check_size(needed)?;
                self.scan = resume;
                self.needed = needed;
                return Ok(None);
            }
            Scan::Invalid { offset } => {
                return Err(ProtocolError::bad_message(format!(
                    "reserved marker at offset {}",
                    offset
                )))
            }
        };
        check_size(len)?;

        self.scan = ScanState::default();
        self.needed = 1;
        let data = self.buffer.split_to(len);
        read_single_value(&data, "message data").map(Some)
    }

    /// Attempts to decode the next message from the buffer.
    pub fn decode_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        match self.decode_value()? {
            Some(value) => decode_message(value).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scan = ScanState::default();
        self.needed = 1;
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn check_size(len: usize) -> Result<(), ProtocolError> {
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::bad_message(format!(
            "message of at least {} bytes exceeds the {} byte limit",
            len, MAX_MESSAGE_SIZE
        )));
    }
    Ok(())
}

/// Decodes one fully decoded generic value into a typed message.
///
/// Compressed messages are unwrapped recursively, up to
/// [`MAX_COMPRESSION_DEPTH`] layers. The innermost frame determines the
/// opcode and message ID of the result.
pub fn decode_message(value: Value) -> Result<Message, ProtocolError> {
    decode_nested(value, 0)
}

fn decode_nested(value: Value, depth: usize) -> Result<Message, ProtocolError> {
    let mut fields = match value {
        Value::Array(fields) if fields.len() >= 2 => fields,
        _ => return Err(ProtocolError::bad_message("invalid message data received")),
    };

    let opcode = Opcode::deserialize(&fields[0]).map_err(|e| {
        ProtocolError::bad_message_with(format!("invalid opcode: {}", fields[0]), e)
    })?;
    let message_id = deserialize_uint32(&fields[1]).map_err(|e| {
        ProtocolError::bad_message_with(format!("invalid message ID: {}", fields[1]), e)
    })?;
    let body = fields.split_off(2);

    match opcode {
        Opcode::Request => {
            let [method, arguments, trace] = take_fields(opcode, body)?;
            Ok(Message::Request(RequestMessage {
                message_id,
                method: string_field(&method, "method")?,
                arguments: array_field(arguments, "arguments")?,
                trace: deserialize_bool(&trace)
                    .map_err(|e| ProtocolError::bad_message_with("invalid trace flag", e))?,
            }))
        }
        Opcode::Notification => {
            let [method, arguments] = take_fields(opcode, body)?;
            Ok(Message::Notification(NotificationMessage {
                message_id,
                method: string_field(&method, "method")?,
                arguments: array_field(arguments, "arguments")?,
            }))
        }
        Opcode::Response => {
            let [result, trace] = take_fields(opcode, body)?;
            Ok(Message::Response(ResponseMessage {
                message_id,
                result,
                trace: Trace::from_value(trace),
            }))
        }
        Opcode::Exception => {
            let [namespace, name, description, trace] = take_fields(opcode, body)?;
            Ok(Message::Exception(ExceptionMessage {
                message_id,
                namespace: string_field(&namespace, "exception namespace")?,
                name: string_field(&name, "exception name")?,
                description: string_field(&description, "exception description")?,
                trace: Trace::from_value(trace),
            }))
        }
        Opcode::NotificationAcknowledgement => {
            take_fields::<0>(opcode, body)?;
            Ok(Message::NotificationAcknowledgement { message_id })
        }
        Opcode::CompressedMessage => {
            let [method, payload] = take_fields(opcode, body)?;
            if depth >= MAX_COMPRESSION_DEPTH {
                return Err(ProtocolError::bad_message(format!(
                    "compressed messages nested deeper than {} levels",
                    MAX_COMPRESSION_DEPTH
                )));
            }

            let method = CompressionMethod::deserialize(&method).map_err(|e| {
                ProtocolError::bad_message_with(format!("invalid compression method: {}", method), e)
            })?;
            let payload = deserialize_binary(&payload)
                .map_err(|e| ProtocolError::bad_message_with("invalid compressed data received", e))?;

            let data = method.decompress(&payload)?;
            tracing::trace!(
                outer_id = message_id,
                %method,
                compressed = payload.len(),
                decompressed = data.len(),
                depth,
                "unwrapping compressed message"
            );

            let inner = read_single_value(&data, "compressed payload")?;
            decode_nested(inner, depth + 1)
        }
    }
}

fn take_fields<const N: usize>(opcode: Opcode, body: Vec<Value>) -> Result<[Value; N], ProtocolError> {
    body.try_into().map_err(|body: Vec<Value>| {
        ProtocolError::bad_message(format!(
            "{} message expects {} fields after the header, got {}",
            opcode,
            N,
            body.len()
        ))
    })
}

fn string_field(value: &Value, field: &str) -> Result<String, ProtocolError> {
    deserialize_string(value)
        .map_err(|e| ProtocolError::bad_message_with(format!("invalid {}", field), e))
}

fn array_field(value: Value, field: &str) -> Result<Vec<Value>, ProtocolError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(ProtocolError::bad_message(format!(
            "invalid {}: expected an array, got {}",
            field, other
        ))),
    }
}

fn read_single_value(data: &[u8], what: &str) -> Result<Value, ProtocolError> {
    let mut cursor = Cursor::new(data);
    let value = rmpv::decode::read_value(&mut cursor)
        .map_err(|e| ProtocolError::bad_message_with(format!("undecodable {}", what), e))?;

    let consumed = cursor.position() as usize;
    if consumed != data.len() {
        return Err(ProtocolError::bad_message(format!(
            "{} trailing bytes after {}",
            data.len() - consumed,
            what
        )));
    }
    Ok(value)
}
