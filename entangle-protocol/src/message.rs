//! Typed wire messages.

use crate::exception::{parse_exception, RemoteError};
use crate::opcode::Opcode;
use rmpv::Value;

/// Opaque diagnostic payload attached to responses and exceptions.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace(Value);

impl Trace {
    /// Wraps a decoded trace field. A nil value means no trace was sent.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Nil => None,
            other => Some(Trace(other)),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestMessage {
    pub message_id: u32,
    pub method: String,
    pub arguments: Vec<Value>,
    pub trace: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub message_id: u32,
    pub method: String,
    pub arguments: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMessage {
    pub message_id: u32,
    pub result: Value,
    pub trace: Option<Trace>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionMessage {
    pub message_id: u32,
    /// Origin domain of the error, e.g. `entangle` for protocol errors.
    pub namespace: String,
    pub name: String,
    pub description: String,
    pub trace: Option<Trace>,
}

impl ExceptionMessage {
    /// Lifts the remote failure into a local error.
    pub fn to_error(&self) -> RemoteError {
        parse_exception(&self.namespace, &self.name, self.description.clone())
    }
}

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(RequestMessage),
    Notification(NotificationMessage),
    Response(ResponseMessage),
    Exception(ExceptionMessage),
    NotificationAcknowledgement { message_id: u32 },
}

impl Message {
    pub fn message_id(&self) -> u32 {
        match self {
            Message::Request(m) => m.message_id,
            Message::Notification(m) => m.message_id,
            Message::Response(m) => m.message_id,
            Message::Exception(m) => m.message_id,
            Message::NotificationAcknowledgement { message_id } => *message_id,
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Message::Request(_) => Opcode::Request,
            Message::Notification(_) => Opcode::Notification,
            Message::Response(_) => Opcode::Response,
            Message::Exception(_) => Opcode::Exception,
            Message::NotificationAcknowledgement { .. } => Opcode::NotificationAcknowledgement,
        }
    }
}
