//! In-memory transports and frame builders for unit tests.

use crate::transport::{Connector, Transport};
use rmpv::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

#[derive(Debug, Default)]
pub(crate) struct TransportLog {
    pub sent: Vec<u8>,
    pub receives: usize,
    pub closed: bool,
}

pub(crate) enum SendStep {
    /// Accept at most this many bytes.
    Accept(usize),
    Fail(io::ErrorKind),
}

/// Replays scripted reads and send outcomes. Once the read script is
/// exhausted the peer appears closed; once the send script is exhausted every
/// write is accepted in full.
pub(crate) struct ScriptedTransport {
    reads: VecDeque<io::Result<Vec<u8>>>,
    sends: VecDeque<SendStep>,
    log: Rc<RefCell<TransportLog>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            reads: VecDeque::new(),
            sends: VecDeque::new(),
            log: Rc::default(),
        }
    }

    pub fn with_reads<I: IntoIterator<Item = Vec<u8>>>(mut self, reads: I) -> Self {
        self.reads.extend(reads.into_iter().map(Ok));
        self
    }

    pub fn with_read_error(mut self, kind: io::ErrorKind) -> Self {
        self.reads.push_back(Err(kind.into()));
        self
    }

    pub fn with_sends<I: IntoIterator<Item = SendStep>>(mut self, sends: I) -> Self {
        self.sends.extend(sends);
        self
    }

    pub fn log(&self) -> Rc<RefCell<TransportLog>> {
        Rc::clone(&self.log)
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = match self.sends.pop_front() {
            Some(SendStep::Accept(max)) => max.min(data.len()),
            Some(SendStep::Fail(kind)) => return Err(kind.into()),
            None => data.len(),
        };
        self.log.borrow_mut().sent.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.log.borrow_mut().receives += 1;
        match self.reads.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.reads.push_front(Ok(chunk[n..].to_vec()));
                }
                Ok(n)
            }
        }
    }

    fn close(&mut self) -> io::Result<()> {
        self.log.borrow_mut().closed = true;
        Ok(())
    }
}

/// Hands out scripted transports in order, then refuses connections.
pub(crate) struct ScriptedConnector {
    outcomes: VecDeque<io::Result<ScriptedTransport>>,
    attempts: Rc<Cell<usize>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self {
            outcomes: VecDeque::new(),
            attempts: Rc::default(),
        }
    }

    pub fn with_transport(mut self, transport: ScriptedTransport) -> Self {
        self.outcomes.push_back(Ok(transport));
        self
    }

    pub fn with_failures(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.outcomes
                .push_back(Err(io::ErrorKind::ConnectionRefused.into()));
        }
        self
    }

    pub fn attempts(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.attempts)
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&mut self) -> io::Result<ScriptedTransport> {
        self.attempts.set(self.attempts.get() + 1);
        self.outcomes
            .pop_front()
            .unwrap_or_else(|| Err(io::ErrorKind::ConnectionRefused.into()))
    }
}

pub(crate) fn pack(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, value).unwrap();
    buf
}

pub(crate) fn response_frame(message_id: u32, result: Value) -> Vec<u8> {
    pack(&Value::Array(vec![
        Value::from(2),
        Value::from(message_id),
        result,
        Value::Nil,
    ]))
}

pub(crate) fn exception_frame(message_id: u32, namespace: &str, name: &str, description: &str) -> Vec<u8> {
    pack(&Value::Array(vec![
        Value::from(3),
        Value::from(message_id),
        Value::from(namespace),
        Value::from(name),
        Value::from(description),
        Value::Nil,
    ]))
}

pub(crate) fn acknowledgement_frame(message_id: u32) -> Vec<u8> {
    pack(&Value::Array(vec![Value::from(4), Value::from(message_id)]))
}

pub(crate) fn compressed_frame(outer_id: u32, inner: &[u8]) -> Vec<u8> {
    let payload = snap::raw::Encoder::new().compress_vec(inner).unwrap();
    pack(&Value::Array(vec![
        Value::from(0x7f),
        Value::from(outer_id),
        Value::from(0),
        Value::Binary(payload),
    ]))
}
