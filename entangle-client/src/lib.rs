//! # entangle-client
//!
//! Client library for Entangle RPC.
//!
//! This crate provides:
//! - Blocking TCP transport with pluggable connectors
//! - Request/reply correlation by message ID
//! - Bounded reconnect retry on connection establishment

pub mod client;
pub mod connection;
pub mod error;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{CallOptions, Client, MessageIds, Reply};
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
pub use transport::{Connector, TcpConnector, Transport};
