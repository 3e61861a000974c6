//! Shellpilot Runtime - Transport, connection, and wire types
//!
//! This crate provides the low-level runtime infrastructure for communicating
//! with the automation server embedded in the device's UI shell:
//!
//! - **Transport**: Length-prefixed JSON frames over a TCP socket
//! - **Connection**: Request/response correlation and error mapping
//! - **Errors**: The single error enum used across the whole stack
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  shellpilot-rs   │  Session handle, scoped executor, facades
//! └────────┬─────────┘
//! ┌────────▼─────────┐
//! │ shellpilot-runtime│  This crate
//! │  ┌────────┐      │
//! │  │ Conn   │      │  id correlation, remote error payloads
//! │  └────────┘      │
//! │  ┌────────┐      │
//! │  │ Trans  │      │  framed TCP socket
//! │  └────────┘      │
//! └──────────────────┘
//! ```
//!
//! The protocol is strictly request/response: the client sends
//! `{id, name, parameters}` and the server answers `{id, value}` or
//! `{id, error}`. The server announces itself with one unsolicited hello
//! frame immediately after the socket opens.

pub mod connection;
pub mod error;
pub mod transport;

pub use connection::{Connection, ErrorPayload, Message, Request, Response};
pub use error::{Error, Result};
pub use transport::{
    SocketTransport, SocketTransportReceiver, SocketTransportSender, Transport, TransportParts,
    TransportReceiver,
};
