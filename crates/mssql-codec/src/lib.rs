//! # mssql-codec
//!
//! Blocking TDS packet framing for SQL Server connections.
//!
//! This crate owns the three pieces between raw bytes and the token
//! layer:
//!
//! - [`MessageBuffer`]: the single fixed-capacity buffer a connection
//!   uses for both directions, with a consuming reader that shifts
//!   processed bytes out on drop.
//! - [`Transport`]: the pluggable byte transport (connect / disconnect /
//!   gather send / exact receive), with a [`TcpTransport`]
//!   implementation.
//! - [`Connection`]: the framer that segments outbound messages into TDS
//!   packets and reassembles inbound packets, streaming packet data to a
//!   callback.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod connection;
pub mod error;
pub mod transport;

pub use buffer::{MessageBuffer, MessageReader, MessageWriter};
pub use connection::{Connection, PacketDataFn};
pub use error::CodecError;
pub use transport::{TcpTransport, Transport};
