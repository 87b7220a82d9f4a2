//! # tds-protocol
//!
//! Pure implementation of the MS-TDS (Tabular Data Stream) protocol as
//! spoken by Microsoft SQL Server and Sybase engines, protocol versions
//! 7.1 and 7.2.
//!
//! This crate provides packet structures, token parsing, and request
//! serialization for the TDS protocol.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It contains no networking
//! logic and makes no assumptions about buffering. Token decoders operate
//! on byte slices and report shortages as
//! [`ProtocolError::Incomplete`]; the framing layer above decides how to
//! pull more data and retry.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod error;
pub mod login7;
pub mod packet;
pub mod rpc;
pub mod sql_batch;
pub mod token;
pub mod types;
pub mod version;

pub use error::ProtocolError;
pub use login7::{Login7, OptionFlags1, OptionFlags2, OptionFlags3, TypeFlags};
pub use packet::{
    DEFAULT_PACKET_SIZE, MAX_PACKET_SIZE, MIN_PACKET_SIZE, PACKET_HEADER_SIZE, PacketHeader,
    PacketStatus, PacketType,
};
pub use rpc::{RpcMode, RpcParam, RpcRequest};
pub use sql_batch::encode_sql_batch;
pub use token::{
    ColMetaData, Column, Done, DoneKind, DoneStatus, EnvChange, EnvChangeType, LoginAck,
    ServerMessage, TokenType, TypeProps, decode_row,
};
pub use types::{ColumnFlags, SizeClass, TypeId, Updateable};
pub use version::TdsVersion;
