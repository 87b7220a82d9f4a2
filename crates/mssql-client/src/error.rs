//! Client error types.

use thiserror::Error;

use tds_protocol::rpc::RpcMode;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection parameters name no server.
    #[error("connection parameter invalid: server name is empty")]
    ServerNameEmpty,

    /// The requested packet size is outside `512..=32767`.
    #[error("connection parameter invalid: packet size {0} not in 512..=32767")]
    PacketSizeInvalid(u32),

    /// The transport could not establish the connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(#[source] mssql_codec::CodecError),

    /// The server rejected the login.
    #[error("login failed")]
    LoginFailed,

    /// The requested RPC mode is not supported.
    #[error("rpc mode {0:?} is not supported")]
    RpcInvalidMode(RpcMode),

    /// An operation was attempted before a successful login.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Protocol-level parse failure.
    #[error("protocol error: {0}")]
    Protocol(#[from] tds_protocol::ProtocolError),

    /// Framing or transport failure.
    #[error("codec error: {0}")]
    Codec(#[from] mssql_codec::CodecError),

    /// Value interpretation failure.
    #[error("type error: {0}")]
    Type(#[from] mssql_types::TypeError),
}
