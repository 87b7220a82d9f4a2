//! Codec-level error types.

use thiserror::Error;

/// Errors that can occur while framing or buffering TDS packets.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Transport I/O failure. Fatal for the connection.
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    /// A TDS header announced a length outside `8..=32767`.
    #[error("invalid TDS packet length: {0}")]
    InvalidPacketLength(u16),

    /// The message buffer cannot hold the bytes required to make
    /// progress; the receive buffer is undersized for this message.
    #[error("message buffer exhausted: capacity {capacity}, needed {needed} more bytes")]
    BufferExhausted {
        /// Total buffer capacity.
        capacity: usize,
        /// Additional bytes that did not fit.
        needed: usize,
    },

    /// Protocol-level failure while decoding framed data.
    #[error(transparent)]
    Protocol(#[from] tds_protocol::ProtocolError),
}

impl CodecError {
    /// Whether the error tears down the connection (any transport
    /// failure does).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
