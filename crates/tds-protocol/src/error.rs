//! Protocol-level error types.

use thiserror::Error;

/// Errors that can occur during TDS protocol parsing or encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Not enough bytes available to finish decoding.
    ///
    /// This is the only non-fatal parse error: the token layer reports
    /// `expected - actual` as a byte deficit to the framer, which pulls
    /// more data and retries from the preserved checkpoint.
    #[error("incomplete data: expected {expected} bytes, got {actual}")]
    Incomplete {
        /// Bytes required at the point the decoder stopped.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// Invalid packet type value.
    #[error("invalid packet type: {0:#x}")]
    InvalidPacketType(u8),

    /// Packet length field outside the 8..=32767 range.
    #[error("invalid packet length: {0}")]
    InvalidPacketLength(u16),

    /// A data type byte whose size class is unknown to the driver.
    #[error("unknown column size for data type {0:#x}")]
    UnknownColumnSizeType(u8),

    /// An on-wire field length not permitted for the column's data type.
    #[error("invalid field length {length} for data type {type_id:#x}")]
    InvalidFieldLength {
        /// The column's data type byte.
        type_id: u8,
        /// The offending on-wire length.
        length: u32,
    },

    /// A ROW token arrived without a preceding COLMETADATA token.
    #[error("ROW token without prior COLMETADATA")]
    MissingPriorColMetaData,

    /// An RPC parameter bound with a reserved (unimplemented) type tag.
    #[error("rpc parameter type {0:#x} is not implemented")]
    UnsupportedParameterType(u8),
}

impl ProtocolError {
    /// Shortage check helper: errors with [`ProtocolError::Incomplete`]
    /// unless `src` holds at least `needed` bytes.
    pub fn need(src: &[u8], needed: usize) -> Result<(), ProtocolError> {
        if src.len() < needed {
            return Err(ProtocolError::Incomplete {
                expected: needed,
                actual: src.len(),
            });
        }
        Ok(())
    }

    /// The byte deficit for a non-fatal shortage, `None` otherwise.
    #[must_use]
    pub fn deficit(&self) -> Option<usize> {
        match self {
            Self::Incomplete { expected, actual } => Some(expected.saturating_sub(*actual)),
            _ => None,
        }
    }
}
