//! Type-level error types.

use thiserror::Error;

/// Errors that can occur while interpreting field bytes as SQL values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The field's byte length is not legal for its data type.
    #[error("invalid field length {length} for data type {type_id:#x}")]
    InvalidLength {
        /// The column's data type byte.
        type_id: u8,
        /// The offending byte length.
        length: usize,
    },

    /// DECIMAL/NUMERIC magnitudes wider than 8 bytes (precision > 19)
    /// parse structurally but value extraction is not supported.
    #[error("decimal magnitude of {width} bytes is not supported")]
    UnsupportedPrecision {
        /// Magnitude width in bytes.
        width: usize,
    },

    /// A data type the value layer cannot interpret.
    #[error("cannot interpret data type {0:#x}")]
    UnsupportedType(u8),
}
