//! # mssql-types
//!
//! Scalar value interpretation for the TDS 7.1/7.2 wire format.
//!
//! Row fields arrive from the protocol layer as raw byte views; this
//! crate turns them into typed values on demand: integers, bit, floats,
//! money, datetime/smalldatetime, decimal/numeric, GUID, character and
//! binary data.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod decode;
pub mod error;
pub mod value;

pub use decode::{decode_ucs2, decode_value};
pub use error::TypeError;
pub use value::{
    DAYS_1900_TO_1970, DateTime, Decimal, Money, SmallDateTime, SqlValue, format_guid,
    guid_from_wire,
};
