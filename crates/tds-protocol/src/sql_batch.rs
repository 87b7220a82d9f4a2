//! SQL batch request encoding.
//!
//! A TDS 7.1 SQL batch payload (packet type 0x01) is simply the SQL text
//! encoded as UCS-2 LE. The ALL_HEADERS preamble only exists from TDS 7.2
//! onwards and is not emitted by this driver.

use bytes::{Bytes, BytesMut};

use crate::codec::{ucs2_byte_len, write_ucs2_string};

/// Encode a SQL batch request payload.
///
/// The result is the message payload only; the framer supplies TDS
/// packet headers when it is sent.
#[must_use]
pub fn encode_sql_batch(sql: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(ucs2_byte_len(sql));
    write_ucs2_string(&mut buf, sql);
    buf.freeze()
}
