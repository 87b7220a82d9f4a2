//! Codec utilities for TDS protocol encoding and decoding.
//!
//! All string payloads in TDS 7.x are UCS-2 LE. Length prefixes count
//! code units, not bytes.

use bytes::BufMut;

use crate::error::ProtocolError;

/// Read a length-prefixed UCS-2 LE string (1-byte length in code units).
pub fn read_b_varchar(src: &mut &[u8]) -> Result<String, ProtocolError> {
    ProtocolError::need(src, 1)?;
    let len = src[0] as usize;
    *src = &src[1..];
    read_ucs2_string(src, len)
}

/// Read a length-prefixed UCS-2 LE value (1-byte length in code units),
/// returning the raw bytes without character conversion.
pub fn read_b_varchar_raw<'a>(src: &mut &'a [u8]) -> Result<&'a [u8], ProtocolError> {
    ProtocolError::need(src, 1)?;
    let byte_count = src[0] as usize * 2;
    ProtocolError::need(&src[1..], byte_count)?;
    let raw = &src[1..1 + byte_count];
    *src = &src[1 + byte_count..];
    Ok(raw)
}

/// Read a length-prefixed UCS-2 LE string (2-byte length in code units).
pub fn read_us_varchar(src: &mut &[u8]) -> Result<String, ProtocolError> {
    ProtocolError::need(src, 2)?;
    let len = u16::from_le_bytes([src[0], src[1]]) as usize;
    *src = &src[2..];
    read_ucs2_string(src, len)
}

/// Read a UCS-2 LE string of `unit_count` code units.
///
/// Invalid surrogate sequences are replaced rather than rejected; the
/// wire length, not the content, drives the parse.
pub fn read_ucs2_string(src: &mut &[u8], unit_count: usize) -> Result<String, ProtocolError> {
    let byte_count = unit_count * 2;
    ProtocolError::need(src, byte_count)?;

    let units = collect_ucs2_units(&src[..byte_count]);
    *src = &src[byte_count..];
    Ok(String::from_utf16_lossy(&units))
}

/// Reinterpret raw bytes as little-endian UCS-2 code units.
///
/// A trailing odd byte, which a conforming server never produces, is
/// ignored.
#[must_use]
pub fn collect_ucs2_units(raw: &[u8]) -> Vec<u16> {
    raw.chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Write a string as UCS-2 LE without a length prefix.
pub fn write_ucs2_string(dst: &mut impl BufMut, s: &str) {
    for unit in s.encode_utf16() {
        dst.put_u16_le(unit);
    }
}

/// Number of UCS-2 code units `s` occupies on the wire.
#[must_use]
pub fn ucs2_unit_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Number of bytes `s` occupies on the wire as UCS-2 LE.
#[must_use]
pub fn ucs2_byte_len(s: &str) -> usize {
    ucs2_unit_len(s) * 2
}

/// Parse a decimal ASCII number transmitted as a UCS-2 LE string.
///
/// ENVCHANGE type 4 carries the new packet size in this form
/// (e.g. `"8192"` as `38 00 31 00 39 00 32 00`). Non-digit units
/// terminate the parse.
#[must_use]
pub fn parse_ucs2_decimal(raw: &[u8]) -> u32 {
    let mut value: u32 = 0;
    for unit in collect_ucs2_units(raw) {
        match unit {
            0x0030..=0x0039 => {
                value = value
                    .saturating_mul(10)
                    .saturating_add(u32::from(unit) - 0x30);
            }
            _ => break,
        }
    }
    value
}
