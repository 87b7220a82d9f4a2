//! Interpretation of row-field bytes as SQL values.
//!
//! A field arrives as a raw byte view whose length the row parser has
//! already validated against the column's allow-list; the functions here
//! turn those bytes into typed values on demand. Integer widths are
//! little-endian throughout.

use bytes::Bytes;
use tds_protocol::types::TypeId;

use crate::error::TypeError;
use crate::value::{DateTime, Decimal, Money, SmallDateTime, SqlValue, guid_from_wire};

/// Decode a non-NULL field's bytes according to its column data type.
///
/// `scale` is consulted for DECIMAL/NUMERIC columns only.
pub fn decode_value(data: &[u8], type_id: TypeId, scale: u8) -> Result<SqlValue, TypeError> {
    match type_id {
        TypeId::Null => Ok(SqlValue::Null),
        TypeId::Bit | TypeId::BitN => Ok(SqlValue::Bool(take::<1>(data, type_id)?[0] != 0)),
        TypeId::Int1 => Ok(SqlValue::TinyInt(take::<1>(data, type_id)?[0])),
        TypeId::Int2 => Ok(SqlValue::SmallInt(i16::from_le_bytes(take(data, type_id)?))),
        TypeId::Int4 => Ok(SqlValue::Int(i32::from_le_bytes(take(data, type_id)?))),
        TypeId::Int8 => Ok(SqlValue::BigInt(i64::from_le_bytes(take(data, type_id)?))),
        TypeId::IntN => decode_intn(data),
        TypeId::Float4 => Ok(SqlValue::Float(f32::from_le_bytes(take(data, type_id)?))),
        TypeId::Float8 => Ok(SqlValue::Double(f64::from_le_bytes(take(data, type_id)?))),
        TypeId::FloatN => match data.len() {
            4 => decode_value(data, TypeId::Float4, scale),
            8 => decode_value(data, TypeId::Float8, scale),
            other => Err(invalid_length(type_id, other)),
        },
        TypeId::Money => Ok(SqlValue::Money(decode_money(take(data, type_id)?))),
        TypeId::Money4 => Ok(SqlValue::Money(Money::from_small(i32::from_le_bytes(
            take(data, type_id)?,
        )))),
        TypeId::MoneyN => match data.len() {
            4 => decode_value(data, TypeId::Money4, scale),
            8 => decode_value(data, TypeId::Money, scale),
            other => Err(invalid_length(type_id, other)),
        },
        TypeId::DateTime4 => {
            let raw: [u8; 4] = take(data, type_id)?;
            Ok(SqlValue::SmallDateTime(SmallDateTime {
                days: u16::from_le_bytes([raw[0], raw[1]]),
                minutes: u16::from_le_bytes([raw[2], raw[3]]),
            }))
        }
        TypeId::DateTime => {
            let raw: [u8; 8] = take(data, type_id)?;
            Ok(SqlValue::DateTime(DateTime {
                days: i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
                ticks: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            }))
        }
        TypeId::DateTimeN => match data.len() {
            4 => decode_value(data, TypeId::DateTime4, scale),
            8 => decode_value(data, TypeId::DateTime, scale),
            other => Err(invalid_length(type_id, other)),
        },
        TypeId::DecimalN | TypeId::NumericN => decode_decimal(data, type_id, scale),
        TypeId::Guid => guid_from_wire(data)
            .map(SqlValue::Guid)
            .ok_or_else(|| invalid_length(type_id, data.len())),
        TypeId::BigChar | TypeId::BigVarChar | TypeId::Text => Ok(SqlValue::String(
            String::from_utf8_lossy(data).into_owned(),
        )),
        TypeId::NChar | TypeId::NVarChar | TypeId::NText => {
            Ok(SqlValue::String(decode_ucs2(data)))
        }
        TypeId::BigBinary | TypeId::BigVarBinary | TypeId::Image => {
            Ok(SqlValue::Binary(Bytes::copy_from_slice(data)))
        }
    }
}

/// Reinterpret UCS-2 LE bytes as a string. A trailing odd byte is
/// dropped.
#[must_use]
pub fn decode_ucs2(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn take<const N: usize>(data: &[u8], type_id: TypeId) -> Result<[u8; N], TypeError> {
    data.try_into()
        .map_err(|_| invalid_length(type_id, data.len()))
}

fn invalid_length(type_id: TypeId, length: usize) -> TypeError {
    TypeError::InvalidLength {
        type_id: type_id as u8,
        length,
    }
}

fn decode_intn(data: &[u8]) -> Result<SqlValue, TypeError> {
    match data.len() {
        1 => Ok(SqlValue::TinyInt(data[0])),
        2 => Ok(SqlValue::SmallInt(i16::from_le_bytes([data[0], data[1]]))),
        4 => Ok(SqlValue::Int(i32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ]))),
        8 => Ok(SqlValue::BigInt(i64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]))),
        other => Err(invalid_length(TypeId::IntN, other)),
    }
}

/// The money wire order is inverted: the more significant 4-byte half
/// comes first, each half little-endian.
fn decode_money(raw: [u8; 8]) -> Money {
    let more = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let less = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
    Money::from_halves(more, less)
}

fn decode_decimal(data: &[u8], type_id: TypeId, scale: u8) -> Result<SqlValue, TypeError> {
    // sign byte: 0 = negative, 1 = non-negative
    let (sign, magnitude) = data
        .split_first()
        .ok_or_else(|| invalid_length(type_id, 0))?;
    let negative = *sign == 0;

    let magnitude = match magnitude.len() {
        4 => u64::from(u32::from_le_bytes([
            magnitude[0],
            magnitude[1],
            magnitude[2],
            magnitude[3],
        ])),
        8 => u64::from_le_bytes([
            magnitude[0],
            magnitude[1],
            magnitude[2],
            magnitude[3],
            magnitude[4],
            magnitude[5],
            magnitude[6],
            magnitude[7],
        ]),
        12 | 16 => {
            return Err(TypeError::UnsupportedPrecision {
                width: magnitude.len(),
            });
        }
        other => return Err(invalid_length(type_id, other + 1)),
    };

    Ok(SqlValue::Decimal(Decimal::new(negative, magnitude, scale)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_are_little_endian() {
        assert_eq!(
            decode_value(&[0x34, 0x12], TypeId::Int2, 0).unwrap(),
            SqlValue::SmallInt(0x1234)
        );
        assert_eq!(
            decode_value(&[0x78, 0x56, 0x34, 0x12], TypeId::Int4, 0).unwrap(),
            SqlValue::Int(0x12345678)
        );
    }

    #[test]
    fn test_bit_nonzero_is_true() {
        assert_eq!(
            decode_value(&[0], TypeId::Bit, 0).unwrap(),
            SqlValue::Bool(false)
        );
        assert_eq!(
            decode_value(&[2], TypeId::BitN, 0).unwrap(),
            SqlValue::Bool(true)
        );
    }

    #[test]
    fn test_intn_widths() {
        assert_eq!(
            decode_value(&[0xFF], TypeId::IntN, 0).unwrap(),
            SqlValue::TinyInt(255)
        );
        assert_eq!(
            decode_value(&1i64.to_le_bytes(), TypeId::IntN, 0).unwrap(),
            SqlValue::BigInt(1)
        );
        assert_eq!(
            decode_value(&[1, 2, 3], TypeId::IntN, 0),
            Err(TypeError::InvalidLength {
                type_id: 0x26,
                length: 3
            })
        );
    }

    #[test]
    fn test_money_min_and_max() {
        let min = decode_value(&[0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00], TypeId::Money, 0)
            .unwrap();
        match min {
            SqlValue::Money(m) => {
                assert_eq!(m.raw(), i64::MIN);
                assert_eq!(m.integer_part(), -922_337_203_685_477);
                assert_eq!(m.fraction_part(), -5808);
            }
            other => panic!("expected money, got {other:?}"),
        }

        let max = decode_value(&[0xFF, 0xFF, 0xFF, 0x7F, 0xFF, 0xFF, 0xFF, 0xFF], TypeId::Money, 0)
            .unwrap();
        match max {
            SqlValue::Money(m) => assert_eq!(m.raw(), i64::MAX),
            other => panic!("expected money, got {other:?}"),
        }
    }

    #[test]
    fn test_moneyn_dispatches_on_width() {
        let small = decode_value(&100_0000i32.to_le_bytes(), TypeId::MoneyN, 0).unwrap();
        match small {
            SqlValue::Money(m) => assert_eq!(m.integer_part(), 100),
            other => panic!("expected money, got {other:?}"),
        }
    }

    #[test]
    fn test_smalldatetime() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&25567u16.to_le_bytes());
        raw.extend_from_slice(&720u16.to_le_bytes());
        let value = decode_value(&raw, TypeId::DateTime4, 0).unwrap();
        match value {
            SqlValue::SmallDateTime(dt) => assert_eq!(dt.unix_timestamp(), 43_200),
            other => panic!("expected smalldatetime, got {other:?}"),
        }
    }

    #[test]
    fn test_datetime_negative_days() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(-700_00i32).to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes());
        let value = decode_value(&raw, TypeId::DateTime, 0).unwrap();
        match value {
            SqlValue::DateTime(dt) => {
                assert_eq!(dt.days, -70_000);
                assert_eq!(dt.unix_timestamp(), 0);
            }
            other => panic!("expected datetime, got {other:?}"),
        }
    }

    #[test]
    fn test_decimal_sign_and_scale() {
        // sign 1 (non-negative), magnitude 12345678 in 4 bytes, scale 4
        let mut raw = vec![1u8];
        raw.extend_from_slice(&12_345_678u32.to_le_bytes());
        let value = decode_value(&raw, TypeId::NumericN, 4).unwrap();
        match value {
            SqlValue::Decimal(d) => {
                assert_eq!(d.integer_part(), 1234);
                assert_eq!(d.fraction_part(), 5678);
            }
            other => panic!("expected decimal, got {other:?}"),
        }

        // sign 0 is negative
        let mut raw = vec![0u8];
        raw.extend_from_slice(&50u64.to_le_bytes());
        let value = decode_value(&raw, TypeId::DecimalN, 1).unwrap();
        match value {
            SqlValue::Decimal(d) => {
                assert_eq!(d.integer_part(), -5);
                assert_eq!(d.fraction_part(), 0);
            }
            other => panic!("expected decimal, got {other:?}"),
        }
    }

    #[test]
    fn test_wide_decimal_unsupported() {
        let mut raw = vec![1u8];
        raw.extend_from_slice(&[0u8; 12]);
        assert_eq!(
            decode_value(&raw, TypeId::DecimalN, 2),
            Err(TypeError::UnsupportedPrecision { width: 12 })
        );
    }

    #[test]
    fn test_strings() {
        let value = decode_value(b"abc", TypeId::BigVarChar, 0).unwrap();
        assert_eq!(value.as_str(), Some("abc"));

        let ucs2: Vec<u8> = "résultat"
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect();
        let value = decode_value(&ucs2, TypeId::NVarChar, 0).unwrap();
        assert_eq!(value.as_str(), Some("résultat"));
    }

    #[test]
    fn test_binary_roundtrip() {
        let value = decode_value(&[1, 2, 3], TypeId::BigVarBinary, 0).unwrap();
        assert_eq!(value.as_bytes(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_guid_wrong_length() {
        assert!(decode_value(&[0u8; 15], TypeId::Guid, 0).is_err());
    }
}
