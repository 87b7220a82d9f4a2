//! SQL value representation.

use std::fmt;

use bytes::Bytes;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Days from 1900-01-01 (the TDS datetime epoch) to 1970-01-01.
///
/// The true calendar distance, including the seventeen leap days in
/// between.
pub const DAYS_1900_TO_1970: i64 = 25567;

/// A SQL value decoded from a row field.
///
/// This enum provides a type-safe way to handle SQL values that may be
/// of various types, including NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value (BIT).
    Bool(bool),
    /// 8-bit unsigned integer (TINYINT).
    TinyInt(u8),
    /// 16-bit signed integer (SMALLINT).
    SmallInt(i16),
    /// 32-bit signed integer (INT).
    Int(i32),
    /// 64-bit signed integer (BIGINT).
    BigInt(i64),
    /// 32-bit floating point (REAL).
    Float(f32),
    /// 64-bit floating point (FLOAT).
    Double(f64),
    /// Character value (CHAR, VARCHAR, NCHAR, NVARCHAR, TEXT, NTEXT).
    String(String),
    /// Binary value (BINARY, VARBINARY, IMAGE).
    Binary(Bytes),
    /// MONEY / SMALLMONEY value.
    Money(Money),
    /// DATETIME value.
    DateTime(DateTime),
    /// SMALLDATETIME value.
    SmallDateTime(SmallDateTime),
    /// DECIMAL / NUMERIC value.
    Decimal(Decimal),
    /// UNIQUEIDENTIFIER value.
    Guid(uuid::Uuid),
}

impl SqlValue {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as a bool, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an i32, widening narrower integers.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::SmallInt(v) => Some(i32::from(*v)),
            Self::TinyInt(v) => Some(i32::from(*v)),
            _ => None,
        }
    }

    /// Get the value as an i64, widening narrower integers.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            Self::SmallInt(v) => Some(i64::from(*v)),
            Self::TinyInt(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as an f64, widening REAL.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Money(v) => Some(v.to_f64()),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is character data.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it is binary.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for SqlValue {
    fn default() -> Self {
        Self::Null
    }
}

/// MONEY / SMALLMONEY: a signed integer holding the value times 10^4.
///
/// On the wire an 8-byte money value arrives as two 4-byte halves, the
/// more significant half first. SMALLMONEY is a plain 4-byte integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Money {
    raw: i64,
}

impl Money {
    /// Build from the two on-wire halves of an 8-byte money value.
    #[must_use]
    pub fn from_halves(more_significant: u32, less_significant: u32) -> Self {
        Self {
            raw: ((u64::from(more_significant) << 32) | u64::from(less_significant)) as i64,
        }
    }

    /// Build from a 4-byte SMALLMONEY integer.
    #[must_use]
    pub fn from_small(raw: i32) -> Self {
        Self {
            raw: i64::from(raw),
        }
    }

    /// The raw scaled integer as stored by the server.
    #[must_use]
    pub const fn raw(&self) -> i64 {
        self.raw
    }

    /// The integer part of the monetary value.
    #[must_use]
    pub const fn integer_part(&self) -> i64 {
        self.raw / 10_000
    }

    /// The fractional part, in ten-thousandths. Negative for negative
    /// values.
    #[must_use]
    pub const fn fraction_part(&self) -> i64 {
        self.raw % 10_000
    }

    /// Floating point conversion.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.integer_part() as f64 + self.fraction_part() as f64 / 10_000.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.raw < 0 { "-" } else { "" };
        write!(
            f,
            "{sign}{}.{:04}",
            self.integer_part().unsigned_abs(),
            self.fraction_part().unsigned_abs()
        )
    }
}

/// SMALLDATETIME: days since 1900-01-01 and minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmallDateTime {
    /// Days since 1900-01-01.
    pub days: u16,
    /// Minutes elapsed since midnight.
    pub minutes: u16,
}

impl SmallDateTime {
    /// Convert to a unix timestamp. Dates before 1970-01-01 clamp to 0.
    #[must_use]
    pub fn unix_timestamp(&self) -> u64 {
        let days = i64::from(self.days);
        if days < DAYS_1900_TO_1970 {
            return 0;
        }
        ((days - DAYS_1900_TO_1970) * 86_400 + i64::from(self.minutes) * 60) as u64
    }

    /// Convert to a calendar date and time.
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let base = NaiveDate::from_ymd_opt(1900, 1, 1)?.and_hms_opt(0, 0, 0)?;
        base.checked_add_signed(
            Duration::days(i64::from(self.days)) + Duration::minutes(i64::from(self.minutes)),
        )
    }
}

/// DATETIME: days since 1900-01-01 (negative back to 1753-01-01) and
/// three-hundredths of a second after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    /// Days since 1900-01-01.
    pub days: i32,
    /// Three-hundredths of a second elapsed since midnight.
    pub ticks: u32,
}

impl DateTime {
    /// Convert to a unix timestamp. Dates before 1970-01-01 clamp to 0.
    #[must_use]
    pub fn unix_timestamp(&self) -> u64 {
        let days = i64::from(self.days);
        if days < DAYS_1900_TO_1970 {
            return 0;
        }
        ((days - DAYS_1900_TO_1970) * 86_400 + i64::from(self.ticks) / 300) as u64
    }

    /// Convert to a calendar date and time.
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        let base = NaiveDate::from_ymd_opt(1900, 1, 1)?.and_hms_opt(0, 0, 0)?;
        base.checked_add_signed(
            Duration::days(i64::from(self.days))
                + Duration::milliseconds(i64::from(self.ticks) * 1000 / 300),
        )
    }
}

/// DECIMAL / NUMERIC: sign and scaled integer magnitude.
///
/// Magnitudes up to 8 bytes (precision 19) are representable; the wider
/// encodings are rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    negative: bool,
    magnitude: u64,
    scale: u8,
}

impl Decimal {
    /// Build from decoded parts.
    #[must_use]
    pub fn new(negative: bool, magnitude: u64, scale: u8) -> Self {
        Self {
            negative,
            magnitude,
            scale,
        }
    }

    /// The column scale (digits right of the decimal point).
    #[must_use]
    pub const fn scale(&self) -> u8 {
        self.scale
    }

    fn divisor(&self) -> u64 {
        10u64.saturating_pow(u32::from(self.scale))
    }

    /// The integer part, signed.
    #[must_use]
    pub fn integer_part(&self) -> i64 {
        let part = (self.magnitude / self.divisor()) as i64;
        if self.negative { -part } else { part }
    }

    /// The fractional part as a scaled integer, signed.
    #[must_use]
    pub fn fraction_part(&self) -> i64 {
        let part = (self.magnitude % self.divisor()) as i64;
        if self.negative { -part } else { part }
    }

    /// Floating point conversion.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        let value = self.magnitude as f64 / self.divisor() as f64;
        if self.negative { -value } else { value }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        if self.scale == 0 {
            return write!(f, "{sign}{}", self.magnitude);
        }
        write!(
            f,
            "{sign}{}.{:0width$}",
            self.magnitude / self.divisor(),
            self.magnitude % self.divisor(),
            width = self.scale as usize
        )
    }
}

/// Format GUID bytes the way SQL Server prints them: the first three
/// groups little-endian, the last eight bytes as-is.
///
/// Anything but sixteen bytes yields `<INVALID>`.
#[must_use]
pub fn format_guid(data: &[u8]) -> String {
    match guid_from_wire(data) {
        Some(uuid) => uuid.to_string(),
        None => "<INVALID>".to_string(),
    }
}

/// Reorder on-wire GUID bytes into a [`uuid::Uuid`].
///
/// SQL Server stores the time fields little-endian; the node bytes keep
/// their order.
#[must_use]
pub fn guid_from_wire(data: &[u8]) -> Option<uuid::Uuid> {
    let raw: &[u8; 16] = data.try_into().ok()?;
    let mut bytes = [0u8; 16];
    bytes[0] = raw[3];
    bytes[1] = raw[2];
    bytes[2] = raw[1];
    bytes[3] = raw[0];
    bytes[4] = raw[5];
    bytes[5] = raw[4];
    bytes[6] = raw[7];
    bytes[7] = raw[6];
    bytes[8..].copy_from_slice(&raw[8..]);
    Some(uuid::Uuid::from_bytes(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_extremes() {
        let min = Money::from_halves(0x8000_0000, 0x0000_0000);
        assert_eq!(min.raw(), i64::MIN);
        assert_eq!(min.integer_part(), -922_337_203_685_477);
        assert_eq!(min.fraction_part(), -5808);
        assert!((min.to_f64() - (-922_337_203_685_477.5808)).abs() < 0.5);

        let max = Money::from_halves(0x7FFF_FFFF, 0xFFFF_FFFF);
        assert_eq!(max.raw(), i64::MAX);
        assert_eq!(max.integer_part(), 922_337_203_685_477);
        assert_eq!(max.fraction_part(), 5807);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_small(12_3456).to_string(), "12.3456");
        assert_eq!(Money::from_small(-5_0001).to_string(), "-5.0001");
        assert_eq!(Money::from_small(99).to_string(), "0.0099");
    }

    #[test]
    fn test_smalldatetime_epoch() {
        let epoch = SmallDateTime {
            days: 25567,
            minutes: 0,
        };
        assert_eq!(epoch.unix_timestamp(), 0);

        let noon = SmallDateTime {
            days: 25567,
            minutes: 720,
        };
        assert_eq!(noon.unix_timestamp(), 43_200);

        // before the unix epoch clamps to zero
        let before = SmallDateTime { days: 0, minutes: 0 };
        assert_eq!(before.unix_timestamp(), 0);
    }

    #[test]
    fn test_smalldatetime_to_naive() {
        let noon = SmallDateTime {
            days: 25567,
            minutes: 720,
        };
        let naive = noon.to_naive().unwrap();
        assert_eq!(naive.to_string(), "1970-01-01 12:00:00");
    }

    #[test]
    fn test_datetime_epoch() {
        let one_minute_past = DateTime {
            days: 25567,
            ticks: 60 * 300,
        };
        assert_eq!(one_minute_past.unix_timestamp(), 60);

        let seventeenth_century = DateTime {
            days: -1000,
            ticks: 0,
        };
        assert_eq!(seventeenth_century.unix_timestamp(), 0);
    }

    #[test]
    fn test_decimal_parts() {
        let value = Decimal::new(false, 1234_5678, 4);
        assert_eq!(value.integer_part(), 1234);
        assert_eq!(value.fraction_part(), 5678);
        assert_eq!(value.to_string(), "1234.5678");

        let negative = Decimal::new(true, 1234_5678, 4);
        assert_eq!(negative.integer_part(), -1234);
        assert_eq!(negative.fraction_part(), -5678);
        assert_eq!(negative.to_string(), "-1234.5678");

        let unscaled = Decimal::new(false, 42, 0);
        assert_eq!(unscaled.integer_part(), 42);
        assert_eq!(unscaled.fraction_part(), 0);
        assert_eq!(unscaled.to_string(), "42");
    }

    #[test]
    fn test_guid_formatting() {
        // on-wire bytes of 00112233-4455-6677-8899-aabbccddeeff
        let wire = [
            0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ];
        assert_eq!(format_guid(&wire), "00112233-4455-6677-8899-aabbccddeeff");
        assert_eq!(format_guid(&wire[..15]), "<INVALID>");
        assert_eq!(format_guid(&[]), "<INVALID>");
    }
}
