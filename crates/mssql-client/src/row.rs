//! The row model: fields as byte views interpreted on demand.

use bytes::Bytes;
use tds_protocol::token::{ColMetaData, Column};
use tds_protocol::types::TypeId;
use mssql_types::{SqlValue, TypeError, decode_value, format_guid};

/// One row of a result set.
///
/// A row owns one optional byte view per column of the preceding
/// COLMETADATA. `None` is a NULL field; an empty `Some` view is a
/// present, zero-length value — the two are distinct states.
#[derive(Debug, Clone)]
pub struct Row {
    fields: Vec<Option<Bytes>>,
}

impl Row {
    pub(crate) fn new(fields: Vec<Option<Bytes>>) -> Self {
        Self { fields }
    }

    /// Number of fields, equal to the result set's column count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// View of the field at `index`, paired with its column descriptor
    /// from `meta`.
    #[must_use]
    pub fn field<'a>(&'a self, meta: &'a ColMetaData, index: usize) -> Option<Field<'a>> {
        let data = self.fields.get(index)?;
        let column = meta.columns.get(index)?;
        Some(Field {
            data: data.as_ref(),
            column,
        })
    }

    /// Iterate over the row's fields with their column descriptors.
    pub fn fields<'a>(&'a self, meta: &'a ColMetaData) -> impl Iterator<Item = Field<'a>> {
        self.fields
            .iter()
            .zip(meta.columns.iter())
            .map(|(data, column)| Field {
                data: data.as_ref(),
                column,
            })
    }
}

/// A field: a byte view plus its column descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    data: Option<&'a Bytes>,
    column: &'a Column,
}

impl<'a> Field<'a> {
    /// Whether the field is NULL. Distinct from a zero-length value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// The raw field bytes; empty for NULL fields.
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        self.data.map_or(&[], |b| b.as_ref())
    }

    /// The field's column descriptor.
    #[must_use]
    pub fn column(&self) -> &'a Column {
        self.column
    }

    /// Interpret the bytes as a typed SQL value.
    pub fn value(&self) -> Result<SqlValue, TypeError> {
        match self.data {
            None => Ok(SqlValue::Null),
            Some(data) => decode_value(
                data,
                self.column.type_id,
                self.column.props.scale().unwrap_or(0),
            ),
        }
    }

    /// The value as a bool, if it is a non-NULL bit.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.value().ok()?.as_bool()
    }

    /// The value as an i32, if it is a non-NULL integer that fits.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        self.value().ok()?.as_i32()
    }

    /// The value as an i64, if it is a non-NULL integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.value().ok()?.as_i64()
    }

    /// The value as an f64, if it is a non-NULL float or money.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.value().ok()?.as_f64()
    }

    /// The value as a string, if it is non-NULL character data.
    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        match self.value().ok()? {
            SqlValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// UCS-2 code units of an N-typed character field.
    #[must_use]
    pub fn utf16_units(&self) -> Vec<u16> {
        self.bytes()
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    /// Human-readable rendering of the field, `NULL` for NULL fields.
    ///
    /// GUID fields with a malformed length render as `<INVALID>`.
    #[must_use]
    pub fn display(&self) -> String {
        let Some(data) = self.data else {
            return "NULL".to_string();
        };
        if self.column.type_id == TypeId::Guid {
            return format_guid(data);
        }
        match self.value() {
            Ok(SqlValue::Null) => "NULL".to_string(),
            Ok(SqlValue::Bool(v)) => v.to_string(),
            Ok(SqlValue::TinyInt(v)) => v.to_string(),
            Ok(SqlValue::SmallInt(v)) => v.to_string(),
            Ok(SqlValue::Int(v)) => v.to_string(),
            Ok(SqlValue::BigInt(v)) => v.to_string(),
            Ok(SqlValue::Float(v)) => v.to_string(),
            Ok(SqlValue::Double(v)) => v.to_string(),
            Ok(SqlValue::String(v)) => v,
            Ok(SqlValue::Binary(v)) => format!("0x{}", hex(&v)),
            Ok(SqlValue::Money(v)) => v.to_string(),
            Ok(SqlValue::Decimal(v)) => v.to_string(),
            Ok(SqlValue::DateTime(v)) => v
                .to_naive()
                .map_or_else(|| v.unix_timestamp().to_string(), |n| n.to_string()),
            Ok(SqlValue::SmallDateTime(v)) => v
                .to_naive()
                .map_or_else(|| v.unix_timestamp().to_string(), |n| n.to_string()),
            Ok(SqlValue::Guid(v)) => v.to_string(),
            Err(_) => "<INVALID>".to_string(),
        }
    }
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}
