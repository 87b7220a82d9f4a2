//! RPC (Remote Procedure Call) request encoding.
//!
//! This module provides encoding for RPC requests (packet type 0x03).
//! The driver uses RPC solely for `sp_executesql`, the path that carries
//! parameterised queries.
//!
//! ## Wire Format
//!
//! ```text
//! RPC Request:
//! +--------------------+
//! | 0xFFFF             | (name-length sentinel: proc id follows)
//! +--------------------+
//! | ProcID             | (0x000A = sp_executesql)
//! +--------------------+
//! | Option Flags       | (2 bytes, zero)
//! +--------------------+
//! | @statement param   | (unnamed NVARCHAR)
//! +--------------------+
//! | @params decl param | (unnamed NVARCHAR, SQL declaration syntax)
//! +--------------------+
//! | user parameters    | (repeated, unnamed, in declaration order)
//! +--------------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{ucs2_byte_len, write_ucs2_string};
use crate::error::ProtocolError;
use crate::types::{SizeClass, TypeId};

/// RPC execution mode.
///
/// The mode doubles as the well-known stored procedure ID transmitted in
/// place of a procedure name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMode {
    /// `sp_executesql` (0x000A): execute a parameterised statement.
    ExecuteSql,
    /// `sp_prepexec` (0x000D): reserved, not implemented.
    PrepExec,
}

impl RpcMode {
    /// The wire procedure ID.
    #[must_use]
    pub const fn proc_id(self) -> u16 {
        match self {
            Self::ExecuteSql => 0x000A,
            Self::PrepExec => 0x000D,
        }
    }
}

/// An RPC parameter binding: type tag, declared size and value bytes.
///
/// Parameters are transmitted unnamed, in declaration order. A declared
/// size of zero means "derive from the value".
#[derive(Debug, Clone)]
pub struct RpcParam {
    type_id: TypeId,
    type_size: u32,
    value: Bytes,
}

impl RpcParam {
    /// Create a parameter binding from raw parts.
    ///
    /// Decimal/numeric, money and datetime tags are reserved: binding
    /// them is not implemented and yields a typed error, as do the large
    /// object types.
    pub fn new(type_id: TypeId, type_size: u32, value: Bytes) -> Result<Self, ProtocolError> {
        match type_id {
            TypeId::Bit
            | TypeId::Int1
            | TypeId::Int2
            | TypeId::Int4
            | TypeId::Int8
            | TypeId::Float4
            | TypeId::Float8
            | TypeId::IntN
            | TypeId::BitN
            | TypeId::FloatN
            | TypeId::Guid
            | TypeId::BigChar
            | TypeId::BigVarChar
            | TypeId::NChar
            | TypeId::NVarChar
            | TypeId::BigBinary
            | TypeId::BigVarBinary => Ok(Self {
                type_id,
                type_size,
                value,
            }),
            reserved => Err(ProtocolError::UnsupportedParameterType(reserved as u8)),
        }
    }

    fn fixed(type_id: TypeId, value: &[u8]) -> Self {
        Self {
            type_id,
            type_size: value.len() as u32,
            value: Bytes::copy_from_slice(value),
        }
    }

    /// BIT parameter.
    #[must_use]
    pub fn bit(value: bool) -> Self {
        Self::fixed(TypeId::Bit, &[u8::from(value)])
    }

    /// TINYINT parameter.
    #[must_use]
    pub fn tinyint(value: u8) -> Self {
        Self::fixed(TypeId::Int1, &value.to_le_bytes())
    }

    /// SMALLINT parameter.
    #[must_use]
    pub fn smallint(value: i16) -> Self {
        Self::fixed(TypeId::Int2, &value.to_le_bytes())
    }

    /// INT parameter.
    #[must_use]
    pub fn int(value: i32) -> Self {
        Self::fixed(TypeId::Int4, &value.to_le_bytes())
    }

    /// BIGINT parameter.
    #[must_use]
    pub fn bigint(value: i64) -> Self {
        Self::fixed(TypeId::Int8, &value.to_le_bytes())
    }

    /// REAL parameter.
    #[must_use]
    pub fn real(value: f32) -> Self {
        Self::fixed(TypeId::Float4, &value.to_le_bytes())
    }

    /// FLOAT parameter.
    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::fixed(TypeId::Float8, &value.to_le_bytes())
    }

    /// VARCHAR parameter (single-byte characters, sent as-is).
    #[must_use]
    pub fn varchar(value: &str) -> Self {
        Self {
            type_id: TypeId::BigVarChar,
            type_size: 0,
            value: Bytes::copy_from_slice(value.as_bytes()),
        }
    }

    /// CHAR(n) parameter.
    #[must_use]
    pub fn char(value: &str, size: u32) -> Self {
        Self {
            type_id: TypeId::BigChar,
            type_size: size,
            value: Bytes::copy_from_slice(value.as_bytes()),
        }
    }

    /// NVARCHAR parameter (UCS-2 LE).
    #[must_use]
    pub fn nvarchar(value: &str) -> Self {
        let mut buf = BytesMut::with_capacity(ucs2_byte_len(value));
        write_ucs2_string(&mut buf, value);
        Self {
            type_id: TypeId::NVarChar,
            type_size: 0,
            value: buf.freeze(),
        }
    }

    /// NCHAR(n) parameter (UCS-2 LE).
    #[must_use]
    pub fn nchar(value: &str, size: u32) -> Self {
        let mut buf = BytesMut::with_capacity(ucs2_byte_len(value));
        write_ucs2_string(&mut buf, value);
        Self {
            type_id: TypeId::NChar,
            type_size: size,
            value: buf.freeze(),
        }
    }

    /// VARBINARY parameter.
    #[must_use]
    pub fn varbinary(value: &[u8]) -> Self {
        Self {
            type_id: TypeId::BigVarBinary,
            type_size: 0,
            value: Bytes::copy_from_slice(value),
        }
    }

    /// BINARY(n) parameter.
    #[must_use]
    pub fn binary(value: &[u8], size: u32) -> Self {
        Self {
            type_id: TypeId::BigBinary,
            type_size: size,
            value: Bytes::copy_from_slice(value),
        }
    }

    /// UNIQUEIDENTIFIER parameter, bytes in wire order.
    #[must_use]
    pub fn guid(value: [u8; 16]) -> Self {
        Self {
            type_id: TypeId::Guid,
            type_size: 16,
            value: Bytes::copy_from_slice(&value),
        }
    }

    /// The parameter's type tag.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The declared size (zero = derived from the value).
    #[must_use]
    pub const fn type_size(&self) -> u32 {
        self.type_size
    }

    /// The raw value bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The (type, max-length) pair actually transmitted: fixed-length
    /// tags convert to their nullable variable-size sibling, everything
    /// else passes through.
    fn wire_type(&self) -> (TypeId, u32) {
        match self.type_id.to_variable_sibling() {
            Some((sibling, width)) => (sibling, u32::from(width)),
            None => {
                let max_len = if self.type_size != 0 {
                    self.type_size
                } else {
                    self.value.len() as u32
                };
                (self.type_id, max_len)
            }
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(0); // name length: parameters are positional
        buf.put_u8(0); // status flags

        let (wire_type, max_len) = self.wire_type();
        buf.put_u8(wire_type as u8);

        let put_collation = |buf: &mut BytesMut| {
            if wire_type.has_collation() {
                buf.put_slice(&[0u8; 5]);
            }
        };

        match wire_type.size_class() {
            SizeClass::VarU8 => {
                buf.put_u8(max_len as u8);
                put_collation(buf);
                buf.put_u8(self.value.len() as u8);
            }
            SizeClass::VarU16 => {
                buf.put_u16_le(max_len as u16);
                put_collation(buf);
                buf.put_u16_le(self.value.len() as u16);
            }
            SizeClass::VarU32 => {
                buf.put_u32_le(max_len);
                put_collation(buf);
                buf.put_u32_le(self.value.len() as u32);
            }
            SizeClass::Fixed(_) | SizeClass::VarPrecision => {
                // Fixed tags were converted above; precision tags are
                // rejected at construction.
            }
        }

        buf.put_slice(&self.value);
    }

    /// SQL declaration fragment for this parameter, e.g. `INT` or
    /// `NVARCHAR(30)`.
    fn declaration(&self) -> String {
        let sized = |name: &str, len: u32| format!("{name}({len})");

        match (self.type_id, self.type_size) {
            (TypeId::Bit | TypeId::BitN, _) => "BIT".to_string(),
            (TypeId::Int1, _) => "TINYINT".to_string(),
            (TypeId::Int2, _) => "SMALLINT".to_string(),
            (TypeId::Int4, _) => "INT".to_string(),
            (TypeId::Int8, _) => "BIGINT".to_string(),
            (TypeId::IntN, size) => match size {
                1 => "TINYINT".to_string(),
                2 => "SMALLINT".to_string(),
                8 => "BIGINT".to_string(),
                _ => "INT".to_string(),
            },
            (TypeId::Float4, _) => "REAL".to_string(),
            (TypeId::Float8, _) => "FLOAT".to_string(),
            (TypeId::FloatN, size) => {
                if size == 4 {
                    "REAL".to_string()
                } else {
                    "FLOAT".to_string()
                }
            }
            (TypeId::Guid, _) => "UNIQUEIDENTIFIER".to_string(),
            (TypeId::BigVarChar, size) => {
                sized("VARCHAR", self.char_declaration_len(size, 1))
            }
            (TypeId::BigChar, size) => sized("CHAR", self.char_declaration_len(size, 1)),
            (TypeId::NVarChar, size) => {
                sized("NVARCHAR", self.char_declaration_len(size, 2))
            }
            (TypeId::NChar, size) => sized("NCHAR", self.char_declaration_len(size, 2)),
            (TypeId::BigVarBinary, size) => {
                sized("VARBINARY", self.char_declaration_len(size, 1))
            }
            (TypeId::BigBinary, size) => sized("BINARY", self.char_declaration_len(size, 1)),
            // Remaining tags are rejected at construction.
            (other, _) => format!("/* unsupported {:#x} */", other as u8),
        }
    }

    /// Declared length for sized types: the caller-supplied size when
    /// non-zero, otherwise the value's byte length (halved for UCS-2).
    fn char_declaration_len(&self, size: u32, unit: u32) -> u32 {
        if size != 0 {
            size
        } else {
            (self.value.len() as u32) / unit
        }
    }
}

/// An `sp_executesql` RPC request.
#[derive(Debug, Clone)]
pub struct RpcRequest<'a> {
    statement: &'a str,
    params: &'a [RpcParam],
}

impl<'a> RpcRequest<'a> {
    /// Create an `sp_executesql` request for `statement` with `params`
    /// bound positionally as `@p0`, `@p1`, ….
    #[must_use]
    pub fn execute_sql(statement: &'a str, params: &'a [RpcParam]) -> Self {
        Self { statement, params }
    }

    /// Build the parameter declaration string,
    /// e.g. `@p0 INT,@p1 NVARCHAR(30)`.
    #[must_use]
    pub fn declarations(&self) -> String {
        self.params
            .iter()
            .enumerate()
            .map(|(idx, param)| format!("@p{idx} {}", param.declaration()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Encode the RPC request payload.
    ///
    /// The result is the message payload only; the framer supplies TDS
    /// packet headers when it is sent.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64 + ucs2_byte_len(self.statement));

        // Procedure id instead of a name.
        buf.put_u16_le(0xFFFF);
        buf.put_u16_le(RpcMode::ExecuteSql.proc_id());
        buf.put_u16_le(0); // option flags

        // @statement
        Self::put_nvarchar_param(&mut buf, |buf| {
            write_ucs2_string(buf, self.statement);
        });

        // @params declaration string; zero-length when there are none
        let declarations = self.declarations();
        Self::put_nvarchar_param(&mut buf, |buf| {
            write_ucs2_string(buf, &declarations);
        });

        for param in self.params {
            param.encode(&mut buf);
        }

        buf.freeze()
    }

    /// Write an unnamed NVARCHAR parameter: max-length 8000, five zero
    /// collation bytes, u16 byte length, then the UCS-2 data produced by
    /// `write_value`. The length field is patched after the data is
    /// written.
    fn put_nvarchar_param(buf: &mut BytesMut, write_value: impl FnOnce(&mut BytesMut)) {
        buf.put_u8(0); // name length
        buf.put_u8(0); // status flags
        buf.put_u8(TypeId::NVarChar as u8);
        buf.put_u16_le(8000); // max length
        buf.put_slice(&[0u8; 5]); // collation

        let len_at = buf.len();
        buf.put_u16_le(0); // byte length placeholder
        let data_start = buf.len();
        write_value(buf);
        let byte_len = (buf.len() - data_start) as u16;
        buf[len_at..len_at + 2].copy_from_slice(&byte_len.to_le_bytes());
    }
}
