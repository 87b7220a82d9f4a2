//! TDS token stream definitions.
//!
//! Tokens are the fundamental units of TDS response data. The server sends
//! a stream of tokens that describe metadata, rows, errors, and other
//! information.
//!
//! ## Token Structure
//!
//! Each token begins with a 1-byte token type identifier, followed by
//! token-specific data. The DONE family and OFFSET/RETURNSTATUS have fixed
//! lengths; every other token the driver handles carries a 2-byte length
//! prefix.
//!
//! ## Partial input
//!
//! All decoders operate on `&mut &[u8]` and check availability before every
//! read. A shortage surfaces as [`ProtocolError::Incomplete`], which the
//! caller converts into a byte deficit for the framer; no decoder consumes
//! input past the point of failure without producing a value.

use bytes::Bytes;

use crate::codec::{
    collect_ucs2_units, parse_ucs2_decimal, read_b_varchar, read_b_varchar_raw, read_us_varchar,
};
use crate::error::ProtocolError;
use crate::types::{SizeClass, TypeId};
use crate::version::TdsVersion;

/// Token type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenType {
    /// Column metadata (COLMETADATA).
    ColMetaData = 0x81,
    /// Error message (ERROR).
    Error = 0xAA,
    /// Informational message (INFO).
    Info = 0xAB,
    /// Login acknowledgment (LOGINACK).
    LoginAck = 0xAD,
    /// Row data (ROW).
    Row = 0xD1,
    /// Environment change (ENVCHANGE).
    EnvChange = 0xE3,
    /// Done (DONE).
    Done = 0xFD,
    /// Done procedure (DONEPROC).
    DoneProc = 0xFE,
    /// Done in procedure (DONEINPROC).
    DoneInProc = 0xFF,
    /// Offset (OFFSET).
    Offset = 0x78,
    /// Return status (RETURNSTATUS).
    ReturnStatus = 0x79,
}

impl TokenType {
    /// Create a token type from a raw byte.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x81 => Some(Self::ColMetaData),
            0xAA => Some(Self::Error),
            0xAB => Some(Self::Info),
            0xAD => Some(Self::LoginAck),
            0xD1 => Some(Self::Row),
            0xE3 => Some(Self::EnvChange),
            0xFD => Some(Self::Done),
            0xFE => Some(Self::DoneProc),
            0xFF => Some(Self::DoneInProc),
            0x78 => Some(Self::Offset),
            0x79 => Some(Self::ReturnStatus),
            _ => None,
        }
    }

    /// Body size for tokens that carry no length prefix.
    ///
    /// Everything else announces its own size in a 2-byte field.
    #[must_use]
    pub fn fixed_body_size(value: u8) -> Option<usize> {
        match Self::from_u8(value) {
            Some(Self::Done | Self::DoneProc | Self::DoneInProc) => Some(Done::SIZE),
            Some(Self::Offset | Self::ReturnStatus) => Some(4),
            _ => None,
        }
    }
}

// =============================================================================
// DONE / DONEPROC / DONEINPROC
// =============================================================================

/// Done token status flags bit positions.
mod done_status_bits {
    pub const DONE_MORE: u16 = 0x0001;
    pub const DONE_ERROR: u16 = 0x0002;
    pub const DONE_INXACT: u16 = 0x0004;
    pub const DONE_COUNT: u16 = 0x0010;
    pub const DONE_ATTN: u16 = 0x0020;
    pub const DONE_SRVERROR: u16 = 0x0100;
}

/// Done status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoneStatus {
    /// More results follow.
    pub more: bool,
    /// Error occurred.
    pub error: bool,
    /// Transaction in progress.
    pub in_xact: bool,
    /// Row count is valid.
    pub count_valid: bool,
    /// Attention acknowledgment.
    pub attn: bool,
    /// Server error caused statement termination.
    pub srverror: bool,
}

impl DoneStatus {
    /// Parse done status from raw bits.
    #[must_use]
    pub fn from_bits(bits: u16) -> Self {
        use done_status_bits::*;
        Self {
            more: (bits & DONE_MORE) != 0,
            error: (bits & DONE_ERROR) != 0,
            in_xact: (bits & DONE_INXACT) != 0,
            count_valid: (bits & DONE_COUNT) != 0,
            attn: (bits & DONE_ATTN) != 0,
            srverror: (bits & DONE_SRVERROR) != 0,
        }
    }

    /// Convert to raw bits.
    #[must_use]
    pub fn to_bits(&self) -> u16 {
        use done_status_bits::*;
        let mut bits = 0u16;
        if self.more {
            bits |= DONE_MORE;
        }
        if self.error {
            bits |= DONE_ERROR;
        }
        if self.in_xact {
            bits |= DONE_INXACT;
        }
        if self.count_valid {
            bits |= DONE_COUNT;
        }
        if self.attn {
            bits |= DONE_ATTN;
        }
        if self.srverror {
            bits |= DONE_SRVERROR;
        }
        bits
    }
}

/// Which of the DONE-family tokens produced a [`Done`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneKind {
    /// Final completion of a SQL statement.
    Done,
    /// Completion of a stored procedure.
    DoneProc,
    /// Completion of a statement within a stored procedure.
    DoneInProc,
}

/// Done token indicating statement completion.
///
/// TDS 7.1/7.2 carries a 4-byte row count.
#[derive(Debug, Clone, Copy)]
pub struct Done {
    /// Which DONE variant arrived.
    pub kind: DoneKind,
    /// Status flags.
    pub status: DoneStatus,
    /// Current command.
    pub cur_cmd: u16,
    /// Row count (valid when `status.count_valid`).
    pub done_row_count: u32,
}

impl Done {
    /// Size of the token body in bytes (excluding the token type byte).
    pub const SIZE: usize = 8; // 2 (status) + 2 (curcmd) + 4 (rowcount)

    /// Decode a DONE-family token body.
    pub fn decode(src: &mut &[u8], kind: DoneKind) -> Result<Self, ProtocolError> {
        ProtocolError::need(src, Self::SIZE)?;

        let status = DoneStatus::from_bits(u16::from_le_bytes([src[0], src[1]]));
        let cur_cmd = u16::from_le_bytes([src[2], src[3]]);
        let done_row_count = u32::from_le_bytes([src[4], src[5], src[6], src[7]]);
        *src = &src[Self::SIZE..];

        Ok(Self {
            kind,
            status,
            cur_cmd,
            done_row_count,
        })
    }

    /// Encode the token including its type byte.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let token = match self.kind {
            DoneKind::Done => TokenType::Done,
            DoneKind::DoneProc => TokenType::DoneProc,
            DoneKind::DoneInProc => TokenType::DoneInProc,
        };
        let mut out = Vec::with_capacity(1 + Self::SIZE);
        out.push(token as u8);
        out.extend_from_slice(&self.status.to_bits().to_le_bytes());
        out.extend_from_slice(&self.cur_cmd.to_le_bytes());
        out.extend_from_slice(&self.done_row_count.to_le_bytes());
        out
    }
}

// =============================================================================
// INFO / ERROR
// =============================================================================

/// Server INFO or ERROR message.
///
/// Both tokens share one wire layout; the severity class separates
/// informational messages from errors.
#[derive(Debug, Clone)]
pub struct ServerMessage {
    /// Message number.
    pub number: u32,
    /// Message state.
    pub state: u8,
    /// Severity class.
    pub class: u8,
    /// Message text.
    pub message: String,
    /// Server name.
    pub server: String,
    /// Procedure name.
    pub procedure: String,
    /// Line number within the batch or procedure.
    pub line: u16,
}

impl ServerMessage {
    /// Absolute minimum body size: number + state + class + three empty
    /// strings + line number.
    pub const MIN_SIZE: usize = 14;

    /// Decode an INFO/ERROR token body (after the 2-byte length field).
    pub fn decode(src: &mut &[u8]) -> Result<Self, ProtocolError> {
        ProtocolError::need(src, Self::MIN_SIZE)?;

        let number = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        let state = src[4];
        let class = src[5];
        *src = &src[6..];

        let message = read_us_varchar(src)?;
        let server = read_b_varchar(src)?;
        let procedure = read_b_varchar(src)?;

        ProtocolError::need(src, 2)?;
        let line = u16::from_le_bytes([src[0], src[1]]);
        *src = &src[2..];

        Ok(Self {
            number,
            state,
            class,
            message,
            server,
            procedure,
            line,
        })
    }

    /// Informational messages have severity class 10 or lower.
    #[must_use]
    pub const fn is_info(&self) -> bool {
        self.class <= 10
    }
}

// =============================================================================
// LOGINACK
// =============================================================================

/// Login acknowledgment token.
#[derive(Debug, Clone)]
pub struct LoginAck {
    /// Interface type.
    pub interface: u8,
    /// Negotiated TDS version.
    pub tds_version: TdsVersion,
    /// Server program name.
    pub prog_name: String,
    /// Server program version: major, minor, build-hi, build-lo.
    pub prog_version: [u8; 4],
}

impl LoginAck {
    /// Minimum body size before the program version bytes.
    pub const MIN_SIZE: usize = 10;

    /// Decode a LOGINACK token body (after the 2-byte length field).
    pub fn decode(src: &mut &[u8]) -> Result<Self, ProtocolError> {
        ProtocolError::need(src, Self::MIN_SIZE)?;

        let interface = src[0];
        let tds_version = TdsVersion::new(u32::from_le_bytes([src[1], src[2], src[3], src[4]]));
        *src = &src[5..];

        let prog_name = read_b_varchar(src)?;

        ProtocolError::need(src, 4)?;
        let prog_version = [src[0], src[1], src[2], src[3]];
        *src = &src[4..];

        Ok(Self {
            interface,
            tds_version,
            prog_name,
            prog_version,
        })
    }
}

// =============================================================================
// ENVCHANGE
// =============================================================================

/// Environment change sub-types the driver interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EnvChangeType {
    /// Database changed.
    Database = 1,
    /// Language changed.
    Language = 2,
    /// Character set changed.
    CharacterSet = 3,
    /// Packet size renegotiated.
    PacketSize = 4,
}

impl EnvChangeType {
    /// Create from raw byte value.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Database),
            2 => Some(Self::Language),
            3 => Some(Self::CharacterSet),
            4 => Some(Self::PacketSize),
            _ => None,
        }
    }
}

/// Environment change token.
///
/// All four handled sub-types arrive in `B_VARCHAR new, B_VARCHAR old`
/// form. For packet-size changes the new value is decimal ASCII in UCS-2;
/// the parsed number rides along.
#[derive(Debug, Clone)]
pub struct EnvChange {
    /// Sub-type of the change.
    pub env_type: EnvChangeType,
    /// New value.
    pub new_value: String,
    /// Old value.
    pub old_value: String,
    /// Parsed packet size, for [`EnvChangeType::PacketSize`] only.
    pub packet_size: Option<u32>,
}

impl EnvChange {
    /// Decode an ENVCHANGE token body (after the 2-byte length field).
    ///
    /// Returns `Ok(None)` for sub-types the driver skips silently; the
    /// caller advances past the token body regardless.
    pub fn decode(src: &mut &[u8]) -> Result<Option<Self>, ProtocolError> {
        ProtocolError::need(src, 1)?;
        let type_byte = src[0];
        *src = &src[1..];

        let Some(env_type) = EnvChangeType::from_u8(type_byte) else {
            return Ok(None);
        };

        let new_raw = read_b_varchar_raw(src)?;
        let packet_size = (env_type == EnvChangeType::PacketSize)
            .then(|| parse_ucs2_decimal(new_raw));
        let new_value = String::from_utf16_lossy(&collect_ucs2_units(new_raw));

        let old_raw = read_b_varchar_raw(src)?;
        let old_value = String::from_utf16_lossy(&collect_ucs2_units(old_raw));

        Ok(Some(Self {
            env_type,
            new_value,
            old_value,
            packet_size,
        }))
    }
}

// =============================================================================
// COLMETADATA
// =============================================================================

/// Type-specific length properties of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeProps {
    /// Fixed length, known from the type byte alone.
    Fixed(u8),
    /// Declared maximum length for variable-size types.
    MaxLength(u32),
    /// Length, precision and scale for DECIMAL/NUMERIC.
    Precision {
        /// Maximum on-wire length.
        length: u8,
        /// Total digits.
        precision: u8,
        /// Digits right of the decimal point.
        scale: u8,
    },
}

impl TypeProps {
    /// Scale for precision-typed columns, `None` otherwise.
    #[must_use]
    pub const fn scale(&self) -> Option<u8> {
        match self {
            Self::Precision { scale, .. } => Some(*scale),
            _ => None,
        }
    }
}

/// One column of a result set.
#[derive(Debug, Clone)]
pub struct Column {
    /// User-defined type code.
    pub user_type: u16,
    /// Raw column flag word; see [`crate::types::ColumnFlags`].
    pub flags: u16,
    /// Data type tag.
    pub type_id: TypeId,
    /// Type-specific length properties.
    pub props: TypeProps,
    /// Column name, present only when the caller opted in.
    pub name: Option<String>,
}

/// Column metadata token: the shape of the subsequent ROW stream.
#[derive(Debug, Clone, Default)]
pub struct ColMetaData {
    /// Column definitions, in result-set order.
    pub columns: Vec<Column>,
}

impl ColMetaData {
    /// Minimum bytes before column parsing can start: the column count
    /// plus the smallest possible column entry.
    pub const MIN_SIZE: usize = 8;

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the result set has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Decode a COLMETADATA token body.
    ///
    /// `read_column_names` controls whether column names are materialised
    /// or skipped. Collation bytes and text-type table names are always
    /// skipped; the driver does not interpret them.
    pub fn decode(src: &mut &[u8], read_column_names: bool) -> Result<Self, ProtocolError> {
        ProtocolError::need(src, Self::MIN_SIZE)?;
        let column_count = u16::from_le_bytes([src[0], src[1]]) as usize;
        *src = &src[2..];

        let mut columns = Vec::with_capacity(column_count);
        while columns.len() < column_count {
            columns.push(Self::decode_column(src, read_column_names)?);
        }

        Ok(Self { columns })
    }

    fn decode_column(src: &mut &[u8], read_name: bool) -> Result<Column, ProtocolError> {
        // user_type + flags + type + column name length
        ProtocolError::need(src, 6)?;
        let user_type = u16::from_le_bytes([src[0], src[1]]);
        let flags = u16::from_le_bytes([src[2], src[3]]);
        let type_byte = src[4];
        *src = &src[5..];

        let type_id = TypeId::parse(type_byte)?;
        ProtocolError::need(src, type_id.min_colmetadata_size())?;

        let props = match type_id.size_class() {
            SizeClass::Fixed(len) => TypeProps::Fixed(len),
            SizeClass::VarU8 => {
                let len = src[0];
                *src = &src[1..];
                TypeProps::MaxLength(u32::from(len))
            }
            SizeClass::VarU16 => {
                let len = u16::from_le_bytes([src[0], src[1]]);
                *src = &src[2..];
                TypeProps::MaxLength(u32::from(len))
            }
            SizeClass::VarU32 => {
                let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
                *src = &src[4..];
                TypeProps::MaxLength(len)
            }
            SizeClass::VarPrecision => {
                let props = TypeProps::Precision {
                    length: src[0],
                    precision: src[1],
                    scale: src[2],
                };
                *src = &src[3..];
                props
            }
        };

        if type_id.has_collation() {
            ProtocolError::need(src, 5)?;
            *src = &src[5..];
        }

        if type_id.has_table_name() {
            ProtocolError::need(src, 2)?;
            let table_name_units = u16::from_le_bytes([src[0], src[1]]) as usize;
            ProtocolError::need(&src[2..], table_name_units * 2)?;
            *src = &src[2 + table_name_units * 2..];
        }

        ProtocolError::need(src, 1)?;
        let name_units = src[0] as usize;
        *src = &src[1..];
        ProtocolError::need(src, name_units * 2)?;

        let name = if read_name {
            Some(String::from_utf16_lossy(&collect_ucs2_units(
                &src[..name_units * 2],
            )))
        } else {
            None
        };
        *src = &src[name_units * 2..];

        Ok(Column {
            user_type,
            flags,
            type_id,
            props,
            name,
        })
    }
}

// =============================================================================
// ROW
// =============================================================================

/// Decode a ROW token body into one byte view per column.
///
/// `None` marks a NULL field; `Some` with an empty view is a present,
/// zero-length value. The two are distinct states.
pub fn decode_row(
    src: &mut &[u8],
    meta: &ColMetaData,
) -> Result<Vec<Option<Bytes>>, ProtocolError> {
    let mut fields = Vec::with_capacity(meta.columns.len());

    for column in &meta.columns {
        let type_id = column.type_id;

        if type_id.has_text_ptr() {
            skip_text_pointer(src)?;
        }

        let (length, is_null) = read_field_length(src, column)?;

        if type_id.size_class().is_variable() && !type_id.is_valid_data_length(length) {
            return Err(ProtocolError::InvalidFieldLength {
                type_id: type_id as u8,
                length,
            });
        }

        if is_null {
            fields.push(None);
            continue;
        }

        let length = length as usize;
        ProtocolError::need(src, length)?;
        fields.push(Some(Bytes::copy_from_slice(&src[..length])));
        *src = &src[length..];
    }

    Ok(fields)
}

/// Skip the text-pointer prelude of a TEXT/NTEXT/IMAGE field.
///
/// A pointer length of 0xFF is the first byte of the 0xFFFFFFFF NULL
/// length; it is left unconsumed for the length read that follows.
fn skip_text_pointer(src: &mut &[u8]) -> Result<(), ProtocolError> {
    ProtocolError::need(src, 1)?;
    let ptr_len = src[0] as usize;
    if ptr_len == 0xFF {
        return Ok(());
    }
    ProtocolError::need(&src[1..], ptr_len + 8)?;
    *src = &src[1 + ptr_len + 8..];
    Ok(())
}

fn read_field_length(src: &mut &[u8], column: &Column) -> Result<(u32, bool), ProtocolError> {
    let type_id = column.type_id;
    match type_id.size_class() {
        SizeClass::Fixed(len) => Ok((u32::from(len), false)),
        SizeClass::VarU8 | SizeClass::VarPrecision => {
            ProtocolError::need(src, 1)?;
            let len = u32::from(src[0]);
            *src = &src[1..];
            Ok((len, type_id.zero_length_is_null() && len == 0))
        }
        SizeClass::VarU16 => {
            ProtocolError::need(src, 2)?;
            let len = u32::from(u16::from_le_bytes([src[0], src[1]]));
            *src = &src[2..];
            let is_null = type_id.maxlen_is_null() && len == 0xFFFF;
            Ok(if is_null { (0, true) } else { (len, false) })
        }
        SizeClass::VarU32 => {
            ProtocolError::need(src, 4)?;
            let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
            *src = &src[4..];
            let is_null = type_id.maxlen_is_null() && len == 0xFFFF_FFFF;
            Ok(if is_null { (0, true) } else { (len, false) })
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
