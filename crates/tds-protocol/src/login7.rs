//! TDS LOGIN7 packet construction.
//!
//! The LOGIN7 packet is sent by the client to authenticate with SQL Server.
//! It contains client information and credentials.
//!
//! ## Packet Structure (TDS 7.1)
//!
//! - 36-byte fixed section: total length, TDS version, packet size, client
//!   program version, PID, connection ID, four flag bytes, timezone and
//!   collation.
//! - 50-byte offset/length table with twelve slots in a fixed order; the
//!   client-id slot holds six raw bytes instead of an offset/length pair,
//!   `unused` and `sspi` are four zero bytes, and `locale`/`atchdbfile`
//!   carry the running offset with a zero length.
//! - The variable section: every string UCS-2 LE, lengths in the table
//!   counted in code units.
//!
//! ## Security Note
//!
//! The password is obfuscated (not encrypted) using a nibble swap and an
//! XOR with 0xA5. This provides no confidentiality; TDS 7.1 predates
//! in-protocol TLS.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{ucs2_unit_len, write_ucs2_string};
use crate::version::TdsVersion;

/// Size of the fixed LOGIN7 section, including the length field.
pub const LOGIN7_FIXED_SIZE: usize = 36;

/// Size of the offset/length table: nine offset/length pairs, two
/// four-byte zero slots and the six-byte client id.
pub const LOGIN7_OFFSET_TABLE_SIZE: usize = 50;

/// Offset of the first variable-section byte, relative to the start of
/// the LOGIN7 payload.
pub const LOGIN7_STRING_OFFSET: usize = LOGIN7_FIXED_SIZE + LOGIN7_OFFSET_TABLE_SIZE;

/// LOGIN7 option flags 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionFlags1 {
    /// Use big-endian byte order.
    pub byte_order_be: bool,
    /// Character set is EBCDIC.
    pub char_ebcdic: bool,
    /// Dump/load off.
    pub dump_load_off: bool,
    /// Notify on `USE db`.
    pub use_db_notify: bool,
    /// Initial database change is fatal.
    pub database_fatal: bool,
    /// Warn on language change.
    pub set_lang_warn: bool,
}

impl OptionFlags1 {
    /// Convert to the wire byte.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        let mut flags = 0u8;
        if self.byte_order_be {
            flags |= 0x01;
        }
        if self.char_ebcdic {
            flags |= 0x02;
        }
        if self.dump_load_off {
            flags |= 0x10;
        }
        if self.use_db_notify {
            flags |= 0x20;
        }
        if self.database_fatal {
            flags |= 0x40;
        }
        if self.set_lang_warn {
            flags |= 0x80;
        }
        flags
    }
}

/// LOGIN7 option flags 2.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionFlags2 {
    /// Initial language change is fatal.
    pub language_fatal: bool,
    /// Client is an ODBC driver.
    pub odbc: bool,
    /// User type (0 = normal).
    pub user_type: u8,
    /// Integrated security requested.
    pub integrated_security: bool,
}

impl OptionFlags2 {
    /// Convert to the wire byte.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        let mut flags = 0u8;
        if self.language_fatal {
            flags |= 0x01;
        }
        if self.odbc {
            flags |= 0x02;
        }
        flags |= (self.user_type & 0x07) << 4;
        if self.integrated_security {
            flags |= 0x80;
        }
        flags
    }
}

/// LOGIN7 type flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeFlags {
    /// SQL dialect (0 = default, 1 = T-SQL).
    pub sql_type: u8,
    /// Client is an OLEDB driver.
    pub oledb: bool,
}

impl TypeFlags {
    /// Convert to the wire byte.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        let mut flags = 0u8;
        flags |= self.sql_type & 0x0F;
        if self.oledb {
            flags |= 0x10;
        }
        flags
    }
}

/// LOGIN7 option flags 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionFlags3 {
    /// Password change requested.
    pub change_password: bool,
    /// User instance requested.
    pub user_instance: bool,
}

impl OptionFlags3 {
    /// Convert to the wire byte.
    #[must_use]
    pub fn to_byte(&self) -> u8 {
        let mut flags = 0u8;
        if self.change_password {
            flags |= 0x01;
        }
        if self.user_instance {
            flags |= 0x02;
        }
        flags
    }
}

/// LOGIN7 packet builder.
#[derive(Debug, Clone)]
pub struct Login7 {
    /// TDS version to request.
    pub tds_version: TdsVersion,
    /// Requested packet size.
    pub packet_size: u32,
    /// Client program version.
    pub client_prog_version: u32,
    /// Client process ID.
    pub client_pid: u32,
    /// Connection ID.
    pub connection_id: u32,
    /// Option flags 1.
    pub option_flags1: OptionFlags1,
    /// Option flags 2.
    pub option_flags2: OptionFlags2,
    /// Type flags.
    pub type_flags: TypeFlags,
    /// Option flags 3.
    pub option_flags3: OptionFlags3,
    /// Client timezone offset in minutes.
    pub client_timezone: i32,
    /// Client LCID (locale ID).
    pub client_lcid: u32,
    /// Client machine name.
    pub client_name: String,
    /// Username for SQL authentication.
    pub username: String,
    /// Password for SQL authentication.
    pub password: String,
    /// Application name.
    pub app_name: String,
    /// Server name.
    pub server_name: String,
    /// Client library name.
    pub library_name: String,
    /// Database name.
    pub database: String,
    /// Client ID (NIC/MAC address, typically zeros).
    pub client_id: [u8; 6],
}

impl Default for Login7 {
    fn default() -> Self {
        Self {
            tds_version: TdsVersion::V7_1_REV1,
            packet_size: 4096,
            client_prog_version: 0,
            client_pid: 0,
            connection_id: 0,
            // 0xE0: use-db notify, database fatal, language-change warn
            option_flags1: OptionFlags1 {
                use_db_notify: true,
                database_fatal: true,
                set_lang_warn: true,
                ..Default::default()
            },
            // 0x03: language fatal, ODBC
            option_flags2: OptionFlags2 {
                language_fatal: true,
                odbc: true,
                ..Default::default()
            },
            type_flags: TypeFlags::default(),
            option_flags3: OptionFlags3::default(),
            client_timezone: 0,
            client_lcid: 0,
            client_name: String::new(),
            username: String::new(),
            password: String::new(),
            app_name: String::new(),
            server_name: String::new(),
            library_name: String::from("mssql-client"),
            database: String::new(),
            client_id: [0u8; 6],
        }
    }
}

impl Login7 {
    /// Create a new Login7 packet builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set SQL authentication credentials.
    #[must_use]
    pub fn with_sql_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the database to connect to.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the client machine name.
    #[must_use]
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    /// Set the application name.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Set the server name.
    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    /// Set the requested packet size.
    #[must_use]
    pub fn with_packet_size(mut self, packet_size: u32) -> Self {
        self.packet_size = packet_size;
        self
    }

    /// Encode the LOGIN7 payload to bytes.
    ///
    /// The result is the complete message payload; the framer supplies
    /// TDS packet headers when it is sent.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(LOGIN7_STRING_OFFSET + 128);

        buf.put_u32_le(0); // total length, patched below
        buf.put_u32(self.tds_version.raw()); // big-endian
        buf.put_u32_le(self.packet_size);
        buf.put_u32_le(self.client_prog_version);
        buf.put_u32_le(self.client_pid);
        buf.put_u32_le(self.connection_id);
        buf.put_u8(self.option_flags1.to_byte());
        buf.put_u8(self.option_flags2.to_byte());
        buf.put_u8(self.type_flags.to_byte());
        buf.put_u8(self.option_flags3.to_byte());
        buf.put_i32_le(self.client_timezone);
        buf.put_u32_le(self.client_lcid);
        debug_assert_eq!(buf.len(), LOGIN7_FIXED_SIZE);

        // Offset/length table. Offsets are relative to the payload start;
        // lengths count UCS-2 units. The slot order is fixed by the
        // protocol; string data follows in the same order.
        let mut offset = LOGIN7_STRING_OFFSET as u16;
        let mut var_data = BytesMut::new();

        fn put_string(
            buf: &mut BytesMut,
            var_data: &mut BytesMut,
            offset: &mut u16,
            s: &str,
            obfuscate: bool,
        ) {
            let units = ucs2_unit_len(s) as u16;
            buf.put_u16_le(*offset);
            buf.put_u16_le(units);
            if obfuscate {
                write_obfuscated_password(var_data, s);
            } else {
                write_ucs2_string(var_data, s);
            }
            *offset += units * 2;
        }

        put_string(&mut buf, &mut var_data, &mut offset, &self.client_name, false);
        put_string(&mut buf, &mut var_data, &mut offset, &self.username, false);
        put_string(&mut buf, &mut var_data, &mut offset, &self.password, true);
        put_string(&mut buf, &mut var_data, &mut offset, &self.app_name, false);
        put_string(&mut buf, &mut var_data, &mut offset, &self.server_name, false);
        buf.put_u32_le(0); // unused slot
        put_string(&mut buf, &mut var_data, &mut offset, &self.library_name, false);
        // locale: current offset, no data
        buf.put_u16_le(offset);
        buf.put_u16_le(0);
        put_string(&mut buf, &mut var_data, &mut offset, &self.database, false);
        buf.put_slice(&self.client_id);
        buf.put_u32_le(0); // sspi slot
        // atchdbfile: current offset, no data
        buf.put_u16_le(offset);
        buf.put_u16_le(0);
        debug_assert_eq!(buf.len(), LOGIN7_STRING_OFFSET);

        buf.put_slice(&var_data);

        // Patch the total payload length.
        let total = buf.len() as u32;
        buf[0..4].copy_from_slice(&total.to_le_bytes());

        buf.freeze()
    }
}

/// Write a password with TDS obfuscation.
///
/// Per MS-TDS: for every byte of the UCS-2 encoded password, first swap
/// the four high bits with the four low bits, then XOR with 0xA5.
pub fn write_obfuscated_password(dst: &mut impl BufMut, password: &str) {
    for unit in password.encode_utf16() {
        let [low, high] = unit.to_le_bytes();
        dst.put_u8(obfuscate_byte(low));
        dst.put_u8(obfuscate_byte(high));
    }
}

#[inline]
fn obfuscate_byte(b: u8) -> u8 {
    b.rotate_right(4) ^ 0xA5
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login7_layout() {
        let login = Login7::new()
            .with_server_name("db.example.com")
            .with_sql_auth("sa", "secret")
            .with_database("master");

        let encoded = login.encode();

        // patched total length
        let total = u32::from_le_bytes([encoded[0], encoded[1], encoded[2], encoded[3]]);
        assert_eq!(total as usize, encoded.len());

        // TDS version is big-endian at offset 4
        assert_eq!(&encoded[4..8], &[0x71, 0x00, 0x00, 0x01]);

        // default option flag bytes
        assert_eq!(encoded[24], 0xE0);
        assert_eq!(encoded[25], 0x03);
        assert_eq!(encoded[26], 0x00);
        assert_eq!(encoded[27], 0x00);
    }

    #[test]
    fn test_offset_table() {
        let login = Login7::new().with_sql_auth("sa", "pw");
        let encoded = login.encode();

        // client_name slot: first string offset, zero length
        let off = u16::from_le_bytes([encoded[36], encoded[37]]);
        let len = u16::from_le_bytes([encoded[38], encoded[39]]);
        assert_eq!(off as usize, LOGIN7_STRING_OFFSET);
        assert_eq!(len, 0);

        // user_name slot
        let off = u16::from_le_bytes([encoded[40], encoded[41]]);
        let len = u16::from_le_bytes([encoded[42], encoded[43]]);
        assert_eq!(off as usize, LOGIN7_STRING_OFFSET);
        assert_eq!(len, 2);

        // password slot begins after "sa"
        let off = u16::from_le_bytes([encoded[44], encoded[45]]);
        let len = u16::from_le_bytes([encoded[46], encoded[47]]);
        assert_eq!(off as usize, LOGIN7_STRING_OFFSET + 4);
        assert_eq!(len, 2);

        // total size: fixed header + table + "sa" + "pw" + "mssql-client"
        assert_eq!(encoded.len(), LOGIN7_STRING_OFFSET + 4 + 4 + 24);
    }

    #[test]
    fn test_password_obfuscation_known_byte() {
        // 'a' = 0x0061: low 0x61 -> swap 0x16 -> XOR 0xA5 = 0xB3,
        // high 0x00 -> 0xA5
        let mut buf = BytesMut::new();
        write_obfuscated_password(&mut buf, "a");
        assert_eq!(&buf[..], &[0xB3, 0xA5]);
    }

    #[test]
    fn test_password_obfuscation_vector() {
        let mut buf = BytesMut::new();
        write_obfuscated_password(&mut buf, "JaxView");
        assert_eq!(
            &buf[..],
            &[0x01, 0xA5, 0xB3, 0xA5, 0x22, 0xA5, 0xC0, 0xA5, 0x33, 0xA5, 0xF3, 0xA5, 0xD2, 0xA5]
        );
    }

    #[test]
    fn test_option_flag_bytes() {
        assert_eq!(OptionFlags1::default().to_byte(), 0x00);
        let flags2 = OptionFlags2 {
            odbc: true,
            integrated_security: true,
            ..Default::default()
        };
        assert_eq!(flags2.to_byte(), 0x82);
    }
}
