//! Scripted transport and response builders shared by the integration
//! tests.
//!
//! The transport replays a canned byte stream to the driver and records
//! every frame the driver sends, so tests can assert on the exact wire
//! traffic without a server.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;

use mssql_client::Transport;

/// Replays `rx` to the driver; captures sent (header, payload) frames.
#[derive(Debug, Default)]
pub struct MockTransport {
    rx: VecDeque<u8>,
    pub sent: Vec<(Vec<u8>, Vec<u8>)>,
    pub connected: bool,
}

impl MockTransport {
    pub fn with_responses(bytes: Vec<u8>) -> Self {
        Self {
            rx: bytes.into(),
            sent: Vec::new(),
            connected: false,
        }
    }

    /// Append more scripted response bytes.
    pub fn push_response(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> io::Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn send(&mut self, header: &[u8], payload: &[u8]) -> io::Result<()> {
        self.sent.push((header.to_vec(), payload.to_vec()));
        Ok(())
    }

    fn recv_exact(&mut self, dst: &mut [u8]) -> io::Result<()> {
        if self.rx.len() < dst.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "mock script exhausted",
            ));
        }
        for byte in dst.iter_mut() {
            *byte = self.rx.pop_front().unwrap_or(0);
        }
        Ok(())
    }
}

pub fn ucs2(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn b_varchar(s: &str) -> Vec<u8> {
    let mut out = vec![s.encode_utf16().count() as u8];
    out.extend_from_slice(&ucs2(s));
    out
}

/// Wrap a payload in a TDS packet header (type 0x04 = tabular result).
pub fn pdu(packet_type: u8, end_of_message: bool, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![packet_type, u8::from(end_of_message)];
    out.extend_from_slice(&((payload.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(&[0, 0, 0, 0]);
    out.extend_from_slice(payload);
    out
}

/// Wrap tokens in a single-packet tabular-result PDU.
pub fn tabular_pdu(tokens: &[u8]) -> Vec<u8> {
    pdu(0x04, true, tokens)
}

// ---------------------------------------------------------------------
// token builders
// ---------------------------------------------------------------------

pub fn token_done(status: u16, rows: u32) -> Vec<u8> {
    let mut out = vec![0xFD];
    out.extend_from_slice(&status.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&rows.to_le_bytes());
    out
}

pub fn token_loginack() -> Vec<u8> {
    let mut body = vec![1u8];
    body.extend_from_slice(&0x7100_0001u32.to_le_bytes());
    body.extend_from_slice(&b_varchar("Microsoft SQL Server"));
    body.extend_from_slice(&[8, 0, 2, 39]);

    let mut out = vec![0xAD];
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

pub fn token_envchange(sub_type: u8, new: &str, old: &str) -> Vec<u8> {
    let mut body = vec![sub_type];
    body.extend_from_slice(&b_varchar(new));
    body.extend_from_slice(&b_varchar(old));

    let mut out = vec![0xE3];
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

pub fn token_message(token: u8, number: u32, class: u8, text: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&number.to_le_bytes());
    body.push(1); // state
    body.push(class);
    body.extend_from_slice(&(text.encode_utf16().count() as u16).to_le_bytes());
    body.extend_from_slice(&ucs2(text));
    body.extend_from_slice(&b_varchar("MOCKSQL"));
    body.push(0); // no procedure
    body.extend_from_slice(&1u16.to_le_bytes()); // line

    let mut out = vec![token];
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

pub fn token_error(number: u32, class: u8, text: &str) -> Vec<u8> {
    token_message(0xAA, number, class, text)
}

pub fn token_info(number: u32, text: &str) -> Vec<u8> {
    token_message(0xAB, number, 0, text)
}

// ---------------------------------------------------------------------
// column and row builders
// ---------------------------------------------------------------------

pub fn col_int4(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_le_bytes()); // user type
    out.extend_from_slice(&0x0008u16.to_le_bytes()); // flags
    out.push(0x38);
    out.extend_from_slice(&b_varchar(name));
    out
}

pub fn col_intn(name: &str, width: u8) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0x0009u16.to_le_bytes());
    out.push(0x26);
    out.push(width);
    out.extend_from_slice(&b_varchar(name));
    out
}

pub fn col_nvarchar(name: &str, max_bytes: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0x0009u16.to_le_bytes());
    out.push(0xE7);
    out.extend_from_slice(&max_bytes.to_le_bytes());
    out.extend_from_slice(&[0x09, 0x04, 0xD0, 0x00, 0x34]); // collation
    out.extend_from_slice(&b_varchar(name));
    out
}

pub fn token_colmetadata(columns: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0x81];
    out.extend_from_slice(&(columns.len() as u16).to_le_bytes());
    for column in columns {
        out.extend_from_slice(column);
    }
    out
}

pub fn token_row(fields: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0xD1];
    for field in fields {
        out.extend_from_slice(field);
    }
    out
}

pub fn field_int4(value: i32) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

pub fn field_intn(value: i32) -> Vec<u8> {
    let mut out = vec![4u8];
    out.extend_from_slice(&value.to_le_bytes());
    out
}

pub fn field_intn_null() -> Vec<u8> {
    vec![0]
}

pub fn field_nvarchar(value: &str) -> Vec<u8> {
    let encoded = ucs2(value);
    let mut out = Vec::new();
    out.extend_from_slice(&(encoded.len() as u16).to_le_bytes());
    out.extend_from_slice(&encoded);
    out
}

pub fn field_nvarchar_null() -> Vec<u8> {
    0xFFFFu16.to_le_bytes().to_vec()
}

// ---------------------------------------------------------------------
// canned exchanges
// ---------------------------------------------------------------------

/// A successful login response: database change, login ack, final done.
pub fn login_success() -> Vec<u8> {
    let mut tokens = Vec::new();
    tokens.extend_from_slice(&token_envchange(1, "master", ""));
    tokens.extend_from_slice(&token_loginack());
    tokens.extend_from_slice(&token_done(0, 0));
    tabular_pdu(&tokens)
}

/// A login response that renegotiates the packet size before the ack.
pub fn login_success_with_packet_size(size: &str, old: &str) -> Vec<u8> {
    let mut tokens = Vec::new();
    tokens.extend_from_slice(&token_envchange(4, size, old));
    tokens.extend_from_slice(&token_loginack());
    tokens.extend_from_slice(&token_done(0, 0));
    tabular_pdu(&tokens)
}

/// A rejected login: error message plus DONE with the srverror bit.
pub fn login_failure() -> Vec<u8> {
    let mut tokens = Vec::new();
    tokens.extend_from_slice(&token_error(18456, 14, "Login failed for user 'sa'."));
    tokens.extend_from_slice(&token_done(0x0100, 0));
    tabular_pdu(&tokens)
}
