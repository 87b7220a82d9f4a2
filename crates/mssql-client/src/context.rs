//! The TDS context: connection ownership and token-stream dispatch.
//!
//! The context owns the framed connection and the `authenticated` flag,
//! and turns TABULAR_RESULT payloads into token callbacks on a
//! [`TokenSink`]. The login and command state machines are sinks; they
//! see the generic tokens (ENVCHANGE, INFO/ERROR, LOGINACK, DONE) through
//! the default handlers and may claim anything else through the subtoken
//! hook.

use mssql_codec::{CodecError, Connection, MessageReader, Transport};
use tds_protocol::ProtocolError;
use tds_protocol::packet::PacketType;
use tds_protocol::token::{
    Done, DoneKind, EnvChange, EnvChangeType, LoginAck, ServerMessage, TokenType,
};

use crate::error::Error;

/// Result of offering a token to the subtoken hook.
pub(crate) enum SubtokenOutcome {
    /// The sink consumed the token; continue with the next one.
    Consumed,
    /// The token is incomplete; this many more bytes are required.
    NeedMore(usize),
    /// The sink does not handle this token type.
    Unhandled,
    /// The token is malformed; abort the message.
    Fatal(ProtocolError),
}

/// Receiver of the token stream.
///
/// Default implementations ignore everything, so a sink implements only
/// what it watches for.
pub(crate) trait TokenSink {
    /// An environment change was received.
    fn on_env_change(&mut self, _change: &EnvChange) {}

    /// An INFO or ERROR message was received.
    fn on_message(&mut self, _message: &ServerMessage) {}

    /// A login acknowledgment was received.
    fn on_login_ack(&mut self, _ack: &LoginAck) {}

    /// A DONE/DONEPROC/DONEINPROC was received.
    fn on_done(&mut self, _done: &Done) {}

    /// First look at every token. `src` is positioned after the token
    /// type byte and spans all bytes currently buffered.
    fn on_subtoken(&mut self, _token: u8, _src: &mut &[u8]) -> SubtokenOutcome {
        SubtokenOutcome::Unhandled
    }
}

/// Connection state shared by the login and command state machines.
#[derive(Debug)]
pub(crate) struct TdsContext<T: Transport> {
    conn: Connection<T>,
    authenticated: bool,
}

impl<T: Transport> TdsContext<T> {
    pub(crate) fn new(transport: T, buffer_capacity: usize) -> Self {
        Self {
            conn: Connection::new(transport, buffer_capacity),
            authenticated: false,
        }
    }

    pub(crate) fn connect(&mut self, host: &str, port: u16) -> Result<(), CodecError> {
        self.conn.connect(host, port)
    }

    /// Tear the connection down; the session is no longer authenticated.
    pub(crate) fn disconnect(&mut self) {
        self.conn.disconnect();
        self.authenticated = false;
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub(crate) fn packet_size(&self) -> u16 {
        self.conn.packet_size()
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        self.conn.transport_mut()
    }

    /// Stage an outbound message payload in the connection buffer.
    pub(crate) fn stage(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.conn.writer().put_slice(payload)?;
        Ok(())
    }

    /// Send the staged message; transport failures tear the connection
    /// down.
    pub(crate) fn send_message(&mut self, message_type: PacketType) -> Result<(), Error> {
        match self.conn.send_pdu(message_type) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.is_fatal() {
                    self.disconnect();
                }
                Err(err.into())
            }
        }
    }

    /// Receive one complete response message, dispatching its token
    /// stream to `sink`.
    ///
    /// Byte shortages are never fatal here: they surface as deficits to
    /// the framer, which pulls more data and the parse resumes from the
    /// preserved position. Any other parse error aborts the message (the
    /// remainder is drained and discarded) and tears the connection
    /// down, as does any transport failure.
    pub(crate) fn receive(&mut self, sink: &mut dyn TokenSink) -> Result<(), Error> {
        let mut fatal: Option<ProtocolError> = None;
        let mut pending_packet_size: Option<u32> = None;
        let mut login_acked = false;

        let outcome = self.conn.receive_pdu(&mut |message_type, reader| {
            if message_type != PacketType::TabularResult {
                tracing::debug!(
                    ?message_type,
                    bytes = reader.remaining(),
                    "ignoring non-tabular message"
                );
                reader.consume_all();
                return 0;
            }
            if fatal.is_some() {
                // a previous token was malformed; drain the message
                reader.consume_all();
                return 0;
            }
            match dispatch_tokens(reader, sink, &mut login_acked, &mut pending_packet_size) {
                Ok(needed) => needed,
                Err(err) => {
                    tracing::warn!(%err, "malformed token, aborting message parse");
                    fatal = Some(err);
                    reader.consume_all();
                    0
                }
            }
        });

        // LOGINACK flips the authenticated flag; ENVCHANGE type 4 takes
        // effect for subsequent outbound PDUs.
        if login_acked {
            self.authenticated = true;
        }
        if let Some(size) = pending_packet_size {
            self.conn.set_packet_size(size);
        }

        if let Err(err) = outcome {
            self.disconnect();
            return Err(err.into());
        }
        if let Some(err) = fatal {
            self.disconnect();
            return Err(err.into());
        }
        Ok(())
    }
}

/// Minimum buffered bytes before token parsing is attempted: type byte
/// plus the smallest size field.
const MIN_TOKEN_BYTES: usize = 3;

enum Step {
    Advance(usize),
    NeedMore(usize),
    Fatal(ProtocolError),
}

/// Parse as many complete tokens as the buffer holds.
///
/// Returns the byte deficit of the first incomplete token (zero when the
/// buffer was fully consumed). The reader only advances past fully
/// parsed tokens, so an interrupted parse resumes at the token boundary
/// once more bytes arrive.
fn dispatch_tokens(
    reader: &mut MessageReader<'_>,
    sink: &mut dyn TokenSink,
    login_acked: &mut bool,
    pending_packet_size: &mut Option<u32>,
) -> Result<usize, ProtocolError> {
    loop {
        if reader.remaining() < MIN_TOKEN_BYTES {
            return Ok(if reader.remaining() == 0 {
                0
            } else {
                MIN_TOKEN_BYTES - reader.remaining()
            });
        }

        let step = {
            let full = reader.peek_remaining();
            let token_byte = full[0];
            let mut src = &full[1..];

            match sink.on_subtoken(token_byte, &mut src) {
                SubtokenOutcome::Consumed => Step::Advance(full.len() - src.len()),
                SubtokenOutcome::NeedMore(needed) => Step::NeedMore(needed),
                SubtokenOutcome::Fatal(err) => Step::Fatal(err),
                SubtokenOutcome::Unhandled => {
                    match parse_plain_token(
                        token_byte,
                        &mut src,
                        sink,
                        login_acked,
                        pending_packet_size,
                    ) {
                        Ok(()) => Step::Advance(full.len() - src.len()),
                        Err(err) => match err.deficit() {
                            Some(needed) => Step::NeedMore(needed),
                            None => Step::Fatal(err),
                        },
                    }
                }
            }
        };

        match step {
            Step::Advance(consumed) => {
                reader.advance(consumed);
            }
            Step::NeedMore(needed) => return Ok(needed),
            Step::Fatal(err) => return Err(err),
        }
    }
}

/// Handle one token on the fixed dispatch path.
///
/// `src` is positioned after the token type byte; on success it has been
/// advanced past the whole token, size field included.
fn parse_plain_token(
    token_byte: u8,
    src: &mut &[u8],
    sink: &mut dyn TokenSink,
    login_acked: &mut bool,
    pending_packet_size: &mut Option<u32>,
) -> Result<(), ProtocolError> {
    // DONE-family and OFFSET/RETURNSTATUS have known sizes; everything
    // else declares its size in a two-byte field.
    let body_len = match TokenType::fixed_body_size(token_byte) {
        Some(size) => size,
        None => {
            ProtocolError::need(src, 2)?;
            let len = u16::from_le_bytes([src[0], src[1]]) as usize;
            *src = &src[2..];
            len
        }
    };

    ProtocolError::need(src, body_len)?;
    let mut body = &src[..body_len];

    match TokenType::from_u8(token_byte) {
        Some(TokenType::EnvChange) => {
            if let Some(change) = EnvChange::decode(&mut body)? {
                if change.env_type == EnvChangeType::PacketSize {
                    *pending_packet_size = change.packet_size;
                }
                sink.on_env_change(&change);
            }
        }
        Some(TokenType::Error | TokenType::Info) => {
            let message = ServerMessage::decode(&mut body)?;
            tracing::debug!(
                number = message.number,
                class = message.class,
                text = %message.message,
                "server message"
            );
            sink.on_message(&message);
        }
        Some(TokenType::LoginAck) => {
            let ack = LoginAck::decode(&mut body)?;
            tracing::debug!(
                version = %ack.tds_version,
                program = %ack.prog_name,
                "login acknowledged"
            );
            *login_acked = true;
            sink.on_login_ack(&ack);
        }
        Some(TokenType::Done) => sink.on_done(&Done::decode(&mut body, DoneKind::Done)?),
        Some(TokenType::DoneProc) => {
            sink.on_done(&Done::decode(&mut body, DoneKind::DoneProc)?);
        }
        Some(TokenType::DoneInProc) => {
            sink.on_done(&Done::decode(&mut body, DoneKind::DoneInProc)?);
        }
        Some(TokenType::Offset | TokenType::ReturnStatus) => {
            // not interpreted, skipped by size
        }
        Some(TokenType::ColMetaData | TokenType::Row) | None => {
            // Sizeless tokens only parse through an installed subtoken
            // handler; anything else unknown is skipped by its declared
            // size.
            tracing::debug!(token = token_byte, "skipping unhandled token");
        }
    }

    *src = &src[body_len..];
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tds_protocol::token::DoneStatus;

    #[derive(Default)]
    struct RecordingSink {
        env_changes: Vec<EnvChange>,
        messages: Vec<ServerMessage>,
        acks: Vec<LoginAck>,
        dones: Vec<Done>,
    }

    impl TokenSink for RecordingSink {
        fn on_env_change(&mut self, change: &EnvChange) {
            self.env_changes.push(change.clone());
        }

        fn on_message(&mut self, message: &ServerMessage) {
            self.messages.push(message.clone());
        }

        fn on_login_ack(&mut self, ack: &LoginAck) {
            self.acks.push(ack.clone());
        }

        fn on_done(&mut self, done: &Done) {
            self.dones.push(*done);
        }
    }

    fn drive(payload: &[u8], sink: &mut dyn TokenSink) -> Result<usize, ProtocolError> {
        let mut buffer = mssql_codec::MessageBuffer::new(4096);
        buffer.writer().put_slice(payload).unwrap();
        let mut reader = buffer.reader();
        let mut login_acked = false;
        let mut pending = None;
        dispatch_tokens(&mut reader, sink, &mut login_acked, &mut pending)
    }

    fn done_token(status: u16, rows: u32) -> Vec<u8> {
        Done {
            kind: DoneKind::Done,
            status: DoneStatus::from_bits(status),
            cur_cmd: 0,
            done_row_count: rows,
        }
        .encode()
    }

    #[test]
    fn test_dispatch_done() {
        let mut sink = RecordingSink::default();
        let needed = drive(&done_token(0x10, 3), &mut sink).unwrap();
        assert_eq!(needed, 0);
        assert_eq!(sink.dones.len(), 1);
        assert_eq!(sink.dones[0].done_row_count, 3);
        assert!(sink.dones[0].status.count_valid);
    }

    #[test]
    fn test_dispatch_split_token_reports_deficit() {
        // DONE token cut short: type byte + 4 of 8 body bytes
        let token = done_token(0x10, 3);
        let mut sink = RecordingSink::default();
        let needed = drive(&token[..5], &mut sink).unwrap();
        assert_eq!(needed, 4);
        assert!(sink.dones.is_empty());
    }

    #[test]
    fn test_dispatch_envchange_packet_size() {
        let mut body = vec![4u8]; // sub-type: packet size
        for value in ["8192", "4096"] {
            body.push(value.len() as u8);
            for unit in value.encode_utf16() {
                body.extend_from_slice(&unit.to_le_bytes());
            }
        }
        let mut token = vec![0xE3];
        token.extend_from_slice(&(body.len() as u16).to_le_bytes());
        token.extend_from_slice(&body);

        let mut buffer = mssql_codec::MessageBuffer::new(4096);
        buffer.writer().put_slice(&token).unwrap();
        let mut reader = buffer.reader();
        let mut sink = RecordingSink::default();
        let mut login_acked = false;
        let mut pending = None;
        dispatch_tokens(&mut reader, &mut sink, &mut login_acked, &mut pending).unwrap();

        assert_eq!(pending, Some(8192));
        assert_eq!(sink.env_changes.len(), 1);
        assert_eq!(sink.env_changes[0].new_value, "8192");
        assert_eq!(sink.env_changes[0].old_value, "4096");
    }

    #[test]
    fn test_dispatch_skips_unknown_sized_token() {
        // 0xA9 (ORDER) with a declared 4-byte body, then a DONE
        let mut payload = vec![0xA9, 0x04, 0x00, 1, 0, 2, 0];
        payload.extend_from_slice(&done_token(0, 0));
        let mut sink = RecordingSink::default();
        let needed = drive(&payload, &mut sink).unwrap();
        assert_eq!(needed, 0);
        assert_eq!(sink.dones.len(), 1);
    }
}
