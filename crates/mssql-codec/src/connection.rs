//! TDS PDU framing over a blocking transport.
//!
//! A message (LOGIN7, SQL batch, RPC request) is accumulated whole in the
//! connection's [`MessageBuffer`] and sent as one or more TDS packets of
//! the negotiated size. Inbound, packets are reassembled in the same
//! buffer and streamed to a packet-data callback as they arrive, so the
//! token layer can consume and discard data without waiting for the full
//! message.

use tds_protocol::packet::{
    DEFAULT_PACKET_SIZE, MAX_PACKET_SIZE, MIN_PACKET_SIZE, PACKET_HEADER_SIZE, PacketHeader,
    PacketStatus, PacketType,
};

use crate::buffer::{MessageBuffer, MessageReader, MessageWriter};
use crate::error::CodecError;
use crate::transport::Transport;

/// Packet-data callback invoked by [`Connection::receive_pdu`].
///
/// The callback consumes what it can from the reader and returns the
/// number of additional bytes it needs to make further progress. The
/// framer logs the hint but does not act on it; bytes the callback leaves
/// behind stay in the buffer for the next invocation.
pub type PacketDataFn<'a> = dyn FnMut(PacketType, &mut MessageReader<'_>) -> usize + 'a;

/// A framed TDS connection: transport + message buffer + packet size.
#[derive(Debug)]
pub struct Connection<T: Transport> {
    transport: T,
    buffer: MessageBuffer,
    packet_size: u16,
}

impl<T: Transport> Connection<T> {
    /// Create a connection over `transport` with a receive/send buffer of
    /// `buffer_capacity` bytes.
    pub fn new(transport: T, buffer_capacity: usize) -> Self {
        Self {
            transport,
            buffer: MessageBuffer::new(buffer_capacity),
            packet_size: DEFAULT_PACKET_SIZE as u16,
        }
    }

    /// Connect the underlying transport.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), CodecError> {
        self.transport.connect(host, port)?;
        Ok(())
    }

    /// Tear the transport down and drop any buffered bytes.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.buffer.reset();
    }

    /// The negotiated packet size.
    #[must_use]
    pub fn packet_size(&self) -> u16 {
        self.packet_size
    }

    /// Renegotiate the packet size (ENVCHANGE type 4).
    ///
    /// The value is clamped to the legal `512..=32767` range; it is never
    /// silently lowered below the minimum.
    pub fn set_packet_size(&mut self, size: u32) {
        let clamped = size.clamp(MIN_PACKET_SIZE as u32, MAX_PACKET_SIZE as u32) as u16;
        if clamped != self.packet_size {
            tracing::debug!(old = self.packet_size, new = clamped, "packet size renegotiated");
            self.packet_size = clamped;
        }
    }

    /// Borrow the message buffer's writer to stage an outbound message.
    pub fn writer(&mut self) -> MessageWriter<'_> {
        self.buffer.writer()
    }

    /// Access the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send the staged message as one or more TDS packets of type
    /// `message_type`, consuming the whole buffer.
    ///
    /// Each segment carries at most `packet_size - 8` payload bytes; the
    /// last one has the end-of-message bit set. Channel, packet id and
    /// window are zero.
    pub fn send_pdu(&mut self, message_type: PacketType) -> Result<(), CodecError> {
        let segment_size = self.packet_size as usize - PACKET_HEADER_SIZE;
        let mut reader = self.buffer.reader();

        loop {
            let chunk = reader.remaining().min(segment_size);
            let last = reader.remaining() <= segment_size;
            let status = if last {
                PacketStatus::END_OF_MESSAGE
            } else {
                PacketStatus::NORMAL
            };

            let header = PacketHeader::new(
                message_type,
                status,
                (chunk + PACKET_HEADER_SIZE) as u16,
            );

            tracing::trace!(
                packet_type = ?message_type,
                length = chunk + PACKET_HEADER_SIZE,
                is_eom = last,
                "sending TDS packet"
            );

            let segment = reader.read_bytes(chunk).unwrap_or(&[]);
            self.transport.send(&header.to_bytes(), segment)?;

            if last {
                break;
            }
        }

        debug_assert_eq!(reader.remaining(), 0);
        Ok(())
    }

    /// Receive one complete TDS message, streaming packet data to
    /// `on_data`.
    ///
    /// The callback fires at least once per segment; when a segment's
    /// payload exceeds the buffer's free capacity it fires once per pull
    /// so the callback can drain the buffer incrementally. If free space
    /// ever reaches zero before a segment is fully pulled, the buffer is
    /// reset and the receive fails: the buffer is undersized for this
    /// message.
    ///
    /// Returns the number of segments processed. Any bytes the callback
    /// leaves unconsumed after the end-of-message packet are logged and
    /// discarded.
    pub fn receive_pdu(&mut self, on_data: &mut PacketDataFn<'_>) -> Result<u32, CodecError> {
        let mut segments = 0u32;

        loop {
            let mut header_bytes = [0u8; PACKET_HEADER_SIZE];
            self.transport.recv_exact(&mut header_bytes)?;
            let header = PacketHeader::decode(&mut &header_bytes[..])?;

            if header.validate_length().is_err() {
                return Err(CodecError::InvalidPacketLength(header.length));
            }

            tracing::trace!(
                packet_type = ?header.packet_type,
                length = header.length,
                is_eom = header.is_end_of_message(),
                "received TDS packet header"
            );

            let mut payload_len = header.payload_length();
            if payload_len > self.buffer.free_capacity() {
                // Streaming path: the segment does not fit behind the
                // unparsed tail, so pull and parse in chunks.
                while payload_len > 0 {
                    let chunk = payload_len.min(self.buffer.free_capacity());
                    if chunk == 0 {
                        self.buffer.reset();
                        return Err(CodecError::BufferExhausted {
                            capacity: self.buffer.capacity(),
                            needed: payload_len,
                        });
                    }
                    self.pull_and_dispatch(header.packet_type, chunk, on_data)?;
                    payload_len -= chunk;
                }
            } else {
                self.pull_and_dispatch(header.packet_type, payload_len, on_data)?;
            }

            segments += 1;
            if header.is_end_of_message() {
                break;
            }
        }

        let mut reader = self.buffer.reader();
        if reader.remaining() > 0 {
            tracing::warn!(
                residue = reader.remaining(),
                "unparsed bytes left after end of message, discarding"
            );
            reader.consume_all();
        }

        Ok(segments)
    }

    fn pull_and_dispatch(
        &mut self,
        message_type: PacketType,
        chunk: usize,
        on_data: &mut PacketDataFn<'_>,
    ) -> Result<(), CodecError> {
        let spare = self.buffer.spare_mut(chunk)?;
        self.transport.recv_exact(spare)?;
        self.buffer.advance_written(chunk);

        let mut reader = self.buffer.reader();
        let needed = on_data(message_type, &mut reader);
        if needed > 0 {
            tracing::trace!(needed, "packet data callback awaits more bytes");
        }
        Ok(())
    }
}
