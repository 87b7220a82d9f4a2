//! Property tests for the framing invariants.
//!
//! For every legal packet size and payload, segmenting and reassembling
//! must reproduce the payload exactly, with correct per-segment headers.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io;

use mssql_codec::{Connection, Transport};
use proptest::prelude::*;
use tds_protocol::packet::{PACKET_HEADER_SIZE, PacketType};

#[derive(Debug, Default)]
struct LoopTransport {
    rx: VecDeque<u8>,
    sent: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Transport for LoopTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> io::Result<()> {
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn send(&mut self, header: &[u8], payload: &[u8]) -> io::Result<()> {
        self.sent.push((header.to_vec(), payload.to_vec()));
        Ok(())
    }

    fn recv_exact(&mut self, dst: &mut [u8]) -> io::Result<()> {
        if self.rx.len() < dst.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "drained"));
        }
        for byte in dst.iter_mut() {
            *byte = self.rx.pop_front().unwrap_or(0);
        }
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn segment_and_reassemble_is_identity(
        payload in proptest::collection::vec(any::<u8>(), 0..6000),
        packet_size in 512u32..=32767,
    ) {
        // --- outbound: segment ---
        let mut sender = Connection::new(LoopTransport::default(), payload.len().max(1));
        sender.set_packet_size(packet_size);
        sender.writer().put_slice(&payload).map_err(|e| TestCaseError::fail(e.to_string()))?;
        sender.send_pdu(PacketType::SqlBatch).map_err(|e| TestCaseError::fail(e.to_string()))?;

        let frames = std::mem::take(&mut sender.transport_mut().sent);
        let segment_limit = packet_size as usize - PACKET_HEADER_SIZE;
        let mut wire = Vec::new();

        for (index, (header, segment)) in frames.iter().enumerate() {
            let last = index == frames.len() - 1;
            // header length equals segment payload length plus header size
            let length = u16::from_be_bytes([header[2], header[3]]) as usize;
            prop_assert_eq!(length, segment.len() + PACKET_HEADER_SIZE);
            // end of message set on exactly the last segment
            prop_assert_eq!(header[1] & 0x01, u8::from(last));
            prop_assert!(segment.len() <= segment_limit);
            // channel, packet id, window are zero
            prop_assert_eq!(&header[4..8], &[0u8, 0, 0, 0][..]);

            wire.extend_from_slice(header);
            wire.extend_from_slice(segment);
        }

        // --- inbound: reassemble through a deliberately small buffer ---
        let receiver_transport = LoopTransport { rx: wire.into(), sent: Vec::new() };
        let mut receiver = Connection::new(receiver_transport, 256);
        let mut reassembled = Vec::new();
        receiver
            .receive_pdu(&mut |_, reader| {
                reassembled.extend_from_slice(reader.peek_remaining());
                reader.consume_all();
                0
            })
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(reassembled, payload);
    }

    #[test]
    fn buffer_write_read_roundtrip(chunks in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..64), 0..16,
    )) {
        let total: usize = chunks.iter().map(Vec::len).sum();
        let mut buffer = mssql_codec::MessageBuffer::new(total.max(1));
        {
            let mut writer = buffer.writer();
            for chunk in &chunks {
                writer.put_slice(chunk).map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
        }

        let mut reader = buffer.reader();
        let expected: Vec<u8> = chunks.concat();
        prop_assert_eq!(reader.read_bytes(total).unwrap_or(&[]), expected.as_slice());
        prop_assert_eq!(reader.remaining(), 0);
        drop(reader);
        prop_assert!(buffer.is_empty());
    }
}
