//! Login handshake integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use mssql_client::{Client, Config, Error};

fn config() -> Config {
    Config::new("db.example.com")
        .with_credentials("sa", "hunter2")
        .with_database("master")
        .with_app_name("it-tests")
}

#[test]
fn login_succeeds_and_sets_authenticated() {
    let transport = MockTransport::with_responses(login_success());
    let mut client = Client::connect_with(transport, &config()).expect("login should succeed");

    assert!(client.is_authenticated());
    assert!(client.transport_mut().connected);

    // exactly one message sent: the LOGIN7 request
    let sent = &client.transport_mut().sent;
    assert_eq!(sent.len(), 1);
    let (header, payload) = &sent[0];
    assert_eq!(header[0], 0x10); // LOGIN packet type
    assert_eq!(header[1], 0x01); // single-segment message
    assert_eq!(
        u16::from_be_bytes([header[2], header[3]]) as usize,
        payload.len() + 8
    );

    // LOGIN7 payload: patched length, then the TDS version big-endian
    let announced = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    assert_eq!(announced as usize, payload.len());
    assert_eq!(&payload[4..8], &[0x71, 0x00, 0x00, 0x01]);
}

#[test]
fn login_payload_carries_obfuscated_password() {
    let transport = MockTransport::with_responses(login_success());
    let mut config = config();
    config.password = "JaxView".to_string();
    let mut client = Client::connect_with(transport, &config).expect("login should succeed");

    let payload = client.transport_mut().sent[0].1.clone();
    let expected = [
        0x01, 0xA5, 0xB3, 0xA5, 0x22, 0xA5, 0xC0, 0xA5, 0x33, 0xA5, 0xF3, 0xA5, 0xD2, 0xA5,
    ];
    assert!(
        payload.windows(expected.len()).any(|w| w == expected),
        "obfuscated password bytes not found in LOGIN7 payload"
    );
    // the clear password must not appear
    let clear = ucs2("JaxView");
    assert!(!payload.windows(clear.len()).any(|w| w == clear));
}

#[test]
fn login_failure_reports_error() {
    let transport = MockTransport::with_responses(login_failure());
    let err = Client::connect_with(transport, &config()).unwrap_err();
    assert!(matches!(err, Error::LoginFailed));
}

#[test]
fn login_without_ack_fails() {
    // server answers with a bare DONE and no LOGINACK
    let transport = MockTransport::with_responses(tabular_pdu(&token_done(0, 0)));
    let err = Client::connect_with(transport, &config()).unwrap_err();
    assert!(matches!(err, Error::LoginFailed));
}

#[test]
fn invalid_parameters_rejected_before_io() {
    let err = Client::connect_with(MockTransport::default(), &Config::new("")).unwrap_err();
    assert!(matches!(err, Error::ServerNameEmpty));

    let bad_size = Config::new("host").with_packet_size(300);
    let err = Client::connect_with(MockTransport::default(), &bad_size).unwrap_err();
    assert!(matches!(err, Error::PacketSizeInvalid(300)));
}

#[test]
fn envchange_renegotiates_packet_size() {
    let mut script = login_success_with_packet_size("8192", "4096");
    script.extend_from_slice(&tabular_pdu(&token_done(0x10, 0)));

    let transport = MockTransport::with_responses(script);
    let mut client = Client::connect_with(transport, &config()).expect("login should succeed");
    assert_eq!(client.packet_size(), 8192);

    // A batch bigger than one segment now fragments at 8192-byte packets.
    let sql = "X".repeat(5000); // 10000 bytes of UCS-2
    client.execute_query(&sql).expect("query should succeed");

    let sent = client.transport_mut().sent.clone();
    assert_eq!(sent.len(), 3); // login + two batch segments

    let (first_header, first_payload) = &sent[1];
    assert_eq!(u16::from_be_bytes([first_header[2], first_header[3]]), 8192);
    assert_eq!(first_header[1], 0x00);
    assert_eq!(first_payload.len(), 8184);

    let (last_header, last_payload) = &sent[2];
    assert_eq!(last_header[1], 0x01);
    assert_eq!(last_payload.len(), 10000 - 8184);
}
