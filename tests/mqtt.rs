use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use multisensor::net::error::Error;
use multisensor::net::mqtt::{Options, Session};
use multisensor::net::{Close, Connection, Read, Write};

/// Shared handles onto a mock connection, kept by the test after the
/// connection itself moves into the session.
#[derive(Clone, Default)]
struct Wire {
    written: Rc<RefCell<Vec<u8>>>,
    to_read: Rc<RefCell<VecDeque<u8>>>,
}

impl Wire {
    fn inject(&self, data: &[u8]) {
        self.to_read.borrow_mut().extend(data.iter().copied());
    }

    fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.written.borrow_mut())
    }
}

struct MockConnection {
    wire: Wire,
}

impl Read for MockConnection {
    type Error = Error;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut queued = self.wire.to_read.borrow_mut();
        let len = buf.len().min(queued.len());
        for slot in buf.iter_mut().take(len) {
            *slot = queued.pop_front().unwrap();
        }
        Ok(len)
    }
}

impl Write for MockConnection {
    type Error = Error;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.wire.written.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockConnection {
    type Error = Error;
    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for MockConnection {}

const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

fn options<'a>() -> Options<'a> {
    Options {
        client_id: "MULTISENSOR-aabb010203ff",
        username: None,
        password: None,
        keep_alive_seconds: 60,
        clean_session: true,
    }
}

fn connect(wire: &Wire, opts: Options) -> Session<MockConnection> {
    wire.inject(&CONNACK_ACCEPTED);
    let session = Session::connect(MockConnection { wire: wire.clone() }, opts).unwrap();
    wire.take_written();
    session
}

/// Offset of the connect-flags byte in a CONNECT packet with a 1-byte
/// remaining length: type, remlen, protocol name (2 + 4), level.
const CONNECT_FLAGS_OFFSET: usize = 9;

#[test]
fn anonymous_connect_sets_only_clean_session() {
    let wire = Wire::default();
    wire.inject(&CONNACK_ACCEPTED);
    Session::connect(MockConnection { wire: wire.clone() }, options()).unwrap();

    let written = wire.take_written();
    assert_eq!(written[0], 0x10);
    assert_eq!(&written[2..4], &[0x00, 0x04]);
    assert_eq!(&written[4..8], b"MQTT");
    assert_eq!(written[8], 4);
    assert_eq!(written[CONNECT_FLAGS_OFFSET], 0x02);

    // Payload holds the client id only.
    let payload = &written[12..];
    let id = options().client_id.as_bytes();
    assert_eq!(&payload[..2], &(id.len() as u16).to_be_bytes());
    assert_eq!(&payload[2..2 + id.len()], id);
    assert_eq!(payload.len(), 2 + id.len());
}

#[test]
fn authenticated_connect_carries_credentials() {
    let wire = Wire::default();
    wire.inject(&CONNACK_ACCEPTED);
    let opts = Options {
        username: Some("sensor"),
        password: Some("secret"),
        ..options()
    };
    Session::connect(MockConnection { wire: wire.clone() }, opts).unwrap();

    let written = wire.take_written();
    // Clean session + username + password flags.
    assert_eq!(written[CONNECT_FLAGS_OFFSET], 0x02 | 0x80 | 0x40);

    let id = options().client_id.as_bytes();
    let after_id = 12 + 2 + id.len();
    let username = &written[after_id..];
    assert_eq!(&username[..2], &6u16.to_be_bytes());
    assert_eq!(&username[2..8], b"sensor");
    assert_eq!(&username[8..10], &6u16.to_be_bytes());
    assert_eq!(&username[10..16], b"secret");
}

#[test]
fn empty_username_means_anonymous() {
    let wire = Wire::default();
    wire.inject(&CONNACK_ACCEPTED);
    let opts = Options {
        username: Some(""),
        password: Some("secret"),
        ..options()
    };
    Session::connect(MockConnection { wire: wire.clone() }, opts).unwrap();
    let written = wire.take_written();
    assert_eq!(written[CONNECT_FLAGS_OFFSET], 0x02);
}

#[test]
fn refused_connack_is_connection_refused() {
    let wire = Wire::default();
    wire.inject(&[0x20, 0x02, 0x00, 0x05]); // not authorized
    let result = Session::connect(MockConnection { wire: wire.clone() }, options());
    assert_eq!(result.err(), Some(Error::ConnectionRefused));
}

#[test]
fn wrong_packet_type_is_a_protocol_error() {
    let wire = Wire::default();
    wire.inject(&[0x30, 0x02, 0x00, 0x00]);
    let result = Session::connect(MockConnection { wire: wire.clone() }, options());
    assert_eq!(result.err(), Some(Error::ProtocolError));
}

#[test]
fn closed_connection_during_handshake_is_reported() {
    let wire = Wire::default();
    // Nothing injected: the read loop sees EOF immediately.
    let result = Session::connect(MockConnection { wire: wire.clone() }, options());
    assert_eq!(result.err(), Some(Error::ConnectionClosed));
}

#[test]
fn publish_sets_the_retain_bit() {
    let wire = Wire::default();
    let mut session = connect(&wire, options());

    session.publish("attic/status", b"{}", true).unwrap();
    let written = wire.take_written();
    assert_eq!(written[0], 0x31);

    session.publish("attic/status", b"{}", false).unwrap();
    let written = wire.take_written();
    assert_eq!(written[0], 0x30);
}

#[test]
fn publish_frames_topic_and_payload() {
    let wire = Wire::default();
    let mut session = connect(&wire, options());

    let payload = br#"{"humidity":45,"temperature":22}"#;
    session.publish("attic/status", payload, true).unwrap();

    let written = wire.take_written();
    let topic = b"attic/status";
    let remaining = 2 + topic.len() + payload.len();
    assert_eq!(written[1] as usize, remaining);
    assert_eq!(&written[2..4], &(topic.len() as u16).to_be_bytes());
    assert_eq!(&written[4..4 + topic.len()], topic);
    assert_eq!(&written[4 + topic.len()..], payload);
}

#[test]
fn large_publish_uses_multi_byte_remaining_length() {
    let wire = Wire::default();
    let mut session = connect(&wire, options());

    let payload = [b'x'; 200];
    session.publish("t", &payload, false).unwrap();

    let written = wire.take_written();
    // remaining = 2 + 1 + 200 = 203 = 1 * 128 + 75
    assert_eq!(written[1], 75 | 0x80);
    assert_eq!(written[2], 1);
}

#[test]
fn oversized_publish_is_rejected_not_truncated() {
    let wire = Wire::default();
    let mut session = connect(&wire, options());

    let payload = [b'x'; 1100];
    let result = session.publish("t", &payload, false);
    assert_eq!(result.err(), Some(Error::ProtocolError));
    assert!(wire.take_written().is_empty());
}
