//! Publish-only MQTT 3.1.1 session.
//!
//! The node is a pure publisher: it needs CONNECT/CONNACK to establish a
//! session and PUBLISH to report state, nothing else. This module implements
//! exactly that subset with fixed-size buffers, over any transport
//! implementing [`Connection`].
//!
//! Status messages are published retained at QoS 0: the broker keeps the
//! last report for late subscribers, and a lost reading costs nothing because
//! the scheduler re-reports on its next pass anyway. Delivery guarantees
//! beyond that are the broker's business, not this module's.
//!
//! The session performs no retries and owns no timers. A failed write or a
//! refused handshake is reported upward, where the connectivity manager
//! decides whether the transport session needs rebuilding.

use heapless::Vec;

use crate::net::Connection;
use crate::net::error::Error;

// MQTT control packet types (fixed header, packet type in the high nibble).
const CONNECT: u8 = 0x10;
const CONNACK: u8 = 0x20;
const PUBLISH: u8 = 0x30;

const RETAIN_FLAG: u8 = 0x01;

const CONNECT_FLAG_CLEAN_SESSION: u8 = 0x02;
const CONNECT_FLAG_PASSWORD: u8 = 0x40;
const CONNECT_FLAG_USERNAME: u8 = 0x80;

// Protocol constants defined by the MQTT 3.1.1 specification.
const PROTOCOL_NAME: &[u8] = b"MQTT";
const PROTOCOL_LEVEL: u8 = 4;

/// Configuration options for the broker handshake.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// The client identifier, unique within the broker. The node passes its
    /// module id here.
    pub client_id: &'a str,
    /// Username for authentication, `None` for anonymous access.
    pub username: Option<&'a str>,
    /// Password for authentication. Only sent when a username is present,
    /// as MQTT 3.1.1 requires.
    pub password: Option<&'a str>,
    /// Keep-alive interval in seconds, 0 to disable.
    pub keep_alive_seconds: u16,
    /// Whether the broker should discard previous session state.
    pub clean_session: bool,
}

/// An established broker session.
///
/// Created by [`Session::connect`]; consumed by dropping (the connectivity
/// manager rebuilds the whole transport on failure rather than salvaging a
/// half-dead session).
#[derive(Debug)]
pub struct Session<C: Connection> {
    connection: C,
}

impl<C: Connection> Session<C> {
    /// Perform the MQTT connection handshake.
    ///
    /// Sends CONNECT and waits for CONNACK on the given transport
    /// connection. Credentials from `options` are carried in the CONNECT
    /// payload with the corresponding connect flags set.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] / [`Error::ReadError`] - transport failure
    /// * [`Error::ConnectionClosed`] - peer closed during the handshake
    /// * [`Error::ConnectionRefused`] - broker rejected the session (bad
    ///   credentials, identifier rejected, server unavailable, ...)
    /// * [`Error::ProtocolError`] - malformed CONNACK
    pub fn connect(mut connection: C, options: Options) -> Result<Self, Error> {
        // --- Variable Header ---
        let mut vh: Vec<u8, 10> = Vec::new();
        vh.extend_from_slice(&(PROTOCOL_NAME.len() as u16).to_be_bytes())
            .unwrap();
        vh.extend_from_slice(PROTOCOL_NAME).unwrap();
        vh.push(PROTOCOL_LEVEL).unwrap();

        let mut connect_flags = 0;
        if options.clean_session {
            connect_flags |= CONNECT_FLAG_CLEAN_SESSION;
        }
        let username = options.username.filter(|u| !u.is_empty());
        let password = username.and(options.password).filter(|p| !p.is_empty());
        if username.is_some() {
            connect_flags |= CONNECT_FLAG_USERNAME;
        }
        if password.is_some() {
            connect_flags |= CONNECT_FLAG_PASSWORD;
        }
        vh.push(connect_flags).unwrap();
        vh.extend_from_slice(&options.keep_alive_seconds.to_be_bytes())
            .unwrap();

        // --- Payload: client id, then username and password when present ---
        let mut payload: Vec<u8, 256> = Vec::new();
        for field in [Some(options.client_id), username, password]
            .into_iter()
            .flatten()
        {
            let bytes = field.as_bytes();
            payload
                .extend_from_slice(&(bytes.len() as u16).to_be_bytes())
                .map_err(|_| Error::ProtocolError)?;
            payload
                .extend_from_slice(bytes)
                .map_err(|_| Error::ProtocolError)?;
        }

        let remaining_len = vh.len() + payload.len();

        // --- Fixed Header ---
        let mut fixed_header: Vec<u8, 5> = Vec::new();
        fixed_header.push(CONNECT).unwrap();
        encode_remaining_length(&mut fixed_header, remaining_len)
            .map_err(|_| Error::ProtocolError)?;

        connection
            .write(&fixed_header)
            .map_err(|_| Error::WriteError)?;
        connection.write(&vh).map_err(|_| Error::WriteError)?;
        connection.write(&payload).map_err(|_| Error::WriteError)?;
        connection.flush().map_err(|_| Error::WriteError)?;

        // Wait for and parse CONNACK
        let mut connack_buf = [0u8; 4];
        let mut total_read = 0;
        while total_read < connack_buf.len() {
            match connection.read(&mut connack_buf[total_read..]) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => total_read += n,
                Err(_) => return Err(Error::ReadError),
            }
        }

        if connack_buf[0] != CONNACK || connack_buf[1] != 2 {
            return Err(Error::ProtocolError);
        }

        // Connect return code: 0 accepted, 1-5 refused for a stated reason.
        match connack_buf[3] {
            0 => Ok(Self { connection }),
            1..=5 => Err(Error::ConnectionRefused),
            _ => Err(Error::ProtocolError),
        }
    }

    /// Publish a message at QoS 0.
    ///
    /// With `retain` set, the broker keeps the message as the topic's last
    /// known state for future subscribers.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - transport failure; the session should be
    ///   considered dead and rebuilt
    /// * [`Error::ProtocolError`] - topic plus payload exceed the packet
    ///   buffer
    pub fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Error> {
        let mut fixed_header: Vec<u8, 5> = Vec::new();
        let mut packet: Vec<u8, 1024> = Vec::new();

        // --- Variable Header ---
        let topic_bytes = topic.as_bytes();
        packet
            .extend_from_slice(&(topic_bytes.len() as u16).to_be_bytes())
            .map_err(|_| Error::ProtocolError)?;
        packet
            .extend_from_slice(topic_bytes)
            .map_err(|_| Error::ProtocolError)?;

        // --- Payload ---
        packet
            .extend_from_slice(payload)
            .map_err(|_| Error::ProtocolError)?;

        // --- Fixed Header ---
        let mut flags = PUBLISH;
        if retain {
            flags |= RETAIN_FLAG;
        }
        fixed_header.push(flags).unwrap();
        encode_remaining_length(&mut fixed_header, packet.len())
            .map_err(|_| Error::ProtocolError)?;

        self.connection
            .write(&fixed_header)
            .map_err(|_| Error::WriteError)?;
        self.connection
            .write(&packet)
            .map_err(|_| Error::WriteError)?;
        self.connection.flush().map_err(|_| Error::WriteError)?;

        Ok(())
    }
}

impl<C: Connection> crate::net::BrokerSession for Session<C> {
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Error> {
        Session::publish(self, topic, payload, retain)
    }
}

/// Encode the MQTT variable-length "remaining length" field.
///
/// Each byte carries 7 bits of the value; the high bit marks continuation.
/// Values up to 268 435 455 fit in the four bytes the spec allows.
fn encode_remaining_length(buf: &mut Vec<u8, 5>, mut len: usize) -> Result<(), ()> {
    loop {
        if buf.is_full() {
            return Err(());
        }
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        buf.push(byte).unwrap(); // `is_full` check above ensures this won't panic
        if len == 0 {
            break;
        }
    }
    Ok(())
}
