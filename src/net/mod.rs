//! Network abstraction layer.
//!
//! The node talks to exactly one peer, its MQTT broker, over whatever
//! transport the host platform provides. This module defines the byte-stream
//! seam that transport must implement and the publish-only MQTT session that
//! runs on top of it. All calls are non-blocking or bounded-blocking; the
//! single control loop polls them cooperatively.

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Publish-only MQTT 3.1.1 session
pub mod mqtt;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connection, Read, Write};
}

pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read data from the connection
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous byte-stream connection
pub trait Connection: Read + Write + Close {}

/// An established broker session the node can publish through.
///
/// Implemented by [`mqtt::Session`]; tests substitute mocks at this seam.
pub trait BrokerSession {
    /// Publish a payload to a topic, optionally retained.
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), error::Error>;
}
