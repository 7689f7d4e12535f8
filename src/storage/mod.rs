//! # Storage abstraction for the persisted configuration record
//!
//! The node keeps exactly one persistent artifact: its provisioning record
//! (see [`crate::config::store`]). This module provides the small trait seam
//! that record is read and written through, so the same codec works over
//! EEPROM, flash, FRAM, or a RAM mock in tests.
//!
//! The traits are deliberately minimal: byte-addressed read and write plus a
//! capacity query. Erase management, wear levelling, and block/sector
//! geometry are the driver's business; a device that needs an erase before
//! write performs it inside [`Storage::write`].

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for storage operations
pub mod error;

/// Trait for reading bytes from a storage device.
///
/// This is the fundamental trait for all readable storage devices. It
/// provides a simple interface for reading data at specific offsets without
/// requiring write capabilities.
pub trait ReadStorage {
    /// Associated error type for read operations
    type Error: core::fmt::Debug;

    /// Read data from the storage device.
    ///
    /// Reads data from the specified offset into the provided buffer. The
    /// entire buffer is filled unless an error occurs.
    ///
    /// # Errors
    ///
    /// - `OutOfBounds` if offset + buffer length exceeds device capacity
    /// - `ReadError` if the hardware read operation fails
    /// - `NotInitialized` if the device is not properly initialized
    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error>;

    /// Total capacity of the storage device in bytes.
    fn capacity(&self) -> usize;
}

/// Trait for storage devices that support both read and write operations.
///
/// Writes must be durable by the time `write` returns: the provisioning flow
/// persists the submitted configuration synchronously before the device
/// leaves the portal, and a record that only made it to a write cache would
/// defeat that.
pub trait Storage: ReadStorage {
    /// Write data to the storage device.
    ///
    /// Writes the provided data at the specified offset. Technologies that
    /// require an erase cycle before programming perform it internally.
    ///
    /// # Errors
    ///
    /// - `OutOfBounds` if offset + data length exceeds device capacity
    /// - `WriteError` if the hardware write operation fails
    /// - `NotInitialized` if the device is not properly initialized
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error>;
}
