//! Persisted configuration record.
//!
//! Layout, from offset 0 of the backing storage:
//!
//! ```text
//! +-------+----------+-----------+------------------+
//! | magic | len: u16 | crc: u32  | JSON body        |
//! | 0xAE  | (LE)     | (LE)      | DeviceConfig     |
//! +-------+----------+-----------+------------------+
//! ```
//!
//! Presence is tested via the magic byte; integrity via a CRC32 over the
//! JSON body. Absence or mismatch of either yields `Ok(None)` from
//! [`ConfigStore::load`], which the connectivity manager treats as "no
//! stored configuration" and answers with the provisioning portal. A record
//! that fails to parse is handled the same way rather than as an error: the
//! only recovery for a corrupt record is re-provisioning.
//!
//! [`ConfigStore::save`] writes the magic byte last, so a write interrupted
//! by power loss leaves a record that fails the presence test instead of one
//! that half-validates.

use super::DeviceConfig;
use crate::storage::Storage;

/// Marker byte proving a record has been written.
pub const MAGIC: u8 = 0xAE;

const MAGIC_OFFSET: u32 = 0;
const LEN_OFFSET: u32 = 1;
const CRC_OFFSET: u32 = 3;
const BODY_OFFSET: u32 = 7;

/// Upper bound on the serialized record body.
///
/// Sized for a `DeviceConfig` with every field at maximum length plus JSON
/// framing.
pub const MAX_BODY_LEN: usize = 512;

/// Errors from persisting a configuration record.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// The underlying storage device failed.
    Storage(E),
    /// The record could not be serialized.
    Encode,
    /// The serialized record does not fit the device.
    RecordTooLarge,
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Error::Storage(err)
    }
}

/// Loads and saves the [`DeviceConfig`] record over a [`Storage`] device.
#[derive(Debug)]
pub struct ConfigStore<S: Storage> {
    storage: S,
}

impl<S: Storage> ConfigStore<S> {
    /// Wrap a storage device.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Give the storage device back.
    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Read the stored configuration, if a valid one is present.
    ///
    /// Returns `Ok(None)` when the magic byte is absent, the length is
    /// implausible, the CRC does not match, or the body fails to parse.
    /// Only a storage-level read failure is an error.
    pub fn load(&mut self) -> Result<Option<DeviceConfig>, S::Error> {
        let mut magic = [0u8; 1];
        self.storage.read(MAGIC_OFFSET, &mut magic)?;
        if magic[0] != MAGIC {
            return Ok(None);
        }

        let mut len_bytes = [0u8; 2];
        self.storage.read(LEN_OFFSET, &mut len_bytes)?;
        let len = u16::from_le_bytes(len_bytes) as usize;
        if len == 0
            || len > MAX_BODY_LEN
            || BODY_OFFSET as usize + len > self.storage.capacity()
        {
            return Ok(None);
        }

        let mut crc_bytes = [0u8; 4];
        self.storage.read(CRC_OFFSET, &mut crc_bytes)?;
        let stored_crc = u32::from_le_bytes(crc_bytes);

        let mut body = [0u8; MAX_BODY_LEN];
        self.storage.read(BODY_OFFSET, &mut body[..len])?;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body[..len]);
        if hasher.finalize() != stored_crc {
            return Ok(None);
        }

        match serde_json_core::from_slice::<DeviceConfig>(&body[..len]) {
            Ok((config, _)) => Ok(Some(config)),
            Err(_) => Ok(None),
        }
    }

    /// Persist a configuration record.
    ///
    /// The write is ordered body, length, CRC, then magic, so the record
    /// only becomes loadable once it is complete.
    pub fn save(&mut self, config: &DeviceConfig) -> Result<(), Error<S::Error>> {
        let mut body = [0u8; MAX_BODY_LEN];
        let len = serde_json_core::to_slice(config, &mut body).map_err(|_| Error::Encode)?;
        if BODY_OFFSET as usize + len > self.storage.capacity() {
            return Err(Error::RecordTooLarge);
        }

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&body[..len]);
        let crc = hasher.finalize();

        self.storage.write(BODY_OFFSET, &body[..len])?;
        self.storage
            .write(LEN_OFFSET, &(len as u16).to_le_bytes())?;
        self.storage.write(CRC_OFFSET, &crc.to_le_bytes())?;
        self.storage.write(MAGIC_OFFSET, &[MAGIC])?;
        Ok(())
    }

    /// Invalidate any stored record by clearing the magic byte.
    ///
    /// The next boot will re-enter provisioning.
    pub fn clear(&mut self) -> Result<(), S::Error> {
        self.storage.write(MAGIC_OFFSET, &[0u8])
    }
}
