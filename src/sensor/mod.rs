//! Sensor channel model: sample sets, driver seams, and change detection.
//!
//! A *channel* is one logical sensor value. The `humidity` and `temperature`
//! channels are built in, read together from the hygrometer/thermometer, and
//! up to four switch channels are enabled by binding them to a property name
//! in the device configuration.
//!
//! A failed read is never fatal and never an error at this layer: the
//! channel's value becomes [`UNDEFINED_VALUE`] for this pass and the other
//! channels are unaffected. There are no retries here either; the scheduler's
//! next tick re-reads everything with fresh state.

#![deny(unsafe_code)]

use heapless::LinearMap;

use crate::config::{PropertyName, SWITCH_CHANNELS};

/// Sentinel published when reading a channel failed.
///
/// Distinct from every valid sensor range (humidity 0..=100, temperature
/// -40..=80, switches 0/1).
pub const UNDEFINED_VALUE: i16 = 999;

/// Largest number of channels a sample pass can produce: the two built-ins
/// plus every switch channel.
pub const MAX_CHANNELS: usize = 2 + SWITCH_CHANNELS;

/// One complete sampling pass: an ordered mapping from channel name to
/// reading.
///
/// Every enabled channel has exactly one entry per pass; disabled channels
/// (empty property name) have none. Comparison is by content, not by entry
/// order.
#[derive(Debug, Default, Clone)]
pub struct SampleSet {
    values: LinearMap<PropertyName, i16, MAX_CHANNELS>,
}

impl PartialEq for SampleSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(name, value)| other.get(name) == Some(value))
    }
}

impl SampleSet {
    /// An empty set, the implicit "nothing published yet" snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a channel reading.
    ///
    /// Replaces any previous entry for the same name.
    ///
    /// # Errors
    ///
    /// [`Error::NameTooLong`] if the name exceeds a property name's bound,
    /// [`Error::TooManyChannels`] past [`MAX_CHANNELS`] distinct names.
    pub fn insert(&mut self, name: &str, value: i16) -> Result<(), Error> {
        let key = PropertyName::try_from(name).map_err(|_| Error::NameTooLong)?;
        self.values
            .insert(key, value)
            .map(|_| ())
            .map_err(|_| Error::TooManyChannels)
    }

    /// The recorded value for a channel, if it was sampled this pass.
    pub fn get(&self, name: &str) -> Option<i16> {
        self.values
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, value)| *value)
    }

    /// Iterate `(name, value)` entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i16)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Number of channels sampled this pass.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no channel has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Errors from building a [`SampleSet`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The channel name exceeds the property-name length bound.
    NameTooLong,
    /// More distinct channels than [`MAX_CHANNELS`].
    TooManyChannels,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NameTooLong => defmt::write!(f, "NameTooLong"),
            Error::TooManyChannels => defmt::write!(f, "TooManyChannels"),
        }
    }
}

/// Decide whether a new sample pass differs from the last published one.
///
/// True iff any channel's value differs between the two sets, where a
/// channel present in one set but not the other counts as differing.
/// Sentinel-vs-sentinel is unchanged; sentinel-vs-value is changed. The
/// result is independent of entry order and symmetric in its arguments.
pub fn has_changed(current: &SampleSet, previous: &SampleSet) -> bool {
    if current.len() != previous.len() {
        return true;
    }
    current
        .iter()
        .any(|(name, value)| previous.get(name) != Some(value))
}

/// A combined humidity and temperature reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HygroThermReading {
    /// Relative humidity, integer percent in 0..=100.
    pub humidity: i16,
    /// Temperature, integer degrees Celsius in -40..=80.
    pub temperature: i16,
}

/// Driver seam for the combined humidity/temperature sensor.
///
/// One bus transaction yields both built-in channels, so they also fail
/// together: a read error leaves both at [`UNDEFINED_VALUE`].
pub trait HygroTherm {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Read the current humidity and temperature.
    fn read(&mut self) -> Result<HygroThermReading, Self::Error>;
}

/// Driver seam for one switch input (tilt sensor, contact, ...).
pub trait SwitchInput {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Read the current switch state.
    fn read(&mut self) -> Result<bool, Self::Error>;
}

/// Reads every enabled channel and yields the pass as a [`SampleSet`].
///
/// Each switch channel owns its own driver slot, indexed the same way as the
/// configuration bindings, so two channels can never alias one input.
#[derive(Debug)]
pub struct SensorBank<H, W> {
    hygrotherm: H,
    switches: [W; SWITCH_CHANNELS],
}

impl<H: HygroTherm, W: SwitchInput> SensorBank<H, W> {
    /// Assemble the bank from its drivers.
    pub fn new(hygrotherm: H, switches: [W; SWITCH_CHANNELS]) -> Self {
        Self {
            hygrotherm,
            switches,
        }
    }

    /// Perform one sampling pass.
    ///
    /// Switch channels with an empty binding are skipped entirely, not read.
    /// Any driver failure records [`UNDEFINED_VALUE`] for the affected
    /// channel(s) instead of propagating.
    pub fn sample(&mut self, bindings: &[PropertyName; SWITCH_CHANNELS]) -> SampleSet {
        let mut set = SampleSet::new();

        let (humidity, temperature) = match self.hygrotherm.read() {
            Ok(reading) => (reading.humidity, reading.temperature),
            Err(_) => (UNDEFINED_VALUE, UNDEFINED_VALUE),
        };
        // At most 2 + SWITCH_CHANNELS entries with bounded names; capacity
        // cannot be exceeded.
        set.insert("humidity", humidity).unwrap();
        set.insert("temperature", temperature).unwrap();

        for (channel, name) in bindings.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            let value = match self.switches[channel].read() {
                Ok(true) => 1,
                Ok(false) => 0,
                Err(_) => UNDEFINED_VALUE,
            };
            set.insert(name, value).unwrap();
        }

        set
    }
}
