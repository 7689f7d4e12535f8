//! Device configuration and identity.
//!
//! A node carries exactly one configuration record: the wireless network it
//! should join, the broker it should publish to, and up to four
//! channel-to-property-name bindings for the switch inputs. The record is
//! entered through the provisioning portal, validated here at that boundary,
//! and persisted through [`store`].
//!
//! All text fields are bounded-length owned strings. The bounds are part of
//! the contract (they size the persisted record and the portal form), not
//! just buffer capacities: a submission that exceeds them is rejected during
//! provisioning rather than truncated.

use core::fmt::Write as _;

use heapless::String;
use serde::{Deserialize, Serialize};

pub mod store;

/// Maximum length of the broker host name or IP address.
pub const MAX_HOST_LEN: usize = 40;
/// Maximum length of the broker username and password.
pub const MAX_CREDENTIAL_LEN: usize = 20;
/// Maximum length of the publish topic.
pub const MAX_TOPIC_LEN: usize = 60;
/// Maximum length of a channel property name.
pub const MAX_PROPERTY_NAME_LEN: usize = 20;
/// Maximum length of the wireless network SSID.
pub const MAX_SSID_LEN: usize = 32;
/// Maximum length of the wireless network password.
pub const MAX_NETWORK_PASSWORD_LEN: usize = 64;
/// Number of configurable switch channels.
pub const SWITCH_CHANNELS: usize = 4;
/// Broker port used when the portal submission leaves it unset.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// Broker host name or IP address.
pub type Hostname = String<MAX_HOST_LEN>;
/// Broker username or password.
pub type Credential = String<MAX_CREDENTIAL_LEN>;
/// MQTT topic string.
pub type Topic = String<MAX_TOPIC_LEN>;
/// Name under which a switch channel appears in the status message.
///
/// An empty property name disables the channel entirely: it is neither
/// sampled nor published.
pub type PropertyName = String<MAX_PROPERTY_NAME_LEN>;

/// Wireless network credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// SSID of the network the device should join.
    pub ssid: String<MAX_SSID_LEN>,
    /// Password for the network, empty for an open network.
    pub password: String<MAX_NETWORK_PASSWORD_LEN>,
}

/// Broker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Host name or IP address of the MQTT broker.
    pub host: Hostname,
    /// Broker port, normally [`DEFAULT_BROKER_PORT`].
    pub port: u16,
    /// Username for the broker session, empty for anonymous access.
    pub username: Credential,
    /// Password for the broker session.
    pub password: Credential,
    /// Topic the status message is published to.
    pub topic: Topic,
}

/// The complete provisioning record.
///
/// Loaded once at boot from persistent storage and replaced only through the
/// provisioning flow. The control loop owns the single live instance; no
/// process-wide copies exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Wireless network credentials.
    pub network: NetworkConfig,
    /// Broker connection settings.
    pub broker: BrokerConfig,
    /// Property-name binding per switch channel, indexed by channel number.
    /// Empty name = channel disabled.
    pub bindings: [PropertyName; SWITCH_CHANNELS],
}

impl DeviceConfig {
    /// Check the invariants a usable record must satisfy.
    ///
    /// Called at the provisioning boundary: a portal submission that fails
    /// validation is discarded and the portal stays open.
    pub fn validate(&self) -> Result<(), Error> {
        if self.network.ssid.is_empty() {
            return Err(Error::MissingSsid);
        }
        if self.broker.host.is_empty() {
            return Err(Error::MissingHost);
        }
        if self.broker.port == 0 {
            return Err(Error::InvalidPort);
        }
        if self.broker.topic.is_empty() {
            return Err(Error::MissingTopic);
        }
        // Property names become JSON keys verbatim; a quote, backslash, or
        // control character would corrupt the status message.
        for name in &self.bindings {
            if name.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
                return Err(Error::InvalidPropertyName);
            }
        }
        Ok(())
    }

    /// Iterate the switch channels that are bound to a non-empty property
    /// name, as `(channel index, name)` pairs.
    pub fn enabled_bindings(&self) -> impl Iterator<Item = (usize, &PropertyName)> {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
    }
}

/// A configuration record that cannot be used to bring the node up.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The network SSID is empty.
    MissingSsid,
    /// The broker host is empty.
    MissingHost,
    /// The broker port is zero.
    InvalidPort,
    /// The publish topic is empty.
    MissingTopic,
    /// A channel property name contains a character that cannot appear in a
    /// JSON key without escaping.
    InvalidPropertyName,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::MissingSsid => defmt::write!(f, "MissingSsid"),
            Error::MissingHost => defmt::write!(f, "MissingHost"),
            Error::InvalidPort => defmt::write!(f, "InvalidPort"),
            Error::MissingTopic => defmt::write!(f, "MissingTopic"),
            Error::InvalidPropertyName => defmt::write!(f, "InvalidPropertyName"),
        }
    }
}

/// Device identity derived from the wireless interface MAC address.
///
/// Formatted as `MULTISENSOR-` followed by the lowercase hex MAC. The same
/// string serves as the provisioning access-point name, the MQTT client id,
/// and the default topic prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleId {
    id: String<{ 12 + 12 }>,
}

impl ModuleId {
    /// Build the identity from the six MAC address octets.
    pub fn from_mac(mac: &[u8; 6]) -> Self {
        let mut id = String::new();
        // "MULTISENSOR-" (12) + 12 hex digits fits the capacity exactly.
        write!(
            id,
            "MULTISENSOR-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
        )
        .unwrap();
        Self { id }
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// The topic used when the portal submission leaves the topic unset:
    /// `<moduleId>/status`.
    pub fn default_topic(&self) -> Topic {
        let mut topic = Topic::new();
        // 24-char id + "/status" is well inside MAX_TOPIC_LEN.
        write!(topic, "{}/status", self.id).unwrap();
        topic
    }
}

impl core::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.id)
    }
}
