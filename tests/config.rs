use multisensor::config::store::{ConfigStore, MAGIC};
use multisensor::config::{
    BrokerConfig, DEFAULT_BROKER_PORT, DeviceConfig, Error as ConfigError, ModuleId,
    NetworkConfig, PropertyName,
};
use multisensor::storage::error::Error;
use multisensor::storage::{ReadStorage, Storage};

const MOCK_CAPACITY: usize = 1024;

struct MockStorage {
    memory: [u8; MOCK_CAPACITY],
}

impl MockStorage {
    fn new() -> Self {
        Self {
            memory: [0xFF; MOCK_CAPACITY],
        }
    }
}

impl ReadStorage for MockStorage {
    type Error = Error;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        if offset + bytes.len() > self.memory.len() {
            return Err(Error::OutOfBounds);
        }
        bytes.copy_from_slice(&self.memory[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        MOCK_CAPACITY
    }
}

impl Storage for MockStorage {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        if offset + bytes.len() > self.memory.len() {
            return Err(Error::OutOfBounds);
        }
        self.memory[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

fn prop(name: &str) -> PropertyName {
    PropertyName::try_from(name).unwrap()
}

fn sample_config() -> DeviceConfig {
    DeviceConfig {
        network: NetworkConfig {
            ssid: "attic-net".try_into().unwrap(),
            password: "correct horse".try_into().unwrap(),
        },
        broker: BrokerConfig {
            host: "mqtt.local".try_into().unwrap(),
            port: DEFAULT_BROKER_PORT,
            username: "sensor".try_into().unwrap(),
            password: "secret".try_into().unwrap(),
            topic: "attic/status".try_into().unwrap(),
        },
        bindings: [prop("tilt"), prop(""), prop(""), prop("door")],
    }
}

#[test]
fn load_from_blank_storage_yields_none() {
    let mut store = ConfigStore::new(MockStorage::new());
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn save_then_load_round_trips() {
    let mut store = ConfigStore::new(MockStorage::new());
    let config = sample_config();
    store.save(&config).unwrap();
    assert_eq!(store.load().unwrap(), Some(config));
}

#[test]
fn clear_invalidates_the_record() {
    let mut store = ConfigStore::new(MockStorage::new());
    store.save(&sample_config()).unwrap();
    store.clear().unwrap();
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn corrupted_body_fails_the_crc_and_yields_none() {
    let mut store = ConfigStore::new(MockStorage::new());
    store.save(&sample_config()).unwrap();
    let mut storage = store.into_inner();
    storage.memory[20] ^= 0x01;
    let mut store = ConfigStore::new(storage);
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn implausible_length_yields_none() {
    let mut storage = MockStorage::new();
    storage.memory[0] = MAGIC;
    storage.memory[1..3].copy_from_slice(&u16::MAX.to_le_bytes());
    let mut store = ConfigStore::new(storage);
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn unparsable_body_yields_none() {
    let mut store = ConfigStore::new(MockStorage::new());
    store.save(&sample_config()).unwrap();
    let mut inner = store.into_inner();
    // Valid CRC over garbage: overwrite body and CRC consistently.
    let garbage = b"not json at all";
    inner.memory[7..7 + garbage.len()].copy_from_slice(garbage);
    inner.memory[1..3].copy_from_slice(&(garbage.len() as u16).to_le_bytes());
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(garbage);
    inner.memory[3..7].copy_from_slice(&hasher.finalize().to_le_bytes());
    let mut store = ConfigStore::new(inner);
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn module_id_uses_lowercase_hex_mac() {
    let id = ModuleId::from_mac(&[0xAA, 0xBB, 0x01, 0x02, 0x03, 0xFF]);
    assert_eq!(id.as_str(), "MULTISENSOR-aabb010203ff");
}

#[test]
fn default_topic_is_module_id_slash_status() {
    let id = ModuleId::from_mac(&[0, 0, 0, 0, 0, 1]);
    assert_eq!(id.default_topic().as_str(), "MULTISENSOR-000000000001/status");
}

#[test]
fn validation_rejects_unusable_records() {
    let mut config = sample_config();
    config.network.ssid = "".try_into().unwrap();
    assert_eq!(config.validate(), Err(ConfigError::MissingSsid));

    let mut config = sample_config();
    config.broker.host = "".try_into().unwrap();
    assert_eq!(config.validate(), Err(ConfigError::MissingHost));

    let mut config = sample_config();
    config.broker.port = 0;
    assert_eq!(config.validate(), Err(ConfigError::InvalidPort));

    let mut config = sample_config();
    config.broker.topic = "".try_into().unwrap();
    assert_eq!(config.validate(), Err(ConfigError::MissingTopic));

    assert_eq!(sample_config().validate(), Ok(()));
}

#[test]
fn validation_rejects_property_names_that_would_corrupt_the_message() {
    // These become JSON keys verbatim, so anything needing escaping is
    // refused at the provisioning boundary.
    for bad in ["til\"t", "back\\slash", "tab\there"] {
        let mut config = sample_config();
        config.bindings[0] = prop(bad);
        assert_eq!(config.validate(), Err(ConfigError::InvalidPropertyName));
    }

    let mut config = sample_config();
    config.bindings[0] = prop("door_2");
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn enabled_bindings_skip_empty_names() {
    let config = sample_config();
    let enabled: Vec<_> = config
        .enabled_bindings()
        .map(|(idx, name)| (idx, name.as_str()))
        .collect();
    assert_eq!(enabled, vec![(0, "tilt"), (3, "door")]);
}

#[test]
fn field_length_bounds_are_enforced_by_the_types() {
    assert!(PropertyName::try_from("a-name-that-is-way-too-long").is_err());
    assert!(PropertyName::try_from("exactly-twenty-chars").is_ok());
}
