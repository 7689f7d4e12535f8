//! Control core of the sensor node.
//!
//! This module ties the crate together: the [`ConnectivityManager`] state
//! machine gates everything, the [`PublishScheduler`] decides when to sample
//! and when to report, and [`publish_status`] turns a sample pass into the
//! wire message. [`Node`] owns all three plus the sensor bank and exposes the
//! single cooperative entry point, [`Node::run_once`].
//!
//! ## Collaborators
//!
//! Everything the node cannot do by itself (persistent storage, the captive
//! configuration portal, the wireless association procedure, opening a
//! transport connection to the broker) is reached through the [`Platform`]
//! trait. The host implements it once per board; tests script it.
//!
//! ## Time
//!
//! There is no global clock. Every entry point takes the current monotonic
//! time in milliseconds, and all throttles, heartbeats, timeouts, and
//! backoffs are deadlines against that value. The host passes its tick
//! counter; tests pass whatever timeline they want to explore.

mod connectivity;
mod publisher;
mod scheduler;

pub use connectivity::{BROKER_BACKOFF_MS, ConnectivityManager, PORTAL_TIMEOUT_MS, State};
pub use publisher::{MAX_MESSAGE_LEN, publish_status, render_status};
pub use scheduler::{HARD_INTERVAL_MS, PublishScheduler, SOFT_INTERVAL_MS, Tick};

use crate::config::{BrokerConfig, DeviceConfig, ModuleId, NetworkConfig};
use crate::net::BrokerSession;
use crate::net::error::Error as NetError;
use crate::sensor::{HygroTherm, SensorBank, SwitchInput};

/// What the control loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep looping.
    Continue,
    /// The run cannot continue; the host must restart the device.
    Restart,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Directive {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Directive::Continue => defmt::write!(f, "Continue"),
            Directive::Restart => defmt::write!(f, "Restart"),
        }
    }
}

/// Observed state of the wireless association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Association still in progress.
    Joining,
    /// Associated; the network is usable.
    Up,
    /// The access point rejected the credentials.
    AuthFailed,
}

#[cfg(feature = "defmt")]
impl defmt::Format for LinkStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            LinkStatus::Joining => defmt::write!(f, "Joining"),
            LinkStatus::Up => defmt::write!(f, "Up"),
            LinkStatus::AuthFailed => defmt::write!(f, "AuthFailed"),
        }
    }
}

/// Board-specific collaborators the connectivity manager drives.
///
/// All methods must return promptly: the portal and the association are
/// started once and then *polled*, and `connect_broker` may block only for
/// the duration of one bounded handshake attempt.
pub trait Platform {
    /// The broker session type produced by a successful handshake.
    type Session: BrokerSession;
    /// Error type of the persistent configuration store.
    type StorageError: core::fmt::Debug;

    /// Read the stored configuration record, `Ok(None)` when no valid
    /// record is present.
    fn load_config(&mut self) -> Result<Option<DeviceConfig>, Self::StorageError>;

    /// Persist a configuration record durably.
    fn save_config(&mut self, config: &DeviceConfig) -> Result<(), Self::StorageError>;

    /// Bring up the local access point and configuration portal.
    ///
    /// `current` carries the stored configuration when one exists, so the
    /// portal can pre-populate its form with it.
    fn start_portal(&mut self, identity: &ModuleId, current: Option<&DeviceConfig>);

    /// Check the portal for a user submission. Returns the submitted record
    /// once, then `None` again.
    fn poll_portal(&mut self) -> Option<DeviceConfig>;

    /// Tear the portal and access point back down.
    fn stop_portal(&mut self);

    /// Begin associating with the configured wireless network.
    fn join_network(&mut self, network: &NetworkConfig);

    /// Observe the association started by
    /// [`join_network`](Self::join_network).
    fn link_status(&mut self) -> LinkStatus;

    /// Open a transport connection and perform one broker handshake
    /// attempt.
    fn connect_broker(
        &mut self,
        broker: &BrokerConfig,
        client_id: &str,
    ) -> Result<Self::Session, NetError>;
}

/// The assembled sensor node.
///
/// Owns the connectivity manager, the publish scheduler, and the sensor
/// bank; borrows the [`Platform`] on each pass so the host keeps ownership
/// of its drivers.
pub struct Node<P: Platform, H, W> {
    manager: ConnectivityManager<P::Session>,
    scheduler: PublishScheduler,
    bank: SensorBank<H, W>,
}

impl<P, H, W> core::fmt::Debug for Node<P, H, W>
where
    P: Platform,
    P::Session: core::fmt::Debug,
    H: core::fmt::Debug,
    W: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("manager", &self.manager)
            .field("scheduler", &self.scheduler)
            .field("bank", &self.bank)
            .finish()
    }
}

impl<P, H, W> Node<P, H, W>
where
    P: Platform,
    H: HygroTherm,
    W: SwitchInput,
{
    /// Assemble a node from its identity and sensor bank.
    pub fn new(identity: ModuleId, bank: SensorBank<H, W>) -> Self {
        Self {
            manager: ConnectivityManager::new(identity),
            scheduler: PublishScheduler::new(),
            bank,
        }
    }

    /// The connectivity manager, for state inspection.
    pub fn manager(&self) -> &ConnectivityManager<P::Session> {
        &self.manager
    }

    /// Run one iteration of the control loop at monotonic time `now`
    /// (milliseconds).
    ///
    /// Connectivity is checked and serviced first; sampling and publishing
    /// are attempted only in [`State::Connected`], so a disconnected
    /// session is never handed a publish. A publish failure is treated as a
    /// broker-session problem: the manager re-enters
    /// [`State::ConnectingBroker`] and the failed sample is simply
    /// superseded by the next pass.
    pub fn run_once(&mut self, now: u64, platform: &mut P) -> Directive {
        if self.manager.service(now, platform) == Directive::Restart {
            return Directive::Restart;
        }

        if self.manager.state() != State::Connected {
            return Directive::Continue;
        }
        let Some((config, session)) = self.manager.publish_context() else {
            return Directive::Continue;
        };

        let bank = &mut self.bank;
        let bindings = &config.bindings;
        let topic = config.broker.topic.as_str();
        let outcome = self.scheduler.tick(
            now,
            || bank.sample(bindings),
            |samples| publisher::publish_status(session, topic, samples),
        );

        if outcome.is_err() {
            self.manager.session_lost(now);
        }
        Directive::Continue
    }
}
