//! Connectivity state machine.

use crate::config::{DeviceConfig, ModuleId};
use crate::net::BrokerSession;
use crate::node::{Directive, LinkStatus, Platform};

/// How long the provisioning portal stays open before the run is abandoned.
pub const PORTAL_TIMEOUT_MS: u64 = 180_000;

/// Fixed delay between broker handshake attempts.
///
/// Deliberately not exponential: broker outages are expected to be
/// transient and the device has no better fallback than to keep trying.
pub const BROKER_BACKOFF_MS: u64 = 5_000;

/// Connectivity states.
///
/// Exactly one instance exists per node, mutated only by
/// [`ConnectivityManager::service`] (and [`ConnectivityManager::session_lost`]
/// when a publish fails).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No usable stored configuration has been established yet.
    Unprovisioned,
    /// The configuration portal is open, bounded by [`PORTAL_TIMEOUT_MS`].
    Provisioning,
    /// Waiting for the wireless association to come up.
    ConnectingNetwork,
    /// Attempting the broker handshake, retrying indefinitely with
    /// [`BROKER_BACKOFF_MS`] between failures.
    ConnectingBroker,
    /// Normal operation; the publish scheduler is active.
    Connected,
    /// Provisioning timed out. Terminal for this run; the host restarts the
    /// device and a fresh boot re-evaluates from [`State::Unprovisioned`].
    Failed,
}

#[cfg(feature = "defmt")]
impl defmt::Format for State {
    fn format(&self, f: defmt::Formatter) {
        match self {
            State::Unprovisioned => defmt::write!(f, "Unprovisioned"),
            State::Provisioning => defmt::write!(f, "Provisioning"),
            State::ConnectingNetwork => defmt::write!(f, "ConnectingNetwork"),
            State::ConnectingBroker => defmt::write!(f, "ConnectingBroker"),
            State::Connected => defmt::write!(f, "Connected"),
            State::Failed => defmt::write!(f, "Failed"),
        }
    }
}

/// Drives the device from boot to a live broker session and back through
/// recovery.
///
/// The manager owns the live configuration and the broker session; sampling
/// and publishing only proceed once [`state`](Self::state) is
/// [`State::Connected`]. All waits are deadlines against the caller's
/// monotonic clock; `service` never blocks.
#[derive(Debug)]
pub struct ConnectivityManager<S> {
    state: State,
    identity: ModuleId,
    config: Option<DeviceConfig>,
    session: Option<S>,
    portal_deadline: u64,
    retry_at: u64,
}

impl<S: BrokerSession> ConnectivityManager<S> {
    /// A manager at boot, before the stored configuration has been
    /// consulted.
    pub fn new(identity: ModuleId) -> Self {
        Self {
            state: State::Unprovisioned,
            identity,
            config: None,
            session: None,
            portal_deadline: 0,
            retry_at: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The device identity (access-point name and broker client id).
    pub fn identity(&self) -> &ModuleId {
        &self.identity
    }

    /// The live configuration, once one has been loaded or submitted.
    pub fn config(&self) -> Option<&DeviceConfig> {
        self.config.as_ref()
    }

    /// The configuration and broker session together, available only while
    /// connected. This is what the publish path borrows.
    pub fn publish_context(&mut self) -> Option<(&DeviceConfig, &mut S)> {
        match (&self.config, &mut self.session) {
            (Some(config), Some(session)) => Some((config, session)),
            _ => None,
        }
    }

    /// Report that the broker session dropped (a publish failed or the
    /// transport was observed dead).
    ///
    /// The configuration remains valid; only the transport session is
    /// rebuilt. The first reconnect attempt is immediate; backoff applies
    /// after a failed attempt, not before the first one.
    pub fn session_lost(&mut self, now: u64) {
        self.session = None;
        self.retry_at = now;
        self.state = State::ConnectingBroker;
    }

    /// Advance the state machine by at most one transition.
    ///
    /// Called once per control-loop iteration, before any sampling or
    /// publishing. Returns [`Directive::Restart`] when the run cannot
    /// continue (provisioning timed out); every other outcome is
    /// [`Directive::Continue`].
    pub fn service<P>(&mut self, now: u64, platform: &mut P) -> Directive
    where
        P: Platform<Session = S>,
    {
        match self.state {
            State::Unprovisioned => {
                let stored = platform.load_config().ok().flatten();
                match stored {
                    Some(config) if config.validate().is_ok() => {
                        platform.join_network(&config.network);
                        self.config = Some(config);
                        self.state = State::ConnectingNetwork;
                    }
                    // Absent, unreadable, or invalid records all mean the
                    // same thing: ask the user.
                    _ => self.open_portal(now, platform),
                }
            }
            State::Provisioning => {
                if let Some(submitted) = platform.poll_portal() {
                    if submitted.validate().is_ok() {
                        // Persist synchronously before moving on; a failed
                        // save costs re-provisioning on the next boot, not
                        // this run.
                        let _ = platform.save_config(&submitted);
                        platform.stop_portal();
                        platform.join_network(&submitted.network);
                        self.config = Some(submitted);
                        self.state = State::ConnectingNetwork;
                    }
                    // An invalid submission is discarded; the portal stays
                    // open until the timeout.
                } else if now >= self.portal_deadline {
                    platform.stop_portal();
                    self.state = State::Failed;
                    return Directive::Restart;
                }
            }
            State::ConnectingNetwork => match platform.link_status() {
                LinkStatus::Up => {
                    self.state = State::ConnectingBroker;
                    self.retry_at = now;
                }
                LinkStatus::Joining => {}
                // Credentials may simply be wrong; re-provisioning beats
                // retrying them forever.
                LinkStatus::AuthFailed => self.open_portal(now, platform),
            },
            State::ConnectingBroker => {
                if now < self.retry_at {
                    return Directive::Continue;
                }
                let Some(config) = self.config.as_ref() else {
                    self.state = State::Unprovisioned;
                    return Directive::Continue;
                };
                match platform.connect_broker(&config.broker, self.identity.as_str()) {
                    Ok(session) => {
                        self.session = Some(session);
                        self.state = State::Connected;
                    }
                    Err(_) => self.retry_at = now + BROKER_BACKOFF_MS,
                }
            }
            State::Connected => {
                if self.session.is_none() {
                    self.state = State::ConnectingBroker;
                    self.retry_at = now;
                }
            }
            State::Failed => return Directive::Restart,
        }
        Directive::Continue
    }

    fn open_portal<P>(&mut self, now: u64, platform: &mut P)
    where
        P: Platform<Session = S>,
    {
        platform.start_portal(&self.identity, self.config.as_ref());
        self.portal_deadline = now + PORTAL_TIMEOUT_MS;
        self.state = State::Provisioning;
    }
}
