//! # multisensor - battery-class MQTT sensor node core
//!
//! This crate implements the control core of a small wireless multi-sensor
//! node: it samples a handful of digital/analog channels, detects meaningful
//! change, and reports state to an MQTT broker, while handling first-time and
//! recovery network provisioning. It is designed for embedded systems and
//! supports `no_std` environments.
//!
//! ## What lives here
//!
//! - **Sampling** ([`sensor`]): driver trait seams for the hygrometer/
//!   thermometer and up to four switch inputs, plus the change detector that
//!   decides whether a new reading is worth reporting.
//! - **Scheduling** ([`node::PublishScheduler`]): a minimum-interval throttle
//!   combined with a maximum-interval heartbeat, so a noisy input cannot
//!   flood the broker and a silent node still proves it is alive.
//! - **Connectivity** ([`node::ConnectivityManager`]): the state machine that
//!   takes the device from unprovisioned, through the configuration portal,
//!   onto the wireless network and broker session, and back through recovery
//!   when any of those are lost.
//! - **Transport** ([`net`]): a connection-agnostic, publish-only MQTT 3.1.1
//!   session.
//! - **Configuration** ([`config`]): the bounded provisioning record, the
//!   device identity derived from the MAC address, and the persisted-record
//!   codec over the [`storage`] traits.
//!
//! ## What deliberately does not
//!
//! The captive-portal HTTP server, the wireless association procedure, the
//! sensor bus transactions, and persistent memory are external collaborators:
//! the host platform supplies them through the trait seams in [`node`],
//! [`sensor`], [`net`], and [`storage`].
//!
//! ## Control model
//!
//! Everything runs on one cooperative control loop. The host calls
//! [`node::Node::run_once`] with the current monotonic time; connectivity is
//! serviced before any sampling or publishing is attempted, and all waits
//! (portal timeout, association poll, broker backoff) are expressed as
//! deadlines against the passed-in clock, never as blocking delays.
//!
//! ```rust,no_run
//! # fn demo<P, H, W>(mut node: multisensor::node::Node<P, H, W>, mut platform: P, now_ms: impl Fn() -> u64)
//! # where P: multisensor::node::Platform, H: multisensor::sensor::HygroTherm, W: multisensor::sensor::SwitchInput {
//! use multisensor::node::Directive;
//!
//! loop {
//!     match node.run_once(now_ms(), &mut platform) {
//!         Directive::Continue => { /* idle until the next pass */ }
//!         Directive::Restart => break, // host reboots the device
//!     }
//! }
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

/// Device configuration: the provisioning record, bounded field types,
/// device identity, and the persisted-record codec.
pub mod config;

/// Network abstraction layer: byte-stream connection traits and the
/// publish-only MQTT session used to reach the broker.
pub mod net;

/// Control core: connectivity state machine, publish scheduler, status
/// message serialization, and the top-level cooperative loop.
pub mod node;

/// Sensor channel model: sample sets, driver trait seams, and change
/// detection.
pub mod sensor;

/// Storage abstraction the configuration record is persisted through.
pub mod storage;
