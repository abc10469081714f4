//! # forge-integration
//!
//! The plumbing shared by every other Forge crate: a synchronous in-process
//! [`bus::MessageBus`] built on the [`channel::Tx`] abstraction, a [`clock::Clock`]
//! that backtest and live deployments implement differently, and the
//! [`snapshot::Snapshot`] wrapper used to distinguish "this is the current state of X"
//! from "this is an update to X".
//!
//! Grounded on the `jackbot-integration` crate (`channel.rs`, `snapshot.rs`)
//! and `barter/src/engine/clock.rs`.

/// Channel primitives ([`channel::Tx`], [`channel::Channel`]) used by the [`bus::MessageBus`]
/// and by point-to-point endpoint registration.
pub mod channel;

/// The [`bus::MessageBus`]: topic-based pub/sub, point-to-point endpoints and
/// request/response, per §4.2.
pub mod bus;

/// [`clock::Clock`] trait with [`clock::TestClock`] and [`clock::LiveClock`]
/// implementations, per §4.1.
pub mod clock;

/// [`snapshot::Snapshot`] wrapper distinguishing full-state updates from deltas.
pub mod snapshot;

pub use bus::MessageBus;
pub use clock::{Clock, LiveClock, TestClock};
pub use snapshot::Snapshot;
