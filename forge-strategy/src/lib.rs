//! # forge-strategy
//!
//! The user-facing [`strategy::Strategy`] trait, its [`context::StrategyContext`] base contract
//! (order submission, lifecycle enforcement), the [`indicator::IndicatorRegistry`] tick/bar
//! fanout, the [`order_factory::OrderFactory`], and the [`runner::StrategyRunner`] that drives
//! it all together, per §4.8.
//!
//! Grounded on `barter`'s `Strategy`/`AlgoStrategy`/`ClosePositionsStrategy` trait split and
//! `jackbot`'s `OnTradingDisabled` error-isolation idiom, collapsed into a single context/runner
//! pair since this kernel has one execution channel rather than a per-venue
//! transmitter set.

/// [`error::StrategyError`]: lifecycle and user-code error taxonomy.
pub mod error;

/// [`indicator::Indicator`] trait and [`indicator::IndicatorRegistry`] fanout.
pub mod indicator;

/// [`order_factory::OrderFactory`]: deterministic client-order-id generation.
pub mod order_factory;

/// [`context::StrategyContext`]: the base contract every strategy is given.
pub mod context;

/// [`strategy::Strategy`] trait and [`strategy::StrategyStateBlob`].
pub mod strategy;

/// [`runner::StrategyRunner`]: drives lifecycle, indicator fanout and hook dispatch.
pub mod runner;

pub use context::{LifecycleState, StrategyContext};
pub use error::StrategyError;
pub use indicator::{Indicator, IndicatorRegistry};
pub use order_factory::OrderFactory;
pub use runner::StrategyRunner;
pub use strategy::{Strategy, StrategyStateBlob};
