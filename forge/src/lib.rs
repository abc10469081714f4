//! # forge
//!
//! The deterministic event-driven trading kernel: [`config`] surface, [`portfolio::Portfolio`]
//! equity bookkeeping, and the [`node::Node`] event loop tying a strategy to the simulated
//! execution/risk stack.
//!
//! Grounded on `src/engine/trader.rs`'s `Trader` container and
//! `src/system/config.rs`'s configuration surface.

/// [`error::NodeError`].
pub mod error;

/// [`config::TradingNodeConfig`], [`config::BacktestEngineConfig`] and the rest of the
/// configuration surface.
pub mod config;

/// [`portfolio::Portfolio`]: account equity and position PnL readout.
pub mod portfolio;

/// [`node::Node`]: the backtest event loop.
pub mod node;

pub use config::{
    BacktestEngineConfig, CacheDatabaseConfig, ExecEngineConfig, InstrumentLimitConfig, LiveRiskEngineConfig, OmsType,
    StrategyConfig, TimeoutsConfig, TradingNodeConfig, VenueConfig,
};
pub use error::NodeError;
pub use node::{ForgeEvent, Node};
pub use portfolio::{Portfolio, PortfolioSnapshot};
