//! # forge-execution
//!
//! The order/position/account data model, the simulated venue, and the
//! [`cache::Cache`] + [`engine::ExecutionEngine`] that sit between a strategy and
//! a venue client.
//!
//! Grounded on the legacy `barter-execution/src/simulated/*` (the
//! account/order/matching logic) and `barter/src/engine/state/order/*` (the
//! `Cache`'s snapshot-reconciliation idiom).

/// Order identifiers, the lifecycle [`order::state::OrderState`] machine, [`order::Order`]
/// itself, and [`order::list::OrderList`] OCO/OTO grouping.
pub mod order;

/// Executed [`trade::Trade`] records.
pub mod trade;

/// [`position::Position`] accounting: realised/unrealised PnL, netting.
pub mod position;

/// [`account::Account`] balances and margin.
pub mod account;

/// The resting-order [`book::OrderBook`] and its [`book::matcher`].
pub mod book;

/// [`simulated::exchange::SimulatedExchange`]: latency/fill-modelled matching simulation.
pub mod simulated;

/// [`error::ExecutionError`].
pub mod error;

/// The [`cache::Cache`]: the coherent cross-cutting view of instruments, orders, positions
/// and the account.
pub mod cache;

/// The [`engine::ExecutionEngine`]: command routing, cache updates, reconciliation.
pub mod engine;

pub use account::{Account, AccountType, AssetBalance, Balance, Margin};
pub use cache::Cache;
pub use engine::{ExecutionCommand, ExecutionEngine};
pub use error::ExecutionError;
pub use order::id::{ClientOrderId, OrderKey, OrderListId, StrategyId, VenueOrderId};
pub use order::list::{ContingencyType, OrderList};
pub use order::state::OrderState;
pub use order::{Order, OrderKind, TimeInForce};
pub use position::{Position, PositionExited, PositionManager, PositionMode};
pub use simulated::{CommissionModel, ExecutionOutcome, FillModel, LatencyModel, NewOrder, SimulatedExchange};
pub use trade::{Trade, TradeId};
