//! # forge-risk
//!
//! The pre-trade [`engine::RiskEngine`]: the [`check::RiskCheck`] trait and its concrete
//! quantity/notional/price checks, the [`trading_state::TradingState`] gate, the
//! [`throttle::Throttle`] rate limiter, and the live-mode [`live_queue::LiveRiskQueue`].
//!
//! Grounded on `barter/src/risk/check/*` (the `RiskCheck` trait and `CheckHigherThan`) and
//! `barter/src/engine/state/trading/mod.rs` (the `TradingState::update` audit idiom).

/// [`check::RiskCheck`] trait plus concrete quantity/notional/price checks.
pub mod check;

/// [`trading_state::TradingState`]: the Halted/Active/Reducing gate.
pub mod trading_state;

/// [`throttle::Throttle`]: sliding-window order-rate limiting.
pub mod throttle;

/// [`violation::RiskViolation`] taxonomy.
pub mod violation;

/// [`engine::RiskEngine`]: ties the checks, gate and throttle together.
pub mod engine;

/// [`live_queue::LiveRiskQueue`]: the live-mode bounded command queue (`qsize`).
pub mod live_queue;

pub use check::{CheckHigherThan, CheckMaxNotional, CheckPriceSanity, RiskCheck};
pub use engine::{InstrumentLimits, RiskEngine};
pub use live_queue::{LiveRiskQueue, LiveRiskQueueProducer};
pub use throttle::Throttle;
pub use trading_state::{TradingState, TradingStateUpdateAudit};
pub use violation::RiskViolation;
