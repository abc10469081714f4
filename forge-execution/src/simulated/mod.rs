//! A matching simulation of a venue: [`exchange::SimulatedExchange`] applies
//! [`latency::LatencyModel`] and [`fill_model::FillModel`] stochastic models to every command,
//! per §4.5.

pub mod commission;
pub mod exchange;
pub mod fill_model;
pub mod latency;

pub use commission::{CommissionModel, FixedRateCommission, ZeroCommission};
pub use exchange::{ExecutionOutcome, NewOrder, SimulatedExchange};
pub use fill_model::{FillModel, FullFillModel, PartialFillModel};
pub use latency::{FixedLatency, LatencyModel, NormalLatency, UniformLatency};
