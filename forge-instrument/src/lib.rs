//! # forge-instrument
//!
//! Defines the [`Instrument`] identity and the fixed-precision [`Price`],
//! [`Quantity`] and [`Money`] types bound to it, plus the market data tick
//! and bar types that flow through the rest of the Forge kernel.
//!
//! Mirrors the `jackbot-instrument` crate: small, dependency-light
//! modules re-exported from a single [`lib.rs`].

/// Defines [`instrument::Instrument`], its identifying [`instrument::InstrumentId`]
/// and arena-style [`instrument::InstrumentIndex`].
pub mod instrument;

/// Defines [`Venue`] identifiers for execution venues (real or simulated).
pub mod venue;

/// Defines [`Side`] (`Buy`/`Sell`).
pub mod side;

/// Defines the fixed-precision [`price::Price`], [`quantity::Quantity`] and
/// [`money::Money`] types.
pub mod price;
pub mod quantity;
pub mod money;

/// Defines the tick and bar market data types: [`market_data::QuoteTick`],
/// [`market_data::TradeTick`] and [`market_data::Bar`].
pub mod market_data;

pub use instrument::{Instrument, InstrumentId, InstrumentIndex};
pub use market_data::{Bar, BarType, QuoteTick, TradeTick};
pub use money::{Currency, Money};
pub use price::Price;
pub use quantity::Quantity;
pub use side::Side;
pub use venue::Venue;
