use crate::instrument::InstrumentIndex;
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Top-of-book quote, per §3: `(bid, ask, bid_size, ask_size, ts_event, ts_init)`.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct QuoteTick {
    pub instrument: InstrumentIndex,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
    pub bid_size: Decimal,
    pub ask_size: Decimal,
    pub ts_event: i64,
    pub ts_init: i64,
}

impl QuoteTick {
    pub fn mid(&self) -> Decimal {
        (self.bid_price + self.ask_price) / Decimal::TWO
    }
}

/// Side of the market taker that caused a [`TradeTick`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Display)]
pub enum AggressorSide {
    Buyer,
    Seller,
    #[display("NoAggressor")]
    NoAggressor,
}

/// A single executed trade, per §3.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct TradeTick {
    pub instrument: InstrumentIndex,
    pub price: Decimal,
    pub size: Decimal,
    pub aggressor_side: AggressorSide,
    pub trade_id: SmolStr,
    pub ts_event: i64,
    pub ts_init: i64,
}

/// The price used when constructing an OHLC [`Bar`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum PriceType {
    Bid,
    Ask,
    Mid,
    Last,
}

/// Aggregation method that produced a [`Bar`] (time, tick count, volume threshold, ...).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum BarAggregation {
    TimeSeconds(u32),
    TimeMinutes(u32),
    Tick(u32),
    Volume(u64),
}

/// Composite key identifying a family of [`Bar`]s for an instrument.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Constructor)]
pub struct BarType {
    pub instrument: InstrumentIndex,
    pub step: u32,
    pub aggregation: BarAggregation,
    pub price_type: PriceType,
    pub source: SmolStr,
}

/// OHLCV bar, per §3.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Bar {
    pub bar_type: BarType,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub ts_event: i64,
    pub ts_init: i64,
}
