use crate::order::id::{StrategyId, VenueOrderId};
use chrono::{DateTime, Utc};
use derive_more::{Constructor, Display, From};
use forge_instrument::{InstrumentIndex, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From)]
pub struct TradeId(pub SmolStr);

impl TradeId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }
}

/// A single fill generated by the [`crate::simulated::exchange::SimulatedExchange`) matching
/// an order against its book. Quote-denominated fee, matching the kernel's single-currency
/// accounting model (§4.5 Non-goals excludes multi-asset fee accounting).
#[derive(Debug, Clone, PartialEq, Constructor, Deserialize, Serialize)]
pub struct Trade {
    pub id: TradeId,
    pub venue_order_id: VenueOrderId,
    pub instrument: InstrumentIndex,
    pub strategy: StrategyId,
    pub time_exchange: DateTime<Utc>,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
}

impl Trade {
    pub fn value_quote(&self) -> Decimal {
        self.price * self.quantity.abs()
    }
}
