use forge_instrument::InstrumentIndex;
use rust_decimal::Decimal;
use thiserror::Error;

/// Why the [`crate::engine::RiskEngine`] denied an outgoing command, per §4.7: "Violation -> the
/// order is immediately denied (`OrderDenied` event published, no outbound command)".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskViolation {
    #[error("trading halted, all new commands blocked")]
    TradingHalted,

    #[error("trading reducing-only, order on {instrument:?} would increase net exposure")]
    ReducingOnly { instrument: InstrumentIndex },

    #[error("order quantity {quantity} exceeds max {limit} for {instrument:?}")]
    MaxQuantityExceeded { instrument: InstrumentIndex, quantity: Decimal, limit: Decimal },

    #[error("order notional {notional} exceeds max {limit} for {instrument:?}")]
    MaxNotionalExceeded { instrument: InstrumentIndex, notional: Decimal, limit: Decimal },

    #[error("order price {order_price} deviates {deviation_pct} from last price {last_price}, exceeding band {max_deviation_pct}")]
    PriceOutOfBand {
        instrument: InstrumentIndex,
        last_price: Decimal,
        order_price: Decimal,
        deviation_pct: Decimal,
        max_deviation_pct: Decimal,
    },

    #[error("order throttled, exceeds max orders per window for {instrument:?}")]
    Throttled { instrument: InstrumentIndex },

    #[error("order on {instrument:?} is reduce_only but would increase net exposure")]
    ReduceOnlyViolation { instrument: InstrumentIndex },
}
