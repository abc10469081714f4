use crate::order::id::{ClientOrderId, VenueOrderId};
use forge_instrument::InstrumentIndex;
use thiserror::Error;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ExecutionError {
    #[error("builder incomplete: missing '{0}'")]
    BuilderIncomplete(String),

    #[error("instrument {0:?} unknown to the cache")]
    UnknownInstrument(InstrumentIndex),

    #[error("order {0} unknown to the cache")]
    UnknownOrder(ClientOrderId),

    #[error("order {0} rejected: {1}")]
    OrderRejected(ClientOrderId, String),

    #[error("order {0} already in a terminal state, cannot cancel")]
    AlreadyTerminal(ClientOrderId),

    #[error("venue order id {0} not found while applying event")]
    UnknownVenueOrderId(VenueOrderId),

    #[error("insufficient balance: required {required}, free {free}")]
    InsufficientBalance { required: String, free: String },

    #[error("quantity {0} below instrument minimum")]
    QuantityBelowMinimum(String),

    #[error("limit price required for order kind {0:?}")]
    LimitPriceRequired(crate::order::OrderKind),
}
