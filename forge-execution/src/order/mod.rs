use crate::order::id::{ClientOrderId, OrderKey, OrderListId};
use crate::order::state::OrderState;
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use forge_instrument::{InstrumentIndex, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order identifiers: [`id::ClientOrderId`], [`id::VenueOrderId`], [`id::StrategyId`],
/// [`id::OrderListId`], [`id::OrderKey`].
pub mod id;

/// Order lifecycle state machine, see [`state::OrderState`].
pub mod state;

/// OCO/OTO contingent order grouping, see [`list::OrderList`].
pub mod list;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum OrderKind {
    Market,
    Limit,
    StopMarket,
    StopLimit,
    /// Dormant until the reference price trades through `trigger_price` in the order's
    /// favour, then converts to a [`OrderKind::Market`] order.
    MarketIfTouched,
    /// Dormant until the reference price trades through `trigger_price` in the order's
    /// favour, then converts to a [`OrderKind::Limit`] order at the order's own `price`.
    LimitIfTouched,
    /// Recomputes its trigger price as the market moves in the order's favour by at least
    /// `offset`, per §4.6's trailing-stop edge case.
    TrailingStop { offset: Decimal },
}

impl OrderKind {
    /// `STOP_MARKET`/`STOP_LIMIT`/`TRAILING_STOP` trigger when the reference price trades
    /// *through* `trigger_price` away from the current price (protecting an existing
    /// position); `MARKET_IF_TOUCHED`/`LIMIT_IF_TOUCHED` trigger on a move *towards* a better
    /// entry price. Both families stay dormant - held out of the book - until triggered.
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            OrderKind::StopMarket | OrderKind::StopLimit | OrderKind::TrailingStop { .. }
        )
    }

    pub fn is_if_touched(&self) -> bool {
        matches!(self, OrderKind::MarketIfTouched | OrderKind::LimitIfTouched)
    }

    /// Any kind that remains dormant pending a trigger rather than joining the book on arrival.
    pub fn requires_trigger(&self) -> bool {
        self.is_stop() || self.is_if_touched()
    }

    pub fn requires_limit_price(&self) -> bool {
        matches!(self, OrderKind::Limit | OrderKind::StopLimit | OrderKind::LimitIfTouched)
    }

    /// The order kind this becomes once its trigger fires. Market/Limit orders are never
    /// dormant, so they map to themselves.
    pub fn triggered_kind(&self) -> OrderKind {
        match self {
            OrderKind::StopMarket | OrderKind::MarketIfTouched | OrderKind::TrailingStop { .. } => OrderKind::Market,
            OrderKind::StopLimit | OrderKind::LimitIfTouched => OrderKind::Limit,
            other => *other,
        }
    }

    /// Whether `reference_price` has touched `trigger_price` for an order of this kind on
    /// `side`, per §4.4. Stops trigger on a breakout past the trigger; if-touched orders
    /// trigger on a pullback to it.
    pub fn is_triggered(&self, side: Side, trigger_price: Decimal, reference_price: Decimal) -> bool {
        if self.is_stop() {
            return match side {
                Side::Buy => reference_price >= trigger_price,
                Side::Sell => reference_price <= trigger_price,
            };
        }

        if self.is_if_touched() {
            return match side {
                Side::Buy => reference_price <= trigger_price,
                Side::Sell => reference_price >= trigger_price,
            };
        }

        false
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum TimeInForce {
    /// Good 'Til Cancelled.
    Gtc,
    /// Immediate Or Cancel: fill what can be filled immediately, cancel the remainder.
    Ioc,
    /// Fill Or Kill: fill the entire quantity immediately, or cancel all of it.
    Fok,
    /// Good 'Til Date: valid until `expire_time`, at which point it expires un-filled.
    Gtd,
    /// Valid for the remainder of the current trading session only.
    Day,
}

/// An order tracked by the [`crate::cache::Cache`], parameterised by its lifecycle `State`
/// (typically [`OrderState`] for a live order, or a narrower projection such as
/// [`state::Accepted`] once matched against a concrete variant).
#[derive(Debug, Clone, Eq, PartialEq, Constructor)]
pub struct Order<State = OrderState> {
    pub key: OrderKey,
    pub instrument: InstrumentIndex,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub kind: OrderKind,
    pub time_in_force: TimeInForce,
    /// `Some` if this order is a member of an OCO/OTO [`list::OrderList`].
    pub list_id: Option<OrderListId>,
    /// The price a stop/if-touched [`OrderKind`] arms against; `None` for `Market`/`Limit`.
    pub trigger_price: Option<Decimal>,
    /// `Some` only when `time_in_force` is [`TimeInForce::Gtd`].
    pub expire_time: Option<DateTime<Utc>>,
    /// Rejected on arrival if it would cross the book and execute as a taker (§4.4
    /// `POST_ONLY_WOULD_CROSS`).
    pub post_only: bool,
    /// Rejected (or, against a `CASH` account, short-circuited) unless it would reduce the
    /// strategy's existing net position on this instrument.
    pub reduce_only: bool,
    pub state: State,
}

impl Order<OrderState> {
    pub fn cid(&self) -> &ClientOrderId {
        &self.key.cid
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_buy(&self) -> bool {
        matches!(self.side, Side::Buy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::id::{ClientOrderId, StrategyId};
    use crate::order::state::ActiveOrderState;

    fn order(state: OrderState) -> Order<OrderState> {
        Order::new(
            OrderKey::new(StrategyId::new("s1"), ClientOrderId::new("cid-1")),
            InstrumentIndex(0),
            Side::Buy,
            Decimal::ONE,
            Decimal::TEN,
            OrderKind::Limit,
            TimeInForce::Gtc,
            None,
            None,
            None,
            false,
            false,
            state,
        )
    }

    #[test]
    fn test_is_active_reflects_state() {
        let active = order(OrderState::Active(ActiveOrderState::Initialized));
        assert!(active.is_active());

        let inactive = order(OrderState::Inactive(state::InactiveOrderState::Expired));
        assert!(!inactive.is_active());
    }

    #[test]
    fn test_stop_triggers_on_breakout_past_trigger() {
        assert!(OrderKind::StopMarket.is_triggered(Side::Buy, Decimal::new(100, 0), Decimal::new(101, 0)));
        assert!(!OrderKind::StopMarket.is_triggered(Side::Buy, Decimal::new(100, 0), Decimal::new(99, 0)));
        assert!(OrderKind::StopMarket.is_triggered(Side::Sell, Decimal::new(100, 0), Decimal::new(99, 0)));
    }

    #[test]
    fn test_if_touched_triggers_on_pullback_to_trigger() {
        assert!(OrderKind::LimitIfTouched.is_triggered(Side::Buy, Decimal::new(100, 0), Decimal::new(99, 0)));
        assert!(!OrderKind::LimitIfTouched.is_triggered(Side::Buy, Decimal::new(100, 0), Decimal::new(101, 0)));
    }

    #[test]
    fn test_triggered_kind_resolves_the_live_counterpart() {
        assert_eq!(OrderKind::StopMarket.triggered_kind(), OrderKind::Market);
        assert_eq!(OrderKind::StopLimit.triggered_kind(), OrderKind::Limit);
        assert_eq!(OrderKind::MarketIfTouched.triggered_kind(), OrderKind::Market);
        assert_eq!(OrderKind::LimitIfTouched.triggered_kind(), OrderKind::Limit);
        assert_eq!(OrderKind::Limit.triggered_kind(), OrderKind::Limit);
    }
}
