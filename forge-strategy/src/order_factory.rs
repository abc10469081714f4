use chrono::{DateTime, Utc};
use forge_execution::{ClientOrderId, NewOrder, OrderKind, OrderListId, StrategyId, TimeInForce};
use forge_instrument::{InstrumentIndex, Side};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

/// Builds [`NewOrder`]s tagged with a strategy-unique, monotonically increasing
/// [`ClientOrderId`], per §4.8: "the order factory assigns deterministic, collision-free client
/// order ids scoped to the strategy's `order_id_tag`".
///
/// A sequence counter rather than [`ClientOrderId::random`] keeps backtest runs byte-for-byte
/// reproducible across replays of the same event stream.
#[derive(Debug)]
pub struct OrderFactory {
    strategy: StrategyId,
    order_id_tag: String,
    sequence: AtomicU64,
}

impl OrderFactory {
    pub fn new(strategy: StrategyId, order_id_tag: impl Into<String>) -> Self {
        Self { strategy, order_id_tag: order_id_tag.into(), sequence: AtomicU64::new(0) }
    }

    fn next_cid(&self) -> ClientOrderId {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        ClientOrderId::new(format!("{}-{}", self.order_id_tag, seq))
    }

    pub fn market(&self, instrument: InstrumentIndex, side: Side, quantity: Decimal) -> NewOrder {
        NewOrder {
            strategy: self.strategy.clone(),
            cid: self.next_cid(),
            instrument,
            side,
            price: Decimal::ZERO,
            quantity,
            kind: OrderKind::Market,
            time_in_force: TimeInForce::Ioc,
            list_id: None,
            trigger_price: None,
            expire_time: None,
            post_only: false,
            reduce_only: false,
        }
    }

    pub fn limit(
        &self,
        instrument: InstrumentIndex,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        time_in_force: TimeInForce,
    ) -> NewOrder {
        NewOrder {
            strategy: self.strategy.clone(),
            cid: self.next_cid(),
            instrument,
            side,
            price,
            quantity,
            kind: OrderKind::Limit,
            time_in_force,
            list_id: None,
            trigger_price: None,
            expire_time: None,
            post_only: false,
            reduce_only: false,
        }
    }

    /// A stop that arms at `trigger_price` and converts to a `STOP_MARKET`/`STOP_LIMIT` once the
    /// reference price breaks out past it - the usual protective stop-loss shape.
    pub fn stop(
        &self,
        instrument: InstrumentIndex,
        side: Side,
        trigger_price: Decimal,
        limit_price: Option<Decimal>,
        quantity: Decimal,
    ) -> NewOrder {
        NewOrder {
            strategy: self.strategy.clone(),
            cid: self.next_cid(),
            instrument,
            side,
            price: limit_price.unwrap_or(trigger_price),
            quantity,
            kind: if limit_price.is_some() { OrderKind::StopLimit } else { OrderKind::StopMarket },
            time_in_force: TimeInForce::Gtc,
            list_id: None,
            trigger_price: Some(trigger_price),
            expire_time: None,
            post_only: false,
            reduce_only: false,
        }
    }

    /// A limit-if-touched order that arms at `trigger_price` and converts to a resting
    /// `LIMIT_IF_TOUCHED` once the reference price pulls back to it.
    pub fn limit_if_touched(
        &self,
        instrument: InstrumentIndex,
        side: Side,
        trigger_price: Decimal,
        limit_price: Decimal,
        quantity: Decimal,
    ) -> NewOrder {
        NewOrder {
            strategy: self.strategy.clone(),
            cid: self.next_cid(),
            instrument,
            side,
            price: limit_price,
            quantity,
            kind: OrderKind::LimitIfTouched,
            time_in_force: TimeInForce::Gtc,
            list_id: None,
            trigger_price: Some(trigger_price),
            expire_time: None,
            post_only: false,
            reduce_only: false,
        }
    }

    /// Attaches an existing [`OrderListId`] so the venue can resolve OCO/OTO contingencies
    /// between members built separately by the same factory.
    pub fn attach_to_list(&self, mut order: NewOrder, list_id: OrderListId) -> NewOrder {
        order.list_id = Some(list_id);
        order
    }

    pub fn as_gtd(&self, mut order: NewOrder, expire_time: DateTime<Utc>) -> NewOrder {
        order.time_in_force = TimeInForce::Gtd;
        order.expire_time = Some(expire_time);
        order
    }

    pub fn as_post_only(&self, mut order: NewOrder) -> NewOrder {
        order.post_only = true;
        order
    }

    pub fn as_reduce_only(&self, mut order: NewOrder) -> NewOrder {
        order.reduce_only = true;
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> OrderFactory {
        OrderFactory::new(StrategyId::new("momentum"), "AUD/USD-001")
    }

    #[test]
    fn test_sequential_cids_are_unique_and_tagged() {
        let factory = factory();
        let a = factory.market(InstrumentIndex(0), Side::Buy, Decimal::ONE);
        let b = factory.market(InstrumentIndex(0), Side::Buy, Decimal::ONE);

        assert_ne!(a.cid, b.cid);
        assert_eq!(a.cid, ClientOrderId::new("AUD/USD-001-0"));
        assert_eq!(b.cid, ClientOrderId::new("AUD/USD-001-1"));
    }

    #[test]
    fn test_market_order_has_zero_price_and_ioc() {
        let factory = factory();
        let order = factory.market(InstrumentIndex(0), Side::Sell, Decimal::TWO);

        assert_eq!(order.kind, OrderKind::Market);
        assert_eq!(order.time_in_force, TimeInForce::Ioc);
        assert_eq!(order.price, Decimal::ZERO);
    }

    #[test]
    fn test_stop_without_limit_price_is_stop_market() {
        let factory = factory();
        let order = factory.stop(InstrumentIndex(0), Side::Sell, Decimal::new(90, 0), None, Decimal::ONE);

        assert_eq!(order.kind, OrderKind::StopMarket);
        assert_eq!(order.trigger_price, Some(Decimal::new(90, 0)));
    }

    #[test]
    fn test_stop_with_limit_price_is_stop_limit() {
        let factory = factory();
        let order = factory.stop(InstrumentIndex(0), Side::Sell, Decimal::new(90, 0), Some(Decimal::new(89, 0)), Decimal::ONE);

        assert_eq!(order.kind, OrderKind::StopLimit);
        assert_eq!(order.price, Decimal::new(89, 0));
    }

    #[test]
    fn test_as_reduce_only_sets_flag() {
        let factory = factory();
        let order = factory.as_reduce_only(factory.market(InstrumentIndex(0), Side::Sell, Decimal::ONE));
        assert!(order.reduce_only);
    }

    #[test]
    fn test_attach_to_list_sets_list_id() {
        let factory = factory();
        let order = factory.limit(InstrumentIndex(0), Side::Buy, Decimal::ONE, Decimal::ONE, TimeInForce::Gtc);
        let list_id = OrderListId::new("oco-1");
        let order = factory.attach_to_list(order, list_id.clone());

        assert_eq!(order.list_id, Some(list_id));
    }
}
