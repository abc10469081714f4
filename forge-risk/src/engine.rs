use crate::check::{CheckHigherThan, CheckMaxNotional, CheckPriceSanity, RiskCheck};
use crate::live_queue::{LiveRiskQueue, LiveRiskQueueProducer};
use crate::throttle::Throttle;
use crate::trading_state::TradingState;
use crate::violation::RiskViolation;
use chrono::{DateTime, Duration, Utc};
use fnv::FnvHashMap;
use forge_execution::NewOrder;
use forge_instrument::{InstrumentIndex, Side};
use rust_decimal::Decimal;
use tracing::warn;

/// Per-instrument pre-trade limits, per §4.7.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentLimits {
    pub max_quantity: Decimal,
    pub max_notional: Decimal,
    pub price_band_pct: Decimal,
}

/// Returns `true` if an order on `side` would reduce the magnitude of `net_position` (a signed
/// quantity: positive for long, negative for short, zero for flat).
fn reduces_exposure(net_position: Decimal, side: Side) -> bool {
    match side {
        Side::Buy => net_position < Decimal::ZERO,
        Side::Sell => net_position > Decimal::ZERO,
    }
}

/// The pre-trade gate every outgoing [`NewOrder`] passes through before reaching
/// [`forge_execution::engine::ExecutionEngine`], per §4.7. `bypass` short-circuits every check
/// (used for a risk-engine-disabled deployment configuration); it should not be set in
/// production.
pub struct RiskEngine {
    pub trading_state: TradingState,
    limits: FnvHashMap<InstrumentIndex, InstrumentLimits>,
    default_limits: InstrumentLimits,
    throttles: FnvHashMap<InstrumentIndex, Throttle>,
    throttle_max_orders: usize,
    throttle_window: Duration,
    pub bypass: bool,
    live_queue: Option<LiveRiskQueue<NewOrder>>,
}

impl RiskEngine {
    pub fn new(default_limits: InstrumentLimits, throttle_max_orders: usize, throttle_window: Duration) -> Self {
        Self {
            trading_state: TradingState::Active,
            limits: FnvHashMap::default(),
            default_limits,
            throttles: FnvHashMap::default(),
            throttle_max_orders,
            throttle_window,
            bypass: false,
            live_queue: None,
        }
    }

    pub fn set_instrument_limits(&mut self, instrument: InstrumentIndex, limits: InstrumentLimits) {
        self.limits.insert(instrument, limits);
    }

    /// Opens the engine's own bounded command queue, per §4.7's live-mode `qsize` queue: a live
    /// venue client feeds [`NewOrder`]s onto the returned producer independently of the node's
    /// own tick cadence, and [`Self::drain_live_queue`] pulls whatever has accumulated.
    pub fn enable_live_mode(&mut self, qsize: usize) -> LiveRiskQueueProducer<NewOrder> {
        let queue = LiveRiskQueue::new(qsize);
        let producer = queue.producer();
        self.live_queue = Some(queue);
        producer
    }

    pub fn is_live_mode(&self) -> bool {
        self.live_queue.is_some()
    }

    /// Drains every order queued since the last drain, without blocking. Returns an empty
    /// `Vec` if live mode was never enabled.
    pub fn drain_live_queue(&mut self) -> Vec<NewOrder> {
        self.live_queue.as_ref().map(|queue| queue.drain()).unwrap_or_default()
    }

    fn limits_for(&self, instrument: InstrumentIndex) -> InstrumentLimits {
        self.limits.get(&instrument).copied().unwrap_or(self.default_limits)
    }

    /// Evaluate `order` against the trading-state gate, per-instrument quantity/notional/price
    /// checks, and the throttle. `net_position` is the current signed position the order would
    /// adjust; `last_price` is the most recently observed market price for the instrument
    /// (`None` if no market data has arrived yet, in which case the price-sanity check passes
    /// trivially).
    pub fn evaluate(
        &mut self,
        order: &NewOrder,
        net_position: Decimal,
        last_price: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<(), RiskViolation> {
        if self.bypass {
            return Ok(());
        }

        let reduces = reduces_exposure(net_position, order.side);
        if !self.trading_state.permits(reduces) {
            let violation = if self.trading_state == TradingState::Halted {
                RiskViolation::TradingHalted
            } else {
                RiskViolation::ReducingOnly { instrument: order.instrument }
            };
            warn!(cid = %order.cid, instrument = ?order.instrument, ?violation, "risk engine denied order");
            return Err(violation);
        }

        if order.reduce_only && !reduces {
            let violation = RiskViolation::ReduceOnlyViolation { instrument: order.instrument };
            warn!(cid = %order.cid, instrument = ?order.instrument, ?violation, "risk engine denied order");
            return Err(violation);
        }

        let limits = self.limits_for(order.instrument);

        CheckHigherThan::new(limits.max_quantity).check(&order.quantity).map_err(|failure| {
            RiskViolation::MaxQuantityExceeded {
                instrument: order.instrument,
                quantity: failure.input,
                limit: failure.limit,
            }
        })?;

        CheckMaxNotional::new(limits.max_notional)
            .check(&(order.quantity, order.price))
            .map_err(|failure| RiskViolation::MaxNotionalExceeded {
                instrument: order.instrument,
                notional: failure.input,
                limit: failure.limit,
            })?;

        if let Some(last_price) = last_price {
            CheckPriceSanity::new(limits.price_band_pct)
                .check(&(last_price, order.price))
                .map_err(|failure| RiskViolation::PriceOutOfBand {
                    instrument: order.instrument,
                    last_price: failure.last_price,
                    order_price: failure.order_price,
                    deviation_pct: failure.deviation_pct,
                    max_deviation_pct: failure.max_deviation_pct,
                })?;
        }

        let throttle = self
            .throttles
            .entry(order.instrument)
            .or_insert_with(|| Throttle::new(self.throttle_max_orders, self.throttle_window));

        if !throttle.try_acquire(now) {
            let violation = RiskViolation::Throttled { instrument: order.instrument };
            warn!(cid = %order.cid, instrument = ?order.instrument, "risk engine throttled order");
            return Err(violation);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_execution::order::id::{ClientOrderId, StrategyId};
    use forge_execution::{OrderKind, TimeInForce};
    use rust_decimal_macros::dec;

    fn default_limits() -> InstrumentLimits {
        InstrumentLimits { max_quantity: dec!(100), max_notional: dec!(100_000), price_band_pct: dec!(0.1) }
    }

    fn order(side: Side, price: Decimal, quantity: Decimal) -> NewOrder {
        NewOrder {
            strategy: StrategyId::new("s1"),
            cid: ClientOrderId::random(),
            instrument: InstrumentIndex(0),
            side,
            price,
            quantity,
            kind: OrderKind::Limit,
            time_in_force: TimeInForce::Gtc,
            list_id: None,
            trigger_price: None,
            expire_time: None,
            post_only: false,
            reduce_only: false,
        }
    }

    #[test]
    fn test_halted_denies_every_order() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        engine.trading_state = TradingState::Halted;

        let result = engine.evaluate(&order(Side::Buy, dec!(100), dec!(1)), Decimal::ZERO, None, Utc::now());
        assert_eq!(result, Err(RiskViolation::TradingHalted));
    }

    #[test]
    fn test_reducing_state_blocks_exposure_increasing_order() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        engine.trading_state = TradingState::Reducing;

        // Flat position, a Buy increases exposure - denied.
        let result = engine.evaluate(&order(Side::Buy, dec!(100), dec!(1)), Decimal::ZERO, None, Utc::now());
        assert!(matches!(result, Err(RiskViolation::ReducingOnly { .. })));
    }

    #[test]
    fn test_reducing_state_allows_exposure_reducing_order() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        engine.trading_state = TradingState::Reducing;

        // Long position, a Sell reduces exposure - allowed.
        let result = engine.evaluate(&order(Side::Sell, dec!(100), dec!(1)), dec!(5), None, Utc::now());
        assert!(result.is_ok());
    }

    #[test]
    fn test_max_quantity_exceeded() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        let result = engine.evaluate(&order(Side::Buy, dec!(100), dec!(200)), Decimal::ZERO, None, Utc::now());
        assert!(matches!(result, Err(RiskViolation::MaxQuantityExceeded { .. })));
    }

    #[test]
    fn test_price_sanity_denies_outside_band() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        let result = engine.evaluate(&order(Side::Buy, dec!(200), dec!(1)), Decimal::ZERO, Some(dec!(100)), Utc::now());
        assert!(matches!(result, Err(RiskViolation::PriceOutOfBand { .. })));
    }

    #[test]
    fn test_throttle_denies_after_max_orders_per_window() {
        let mut engine = RiskEngine::new(default_limits(), 1, Duration::seconds(60));
        let now = Utc::now();

        assert!(engine.evaluate(&order(Side::Buy, dec!(100), dec!(1)), Decimal::ZERO, None, now).is_ok());
        let result = engine.evaluate(&order(Side::Buy, dec!(100), dec!(1)), Decimal::ZERO, None, now);
        assert!(matches!(result, Err(RiskViolation::Throttled { .. })));
    }

    #[test]
    fn test_reduce_only_order_increasing_exposure_is_denied() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        let mut buy = order(Side::Buy, dec!(100), dec!(1));
        buy.reduce_only = true;

        // Flat position, a reduce_only Buy would increase exposure - denied.
        let result = engine.evaluate(&buy, Decimal::ZERO, None, Utc::now());
        assert!(matches!(result, Err(RiskViolation::ReduceOnlyViolation { .. })));
    }

    #[test]
    fn test_reduce_only_order_reducing_exposure_is_allowed() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        let mut sell = order(Side::Sell, dec!(100), dec!(1));
        sell.reduce_only = true;

        // Long position, a reduce_only Sell reduces exposure - allowed.
        let result = engine.evaluate(&sell, dec!(5), None, Utc::now());
        assert!(result.is_ok());
    }

    #[test]
    fn test_live_queue_disabled_by_default_drains_nothing() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        assert!(!engine.is_live_mode());
        assert!(engine.drain_live_queue().is_empty());
    }

    #[test]
    fn test_enabled_live_queue_drains_orders_sent_by_its_producer() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        let producer = engine.enable_live_mode(4);

        producer.send(order(Side::Buy, dec!(100), dec!(1))).unwrap();
        producer.send(order(Side::Sell, dec!(100), dec!(1))).unwrap();

        assert_eq!(engine.drain_live_queue().len(), 2);
        assert!(engine.drain_live_queue().is_empty());
    }

    #[test]
    fn test_bypass_skips_all_checks() {
        let mut engine = RiskEngine::new(default_limits(), 10, Duration::seconds(1));
        engine.bypass = true;
        engine.trading_state = TradingState::Halted;

        let result = engine.evaluate(&order(Side::Buy, dec!(1_000_000), dec!(1_000)), Decimal::ZERO, None, Utc::now());
        assert!(result.is_ok());
    }
}
