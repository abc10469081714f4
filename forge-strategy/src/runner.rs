use crate::context::{LifecycleState, StrategyContext};
use crate::error::StrategyError;
use crate::indicator::IndicatorRegistry;
use crate::strategy::{Strategy, StrategyStateBlob};
use forge_execution::{ExecutionCommand, Order, OrderState, Position};
use forge_instrument::{Bar, QuoteTick, TradeTick};
use tracing::error;

/// Drives a user [`Strategy`] through its lifecycle and event hooks, per §4.8/§7.
///
/// Indicators registered on the [`IndicatorRegistry`] receive their update before the
/// corresponding user hook fires. A [`StrategyError::UserCode`] raised inside `on_save`/
/// `on_load` propagates to the caller; every other hook logs the error and is suppressed so the
/// event loop survives, matching `OnTradingDisabled`'s error-isolation pattern of keeping one
/// misbehaving strategy from taking down the run.
pub struct StrategyRunner<S: Strategy> {
    strategy: S,
    context: StrategyContext,
    indicators: IndicatorRegistry,
}

impl<S: Strategy> StrategyRunner<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy, context: StrategyContext::new(), indicators: IndicatorRegistry::new() }
    }

    pub fn context(&self) -> &StrategyContext {
        &self.context
    }

    pub fn indicators_mut(&mut self) -> &mut IndicatorRegistry {
        &mut self.indicators
    }

    pub fn drain_outbound(&mut self) -> Vec<ExecutionCommand> {
        self.context.drain_outbound()
    }

    pub fn start(&mut self) -> Result<(), StrategyError> {
        self.context.start()?;
        self.suppress("on_start", |strategy, ctx| strategy.on_start(ctx));
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), StrategyError> {
        self.context.stop()?;
        self.suppress("on_stop", |strategy, ctx| strategy.on_stop(ctx));
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), StrategyError> {
        self.context.resume()?;
        self.suppress("on_resume", |strategy, ctx| strategy.on_resume(ctx));
        Ok(())
    }

    pub fn reset(&mut self) {
        self.suppress("on_reset", |strategy, ctx| strategy.on_reset(ctx));
    }

    pub fn dispose(&mut self) -> Result<(), StrategyError> {
        self.suppress("on_dispose", |strategy, ctx| strategy.on_dispose(ctx));
        self.context.dispose()
    }

    /// Re-raises a [`StrategyError::UserCode`], unlike every other hook.
    pub fn save(&mut self) -> Result<StrategyStateBlob, StrategyError> {
        self.strategy.on_save()
    }

    /// Re-raises a [`StrategyError::UserCode`], unlike every other hook.
    pub fn load(&mut self, state: StrategyStateBlob) -> Result<(), StrategyError> {
        self.strategy.on_load(state)
    }

    pub fn on_quote_tick(&mut self, tick: &QuoteTick) {
        if self.context.lifecycle() != LifecycleState::Running {
            return;
        }
        self.indicators.dispatch_quote_tick(tick);
        self.suppress("on_quote_tick", |strategy, ctx| strategy.on_quote_tick(ctx, tick));
    }

    pub fn on_trade_tick(&mut self, tick: &TradeTick) {
        if self.context.lifecycle() != LifecycleState::Running {
            return;
        }
        self.indicators.dispatch_trade_tick(tick);
        self.suppress("on_trade_tick", |strategy, ctx| strategy.on_trade_tick(ctx, tick));
    }

    pub fn on_bar(&mut self, bar: &Bar) {
        if self.context.lifecycle() != LifecycleState::Running {
            return;
        }
        self.indicators.dispatch_bar(bar);
        self.suppress("on_bar", |strategy, ctx| strategy.on_bar(ctx, bar));
    }

    pub fn on_order_event(&mut self, order: &Order<OrderState>) {
        self.suppress("on_order_event", |strategy, ctx| strategy.on_order_event(ctx, order));
    }

    pub fn on_position_event(&mut self, position: &Position) {
        self.suppress("on_position_event", |strategy, ctx| strategy.on_position_event(ctx, position));
    }

    fn suppress(&mut self, hook: &'static str, call: impl FnOnce(&mut S, &mut StrategyContext) -> Result<(), StrategyError>) {
        if let Err(err) = call(&mut self.strategy, &mut self.context) {
            error!(hook, error = %err, "strategy hook raised, suppressing and continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::Indicator;
    use forge_instrument::InstrumentIndex;
    use rust_decimal::Decimal;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingStrategy {
        quote_ticks: Rc<RefCell<usize>>,
        fail_on_bar: bool,
    }

    impl Strategy for RecordingStrategy {
        fn on_quote_tick(&mut self, _ctx: &mut StrategyContext, _tick: &QuoteTick) -> Result<(), StrategyError> {
            *self.quote_ticks.borrow_mut() += 1;
            Ok(())
        }

        fn on_bar(&mut self, _ctx: &mut StrategyContext, _bar: &Bar) -> Result<(), StrategyError> {
            if self.fail_on_bar {
                return Err(StrategyError::UserCode { hook: "on_bar", message: "boom".into() });
            }
            Ok(())
        }
    }

    fn quote_tick() -> QuoteTick {
        QuoteTick::new(InstrumentIndex(0), Decimal::ONE, Decimal::TWO, Decimal::ONE, Decimal::ONE, 0, 0)
    }

    #[test]
    fn test_ticks_before_start_do_not_reach_the_strategy() {
        let mut runner = StrategyRunner::new(RecordingStrategy::default());
        runner.on_quote_tick(&quote_tick());
        assert_eq!(*runner.strategy.quote_ticks.borrow(), 0);
    }

    #[test]
    fn test_ticks_after_start_reach_the_strategy() {
        let mut runner = StrategyRunner::new(RecordingStrategy::default());
        runner.start().unwrap();
        runner.on_quote_tick(&quote_tick());
        assert_eq!(*runner.strategy.quote_ticks.borrow(), 1);
    }

    #[test]
    fn test_user_code_error_on_bar_is_suppressed_not_propagated() {
        let mut runner = StrategyRunner::new(RecordingStrategy { fail_on_bar: true, ..Default::default() });
        runner.start().unwrap();
        runner.on_bar(&Bar::new(
            forge_instrument::BarType::new(
                InstrumentIndex(0),
                1,
                forge_instrument::market_data::BarAggregation::TimeSeconds(60),
                forge_instrument::market_data::PriceType::Last,
                "test".into(),
            ),
            Decimal::ONE,
            Decimal::ONE,
            Decimal::ONE,
            Decimal::ONE,
            Decimal::ONE,
            0,
            0,
        ));
    }

    #[derive(Debug)]
    struct CountingIndicator(usize);
    impl Indicator for CountingIndicator {
        fn id(&self) -> &str {
            "counter"
        }
        fn on_quote_tick(&mut self, _tick: &QuoteTick) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_indicator_fanout_fires_before_user_hook() {
        let mut runner = StrategyRunner::new(RecordingStrategy::default());
        runner.indicators_mut().register_for_quote_ticks(Box::new(CountingIndicator(0)));
        runner.start().unwrap();
        runner.on_quote_tick(&quote_tick());
        assert_eq!(*runner.strategy.quote_ticks.borrow(), 1);
    }

    #[test]
    fn test_operations_after_dispose_error() {
        let mut runner = StrategyRunner::new(RecordingStrategy::default());
        runner.start().unwrap();
        runner.dispose().unwrap();
        assert_eq!(runner.start(), Err(StrategyError::Disposed));
    }
}
