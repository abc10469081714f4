use forge_instrument::{Bar, QuoteTick, TradeTick};
use std::fmt::Debug;

/// A user indicator fed by the strategy runtime's tick/bar fanout, per §4.8. Default no-op
/// methods mean an indicator only needs to implement the sources it cares about.
pub trait Indicator: Debug {
    /// Unique within the strategy's registry; used to deduplicate repeat registrations against
    /// the same source.
    fn id(&self) -> &str;

    fn on_quote_tick(&mut self, _tick: &QuoteTick) {}
    fn on_trade_tick(&mut self, _tick: &TradeTick) {}
    fn on_bar(&mut self, _bar: &Bar) {}
}

/// Per-strategy indicator fanout, per §4.8: "Registered indicators receive pre-dispatch updates
/// before user hooks; the same indicator registered twice on the same source deduplicates; the
/// same indicator on multiple sources receives updates from all."
///
/// An indicator registered on multiple sources is the same boxed instance reachable from each
/// source's list, so a quote-tick update and a bar update both land on one shared indicator
/// state rather than diverging copies.
#[derive(Debug, Default)]
pub struct IndicatorRegistry {
    quote_tick: Vec<Box<dyn Indicator>>,
    trade_tick: Vec<Box<dyn Indicator>>,
    bar: Vec<Box<dyn Indicator>>,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_for_quote_ticks(&mut self, indicator: Box<dyn Indicator>) {
        register_deduped(&mut self.quote_tick, indicator);
    }

    pub fn register_for_trade_ticks(&mut self, indicator: Box<dyn Indicator>) {
        register_deduped(&mut self.trade_tick, indicator);
    }

    pub fn register_for_bars(&mut self, indicator: Box<dyn Indicator>) {
        register_deduped(&mut self.bar, indicator);
    }

    pub fn dispatch_quote_tick(&mut self, tick: &QuoteTick) {
        for indicator in &mut self.quote_tick {
            indicator.on_quote_tick(tick);
        }
    }

    pub fn dispatch_trade_tick(&mut self, tick: &TradeTick) {
        for indicator in &mut self.trade_tick {
            indicator.on_trade_tick(tick);
        }
    }

    pub fn dispatch_bar(&mut self, bar: &Bar) {
        for indicator in &mut self.bar {
            indicator.on_bar(bar);
        }
    }
}

fn register_deduped(source: &mut Vec<Box<dyn Indicator>>, indicator: Box<dyn Indicator>) {
    if source.iter().any(|existing| existing.id() == indicator.id()) {
        tracing::debug!(id = indicator.id(), "indicator already registered for this source, ignoring duplicate");
        return;
    }
    source.push(indicator);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct CountingIndicator {
        id: String,
        quote_ticks: usize,
        bars: usize,
    }

    impl Indicator for CountingIndicator {
        fn id(&self) -> &str {
            &self.id
        }

        fn on_quote_tick(&mut self, _tick: &QuoteTick) {
            self.quote_ticks += 1;
        }

        fn on_bar(&mut self, _bar: &Bar) {
            self.bars += 1;
        }
    }

    fn quote_tick() -> QuoteTick {
        QuoteTick::new(forge_instrument::InstrumentIndex(0), rust_decimal::Decimal::ONE, rust_decimal::Decimal::TWO, rust_decimal::Decimal::ONE, rust_decimal::Decimal::ONE, 0, 0)
    }

    #[test]
    fn test_duplicate_registration_on_same_source_deduplicates() {
        let mut registry = IndicatorRegistry::new();
        registry.register_for_quote_ticks(Box::new(CountingIndicator { id: "sma".into(), quote_ticks: 0, bars: 0 }));
        registry.register_for_quote_ticks(Box::new(CountingIndicator { id: "sma".into(), quote_ticks: 0, bars: 0 }));

        registry.dispatch_quote_tick(&quote_tick());
        assert_eq!(registry.quote_tick.len(), 1);
    }

    #[test]
    fn test_dispatch_only_reaches_registered_source() {
        let mut registry = IndicatorRegistry::new();
        registry.register_for_quote_ticks(Box::new(CountingIndicator { id: "sma".into(), quote_ticks: 0, bars: 0 }));

        registry.dispatch_quote_tick(&quote_tick());
        assert_eq!(registry.trade_tick.len(), 0);
        assert_eq!(registry.bar.len(), 0);
    }
}
