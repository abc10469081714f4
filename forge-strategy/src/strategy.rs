use crate::context::StrategyContext;
use crate::error::StrategyError;
use fnv::FnvHashMap;
use forge_execution::{Order, OrderState, Position};
use forge_instrument::{Bar, QuoteTick, TradeTick};

/// Opaque state a strategy hands the kernel from `on_save` and gets back in `on_load`. The
/// kernel stores and retrieves the map verbatim; it never inspects or parses the bytes, per
/// §4.8's "Persisted state".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyStateBlob(pub FnvHashMap<String, Vec<u8>>);

impl StrategyStateBlob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.0.insert(key.into(), value);
    }
}

/// User strategy hooks, per §4.8. Every hook has a default no-op body so an implementation
/// only overrides what it needs; [`crate::runner::StrategyRunner`] drives these in a
/// fire-default-then-user-hook idiom.
pub trait Strategy {
    fn on_start(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_stop(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_resume(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_reset(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_dispose(&mut self, _ctx: &mut StrategyContext) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_save(&mut self) -> Result<StrategyStateBlob, StrategyError> {
        Ok(StrategyStateBlob::default())
    }

    fn on_load(&mut self, _state: StrategyStateBlob) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_quote_tick(&mut self, _ctx: &mut StrategyContext, _tick: &QuoteTick) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_trade_tick(&mut self, _ctx: &mut StrategyContext, _tick: &TradeTick) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_bar(&mut self, _ctx: &mut StrategyContext, _bar: &Bar) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_order_event(&mut self, _ctx: &mut StrategyContext, _order: &Order<OrderState>) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_position_event(&mut self, _ctx: &mut StrategyContext, _position: &Position) -> Result<(), StrategyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_blob_roundtrips_values() {
        let mut blob = StrategyStateBlob::new();
        blob.insert("position_target", vec![1, 2, 3]);

        assert_eq!(blob.get("position_target"), Some([1u8, 2, 3].as_slice()));
        assert_eq!(blob.get("missing"), None);
    }

    struct NoopStrategy;
    impl Strategy for NoopStrategy {}

    #[test]
    fn test_default_hooks_are_ok() {
        let mut strategy = NoopStrategy;
        let mut ctx = StrategyContext::new();
        assert!(strategy.on_start(&mut ctx).is_ok());
        assert!(strategy.on_save().is_ok());
    }
}
