use crate::error::StrategyError;
use forge_execution::{ClientOrderId, ExecutionCommand, NewOrder};
use tracing::debug;

/// Where a [`StrategyContext`] sits in its lifecycle, per §4.8: `initialize -> start -> running
/// -> stopped -> disposed`. Commands issued before `start()` queue rather than emit; every
/// operation after `dispose()` errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LifecycleState {
    Initialized,
    Running,
    Stopped,
    Disposed,
}

/// The base contract every strategy is given: order submission/cancellation helpers that emit
/// [`ExecutionCommand`]s, queued until the strategy starts and rejected once disposed. Grounded
/// on the `AlgoStrategy`/`ClosePositionsStrategy` split, collapsed here into one context object
/// since this kernel routes every command through a single [`ExecutionCommand`] channel rather
/// than a separate execution transmitter per venue.
#[derive(Debug)]
pub struct StrategyContext {
    lifecycle: LifecycleState,
    queued_before_start: Vec<ExecutionCommand>,
    outbound: Vec<ExecutionCommand>,
}

impl Default for StrategyContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyContext {
    pub fn new() -> Self {
        Self { lifecycle: LifecycleState::Initialized, queued_before_start: Vec::new(), outbound: Vec::new() }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn start(&mut self) -> Result<(), StrategyError> {
        if self.lifecycle == LifecycleState::Disposed {
            return Err(StrategyError::Disposed);
        }
        self.lifecycle = LifecycleState::Running;
        self.outbound.append(&mut self.queued_before_start);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), StrategyError> {
        if self.lifecycle == LifecycleState::Disposed {
            return Err(StrategyError::Disposed);
        }
        self.lifecycle = LifecycleState::Stopped;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), StrategyError> {
        if self.lifecycle == LifecycleState::Disposed {
            return Err(StrategyError::Disposed);
        }
        self.lifecycle = LifecycleState::Running;
        Ok(())
    }

    pub fn dispose(&mut self) -> Result<(), StrategyError> {
        self.lifecycle = LifecycleState::Disposed;
        Ok(())
    }

    /// Drains commands accumulated since the last drain, in emission order. The host runner
    /// calls this once per event to forward queued commands to the execution engine.
    pub fn drain_outbound(&mut self) -> Vec<ExecutionCommand> {
        std::mem::take(&mut self.outbound)
    }

    fn emit(&mut self, command: ExecutionCommand) -> Result<(), StrategyError> {
        match self.lifecycle {
            LifecycleState::Disposed => Err(StrategyError::Disposed),
            LifecycleState::Initialized => {
                debug!("strategy not yet started, queueing command");
                self.queued_before_start.push(command);
                Ok(())
            }
            LifecycleState::Running | LifecycleState::Stopped => {
                self.outbound.push(command);
                Ok(())
            }
        }
    }

    pub fn submit_order(&mut self, order: NewOrder) -> Result<(), StrategyError> {
        self.emit(ExecutionCommand::OpenOrder(order))
    }

    /// Submits an OTO bracket: `entry` and every member of `children` are sent to the venue
    /// together, with `children` held dormant until `entry` fills (or cascaded into the same
    /// terminal state if `entry` is rejected/cancelled instead).
    pub fn submit_bracket(&mut self, entry: NewOrder, children: Vec<NewOrder>) -> Result<(), StrategyError> {
        self.emit(ExecutionCommand::OpenOrderList { entry, children })
    }

    /// No in-place modify/replace path exists on the venue yet (see the OCO child manual-modify
    /// tie-break open question); a modify is expressed as cancel-then-resubmit.
    pub fn modify_order(&mut self, cid: ClientOrderId, replacement: NewOrder) -> Result<(), StrategyError> {
        self.cancel_order(cid)?;
        self.submit_order(replacement)
    }

    pub fn cancel_order(&mut self, cid: ClientOrderId) -> Result<(), StrategyError> {
        self.emit(ExecutionCommand::CancelOrder(cid))
    }

    pub fn cancel_all_orders(&mut self, cids: impl IntoIterator<Item = ClientOrderId>) -> Result<(), StrategyError> {
        for cid in cids {
            self.cancel_order(cid)?;
        }
        Ok(())
    }

    /// Closes a position by emitting a reducing order built by the caller (the runner knows the
    /// current net quantity/side; the context itself does not hold position state).
    pub fn close_position(&mut self, reducing_order: NewOrder) -> Result<(), StrategyError> {
        self.submit_order(reducing_order)
    }

    pub fn close_all_positions(&mut self, reducing_orders: Vec<NewOrder>) -> Result<(), StrategyError> {
        for order in reducing_orders {
            self.close_position(order)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_execution::{OrderKind, StrategyId, TimeInForce};
    use forge_instrument::{InstrumentIndex, Side};
    use rust_decimal::Decimal;

    fn order() -> NewOrder {
        NewOrder {
            strategy: StrategyId::new("s"),
            cid: ClientOrderId::new("c-0"),
            instrument: InstrumentIndex(0),
            side: Side::Buy,
            price: Decimal::ONE,
            quantity: Decimal::ONE,
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
    fn test_commands_before_start_queue_then_flush_on_start() {
        let mut ctx = StrategyContext::new();
        ctx.submit_order(order()).unwrap();
        assert!(ctx.drain_outbound().is_empty());

        ctx.start().unwrap();
        let drained = ctx.drain_outbound();
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn test_commands_after_start_emit_immediately() {
        let mut ctx = StrategyContext::new();
        ctx.start().unwrap();
        ctx.submit_order(order()).unwrap();

        assert_eq!(ctx.drain_outbound().len(), 1);
    }

    #[test]
    fn test_operations_after_dispose_error() {
        let mut ctx = StrategyContext::new();
        ctx.start().unwrap();
        ctx.dispose().unwrap();

        assert_eq!(ctx.submit_order(order()), Err(StrategyError::Disposed));
        assert_eq!(ctx.cancel_order(ClientOrderId::new("c-0")), Err(StrategyError::Disposed));
    }

    #[test]
    fn test_submit_bracket_emits_a_single_open_order_list_command() {
        let mut ctx = StrategyContext::new();
        ctx.start().unwrap();

        let mut tp = order();
        tp.cid = ClientOrderId::new("tp");
        let mut sl = order();
        sl.cid = ClientOrderId::new("sl");

        ctx.submit_bracket(order(), vec![tp, sl]).unwrap();

        let drained = ctx.drain_outbound();
        assert_eq!(drained.len(), 1);
        match &drained[0] {
            ExecutionCommand::OpenOrderList { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("expected OpenOrderList, got {other:?}"),
        }
    }

    #[test]
    fn test_drain_outbound_is_idempotent_empty_after_drain() {
        let mut ctx = StrategyContext::new();
        ctx.start().unwrap();
        ctx.submit_order(order()).unwrap();
        ctx.drain_outbound();

        assert!(ctx.drain_outbound().is_empty());
    }
}
