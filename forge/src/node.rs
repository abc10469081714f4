use crate::config::{BacktestEngineConfig, TimeoutsConfig};
use crate::error::NodeError;
use crate::portfolio::{Portfolio, PortfolioSnapshot};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use forge_execution::{Account, ExecutionCommand, ExecutionEngine, SimulatedExchange};
use forge_instrument::{Bar, InstrumentIndex, QuoteTick, Side, TradeTick};
use forge_integration::{Clock, MessageBus, TestClock};
use forge_risk::RiskEngine;
use forge_strategy::{Strategy, StrategyRunner};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Events published to the [`Node`]'s [`MessageBus`], per §4.2: every subsystem observes the
/// same stream rather than reaching into each other's state directly.
#[derive(Debug, Clone)]
pub enum ForgeEvent {
    QuoteTick(QuoteTick),
    TradeTick(TradeTick),
    Bar(Bar),
    OrderUpdated(forge_execution::Order<forge_execution::OrderState>),
    PositionUpdated(forge_execution::Position),
    RiskDenied { cid: forge_execution::ClientOrderId, reason: String },
}

fn to_datetime(now_ns: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(now_ns)
}

/// Assembles the [`SimulatedExchange`], [`ExecutionEngine`], [`RiskEngine`], [`Portfolio`] and a
/// single [`StrategyRunner`] into one backtest container, owning lifecycle and shutdown. Grounded
/// on `src/engine/trader.rs`'s `Trader`: a single-threaded container around one strategy and its
/// execution/data handlers, adapted from a generic `Data`/`Strategy`/`Execution`
/// type-parameter set to this kernel's concrete `SimulatedExchange`/`ExecutionEngine`/
/// `RiskEngine` stack (a single simulated venue has no need for a trait-object
/// handler abstraction).
pub struct Node<S: Strategy> {
    clock: TestClock,
    bus: MessageBus<ForgeEvent>,
    execution: ExecutionEngine,
    risk: RiskEngine,
    portfolio: Portfolio,
    runner: StrategyRunner<S>,
    last_price: FnvHashMap<InstrumentIndex, Decimal>,
    timeouts: TimeoutsConfig,
}

impl<S: Strategy> Node<S> {
    pub fn new(exchange: SimulatedExchange, risk: RiskEngine, strategy: S, reconciliation_lookback_mins: i64, start_ns: i64) -> Self {
        Self {
            clock: TestClock::new(start_ns),
            bus: MessageBus::new(),
            execution: ExecutionEngine::new(exchange, reconciliation_lookback_mins),
            risk,
            portfolio: Portfolio::new(),
            runner: StrategyRunner::new(strategy),
            last_price: FnvHashMap::default(),
            timeouts: TimeoutsConfig::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutsConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn cache(&self) -> &forge_execution::Cache {
        self.execution.cache()
    }

    pub fn bus_mut(&mut self) -> &mut MessageBus<ForgeEvent> {
        &mut self.bus
    }

    pub fn runner_mut(&mut self) -> &mut StrategyRunner<S> {
        &mut self.runner
    }

    pub fn apply_account_snapshot(&mut self, account: Account) {
        self.execution.apply_account_snapshot(account);
    }

    pub fn register_order_list(&mut self, list_id: forge_execution::OrderListId, list: forge_execution::OrderList) {
        self.execution.register_order_list(list_id, list);
    }

    pub fn portfolio_snapshot(&self) -> PortfolioSnapshot {
        self.portfolio.snapshot(self.execution.cache())
    }

    /// Fires `on_start` on the strategy, flushing any commands queued before construction.
    pub fn start(&mut self) -> Result<(), NodeError> {
        self.runner.start().map_err(|_| NodeError::BuilderIncomplete("strategy"))?;
        self.drain_and_process(self.clock.now_ns());
        Ok(())
    }

    /// Per §5's "Cancellation": `stop()` the strategy (fires `on_stop`), drain any outstanding
    /// commands, then `dispose()`.
    pub fn shutdown(&mut self) -> Result<(), NodeError> {
        self.runner.stop().map_err(|_| NodeError::ShutdownTimeout)?;
        self.drain_and_process(self.clock.now_ns());
        self.runner.dispose().map_err(|_| NodeError::ShutdownTimeout)?;
        Ok(())
    }

    pub fn process_quote_tick(&mut self, tick: QuoteTick) {
        let now_ns = tick.ts_init;
        self.clock.set_time(now_ns);

        self.last_price.insert(tick.instrument, tick.mid());
        self.execution.mark_to_market(tick.instrument, tick.mid());

        self.runner.on_quote_tick(&tick);
        self.bus.publish("data.quotes", ForgeEvent::QuoteTick(tick));
        self.drain_and_process(now_ns);
    }

    pub fn process_trade_tick(&mut self, tick: TradeTick, aggressor_side: Side) {
        let now_ns = tick.ts_init;
        self.clock.set_time(now_ns);
        let now = to_datetime(now_ns);

        self.last_price.insert(tick.instrument, tick.price);
        self.execution.mark_to_market(tick.instrument, tick.price);

        let outcomes = self.execution.apply_trade_tick(tick.instrument, aggressor_side, tick.price, tick.size, now);
        for outcome in &outcomes {
            self.bus.publish("orders.updated", ForgeEvent::OrderUpdated(outcome.order.clone()));
            self.runner.on_order_event(&outcome.order);
        }

        self.runner.on_trade_tick(&tick);
        self.bus.publish("data.trades", ForgeEvent::TradeTick(tick));
        self.drain_and_process(now_ns);
    }

    pub fn process_bar(&mut self, bar: Bar) {
        let now_ns = bar.ts_init;
        self.clock.set_time(now_ns);

        self.runner.on_bar(&bar);
        self.bus.publish("data.bars", ForgeEvent::Bar(bar));
        self.drain_and_process(now_ns);
    }

    /// Drains every command the strategy queued, risk-checks and routes each, and folds the
    /// resulting events back to the strategy, per §2's data flow: "orders -> RiskEngine ->
    /// ExecutionEngine -> events -> ExecutionEngine -> Portfolio + strategies". Runs until the
    /// strategy's outbound queue is empty, so a command issued reactively from within an
    /// `on_order_event` callback (e.g. closing a position once its stop-loss fires) is processed
    /// within the same tick rather than left stranded until the next one.
    fn drain_and_process(&mut self, now_ns: i64) {
        let now = to_datetime(now_ns);

        loop {
            let commands = self.runner.drain_outbound();
            if commands.is_empty() {
                break;
            }
            self.process_commands(commands, now);
        }
    }

    fn process_commands(&mut self, commands: Vec<ExecutionCommand>, now: DateTime<Utc>) {
        for command in commands {
            match command {
                ExecutionCommand::OpenOrder(order) => self.route_open_order(order, now),
                ExecutionCommand::OpenOrderList { entry, children } => self.route_open_order_list(entry, children, now),
                ExecutionCommand::CancelOrder(cid) => {
                    if let Some(Ok(outcome)) = self.execution.apply(ExecutionCommand::CancelOrder(cid), now) {
                        self.bus.publish("orders.updated", ForgeEvent::OrderUpdated(outcome.order.clone()));
                        self.runner.on_order_event(&outcome.order);
                        self.notify_cancelled_siblings(&outcome.cancelled_siblings);
                    }
                }
            }
        }
    }

    /// Drains whatever orders have accumulated on [`RiskEngine`]'s live-mode queue (per
    /// §4.7) and routes each through the same risk-evaluate -> execute -> cache/strategy path
    /// as a strategy-issued command, independent of the tick that triggered this poll. A no-op
    /// if live mode was never enabled.
    pub fn poll_live_queue(&mut self, now_ns: i64) {
        self.clock.set_time(now_ns);
        let now = to_datetime(now_ns);
        let pending = self.risk.drain_live_queue();
        for order in pending {
            self.route_open_order(order, now);
        }
        self.drain_and_process(now_ns);
    }

    fn route_open_order(&mut self, order: forge_execution::NewOrder, now: DateTime<Utc>) {
        let net_position = self
            .execution
            .cache()
            .position(order.instrument)
            .map(|position| signed_quantity(position))
            .unwrap_or(Decimal::ZERO);
        let last_price = self.last_price.get(&order.instrument).copied();

        if let Err(violation) = self.risk.evaluate(&order, net_position, last_price, now) {
            warn!(cid = %order.cid, violation = %violation, "order denied by risk engine");
            self.bus.publish("risk.denied", ForgeEvent::RiskDenied { cid: order.cid.clone(), reason: violation.to_string() });
            return;
        }

        if let Some(Ok(outcome)) = self.execution.apply(ExecutionCommand::OpenOrder(order), now) {
            self.publish_outcome(outcome);
        }
    }

    fn route_open_order_list(&mut self, entry: forge_execution::NewOrder, children: Vec<forge_execution::NewOrder>, now: DateTime<Utc>) {
        let net_position = self
            .execution
            .cache()
            .position(entry.instrument)
            .map(|position| signed_quantity(position))
            .unwrap_or(Decimal::ZERO);
        let last_price = self.last_price.get(&entry.instrument).copied();

        if let Err(violation) = self.risk.evaluate(&entry, net_position, last_price, now) {
            warn!(cid = %entry.cid, violation = %violation, "bracket entry denied by risk engine");
            self.bus.publish("risk.denied", ForgeEvent::RiskDenied { cid: entry.cid.clone(), reason: violation.to_string() });
            return;
        }

        if let Some(Ok(outcome)) = self.execution.apply(ExecutionCommand::OpenOrderList { entry, children }, now) {
            self.publish_outcome(outcome);
        }
    }

    fn publish_outcome(&mut self, outcome: forge_execution::ExecutionOutcome) {
        self.bus.publish("orders.updated", ForgeEvent::OrderUpdated(outcome.order.clone()));
        self.runner.on_order_event(&outcome.order);
        self.notify_cancelled_siblings(&outcome.cancelled_siblings);
        for released in &outcome.released_children {
            self.bus.publish("orders.updated", ForgeEvent::OrderUpdated(released.clone()));
            self.runner.on_order_event(released);
        }
        if let Some(position) = self.execution.cache().position(outcome.order.instrument) {
            self.runner.on_position_event(position);
            self.bus.publish("positions.updated", ForgeEvent::PositionUpdated(position.clone()));
        }
    }

    /// An [`forge_execution::ExecutionOutcome::cancelled_siblings`] list only carries the ids
    /// cancelled as an OCO side effect; look each one back up in the cache to forward its
    /// updated state to the strategy and bus the same way a direct cancel would.
    fn notify_cancelled_siblings(&mut self, cancelled: &[forge_execution::ClientOrderId]) {
        for cid in cancelled {
            info!(%cid, "OCO sibling cancelled");
            if let Ok(sibling) = self.execution.cache().order(cid) {
                let sibling = sibling.clone();
                self.bus.publish("orders.updated", ForgeEvent::OrderUpdated(sibling.clone()));
                self.runner.on_order_event(&sibling);
            }
        }
    }
}

/// `Buy` position quantity is positive, `Sell` is negative, matching [`forge_risk::engine`]'s
/// `net_position` convention.
fn signed_quantity(position: &forge_execution::Position) -> Decimal {
    match position.side {
        Side::Buy => position.quantity_abs,
        Side::Sell => -position.quantity_abs,
    }
}

/// Convenience constructor assembling a [`SimulatedExchange`]-backed [`Node`] from a
/// [`BacktestEngineConfig`]'s first venue, matching the single-venue scope of the simulated
/// exchange built here (multi-venue routing is a `forge::config::VenueConfig` list for future
/// extension, not yet dispatched by `Node`).
pub fn first_venue_account(config: &BacktestEngineConfig) -> Option<Account> {
    config.venues.first().map(|venue| {
        let balances = venue
            .starting_balances
            .iter()
            .map(|(asset, amount)| {
                forge_execution::AssetBalance::new(
                    smol_str::SmolStr::new(asset),
                    forge_execution::Balance::new(*amount, *amount),
                    chrono::Utc::now(),
                )
            })
            .collect();

        Account::new(
            venue.account_type,
            balances,
            forge_execution::Margin::new(Decimal::ZERO, Decimal::ZERO, venue.default_leverage),
        )
    })
}
