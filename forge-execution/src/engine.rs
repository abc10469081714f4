use crate::account::Account;
use crate::cache::Cache;
use crate::error::ExecutionError;
use crate::order::id::{ClientOrderId, OrderListId};
use crate::order::list::OrderList;
use crate::simulated::exchange::{ExecutionOutcome, NewOrder, SimulatedExchange};
use chrono::{DateTime, Duration, Utc};
use forge_integration::Snapshot;
use tracing::{debug, warn};

/// A command the [`ExecutionEngine`] routes to the venue client, per §4.3.
#[derive(Debug, Clone)]
pub enum ExecutionCommand {
    OpenOrder(NewOrder),
    OpenOrderList { entry: NewOrder, children: Vec<NewOrder> },
    CancelOrder(ClientOrderId),
}

/// Routes [`ExecutionCommand`]s to the [`SimulatedExchange`], applies the resulting
/// [`ExecutionOutcome`] events to the [`Cache`] (order snapshots, position updates), and runs
/// the bounded startup reconciliation named in §4.6.
///
/// A command issued while [`Self::connected`] is `false` is deferred rather than dropped,
/// matching the ConnectivityError handling: the engine buffers commands during a disconnection
/// and replays them once [`Self::reconcile`] completes.
pub struct ExecutionEngine {
    exchange: SimulatedExchange,
    cache: Cache,
    connected: bool,
    deferred: Vec<ExecutionCommand>,
    reconciliation_lookback_mins: i64,
}

impl ExecutionEngine {
    pub fn new(exchange: SimulatedExchange, reconciliation_lookback_mins: i64) -> Self {
        Self {
            exchange,
            cache: Cache::new(),
            connected: true,
            deferred: Vec::new(),
            reconciliation_lookback_mins,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Marks any open position in `instrument` to `price`, independent of whether a trade
    /// occurred - called on every quote/trade tick per §4.3.
    pub fn mark_to_market(&mut self, instrument: forge_instrument::InstrumentIndex, price: rust_decimal::Decimal) {
        self.cache.mark_to_market(instrument, price);
    }

    /// Feed a trade print through to the [`SimulatedExchange`]'s matcher, folding every
    /// resulting [`ExecutionOutcome`] into the cache exactly as [`Self::apply`] does.
    pub fn apply_trade_tick(
        &mut self,
        instrument: forge_instrument::InstrumentIndex,
        aggressor_side: forge_instrument::Side,
        price: rust_decimal::Decimal,
        quantity: rust_decimal::Decimal,
        now: DateTime<Utc>,
    ) -> Vec<ExecutionOutcome> {
        let outcomes = self.exchange.apply_trade_tick(instrument, aggressor_side, price, quantity, now);
        for outcome in &outcomes {
            self.absorb_outcome(outcome);
        }
        outcomes
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
        warn!("execution engine disconnected, commands will be deferred");
    }

    /// Reconcile the cache against venue truth: for every order the [`SimulatedExchange`]
    /// tracks but the cache has no record of (or whose status diverges), synthesize a snapshot
    /// event bringing the cache into agreement. Only orders accepted within
    /// `reconciliation_lookback_mins` of `now` are considered - anything older is assumed
    /// already resolved and out of scope, per §4.6.
    pub fn reconcile(&mut self, now: DateTime<Utc>) -> usize {
        let lookback = now - Duration::minutes(self.reconciliation_lookback_mins);
        let mut synthesized = 0;

        for order in self.exchange.orders.values() {
            let Some(ts) = order.state.ts() else { continue };
            if ts < lookback {
                continue;
            }

            let diverges = match self.cache.order(order.cid()) {
                Ok(cached) => cached.state != order.state,
                Err(_) => true,
            };

            if diverges {
                debug!(cid = %order.cid(), "reconciliation synthesizing cache event");
                self.cache.update_order_snapshot(Snapshot(order.clone()));
                synthesized += 1;
            }
        }

        self.connected = true;
        let deferred = std::mem::take(&mut self.deferred);
        for command in deferred {
            self.apply(command, now);
        }

        synthesized
    }

    pub fn apply_account_snapshot(&mut self, account: Account) {
        self.cache.update_account(account);
    }

    /// Registers an OCO/OTO grouping on the venue before its member orders are submitted, so
    /// [`SimulatedExchange`] resolves contingencies as fills/cancels arrive.
    pub fn register_order_list(&mut self, list_id: OrderListId, list: OrderList) {
        self.exchange.order_lists.insert(list_id, list);
    }

    /// Route `command` to the [`SimulatedExchange`] and fold the resulting
    /// [`ExecutionOutcome`] (and every nested counterparty/sibling/child outcome) into the
    /// cache. Returns `None` if the command was deferred (disconnected) rather than applied.
    pub fn apply(&mut self, command: ExecutionCommand, now: DateTime<Utc>) -> Option<Result<ExecutionOutcome, ExecutionError>> {
        if !self.connected {
            debug!("execution engine disconnected, deferring command");
            self.deferred.push(command);
            return None;
        }

        let result = match command {
            ExecutionCommand::OpenOrder(request) => Ok(self.exchange.open_order(request, now)),
            ExecutionCommand::OpenOrderList { entry, children } => Ok(self.exchange.open_order_list(entry, children, now)),
            ExecutionCommand::CancelOrder(cid) => self.exchange.cancel_order(&cid, now),
        };

        if let Ok(outcome) = &result {
            self.absorb_outcome(outcome);
        }

        Some(result)
    }

    fn absorb_outcome(&mut self, outcome: &ExecutionOutcome) {
        self.cache.update_order_snapshot(Snapshot(outcome.order.clone()));

        for trade in &outcome.trades {
            if let Some(exited) = self.cache.update_position_from_trade(trade) {
                debug!(instrument = ?exited.instrument, pnl_realised = %exited.pnl_realised, "position closed");
            }
        }

        for counterparty in &outcome.counterparty_outcomes {
            self.absorb_outcome(counterparty);
        }

        for released in &outcome.released_children {
            self.cache.update_order_snapshot(Snapshot(released.clone()));
        }
    }
}
