use crate::account::Account;
use crate::error::ExecutionError;
use crate::order::id::ClientOrderId;
use crate::order::state::OrderState;
use crate::order::Order;
use crate::position::{Position, PositionManager};
use fnv::FnvHashMap;
use forge_instrument::{Instrument, InstrumentIndex};
use forge_integration::Snapshot;
use rust_decimal::Decimal;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

/// The coherent, cross-cutting store of instruments, orders, positions and the account that
/// the [`crate::engine`] and strategy/risk layers all read from and write through, per §4.3.
///
/// Orders are only ever replaced wholesale via a [`Snapshot`] (the authoritative current
/// state from the simulated exchange), never merged field-by-field - this keeps
/// reconciliation simple at the cost of the caller needing to supply a complete view each
/// time, matching how the venue event stream itself reports state.
#[derive(Debug, Default)]
pub struct Cache {
    instruments: FnvHashMap<InstrumentIndex, Instrument>,
    orders: FnvHashMap<ClientOrderId, Order<OrderState>>,
    positions: FnvHashMap<InstrumentIndex, PositionManager>,
    account: Option<Account>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instrument(&mut self, index: InstrumentIndex, instrument: Instrument) {
        self.instruments.insert(index, instrument);
    }

    pub fn instrument(&self, index: InstrumentIndex) -> Result<&Instrument, ExecutionError> {
        self.instruments.get(&index).ok_or(ExecutionError::UnknownInstrument(index))
    }

    /// Apply an order `Snapshot`: an active order is inserted/replaced, an inactive one is
    /// removed from the live set (it remains queryable via `orders_closed` history only if the
    /// caller separately retains it - the cache itself tracks only what is currently live or
    /// was most recently seen, matching the venue's own event stream semantics).
    pub fn update_order_snapshot(&mut self, snapshot: Snapshot<Order<OrderState>>) {
        let Snapshot(order) = snapshot;
        let cid = order.cid().clone();

        match (self.orders.entry(cid.clone()), order.is_active()) {
            (Entry::Vacant(entry), true) => {
                debug!(%cid, "cache tracking new order");
                entry.insert(order);
            }
            (Entry::Vacant(_), false) => {
                warn!(%cid, "cache received inactive snapshot for untracked order - ignoring");
            }
            (Entry::Occupied(mut entry), true) => {
                entry.insert(order);
            }
            (Entry::Occupied(mut entry), false) => {
                debug!(%cid, "cache order reached terminal state");
                entry.insert(order);
            }
        }
    }

    pub fn order(&self, cid: &ClientOrderId) -> Result<&Order<OrderState>, ExecutionError> {
        self.orders.get(cid).ok_or_else(|| ExecutionError::UnknownOrder(cid.clone()))
    }

    pub fn is_order_open(&self, cid: &ClientOrderId) -> bool {
        self.orders.get(cid).map(|order| order.is_active()).unwrap_or(false)
    }

    pub fn is_order_closed(&self, cid: &ClientOrderId) -> bool {
        self.orders.get(cid).map(|order| !order.is_active()).unwrap_or(false)
    }

    pub fn order_exists(&self, cid: &ClientOrderId) -> bool {
        self.orders.contains_key(cid)
    }

    pub fn orders_open(&self) -> impl Iterator<Item = &Order<OrderState>> {
        self.orders.values().filter(|order| order.is_active())
    }

    pub fn orders_closed(&self) -> impl Iterator<Item = &Order<OrderState>> {
        self.orders.values().filter(|order| !order.is_active())
    }

    /// All tracked orders, optionally restricted to one instrument.
    pub fn orders(&self, instrument: Option<InstrumentIndex>) -> impl Iterator<Item = &Order<OrderState>> {
        self.orders
            .values()
            .filter(move |order| instrument.is_none_or(|index| order.instrument == index))
    }

    pub fn update_position_from_trade(&mut self, trade: &crate::trade::Trade) -> Option<crate::position::PositionExited> {
        self.positions.entry(trade.instrument).or_default().update_from_trade(trade)
    }

    pub fn position(&self, instrument: InstrumentIndex) -> Option<&Position> {
        self.positions.get(&instrument).and_then(|manager| manager.current.as_ref())
    }

    /// Marks any open position in `instrument` to `price`, refreshing its `pnl_unrealised`.
    /// Called on every quote/trade tick, independent of whether a trade occurred.
    pub fn mark_to_market(&mut self, instrument: InstrumentIndex, price: Decimal) {
        if let Some(manager) = self.positions.get_mut(&instrument) {
            if let Some(position) = manager.current.as_mut() {
                position.update_pnl_unrealised(price);
            }
        }
    }

    pub fn positions_open(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter_map(|manager| manager.current.as_ref())
    }

    /// The position (if any) carrying the instrument that `cid` trades, i.e. the position an
    /// order's fills would update.
    pub fn position_for_order(&self, cid: &ClientOrderId) -> Option<&Position> {
        let order = self.orders.get(cid)?;
        self.position(order.instrument)
    }

    pub fn update_account(&mut self, account: Account) {
        self.account = Some(account);
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn account_mut(&mut self) -> Option<&mut Account> {
        self.account.as_mut()
    }
}
