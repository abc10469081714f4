use crate::account::{Account, AccountType};
use crate::book::matcher;
use crate::book::OrderBook;
use crate::error::ExecutionError;
use crate::order::id::{ClientOrderId, OrderKey, OrderListId, StrategyId, VenueOrderId};
use crate::order::list::{ContingencyType, OrderList};
use crate::order::state::{Accepted, ActiveOrderState, Canceled, Dormant, Filled, InactiveOrderState, OrderState, Rejected};
use crate::order::{Order, OrderKind, TimeInForce};
use crate::simulated::commission::CommissionModel;
use crate::simulated::fill_model::FillModel;
use crate::simulated::latency::LatencyModel;
use crate::trade::{Trade, TradeId};
use chrono::{DateTime, Duration, Utc};
use fnv::FnvHashMap;
use forge_instrument::{InstrumentIndex, Side};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal::Decimal;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

/// A request to open a new order, as submitted to [`SimulatedExchange::submit_open`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub strategy: StrategyId,
    pub cid: ClientOrderId,
    pub instrument: InstrumentIndex,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub kind: OrderKind,
    pub time_in_force: TimeInForce,
    pub list_id: Option<OrderListId>,
    /// The price a stop/if-touched [`OrderKind`] arms against.
    pub trigger_price: Option<Decimal>,
    /// `Some` only when `time_in_force` is [`TimeInForce::Gtd`].
    pub expire_time: Option<DateTime<Utc>>,
    pub post_only: bool,
    pub reduce_only: bool,
}

/// Outcome of a command applied against the [`SimulatedExchange`]: the updated order plus any
/// trades generated immediately by matching.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub order: Order<OrderState>,
    pub trades: Vec<Trade>,
    /// Orders cancelled as a side effect (OCO siblings of a filled/cancelled member).
    pub cancelled_siblings: Vec<ClientOrderId>,
    /// Orders whose snapshot changed as a side effect of this command: an OTO bracket's
    /// children newly held (SUBMITTED) at submission, later replaced by their ACCEPTED/
    /// REJECTED/CANCELED snapshot once the entry resolves. Order in the vector is the order the
    /// cache should apply them in.
    pub released_children: Vec<Order<OrderState>>,
    /// Resting counterparty orders also updated by this command's matching (e.g. the limit
    /// order on the other side of the book that an incoming marketable order swept).
    pub counterparty_outcomes: Vec<ExecutionOutcome>,
}

impl ExecutionOutcome {
    fn new(order: Order<OrderState>, trades: Vec<Trade>) -> Self {
        Self {
            order,
            trades,
            cancelled_siblings: Vec::new(),
            released_children: Vec::new(),
            counterparty_outcomes: Vec::new(),
        }
    }
}

/// The fields [`SimulatedExchange::match_and_finalize`] needs, common to a fresh [`NewOrder`]
/// and to an already-tracked [`Order`] being activated out of [`ActiveOrderState::Dormant`].
struct MatchRequest {
    key: OrderKey,
    instrument: InstrumentIndex,
    side: Side,
    price: Decimal,
    quantity: Decimal,
    kind: OrderKind,
    time_in_force: TimeInForce,
    list_id: Option<OrderListId>,
    trigger_price: Option<Decimal>,
    expire_time: Option<DateTime<Utc>>,
    post_only: bool,
    reduce_only: bool,
}

impl From<&NewOrder> for MatchRequest {
    fn from(request: &NewOrder) -> Self {
        Self {
            key: OrderKey::new(request.strategy.clone(), request.cid.clone()),
            instrument: request.instrument,
            side: request.side,
            price: request.price,
            quantity: request.quantity,
            kind: request.kind,
            time_in_force: request.time_in_force,
            list_id: request.list_id.clone(),
            trigger_price: request.trigger_price,
            expire_time: request.expire_time,
            post_only: request.post_only,
            reduce_only: request.reduce_only,
        }
    }
}

impl From<&Order<OrderState>> for MatchRequest {
    fn from(order: &Order<OrderState>) -> Self {
        Self {
            key: order.key.clone(),
            instrument: order.instrument,
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            kind: order.kind,
            time_in_force: order.time_in_force,
            list_id: order.list_id.clone(),
            trigger_price: order.trigger_price,
            expire_time: order.expire_time,
            post_only: order.post_only,
            reduce_only: order.reduce_only,
        }
    }
}

/// A command stamped with the effective (post-latency) time it should be applied, per §4.5.
#[derive(Debug, Clone)]
enum PendingKind {
    Open(NewOrder),
    Cancel(ClientOrderId),
    OpenList { entry: NewOrder, children: Vec<NewOrder> },
}

#[derive(Debug, Clone)]
struct PendingCommand {
    effective_ts: DateTime<Utc>,
    sequence: u64,
    kind: PendingKind,
}

impl PartialEq for PendingCommand {
    fn eq(&self, other: &Self) -> bool {
        (self.effective_ts, self.sequence) == (other.effective_ts, other.sequence)
    }
}

impl Eq for PendingCommand {}

impl PartialOrd for PendingCommand {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingCommand {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.effective_ts, self.sequence).cmp(&(other.effective_ts, other.sequence))
    }
}

/// A matching simulation of a single-instrument venue: holds the [`Account`], one
/// [`OrderBook`] per instrument, every live [`Order`], and the [`OrderList`] contingency
/// groupings, applying a [`LatencyModel`], [`FillModel`] and [`CommissionModel`] to every
/// command.
pub struct SimulatedExchange {
    pub account: Account,
    pub books: FnvHashMap<InstrumentIndex, OrderBook>,
    pub orders: FnvHashMap<ClientOrderId, Order<OrderState>>,
    pub order_lists: FnvHashMap<OrderListId, OrderList>,
    pub latency_model: Box<dyn LatencyModel>,
    pub fill_model: Box<dyn FillModel>,
    pub commission_model: Box<dyn CommissionModel>,
    pending: BinaryHeap<Reverse<PendingCommand>>,
    rng: StdRng,
    next_venue_order_id: u64,
    next_trade_id: u64,
    next_sequence: u64,
}

impl SimulatedExchange {
    pub fn new(
        account: Account,
        latency_model: Box<dyn LatencyModel>,
        fill_model: Box<dyn FillModel>,
        commission_model: Box<dyn CommissionModel>,
        seed: u64,
    ) -> Self {
        Self {
            account,
            books: FnvHashMap::default(),
            orders: FnvHashMap::default(),
            order_lists: FnvHashMap::default(),
            latency_model,
            fill_model,
            commission_model,
            pending: BinaryHeap::new(),
            rng: StdRng::seed_from_u64(seed),
            next_venue_order_id: 1,
            next_trade_id: 1,
            next_sequence: 1,
        }
    }

    fn next_venue_order_id(&mut self) -> VenueOrderId {
        let id = VenueOrderId(self.next_venue_order_id);
        self.next_venue_order_id += 1;
        id
    }

    fn next_trade_id(&mut self) -> TradeId {
        let id = TradeId::new(format!("trade-{}", self.next_trade_id));
        self.next_trade_id += 1;
        id
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    fn schedule(&mut self, kind: PendingKind, now: DateTime<Utc>) {
        let latency_ns = self.latency_model.sample_ns(&mut self.rng);
        let effective_ts = now + Duration::nanoseconds(latency_ns);
        let sequence = self.next_sequence();
        self.pending.push(Reverse(PendingCommand { effective_ts, sequence, kind }));
    }

    /// Enqueue `request`, stamping its effective application time per [`LatencyModel::sample_ns`].
    /// A [`ActiveOrderState::Submitted`] placeholder is visible immediately, before the command
    /// is actually applied by [`Self::process`].
    pub fn submit_open(&mut self, request: NewOrder, now: DateTime<Utc>) -> ClientOrderId {
        let cid = request.cid.clone();
        let key = OrderKey::new(request.strategy.clone(), request.cid.clone());
        let placeholder = Order::new(
            key,
            request.instrument,
            request.side,
            request.price,
            request.quantity,
            request.kind,
            request.time_in_force,
            request.list_id.clone(),
            request.trigger_price,
            request.expire_time,
            request.post_only,
            request.reduce_only,
            OrderState::Active(ActiveOrderState::Submitted),
        );
        self.orders.insert(cid.clone(), placeholder);
        self.schedule(PendingKind::Open(request), now);
        cid
    }

    /// Enqueue a cancel for `cid`. Existence/terminal-state validation happens synchronously -
    /// it reflects what the engine already knows, not venue latency - and an `Accepted` order
    /// is marked `PendingCancel` immediately so callers see the request in flight.
    pub fn submit_cancel(&mut self, cid: ClientOrderId, now: DateTime<Utc>) -> Result<(), ExecutionError> {
        let order = self.orders.get(&cid).ok_or_else(|| ExecutionError::UnknownOrder(cid.clone()))?;
        if !order.is_active() {
            return Err(ExecutionError::AlreadyTerminal(cid.clone()));
        }

        if let OrderState::Active(ActiveOrderState::Accepted(accepted)) = &order.state {
            let accepted = accepted.clone();
            if let Some(order) = self.orders.get_mut(&cid) {
                order.state = OrderState::Active(ActiveOrderState::PendingCancel(accepted));
            }
        }

        self.schedule(PendingKind::Cancel(cid), now);
        Ok(())
    }

    /// Enqueue an OTO bracket: `entry` plus its `children`, submitted atomically per §4.5.
    pub fn submit_open_list(&mut self, entry: NewOrder, children: Vec<NewOrder>, now: DateTime<Utc>) -> ClientOrderId {
        let cid = entry.cid.clone();
        self.schedule(PendingKind::OpenList { entry, children }, now);
        cid
    }

    /// Advance the venue clock to `ts`: drain every command whose effective time has arrived,
    /// then evaluate dormant stop/if-touched triggers against the current book and sweep GTD
    /// expirations, per §4.5.
    pub fn process(&mut self, ts: DateTime<Utc>) -> Vec<ExecutionOutcome> {
        let mut outcomes = Vec::new();

        while let Some(Reverse(next)) = self.pending.peek() {
            if next.effective_ts > ts {
                break;
            }
            let Reverse(command) = self.pending.pop().expect("heap non-empty after peek");

            let outcome = match command.kind {
                PendingKind::Open(request) => Some(self.apply_open_now(request, command.effective_ts)),
                PendingKind::Cancel(cid) => self.apply_cancel_now(&cid, command.effective_ts).ok(),
                PendingKind::OpenList { entry, children } => Some(self.apply_open_list_now(entry, children, command.effective_ts)),
            };

            if let Some(outcome) = outcome {
                outcomes.push(outcome);
            }
        }

        outcomes.extend(self.evaluate_all_triggers(ts));
        outcomes.extend(self.sweep_expirations(ts));
        outcomes
    }

    /// Submit then immediately [`Self::process`] up to `now`: under the zero-latency model
    /// every existing caller configures, this resolves synchronously exactly as a direct apply
    /// would; under real latency, the returned outcome reflects the `Submitted` placeholder
    /// until a later `process` call drains it.
    pub fn open_order(&mut self, request: NewOrder, now: DateTime<Utc>) -> ExecutionOutcome {
        let cid = request.cid.clone();
        self.submit_open(request, now);
        self.process(now)
            .into_iter()
            .find(|outcome| *outcome.order.cid() == cid)
            .unwrap_or_else(|| self.pending_submission_outcome(&cid))
    }

    pub fn cancel_order(&mut self, cid: &ClientOrderId, now: DateTime<Utc>) -> Result<ExecutionOutcome, ExecutionError> {
        self.submit_cancel(cid.clone(), now)?;
        let outcome = self
            .process(now)
            .into_iter()
            .find(|outcome| outcome.order.cid() == cid)
            .unwrap_or_else(|| self.pending_submission_outcome(cid));
        Ok(outcome)
    }

    pub fn open_order_list(&mut self, entry: NewOrder, children: Vec<NewOrder>, now: DateTime<Utc>) -> ExecutionOutcome {
        let cid = entry.cid.clone();
        self.submit_open_list(entry, children, now);
        self.process(now)
            .into_iter()
            .find(|outcome| *outcome.order.cid() == cid)
            .unwrap_or_else(|| self.pending_submission_outcome(&cid))
    }

    fn pending_submission_outcome(&self, cid: &ClientOrderId) -> ExecutionOutcome {
        let order = self.orders.get(cid).cloned().expect("submitted order missing from tracking");
        ExecutionOutcome::new(order, Vec::new())
    }

    /// The real effect of opening `request`: account checks, post-only rejection, dormancy for
    /// a triggered [`OrderKind`], or an immediate match against the book.
    fn apply_open_now(&mut self, request: NewOrder, now: DateTime<Utc>) -> ExecutionOutcome {
        if request.post_only && self.would_cross(&request) {
            warn!(cid = %request.cid, "post-only order would cross the book, rejecting");
            return self.reject_order(&request, "post_only_would_cross".to_string(), now);
        }

        if let Err(reason) = self.reserve_for_new_order(request.side, request.price, request.quantity) {
            warn!(cid = %request.cid, %reason, "order rejected by account check");
            return self.reject_order(&request, reason, now);
        }

        let venue_order_id = self.next_venue_order_id();

        if request.kind.requires_trigger() {
            let key = OrderKey::new(request.strategy.clone(), request.cid.clone());
            let dormant = Dormant::new(venue_order_id, now, request.trigger_price, request.quantity);
            let order = Order::new(
                key,
                request.instrument,
                request.side,
                request.price,
                request.quantity,
                request.kind,
                request.time_in_force,
                request.list_id.clone(),
                request.trigger_price,
                request.expire_time,
                request.post_only,
                request.reduce_only,
                OrderState::Active(ActiveOrderState::Dormant(dormant)),
            );
            self.orders.insert(order.cid().clone(), order.clone());
            debug!(cid = %order.cid(), "order held dormant pending trigger");

            let mut outcome = ExecutionOutcome::new(order, Vec::new());
            self.resolve_contingencies(&mut outcome, now);
            return outcome;
        }

        let match_request = MatchRequest::from(&request);
        let (order, trades, counterparty_outcomes) = self.match_and_finalize(match_request, venue_order_id, now);
        self.orders.insert(order.cid().clone(), order.clone());
        debug!(cid = %order.cid(), "order processed by simulated exchange");

        let mut outcome = ExecutionOutcome::new(order, trades);
        outcome.counterparty_outcomes = counterparty_outcomes;
        self.resolve_contingencies(&mut outcome, now);
        outcome
    }

    /// Whether `request` would execute as a taker if matched right now, per §4.4's
    /// `POST_ONLY_WOULD_CROSS` rule. A `Market` order always crosses; a dormant stop/if-touched
    /// kind never does, since it does not join the book until triggered.
    fn would_cross(&self, request: &NewOrder) -> bool {
        if matches!(request.kind, OrderKind::Market) {
            return true;
        }
        if !request.kind.requires_limit_price() {
            return false;
        }

        let Some(book) = self.books.get(&request.instrument) else { return false };
        match request.side {
            Side::Buy => book.best_ask().is_some_and(|ask| ask <= request.price),
            Side::Sell => book.best_bid().is_some_and(|bid| bid >= request.price),
        }
    }

    /// Reserve the account capital `side`/`price`/`quantity` commits on acceptance: CASH buys
    /// must be fully funded by free quote balance; MARGIN orders reserve `price * quantity /
    /// leverage` against headroom. Betting accounts reserve nothing.
    fn reserve_for_new_order(&mut self, side: Side, price: Decimal, quantity: Decimal) -> Result<(), String> {
        match self.account.account_type {
            AccountType::Cash => {
                if side != Side::Buy {
                    return Ok(());
                }
                let required = price * quantity;
                let free = self.account.balance("quote").map(|b| b.free).unwrap_or(Decimal::ZERO);
                if free < required {
                    return Err(format!("insufficient balance: required {required}, free {free}"));
                }
                if let Some(balance) = self.account.balance_mut("quote") {
                    balance.reserve(required);
                }
                Ok(())
            }
            AccountType::Margin => {
                let required = self.required_margin(price, quantity);
                if self.account.margin.headroom() < required {
                    return Err(format!("insufficient margin: required {required}, headroom {}", self.account.margin.headroom()));
                }
                self.account.margin.used += required;
                Ok(())
            }
            AccountType::Betting => Ok(()),
        }
    }

    /// Release capital reserved by [`Self::reserve_for_new_order`] for an order of `quantity`
    /// remaining unfilled, on cancel/reject/terminal-fill.
    fn release_reservation(&mut self, side: Side, price: Decimal, quantity: Decimal) {
        match self.account.account_type {
            AccountType::Cash => {
                if side == Side::Buy {
                    if let Some(balance) = self.account.balance_mut("quote") {
                        balance.release(price * quantity);
                    }
                }
            }
            AccountType::Margin => {
                let required = self.required_margin(price, quantity);
                self.account.margin.used = (self.account.margin.used - required).max(Decimal::ZERO);
            }
            AccountType::Betting => {}
        }
    }

    fn required_margin(&self, price: Decimal, quantity: Decimal) -> Decimal {
        let leverage = self.account.margin.leverage;
        if leverage > Decimal::ZERO {
            price * quantity / leverage
        } else {
            price * quantity
        }
    }

    /// Debit/credit the quote balance for a CASH account on a fill: releases the reservation
    /// made at `order_price` and settles the actual proceeds/cost at `fill_price`, net of `fee`.
    fn settle_fill(&mut self, side: Side, order_price: Decimal, fill_price: Decimal, quantity: Decimal, fee: Decimal) {
        let Some(balance) = self.account.balance_mut("quote") else { return };
        match side {
            Side::Buy => {
                balance.release(order_price * quantity);
                balance.settle(-(fill_price * quantity + fee));
            }
            Side::Sell => {
                balance.settle(fill_price * quantity - fee);
            }
        }
    }

    fn reject_order(&mut self, request: &NewOrder, reason: String, now: DateTime<Utc>) -> ExecutionOutcome {
        let key = OrderKey::new(request.strategy.clone(), request.cid.clone());
        let order = Order::new(
            key,
            request.instrument,
            request.side,
            request.price,
            request.quantity,
            request.kind,
            request.time_in_force,
            request.list_id.clone(),
            request.trigger_price,
            request.expire_time,
            request.post_only,
            request.reduce_only,
            OrderState::Inactive(InactiveOrderState::Rejected(Rejected::new(reason))),
        );
        self.orders.insert(order.cid().clone(), order.clone());
        let mut outcome = ExecutionOutcome::new(order, Vec::new());
        self.resolve_contingencies(&mut outcome, now);
        outcome
    }

    /// Match `request` against the book, settling every fill and resting any remainder per
    /// time-in-force, shared by a fresh marketable submission and a dormant order's activation.
    fn match_and_finalize(&mut self, request: MatchRequest, venue_order_id: VenueOrderId, now: DateTime<Utc>) -> (Order<OrderState>, Vec<Trade>, Vec<ExecutionOutcome>) {
        let limit_price = request.kind.requires_limit_price().then_some(request.price);
        let book = self.books.entry(request.instrument).or_default();
        let matched = matcher::match_incoming(book, request.side, limit_price, request.quantity);

        let mut trades = Vec::with_capacity(matched.len());
        let mut filled_quantity = Decimal::ZERO;
        let mut counterparty_outcomes = Vec::new();

        for fill in matched {
            let fill_quantity = self.fill_model.apply(&mut self.rng, fill.quantity);
            if fill_quantity <= Decimal::ZERO {
                continue;
            }
            filled_quantity += fill_quantity;
            let fee = self.commission_model.commission(fill.price, fill_quantity);
            trades.push(Trade::new(
                self.next_trade_id(),
                venue_order_id,
                request.instrument,
                request.key.strategy.clone(),
                now,
                request.side,
                fill.price,
                fill_quantity,
                fee,
            ));

            if self.account.account_type == AccountType::Cash {
                self.settle_fill(request.side, request.price, fill.price, fill_quantity, fee);
            }
            self.sync_oco_peers_on_reduction(request.instrument, &request.key.cid, request.side, fill_quantity, now);

            if let Some(counterparty_outcome) = self.fill_resting_order(&fill.cid, request.instrument, fill.price, fill_quantity, now) {
                counterparty_outcomes.push(counterparty_outcome);
            }
        }

        let remaining = request.quantity - filled_quantity;
        let fully_filled = remaining <= Decimal::ZERO;
        let rests = !fully_filled && request.time_in_force == TimeInForce::Gtc && !matches!(request.kind, OrderKind::Market);

        if rests {
            self.books
                .entry(request.instrument)
                .or_default()
                .add(request.side, request.price, request.key.cid.clone(), remaining);
        } else if !fully_filled {
            // IOC/FOK/Market remainder that cannot rest releases the capital it reserved.
            self.release_reservation(request.side, request.price, remaining);
        }

        if fully_filled && self.account.account_type == AccountType::Margin {
            // CASH already released its reservation per-fill via `settle_fill`; MARGIN never
            // touches the reservation on a fill, so the full amount releases here instead.
            self.release_reservation(request.side, request.price, request.quantity);
        }

        let state = if fully_filled {
            OrderState::Inactive(InactiveOrderState::Filled(Filled::new(
                venue_order_id,
                now,
                trades.iter().map(|t| t.price * t.quantity).sum::<Decimal>()
                    / trades.iter().map(|t| t.quantity).sum::<Decimal>().max(Decimal::ONE),
                request.quantity,
            )))
        } else if rests {
            OrderState::Active(ActiveOrderState::Accepted(Accepted::new(
                venue_order_id,
                now,
                request.price,
                request.quantity,
                filled_quantity,
            )))
        } else {
            OrderState::Inactive(InactiveOrderState::Canceled(Canceled::new(venue_order_id, now)))
        };

        let order = Order::new(
            request.key,
            request.instrument,
            request.side,
            request.price,
            request.quantity,
            request.kind,
            request.time_in_force,
            request.list_id,
            request.trigger_price,
            request.expire_time,
            request.post_only,
            request.reduce_only,
            state,
        );

        (order, trades, counterparty_outcomes)
    }

    /// Apply a fill of `quantity` at `price` to the resting order `cid` matched against by an
    /// incoming order or a trade print, updating its state in [`Self::orders`] and resolving
    /// any contingency it belongs to. Returns `None` if `cid` is no longer tracked (already
    /// cancelled) or not in a fillable state.
    fn fill_resting_order(&mut self, cid: &ClientOrderId, instrument: InstrumentIndex, price: Decimal, quantity: Decimal, now: DateTime<Utc>) -> Option<ExecutionOutcome> {
        let mut order = self.orders.get(cid).cloned()?;
        let OrderState::Active(ActiveOrderState::Accepted(accepted)) = &order.state else {
            return None;
        };

        let venue_order_id = accepted.venue_order_id;
        let new_filled = accepted.filled_quantity + quantity;
        let fee = self.commission_model.commission(price, quantity);
        let trade = Trade::new(
            self.next_trade_id(),
            venue_order_id,
            instrument,
            order.key.strategy.clone(),
            now,
            order.side,
            price,
            quantity,
            fee,
        );

        if self.account.account_type == AccountType::Cash {
            self.settle_fill(order.side, accepted.price, price, quantity, fee);
        }

        let fully_filled = new_filled >= order.quantity;
        if fully_filled && self.account.account_type == AccountType::Margin {
            self.release_reservation(order.side, order.price, order.quantity);
        }

        order.state = if fully_filled {
            OrderState::Inactive(InactiveOrderState::Filled(Filled::new(venue_order_id, now, price, order.quantity)))
        } else {
            OrderState::Active(ActiveOrderState::Accepted(Accepted::new(
                venue_order_id,
                accepted.ts_accepted,
                accepted.price,
                accepted.quantity,
                new_filled,
            )))
        };

        self.orders.insert(order.cid().clone(), order.clone());
        self.sync_oco_peers_on_reduction(instrument, cid, order.side, quantity, now);

        let mut outcome = ExecutionOutcome::new(order, vec![trade]);
        self.resolve_contingencies(&mut outcome, now);
        Some(outcome)
    }

    /// Proportionally shrink every other active order sharing `instrument`/`reducing_side` and
    /// belonging to an OCO grouping, by `reduced_quantity` - covers both an OCO peer's own
    /// partial fill (§8 S3) and an unrelated reduce-only order filling against the same
    /// position (§8 S6).
    fn sync_oco_peers_on_reduction(&mut self, instrument: InstrumentIndex, filled_cid: &ClientOrderId, reducing_side: Side, reduced_quantity: Decimal, now: DateTime<Utc>) {
        let siblings: Vec<ClientOrderId> = self
            .orders
            .values()
            .filter(|order| order.instrument == instrument && order.side == reducing_side && order.is_active() && order.cid() != filled_cid)
            .filter(|order| {
                order.list_id.as_ref().is_some_and(|list_id| {
                    self.order_lists.get(list_id).is_some_and(|list| match list.contingency {
                        ContingencyType::Oco => true,
                        // Released Oto children are OCO with each other once past the entry.
                        ContingencyType::Oto => list.oto_entry() != Some(order.cid()),
                        ContingencyType::Ouo => false,
                    })
                })
            })
            .map(|order| order.cid().clone())
            .collect();

        for sibling_cid in siblings {
            self.shrink_order_quantity(&sibling_cid, reduced_quantity, now);
        }
    }

    fn shrink_order_quantity(&mut self, cid: &ClientOrderId, by: Decimal, _now: DateTime<Utc>) {
        let Some(mut order) = self.orders.get(cid).cloned() else { return };

        match &order.state {
            OrderState::Active(ActiveOrderState::Accepted(accepted)) => {
                let new_quantity = (accepted.quantity - by).max(Decimal::ZERO);
                let removed = by.min(accepted.quantity_remaining());
                if let Some(book) = self.books.get_mut(&order.instrument) {
                    book.reduce(order.side, order.price, cid, removed);
                }
                order.quantity = new_quantity;
                order.state = OrderState::Active(ActiveOrderState::Accepted(Accepted::new(
                    accepted.venue_order_id,
                    accepted.ts_accepted,
                    accepted.price,
                    new_quantity,
                    accepted.filled_quantity.min(new_quantity),
                )));
                self.orders.insert(cid.clone(), order);
            }
            OrderState::Active(ActiveOrderState::Dormant(dormant)) => {
                let new_quantity = (dormant.quantity - by).max(Decimal::ZERO);
                order.quantity = new_quantity;
                order.state = OrderState::Active(ActiveOrderState::Dormant(Dormant::new(
                    dormant.venue_order_id,
                    dormant.ts_accepted,
                    dormant.trigger_price,
                    new_quantity,
                )));
                self.orders.insert(cid.clone(), order);
            }
            _ => {}
        }
    }

    /// Cancel a resting or dormant order. A no-op (returning `AlreadyTerminal`) if it has
    /// already reached a terminal state.
    fn apply_cancel_now(&mut self, cid: &ClientOrderId, now: DateTime<Utc>) -> Result<ExecutionOutcome, ExecutionError> {
        let order = self.orders.get(cid).ok_or_else(|| ExecutionError::UnknownOrder(cid.clone()))?.clone();
        if !order.is_active() {
            return Err(ExecutionError::AlreadyTerminal(cid.clone()));
        }
        let venue_order_id = order.state.venue_order_id().ok_or_else(|| ExecutionError::UnknownOrder(cid.clone()))?;

        if let Some(book) = self.books.get_mut(&order.instrument) {
            book.remove(order.side, order.price, cid);
        }

        let remaining = match &order.state {
            OrderState::Active(ActiveOrderState::Accepted(accepted)) => accepted.quantity_remaining(),
            OrderState::Active(ActiveOrderState::Dormant(dormant)) => dormant.quantity,
            _ => order.quantity,
        };
        self.release_reservation(order.side, order.price, remaining);

        let mut order = order;
        order.state = OrderState::Inactive(InactiveOrderState::Canceled(Canceled::new(venue_order_id, now)));
        self.orders.insert(cid.clone(), order.clone());

        let mut outcome = ExecutionOutcome::new(order, Vec::new());
        self.resolve_contingencies(&mut outcome, now);
        Ok(outcome)
    }

    /// Sweep resting orders against an external trade print, generating fills for any that the
    /// print would also have executed against, then re-evaluate triggers against the new price.
    pub fn apply_trade_tick(&mut self, instrument: InstrumentIndex, aggressor_side: Side, price: Decimal, quantity: Decimal, now: DateTime<Utc>) -> Vec<ExecutionOutcome> {
        let Some(book) = self.books.get_mut(&instrument) else {
            return self.evaluate_all_triggers(now);
        };

        let matched = matcher::match_against_tick(book, aggressor_side, price, quantity);

        let mut outcomes: Vec<ExecutionOutcome> = matched
            .into_iter()
            .filter_map(|fill| self.fill_resting_order(&fill.cid, instrument, fill.price, fill.quantity, now))
            .collect();

        outcomes.extend(self.evaluate_all_triggers(now));
        outcomes
    }

    /// The reference price a dormant order's trigger compares against: the book's own mid
    /// where one exists (bid/ask-driven triggers), falling back to `None` if the instrument has
    /// never traded or quoted.
    fn reference_price(&self, instrument: InstrumentIndex) -> Option<Decimal> {
        let book = self.books.get(&instrument)?;
        match (book.best_bid(), book.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }

    /// Activate every dormant stop/if-touched order whose trigger has fired against the current
    /// reference price, converting it to its [`OrderKind::triggered_kind`] and matching it
    /// against the book.
    fn evaluate_all_triggers(&mut self, now: DateTime<Utc>) -> Vec<ExecutionOutcome> {
        let candidates: Vec<(ClientOrderId, InstrumentIndex)> = self
            .orders
            .values()
            .filter_map(|order| {
                let OrderState::Active(ActiveOrderState::Dormant(dormant)) = &order.state else { return None };
                dormant.trigger_price?;
                Some((order.cid().clone(), order.instrument))
            })
            .collect();

        let mut outcomes = Vec::new();
        for (cid, instrument) in candidates {
            let Some(reference_price) = self.reference_price(instrument) else { continue };
            let Some(order) = self.orders.get(&cid) else { continue };
            let OrderState::Active(ActiveOrderState::Dormant(dormant)) = &order.state else { continue };
            let Some(trigger_price) = dormant.trigger_price else { continue };

            if order.kind.is_triggered(order.side, trigger_price, reference_price) {
                if let Some(outcome) = self.fire_dormant(&cid, now) {
                    outcomes.push(outcome);
                }
            }
        }
        outcomes
    }

    /// Sweep every `Gtd` order whose `expire_time` has passed into [`InactiveOrderState::Expired`].
    fn sweep_expirations(&mut self, now: DateTime<Utc>) -> Vec<ExecutionOutcome> {
        let candidates: Vec<ClientOrderId> = self
            .orders
            .values()
            .filter(|order| order.is_active() && order.time_in_force == TimeInForce::Gtd)
            .filter(|order| order.expire_time.is_some_and(|expire| expire <= now))
            .map(|order| order.cid().clone())
            .collect();

        candidates.into_iter().filter_map(|cid| self.expire_order(&cid, now)).collect()
    }

    fn expire_order(&mut self, cid: &ClientOrderId, now: DateTime<Utc>) -> Option<ExecutionOutcome> {
        let order = self.orders.get(cid)?.clone();

        let remaining = match &order.state {
            OrderState::Active(ActiveOrderState::Accepted(accepted)) => accepted.quantity_remaining(),
            OrderState::Active(ActiveOrderState::Dormant(dormant)) => dormant.quantity,
            _ => order.quantity,
        };
        if let Some(book) = self.books.get_mut(&order.instrument) {
            book.remove(order.side, order.price, cid);
        }
        self.release_reservation(order.side, order.price, remaining);

        let mut order = order;
        order.state = OrderState::Inactive(InactiveOrderState::Expired);
        self.orders.insert(cid.clone(), order.clone());

        let mut outcome = ExecutionOutcome::new(order, Vec::new());
        self.resolve_contingencies(&mut outcome, now);
        Some(outcome)
    }

    /// Convert a dormant order out of [`ActiveOrderState::Dormant`] into its live counterpart
    /// (an OTO entry's fill releasing a held child, or a stop/if-touched order's trigger
    /// firing) and match it against the book, reusing its existing `venue_order_id`.
    /// Releases an OTO child once its entry fills. A trigger-kind child (e.g. a protective
    /// stop-loss) was only held pending the entry, not armed against its own price trigger -
    /// releasing it arms it instead of sending it straight to the book. Anything else (a plain
    /// resting Limit/Market child) joins the book immediately via [`Self::fire_dormant`].
    fn activate_dormant(&mut self, cid: &ClientOrderId, now: DateTime<Utc>) -> Option<ExecutionOutcome> {
        let order = self.orders.get(cid)?.clone();
        let OrderState::Active(ActiveOrderState::Dormant(dormant)) = &order.state else { return None };

        if order.kind.requires_trigger() {
            let venue_order_id = dormant.venue_order_id;
            let rearmed = Dormant::new(venue_order_id, dormant.ts_accepted, order.trigger_price, dormant.quantity);
            let mut rearmed_order = order.clone();
            rearmed_order.state = OrderState::Active(ActiveOrderState::Dormant(rearmed));
            self.orders.insert(cid.clone(), rearmed_order.clone());
            debug!(cid = %cid, "dormant child released, now armed against its own trigger");
            return Some(ExecutionOutcome::new(rearmed_order, Vec::new()));
        }

        self.fire_dormant(cid, now)
    }

    /// Converts a dormant order whose trigger has actually fired into its live
    /// [`OrderKind::triggered_kind`] counterpart and runs it through the matcher.
    fn fire_dormant(&mut self, cid: &ClientOrderId, now: DateTime<Utc>) -> Option<ExecutionOutcome> {
        let order = self.orders.get(cid)?.clone();
        let OrderState::Active(ActiveOrderState::Dormant(_)) = &order.state else { return None };
        let venue_order_id = order.state.venue_order_id()?;

        let mut match_request = MatchRequest::from(&order);
        match_request.kind = order.kind.triggered_kind();

        let (finalized, trades, counterparty_outcomes) = self.match_and_finalize(match_request, venue_order_id, now);
        self.orders.insert(finalized.cid().clone(), finalized.clone());
        debug!(cid = %finalized.cid(), "dormant order fired");

        let mut outcome = ExecutionOutcome::new(finalized, trades);
        outcome.counterparty_outcomes = counterparty_outcomes;
        self.resolve_contingencies(&mut outcome, now);
        Some(outcome)
    }

    /// Collapse a held OTO child into the same terminal state as its rejected/cancelled entry,
    /// releasing the capital reserved at its submission.
    fn collapse_held_child(&mut self, cid: &ClientOrderId, now: DateTime<Utc>, entry_rejected: bool) -> Option<ExecutionOutcome> {
        let order = self.orders.get(cid)?.clone();
        let (venue_order_id, remaining) = match &order.state {
            OrderState::Active(ActiveOrderState::Dormant(dormant)) => (dormant.venue_order_id, dormant.quantity),
            OrderState::Active(ActiveOrderState::Accepted(accepted)) => (accepted.venue_order_id, accepted.quantity_remaining()),
            _ => return None,
        };

        if let Some(book) = self.books.get_mut(&order.instrument) {
            book.remove(order.side, order.price, cid);
        }
        self.release_reservation(order.side, order.price, remaining);

        let mut order = order;
        order.state = if entry_rejected {
            OrderState::Inactive(InactiveOrderState::Rejected(Rejected::new("cascaded from entry rejection".to_string())))
        } else {
            OrderState::Inactive(InactiveOrderState::Canceled(Canceled::new(venue_order_id, now)))
        };
        self.orders.insert(cid.clone(), order.clone());
        Some(ExecutionOutcome::new(order, Vec::new()))
    }

    fn apply_open_list_now(&mut self, entry: NewOrder, children: Vec<NewOrder>, now: DateTime<Utc>) -> ExecutionOutcome {
        let list_id = entry.list_id.clone().unwrap_or_else(|| OrderListId::new(entry.cid.0.as_str()));
        let mut members = vec![entry.cid.clone()];
        members.extend(children.iter().map(|child| child.cid.clone()));
        self.order_lists.insert(list_id.clone(), OrderList::new(list_id.clone(), ContingencyType::Oto, members));

        let held_orders: Vec<Order<OrderState>> = children
            .into_iter()
            .map(|mut child| {
                child.list_id = Some(list_id.clone());
                self.insert_held_child(child, now).order
            })
            .collect();

        let mut entry = entry;
        entry.list_id = Some(list_id);
        let mut outcome = self.apply_open_now(entry, now);

        let mut released_children = held_orders;
        released_children.append(&mut outcome.released_children);
        outcome.released_children = released_children;
        outcome
    }

    /// Insert an OTO child as held (`Dormant`, not yet in the book) once its own account check
    /// clears - a bracket reserves capital for every leg upfront, matching §3's account
    /// invariant that locked balance covers every *working* order, not only live ones.
    fn insert_held_child(&mut self, child: NewOrder, now: DateTime<Utc>) -> ExecutionOutcome {
        let key = OrderKey::new(child.strategy.clone(), child.cid.clone());

        if let Err(reason) = self.reserve_for_new_order(child.side, child.price, child.quantity) {
            let order = Order::new(
                key,
                child.instrument,
                child.side,
                child.price,
                child.quantity,
                child.kind,
                child.time_in_force,
                child.list_id.clone(),
                child.trigger_price,
                child.expire_time,
                child.post_only,
                child.reduce_only,
                OrderState::Inactive(InactiveOrderState::Rejected(Rejected::new(reason))),
            );
            self.orders.insert(order.cid().clone(), order.clone());
            return ExecutionOutcome::new(order, Vec::new());
        }

        let venue_order_id = self.next_venue_order_id();
        // Held pending the entry's own fill, not yet armed against its price trigger (if any) -
        // `activate_dormant` re-arms a triggered child once the entry releases it.
        let dormant = Dormant::new(venue_order_id, now, None, child.quantity);
        let order = Order::new(
            key,
            child.instrument,
            child.side,
            child.price,
            child.quantity,
            child.kind,
            child.time_in_force,
            child.list_id.clone(),
            child.trigger_price,
            child.expire_time,
            child.post_only,
            child.reduce_only,
            OrderState::Active(ActiveOrderState::Dormant(dormant)),
        );
        self.orders.insert(order.cid().clone(), order.clone());
        ExecutionOutcome::new(order, Vec::new())
    }

    /// After `outcome.order` reaches a terminal state (or is newly dormant), resolve any
    /// OCO/OTO it belongs to: cancel OCO siblings, or cascade an OTO entry's fill/rejection to
    /// its children.
    fn resolve_contingencies(&mut self, outcome: &mut ExecutionOutcome, now: DateTime<Utc>) {
        let Some(list_id) = outcome.order.list_id.clone() else { return };
        let Some(list) = self.order_lists.get(&list_id).cloned() else { return };

        match list.contingency {
            ContingencyType::Oco if !outcome.order.is_active() => {
                for sibling_cid in list.siblings_of(outcome.order.cid()) {
                    if let Ok(sibling_outcome) = self.cancel_order(sibling_cid, now) {
                        outcome.cancelled_siblings.push(sibling_outcome.order.cid().clone());
                    }
                }
            }
            ContingencyType::Oco => {}
            ContingencyType::Oto => {
                let is_entry = list.oto_entry() == Some(outcome.order.cid());

                if is_entry {
                    match &outcome.order.state {
                        OrderState::Inactive(InactiveOrderState::Filled(_)) => {
                            let children: Vec<ClientOrderId> = list.siblings_of(outcome.order.cid()).cloned().collect();
                            for child_cid in children {
                                if let Some(child_outcome) = self.activate_dormant(&child_cid, now) {
                                    outcome.released_children.push(child_outcome.order.clone());
                                    outcome.counterparty_outcomes.push(child_outcome);
                                }
                            }
                        }
                        OrderState::Inactive(InactiveOrderState::Rejected(_)) | OrderState::Inactive(InactiveOrderState::Canceled(_)) => {
                            let entry_rejected = matches!(outcome.order.state, OrderState::Inactive(InactiveOrderState::Rejected(_)));
                            let children: Vec<ClientOrderId> = list.siblings_of(outcome.order.cid()).cloned().collect();
                            for child_cid in children {
                                if let Some(child_outcome) = self.collapse_held_child(&child_cid, now, entry_rejected) {
                                    outcome.cancelled_siblings.push(child_outcome.order.cid().clone());
                                    outcome.released_children.push(child_outcome.order.clone());
                                    outcome.counterparty_outcomes.push(child_outcome);
                                }
                            }
                        }
                        _ => {}
                    }
                } else if !outcome.order.is_active() {
                    // A released child reached a terminal state: its siblings (excluding the
                    // entry, which is never cancelled by a child) are OCO with each other.
                    if let Some(entry_cid) = list.oto_entry().cloned() {
                        let siblings: Vec<ClientOrderId> = list
                            .siblings_of(outcome.order.cid())
                            .filter(|cid| **cid != entry_cid)
                            .cloned()
                            .collect();
                        for sibling_cid in siblings {
                            if let Ok(sibling_outcome) = self.cancel_order(&sibling_cid, now) {
                                outcome.cancelled_siblings.push(sibling_outcome.order.cid().clone());
                            }
                        }
                    }
                }
            }
            ContingencyType::Ouo => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AssetBalance, Balance, Margin};
    use crate::simulated::commission::{FixedRateCommission, ZeroCommission};
    use crate::simulated::fill_model::FullFillModel;
    use crate::simulated::latency::FixedLatency;
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;

    fn exchange_with_balance(free: Decimal) -> SimulatedExchange {
        let account = Account::new(
            AccountType::Cash,
            vec![AssetBalance::new(SmolStr::new("quote"), Balance::new(free, free), Utc::now())],
            Margin::default(),
        );
        SimulatedExchange::new(
            account,
            Box::new(FixedLatency { latency_ns: 0 }),
            Box::new(FullFillModel),
            Box::new(ZeroCommission),
            1,
        )
    }

    fn margin_exchange(leverage: Decimal, available: Decimal) -> SimulatedExchange {
        let account = Account::new(AccountType::Margin, Vec::new(), Margin::new(Decimal::ZERO, available, leverage));
        SimulatedExchange::new(
            account,
            Box::new(FixedLatency { latency_ns: 0 }),
            Box::new(FullFillModel),
            Box::new(ZeroCommission),
            1,
        )
    }

    fn new_order(side: Side, price: Decimal, quantity: Decimal, kind: OrderKind, tif: TimeInForce) -> NewOrder {
        NewOrder {
            strategy: StrategyId::new("s1"),
            cid: ClientOrderId::random(),
            instrument: InstrumentIndex(0),
            side,
            price,
            quantity,
            kind,
            time_in_force: tif,
            list_id: None,
            trigger_price: None,
            expire_time: None,
            post_only: false,
            reduce_only: false,
        }
    }

    #[test]
    fn test_cash_account_rejects_buy_without_sufficient_balance() {
        let mut exchange = exchange_with_balance(dec!(10));
        let outcome = exchange.open_order(
            new_order(Side::Buy, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        assert!(matches!(
            outcome.order.state,
            OrderState::Inactive(InactiveOrderState::Rejected(_))
        ));
    }

    #[test]
    fn test_limit_order_rests_when_no_crossing_liquidity() {
        let mut exchange = exchange_with_balance(dec!(10_000));
        let outcome = exchange.open_order(
            new_order(Side::Buy, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        assert!(matches!(
            outcome.order.state,
            OrderState::Active(ActiveOrderState::Accepted(_))
        ));
        assert!(outcome.trades.is_empty());
    }

    #[test]
    fn test_ioc_order_with_no_liquidity_cancels_instead_of_resting() {
        let mut exchange = exchange_with_balance(dec!(10_000));
        let outcome = exchange.open_order(
            new_order(Side::Buy, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Ioc),
            Utc::now(),
        );

        assert!(matches!(
            outcome.order.state,
            OrderState::Inactive(InactiveOrderState::Canceled(_))
        ));
    }

    #[test]
    fn test_crossing_limit_order_fills_against_resting_liquidity() {
        let mut exchange = exchange_with_balance(dec!(10_000));

        exchange.open_order(
            new_order(Side::Sell, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        let outcome = exchange.open_order(
            new_order(Side::Buy, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        assert_eq!(outcome.trades.len(), 1);
        assert!(matches!(
            outcome.order.state,
            OrderState::Inactive(InactiveOrderState::Filled(_))
        ));
    }

    #[test]
    fn test_oco_fill_cancels_sibling() {
        let mut exchange = exchange_with_balance(dec!(10_000));

        let tp = new_order(Side::Sell, dec!(110), dec!(1), OrderKind::Limit, TimeInForce::Gtc);
        let sl = new_order(Side::Sell, dec!(90), dec!(1), OrderKind::Limit, TimeInForce::Gtc);
        let list_id = OrderListId::new("bracket-1");

        let mut tp_request = tp.clone();
        tp_request.list_id = Some(list_id.clone());
        let mut sl_request = sl.clone();
        sl_request.list_id = Some(list_id.clone());

        exchange.order_lists.insert(
            list_id.clone(),
            OrderList::new(list_id, ContingencyType::Oco, vec![tp_request.cid.clone(), sl_request.cid.clone()]),
        );

        exchange.open_order(tp_request.clone(), Utc::now());
        exchange.open_order(sl_request.clone(), Utc::now());

        // A buy sweeping the take-profit ask should cancel the resting stop-loss sibling.
        let outcome = exchange.open_order(
            new_order(Side::Buy, dec!(110), dec!(1), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        assert_eq!(outcome.trades.len(), 1);
        let tp_outcome = exchange.orders.get(&tp_request.cid).unwrap();
        assert!(matches!(tp_outcome.state, OrderState::Inactive(InactiveOrderState::Filled(_))));

        let sl_outcome = exchange.orders.get(&sl_request.cid).unwrap();
        assert!(matches!(sl_outcome.state, OrderState::Inactive(InactiveOrderState::Canceled(_))));
    }

    #[test]
    fn test_stop_market_order_stays_dormant_until_triggered() {
        let mut exchange = exchange_with_balance(dec!(10_000));
        let mut request = new_order(Side::Sell, dec!(95), dec!(1), OrderKind::StopMarket, TimeInForce::Gtc);
        request.trigger_price = Some(dec!(95));

        let outcome = exchange.open_order(request.clone(), Utc::now());
        assert!(matches!(outcome.order.state, OrderState::Active(ActiveOrderState::Dormant(_))));

        // Seed the book so a reference price exists, then sweep a print through the trigger.
        exchange.open_order(
            new_order(Side::Buy, dec!(94), dec!(5), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );
        let outcomes = exchange.apply_trade_tick(InstrumentIndex(0), Side::Sell, dec!(94), dec!(1), Utc::now());

        let triggered = outcomes.into_iter().find(|o| o.order.cid() == &request.cid).unwrap();
        assert!(matches!(
            triggered.order.state,
            OrderState::Inactive(InactiveOrderState::Filled(_)) | OrderState::Active(ActiveOrderState::Accepted(_))
        ));
    }

    #[test]
    fn test_commission_is_deducted_from_quote_balance_on_fill() {
        let account = Account::new(
            AccountType::Cash,
            vec![AssetBalance::new(SmolStr::new("quote"), Balance::new(dec!(10_000), dec!(10_000)), Utc::now())],
            Margin::default(),
        );
        let mut exchange = SimulatedExchange::new(
            account,
            Box::new(FixedLatency { latency_ns: 0 }),
            Box::new(FullFillModel),
            Box::new(FixedRateCommission { rate: dec!(0.01) }),
            1,
        );

        exchange.open_order(
            new_order(Side::Sell, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );
        exchange.open_order(
            new_order(Side::Buy, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        let balance = exchange.account.balance("quote").unwrap();
        // Paid 100 notional plus 1 in commission (1% of 100).
        assert_eq!(balance.total, dec!(10_000) - dec!(101));
    }

    #[test]
    fn test_margin_reserved_on_accept_and_released_on_cancel() {
        let mut exchange = margin_exchange(dec!(10), dec!(1_000));
        let outcome = exchange.open_order(
            new_order(Side::Buy, dec!(100), dec!(10), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );
        assert_eq!(exchange.account.margin.used, dec!(100));

        exchange.cancel_order(outcome.order.cid(), Utc::now()).unwrap();
        assert_eq!(exchange.account.margin.used, dec!(0));
    }

    #[test]
    fn test_post_only_order_crossing_book_is_rejected() {
        let mut exchange = exchange_with_balance(dec!(10_000));
        exchange.open_order(
            new_order(Side::Sell, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        let mut crossing = new_order(Side::Buy, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc);
        crossing.post_only = true;

        let outcome = exchange.open_order(crossing, Utc::now());
        assert!(matches!(outcome.order.state, OrderState::Inactive(InactiveOrderState::Rejected(_))));
    }

    #[test]
    fn test_gtd_order_expires_after_expire_time() {
        let mut exchange = exchange_with_balance(dec!(10_000));
        let now = Utc::now();
        let mut request = new_order(Side::Buy, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtd);
        request.expire_time = Some(now + ChronoDuration::seconds(1));

        let outcome = exchange.open_order(request.clone(), now);
        assert!(matches!(outcome.order.state, OrderState::Active(ActiveOrderState::Accepted(_))));

        let outcomes = exchange.process(now + ChronoDuration::seconds(2));
        let expired = outcomes.into_iter().find(|o| o.order.cid() == &request.cid).unwrap();
        assert!(matches!(expired.order.state, OrderState::Inactive(InactiveOrderState::Expired)));
    }

    #[test]
    fn test_latency_defers_application_until_process_reaches_effective_time() {
        let account = Account::new(
            AccountType::Cash,
            vec![AssetBalance::new(SmolStr::new("quote"), Balance::new(dec!(10_000), dec!(10_000)), Utc::now())],
            Margin::default(),
        );
        let mut exchange = SimulatedExchange::new(
            account,
            Box::new(FixedLatency { latency_ns: 1_000_000_000 }),
            Box::new(FullFillModel),
            Box::new(ZeroCommission),
            1,
        );

        let now = Utc::now();
        let request = new_order(Side::Buy, dec!(100), dec!(1), OrderKind::Limit, TimeInForce::Gtc);
        let outcome = exchange.open_order(request.clone(), now);
        assert!(matches!(outcome.order.state, OrderState::Active(ActiveOrderState::Submitted)));

        let outcomes = exchange.process(now + ChronoDuration::seconds(1));
        let resolved = outcomes.into_iter().find(|o| o.order.cid() == &request.cid).unwrap();
        assert!(matches!(resolved.order.state, OrderState::Active(ActiveOrderState::Accepted(_))));
    }

    #[test]
    fn test_bracket_market_entry_fills_and_releases_children_upfront_submitted() {
        let mut exchange = exchange_with_balance(dec!(100_000));
        exchange.open_order(
            new_order(Side::Sell, dec!(3090.5), dec!(10), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        let entry = new_order(Side::Buy, dec!(3090.5), dec!(10), OrderKind::Market, TimeInForce::Gtc);
        let sl = new_order(Side::Sell, dec!(3050), dec!(10), OrderKind::Limit, TimeInForce::Gtc);
        let tp = new_order(Side::Sell, dec!(3150), dec!(10), OrderKind::Limit, TimeInForce::Gtc);

        let outcome = exchange.open_order_list(entry.clone(), vec![sl.clone(), tp.clone()], Utc::now());

        assert!(matches!(outcome.order.state, OrderState::Inactive(InactiveOrderState::Filled(_))));
        let sl_state = &exchange.orders.get(&sl.cid).unwrap().state;
        let tp_state = &exchange.orders.get(&tp.cid).unwrap().state;
        assert!(matches!(sl_state, OrderState::Active(ActiveOrderState::Accepted(_))));
        assert!(matches!(tp_state, OrderState::Active(ActiveOrderState::Accepted(_))));
    }

    #[test]
    fn test_post_only_bracket_entry_rejection_cascades_to_children() {
        let mut exchange = exchange_with_balance(dec!(100_000));
        exchange.open_order(
            new_order(Side::Sell, dec!(3090.5), dec!(10), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        let mut entry = new_order(Side::Sell, dec!(3050), dec!(10), OrderKind::Limit, TimeInForce::Gtc);
        entry.post_only = true; // resting sell at 3050 would cross the 3090.5 ask? no - but below tests a crossing bid instead
        exchange.open_order(
            new_order(Side::Buy, dec!(3060), dec!(10), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );
        // Now a post-only sell at 3050 would cross the 3060 bid.
        let sl = new_order(Side::Buy, dec!(2900), dec!(10), OrderKind::Limit, TimeInForce::Gtc);
        let tp = new_order(Side::Buy, dec!(3200), dec!(10), OrderKind::Limit, TimeInForce::Gtc);

        let outcome = exchange.open_order_list(entry, vec![sl.clone(), tp.clone()], Utc::now());

        assert!(matches!(outcome.order.state, OrderState::Inactive(InactiveOrderState::Rejected(_))));
        assert!(matches!(
            exchange.orders.get(&sl.cid).unwrap().state,
            OrderState::Inactive(InactiveOrderState::Rejected(_))
        ));
        assert!(matches!(
            exchange.orders.get(&tp.cid).unwrap().state,
            OrderState::Inactive(InactiveOrderState::Rejected(_))
        ));
    }

    #[test]
    fn test_reduce_order_shrinks_oco_siblings() {
        let mut exchange = exchange_with_balance(dec!(100_000));
        exchange.open_order(
            new_order(Side::Sell, dec!(3090.5), dec!(10), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );

        let entry = new_order(Side::Buy, dec!(3090.5), dec!(10), OrderKind::Market, TimeInForce::Gtc);
        let sl = new_order(Side::Sell, dec!(3050), dec!(10), OrderKind::Limit, TimeInForce::Gtc);
        let tp = new_order(Side::Sell, dec!(3150), dec!(10), OrderKind::Limit, TimeInForce::Gtc);
        exchange.open_order_list(entry, vec![sl.clone(), tp.clone()], Utc::now());

        // An unrelated reduce SELL order fills against fresh resting liquidity, reducing the
        // long position by 5.
        exchange.open_order(
            new_order(Side::Buy, dec!(3000), dec!(5), OrderKind::Limit, TimeInForce::Gtc),
            Utc::now(),
        );
        let mut reduce = new_order(Side::Sell, dec!(3000), dec!(5), OrderKind::Limit, TimeInForce::Gtc);
        reduce.reduce_only = true;
        exchange.open_order(reduce, Utc::now());

        assert_eq!(exchange.orders.get(&sl.cid).unwrap().quantity, dec!(5));
        assert_eq!(exchange.orders.get(&tp.cid).unwrap().quantity, dec!(5));
    }
}
