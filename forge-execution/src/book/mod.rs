use crate::order::id::ClientOrderId;
use forge_instrument::Side;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};

/// Price-time-priority matching, see [`matcher`].
pub mod matcher;

/// A single resting order queued at a price level, ordered by arrival (`sequence`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookEntry {
    pub cid: ClientOrderId,
    pub quantity: Decimal,
    pub sequence: u64,
}

/// The simulated venue's limit order book for one instrument: resting bids and asks, each
/// side ordered by price (best first) then by arrival within a price level.
///
/// Bids are keyed by `Decimal` descending (highest first, `BTreeMap` default ascending order
/// is reversed via [`Self::best_bid`] rather than a custom `Ord`, keeping the key type plain
/// `Decimal` so it composes with [`forge_instrument::Price`] rounding).
#[derive(Debug, Default)]
pub struct OrderBook {
    pub bids: BTreeMap<Decimal, VecDeque<BookEntry>>,
    pub asks: BTreeMap<Decimal, VecDeque<BookEntry>>,
    next_sequence: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, VecDeque<BookEntry>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn side(&self, side: Side) -> &BTreeMap<Decimal, VecDeque<BookEntry>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Add a resting order at `price`, appended to the back of its level's queue (time
    /// priority: earlier orders at the same price fill first).
    pub fn add(&mut self, side: Side, price: Decimal, cid: ClientOrderId, quantity: Decimal) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.side_mut(side)
            .entry(price)
            .or_default()
            .push_back(BookEntry { cid, quantity, sequence });
    }

    /// Remove `cid` from `price`'s queue on `side`, dropping the level if it empties.
    pub fn remove(&mut self, side: Side, price: Decimal, cid: &ClientOrderId) -> Option<BookEntry> {
        let levels = self.side_mut(side);
        let Some(queue) = levels.get_mut(&price) else {
            return None;
        };

        let position = queue.iter().position(|entry| &entry.cid == cid)?;
        let removed = queue.remove(position);

        if queue.is_empty() {
            levels.remove(&price);
        }

        removed
    }

    /// Reduce the resting quantity of `cid` at `price` by `filled`, removing the entry (and
    /// the level, if now empty) if that exhausts it.
    pub fn reduce(&mut self, side: Side, price: Decimal, cid: &ClientOrderId, filled: Decimal) {
        let levels = self.side_mut(side);
        let Some(queue) = levels.get_mut(&price) else {
            return;
        };

        if let Some(entry) = queue.iter_mut().find(|entry| &entry.cid == cid) {
            entry.quantity -= filled;
            if entry.quantity <= Decimal::ZERO {
                queue.retain(|entry| &entry.cid != cid);
            }
        }

        if queue.is_empty() {
            levels.remove(&price);
        }
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.keys().next().copied()
    }

    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    /// Bid levels best-first (highest price first), each with its total resting quantity.
    pub fn bid_levels(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.bids
            .iter()
            .rev()
            .map(|(price, queue)| (*price, queue.iter().map(|entry| entry.quantity).sum()))
    }

    /// Ask levels best-first (lowest price first), each with its total resting quantity.
    pub fn ask_levels(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.asks
            .iter()
            .map(|(price, queue)| (*price, queue.iter().map(|entry| entry.quantity).sum()))
    }

    /// Resting entries at `price` on `side`, time priority order.
    pub fn entries_at(&self, side: Side, price: Decimal) -> impl Iterator<Item = &BookEntry> {
        self.side(side)
            .get(&price)
            .into_iter()
            .flat_map(|queue| queue.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cid(s: &str) -> ClientOrderId {
        ClientOrderId::new(s)
    }

    #[test]
    fn test_best_bid_and_ask() {
        let mut book = OrderBook::new();
        book.add(Side::Buy, dec!(99), cid("b1"), dec!(1));
        book.add(Side::Buy, dec!(100), cid("b2"), dec!(1));
        book.add(Side::Sell, dec!(101), cid("a1"), dec!(1));
        book.add(Side::Sell, dec!(102), cid("a2"), dec!(1));

        assert_eq!(book.best_bid(), Some(dec!(100)));
        assert_eq!(book.best_ask(), Some(dec!(101)));
        assert_eq!(book.spread(), Some(dec!(1)));
    }

    #[test]
    fn test_time_priority_within_level() {
        let mut book = OrderBook::new();
        book.add(Side::Buy, dec!(100), cid("first"), dec!(1));
        book.add(Side::Buy, dec!(100), cid("second"), dec!(1));

        let entries: Vec<&ClientOrderId> = book.entries_at(Side::Buy, dec!(100)).map(|e| &e.cid).collect();
        assert_eq!(entries, vec![&cid("first"), &cid("second")]);
    }

    #[test]
    fn test_reduce_removes_exhausted_entry_and_level() {
        let mut book = OrderBook::new();
        book.add(Side::Sell, dec!(100), cid("a1"), dec!(1));
        book.reduce(Side::Sell, dec!(100), &cid("a1"), dec!(1));

        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_remove_drops_empty_level() {
        let mut book = OrderBook::new();
        book.add(Side::Buy, dec!(100), cid("b1"), dec!(1));
        let removed = book.remove(Side::Buy, dec!(100), &cid("b1"));

        assert!(removed.is_some());
        assert_eq!(book.best_bid(), None);
    }
}
