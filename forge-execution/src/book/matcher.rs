use crate::book::OrderBook;
use crate::order::id::ClientOrderId;
use forge_instrument::Side;
use rust_decimal::Decimal;

/// One resting order consumed by a sweep, in the order fills were generated (price-time
/// priority: best price first, then earliest arrival within a price level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub cid: ClientOrderId,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Consume resting liquidity on `resting_side` of `book`, best price first and FIFO within a
/// level, up to `available_quantity`, stopping early once a level's price no longer satisfies
/// `limit_price` (`None` means marketable against any price, i.e. an incoming market order or
/// a venue print sweeping the full book).
///
/// This is the sole matching primitive: both a new marketable order crossing the book and a
/// trade print crossing resting limit orders reduce to the same sweep, per §4.4's tie-break
/// rule that two orders at an identical price always fill in arrival order.
fn sweep(book: &mut OrderBook, resting_side: Side, limit_price: Option<Decimal>, available_quantity: Decimal) -> Vec<Fill> {
    let mut fills = Vec::new();
    let mut remaining = available_quantity;

    loop {
        if remaining <= Decimal::ZERO {
            break;
        }

        let best_price = match resting_side {
            Side::Buy => book.best_bid(),
            Side::Sell => book.best_ask(),
        };

        let Some(price) = best_price else { break };

        let crosses = match (resting_side, limit_price) {
            (_, None) => true,
            // An incoming buy crosses a resting ask priced at or below its limit.
            (Side::Sell, Some(limit)) => price <= limit,
            // An incoming sell crosses a resting bid priced at or above its limit.
            (Side::Buy, Some(limit)) => price >= limit,
        };

        if !crosses {
            break;
        }

        let cids_at_level: Vec<ClientOrderId> = book.entries_at(resting_side, price).map(|e| e.cid.clone()).collect();

        for cid in cids_at_level {
            if remaining <= Decimal::ZERO {
                break;
            }

            let resting_quantity = book
                .entries_at(resting_side, price)
                .find(|e| e.cid == cid)
                .map(|e| e.quantity)
                .unwrap_or(Decimal::ZERO);

            let filled = resting_quantity.min(remaining);
            if filled <= Decimal::ZERO {
                continue;
            }

            book.reduce(resting_side, price, &cid, filled);
            remaining -= filled;

            fills.push(Fill { cid, price, quantity: filled });
        }
    }

    fills
}

/// Sweep the book against an incoming order of `incoming_side` and `quantity`. `limit_price`
/// is `None` for a market order (marketable against any resting price).
pub fn match_incoming(book: &mut OrderBook, incoming_side: Side, limit_price: Option<Decimal>, quantity: Decimal) -> Vec<Fill> {
    sweep(book, incoming_side.opposite(), limit_price, quantity)
}

/// Sweep the book against an external print: a trade at `price` for `quantity` executed on the
/// real venue, used to infer which of the book's own resting orders the simulated exchange
/// would also have filled.
pub fn match_against_tick(book: &mut OrderBook, aggressor_side: Side, price: Decimal, quantity: Decimal) -> Vec<Fill> {
    sweep(book, aggressor_side.opposite(), Some(price), quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cid(s: &str) -> ClientOrderId {
        ClientOrderId::new(s)
    }

    #[test]
    fn test_market_buy_sweeps_multiple_ask_levels() {
        let mut book = OrderBook::new();
        book.add(Side::Sell, dec!(100), cid("a1"), dec!(1));
        book.add(Side::Sell, dec!(101), cid("a2"), dec!(2));

        let fills = match_incoming(&mut book, Side::Buy, None, dec!(2.5));

        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0], Fill { cid: cid("a1"), price: dec!(100), quantity: dec!(1) });
        assert_eq!(fills[1], Fill { cid: cid("a2"), price: dec!(101), quantity: dec!(1.5) });
        assert_eq!(book.best_ask(), Some(dec!(101)));
    }

    #[test]
    fn test_limit_order_does_not_cross_worse_price() {
        let mut book = OrderBook::new();
        book.add(Side::Sell, dec!(105), cid("a1"), dec!(1));

        let fills = match_incoming(&mut book, Side::Buy, Some(dec!(100)), dec!(1));

        assert!(fills.is_empty());
    }

    #[test]
    fn test_fifo_tie_break_within_level() {
        let mut book = OrderBook::new();
        book.add(Side::Sell, dec!(100), cid("first"), dec!(1));
        book.add(Side::Sell, dec!(100), cid("second"), dec!(1));

        let fills = match_incoming(&mut book, Side::Buy, None, dec!(1));

        assert_eq!(fills, vec![Fill { cid: cid("first"), price: dec!(100), quantity: dec!(1) }]);
        assert_eq!(book.entries_at(Side::Sell, dec!(100)).count(), 1);
    }

    #[test]
    fn test_trade_print_sweeps_resting_bids_at_or_above_print() {
        let mut book = OrderBook::new();
        book.add(Side::Buy, dec!(100), cid("b1"), dec!(1));
        book.add(Side::Buy, dec!(99), cid("b2"), dec!(1));

        // A sell print at 100 should only cross the 100 bid, not the 99 one.
        let fills = match_against_tick(&mut book, Side::Sell, dec!(100), dec!(5));

        assert_eq!(fills, vec![Fill { cid: cid("b1"), price: dec!(100), quantity: dec!(1) }]);
        assert_eq!(book.best_bid(), Some(dec!(99)));
    }
}
