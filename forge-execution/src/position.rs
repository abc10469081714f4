use crate::trade::{Trade, TradeId};
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use forge_instrument::{InstrumentIndex, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Whether an account nets all fills for an instrument into a single [`Position`] per side
/// (`Netting`), or tracks each opening trade as an independent position (`Hedging`).
///
/// The kernel implements `Netting` accounting; `Hedging` is recorded here for completeness of
/// the account model but [`PositionManager`] always nets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Default)]
pub enum PositionMode {
    #[default]
    Netting,
    Hedging,
}

/// Owns the single open [`Position`] (if any) for one instrument, updating it trade-by-trade.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PositionManager {
    pub current: Option<Position>,
}

impl PositionManager {
    /// Apply `trade` to the current position, returning the [`PositionExited`] record if the
    /// update closed it exactly.
    pub fn update_from_trade(&mut self, trade: &Trade) -> Option<PositionExited> {
        let (current, closed) = match self.current.take() {
            Some(position) => position.update_from_trade(trade),
            None => (Some(Position::from(trade)), None),
        };
        self.current = current;
        closed
    }
}

/// An open position in a single instrument, updated trade-by-trade by [`PositionManager`].
#[derive(Debug, Clone, PartialEq, Constructor, Deserialize, Serialize)]
pub struct Position {
    pub instrument: InstrumentIndex,
    /// `Buy` => long, `Sell` => short.
    pub side: Side,
    pub price_entry_average: Decimal,
    pub quantity_abs: Decimal,
    pub quantity_abs_max: Decimal,
    /// Estimated PnL from closing `quantity_abs` at the last observed price, net of estimated
    /// exit fees.
    pub pnl_unrealised: Decimal,
    /// Cumulative realised PnL (net of fees) from every partial or full close so far.
    pub pnl_realised: Decimal,
    pub fees_enter: Decimal,
    pub fees_exit: Decimal,
    pub time_enter: DateTime<Utc>,
    pub time_exchange_update: DateTime<Utc>,
    pub trades: Vec<TradeId>,
}

impl Position {
    /// Apply `trade` to this position: increase, reduce, close exactly, or close-and-flip.
    pub fn update_from_trade(mut self, trade: &Trade) -> (Option<Self>, Option<PositionExited>) {
        if self.instrument != trade.instrument {
            error!(
                position_instrument = ?self.instrument,
                trade_instrument = ?trade.instrument,
                "position updated from a trade for a different instrument - ignoring"
            );
            return (Some(self), None);
        }

        self.trades.push(trade.id.clone());

        use Side::*;
        match (self.side, trade.side) {
            (Buy, Buy) | (Sell, Sell) => {
                self.price_entry_average = calculate_price_entry_average(
                    self.price_entry_average,
                    self.quantity_abs,
                    trade.price,
                    trade.quantity.abs(),
                );
                self.quantity_abs += trade.quantity.abs();
                self.quantity_abs_max = self.quantity_abs_max.max(self.quantity_abs);
                self.pnl_realised -= trade.fee;
                self.fees_enter += trade.fee;
                self.time_exchange_update = trade.time_exchange;
                self.update_pnl_unrealised(trade.price);
                (Some(self), None)
            }
            (Buy, Sell) | (Sell, Buy) if self.quantity_abs > trade.quantity.abs() => {
                self.pnl_realised +=
                    calculate_pnl_realised(self.side, self.price_entry_average, trade.quantity, trade.price, trade.fee);
                self.quantity_abs -= trade.quantity.abs();
                self.fees_exit += trade.fee;
                self.time_exchange_update = trade.time_exchange;
                self.update_pnl_unrealised(trade.price);
                (Some(self), None)
            }
            (Buy, Sell) | (Sell, Buy) if self.quantity_abs == trade.quantity.abs() => {
                self.quantity_abs = Decimal::ZERO;
                self.fees_exit += trade.fee;
                self.time_exchange_update = trade.time_exchange;
                self.pnl_realised +=
                    calculate_pnl_realised(self.side, self.price_entry_average, trade.quantity, trade.price, trade.fee);
                self.update_pnl_unrealised(trade.price);
                (None, Some(PositionExited::from(self)))
            }
            (Buy, Sell) | (Sell, Buy) => {
                let next_quantity = trade.quantity.abs() - self.quantity_abs;
                let next_fee_enter = trade.fee * (next_quantity / trade.quantity.abs());
                let next_trade = Trade {
                    id: trade.id.clone(),
                    venue_order_id: trade.venue_order_id,
                    instrument: trade.instrument,
                    strategy: trade.strategy.clone(),
                    time_exchange: trade.time_exchange,
                    side: trade.side,
                    price: trade.price,
                    quantity: next_quantity,
                    fee: next_fee_enter,
                };

                let fee_exit = trade.fee * (self.quantity_abs / trade.quantity.abs());
                self.fees_exit += fee_exit;
                self.time_exchange_update = trade.time_exchange;
                self.pnl_realised +=
                    calculate_pnl_realised(self.side, self.price_entry_average, self.quantity_abs, trade.price, fee_exit);
                self.quantity_abs = Decimal::ZERO;
                self.update_pnl_unrealised(trade.price);

                (Some(Position::from(&next_trade)), Some(PositionExited::from(self)))
            }
        }
    }

    /// Mark to `price`, updating [`Self::pnl_unrealised`]. Called on every quote/trade tick for
    /// instruments with an open position, independent of any trade occurring.
    pub fn update_pnl_unrealised(&mut self, price: Decimal) {
        let approx_exit_fees = if self.quantity_abs_max.is_zero() {
            Decimal::ZERO
        } else {
            (self.quantity_abs / self.quantity_abs_max) * self.fees_enter
        };

        let value_current = self.quantity_abs * price;
        let value_entry = self.quantity_abs * self.price_entry_average;

        self.pnl_unrealised = match self.side {
            Side::Buy => value_current - value_entry - approx_exit_fees,
            Side::Sell => value_entry - value_current - approx_exit_fees,
        };
    }

    pub fn is_flat(&self) -> bool {
        self.quantity_abs.is_zero()
    }
}

impl From<&Trade> for Position {
    fn from(trade: &Trade) -> Self {
        Self {
            instrument: trade.instrument,
            side: trade.side,
            price_entry_average: trade.price,
            quantity_abs: trade.quantity.abs(),
            quantity_abs_max: trade.quantity.abs(),
            pnl_unrealised: Decimal::ZERO,
            pnl_realised: -trade.fee,
            fees_enter: trade.fee,
            fees_exit: Decimal::ZERO,
            time_enter: trade.time_exchange,
            time_exchange_update: trade.time_exchange,
            trades: vec![trade.id.clone()],
        }
    }
}

fn calculate_price_entry_average(
    current_price_entry_average: Decimal,
    current_quantity_abs: Decimal,
    trade_price: Decimal,
    trade_quantity_abs: Decimal,
) -> Decimal {
    if current_quantity_abs.is_zero() && trade_quantity_abs.is_zero() {
        return Decimal::ZERO;
    }

    let current_value = current_price_entry_average * current_quantity_abs;
    let trade_value = trade_price * trade_quantity_abs;

    (current_value + trade_value) / (current_quantity_abs + trade_quantity_abs)
}

fn calculate_pnl_realised(
    position_side: Side,
    price_entry_average: Decimal,
    closed_quantity: Decimal,
    closed_price: Decimal,
    closed_fee: Decimal,
) -> Decimal {
    let closed_quantity = closed_quantity.abs();
    let value_closed = closed_quantity * closed_price;
    let value_entry = closed_quantity * price_entry_average;

    match position_side {
        Side::Buy => value_closed - value_entry - closed_fee,
        Side::Sell => value_entry - value_closed - closed_fee,
    }
}

/// A fully closed position: the terminal record of a [`Position`] once `quantity_abs` reaches
/// zero, retained by the [`crate::cache::Cache`] for PnL history and reconciliation.
#[derive(Debug, Clone, PartialEq, Constructor, Deserialize, Serialize)]
pub struct PositionExited {
    pub instrument: InstrumentIndex,
    pub side: Side,
    pub price_entry_average: Decimal,
    pub quantity_abs_max: Decimal,
    pub pnl_realised: Decimal,
    pub fees_enter: Decimal,
    pub fees_exit: Decimal,
    pub time_enter: DateTime<Utc>,
    pub time_exit: DateTime<Utc>,
    pub trades: Vec<TradeId>,
}

impl From<Position> for PositionExited {
    fn from(position: Position) -> Self {
        Self {
            instrument: position.instrument,
            side: position.side,
            price_entry_average: position.price_entry_average,
            quantity_abs_max: position.quantity_abs_max,
            pnl_realised: position.pnl_realised,
            fees_enter: position.fees_enter,
            fees_exit: position.fees_exit,
            time_enter: position.time_enter,
            time_exit: position.time_exchange_update,
            trades: position.trades,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::id::{StrategyId, VenueOrderId};
    use rust_decimal_macros::dec;

    fn trade(side: Side, price: Decimal, quantity: Decimal, fee: Decimal, id: &str) -> Trade {
        Trade {
            id: TradeId::new(id),
            venue_order_id: VenueOrderId(1),
            instrument: InstrumentIndex(0),
            strategy: StrategyId::new("s1"),
            time_exchange: Utc::now(),
            side,
            price,
            quantity,
            fee,
        }
    }

    #[test]
    fn test_partially_reduce_long_position() {
        let position = Position::from(&trade(Side::Buy, dec!(50_000), dec!(0.1), dec!(5), "t1"));
        assert_eq!(position.side, Side::Buy);
        assert_eq!(position.quantity_abs, dec!(0.1));

        let (updated, closed) =
            position.update_from_trade(&trade(Side::Sell, dec!(60_000), dec!(0.05), dec!(2.5), "t2"));

        let updated = updated.unwrap();
        assert_eq!(updated.quantity_abs, dec!(0.05));
        assert_eq!(updated.quantity_abs_max, dec!(0.1));
        assert_eq!(updated.pnl_realised, dec!(492.5));
        assert!(closed.is_none());
    }

    #[test]
    fn test_flip_short_to_long() {
        let position = Position::from(&trade(Side::Sell, dec!(50_000), dec!(0.1), dec!(5), "t1"));
        assert_eq!(position.side, Side::Sell);

        let (new_position, closed) =
            position.update_from_trade(&trade(Side::Buy, dec!(40_000), dec!(0.2), dec!(10), "t2"));

        let closed = closed.unwrap();
        assert_eq!(closed.side, Side::Sell);
        assert_eq!(closed.quantity_abs_max, dec!(0.1));
        assert_eq!(closed.pnl_realised, dec!(990));

        let new_position = new_position.unwrap();
        assert_eq!(new_position.side, Side::Buy);
        assert_eq!(new_position.quantity_abs, dec!(0.1));
        assert_eq!(new_position.price_entry_average, dec!(40_000));
        assert_eq!(new_position.pnl_realised, dec!(-5));
    }

    #[test]
    fn test_close_position_exactly() {
        let position = Position::from(&trade(Side::Buy, dec!(100), dec!(1), dec!(1), "t1"));
        let (remaining, closed) = position.update_from_trade(&trade(Side::Sell, dec!(110), dec!(1), dec!(1), "t2"));

        assert!(remaining.is_none());
        let closed = closed.unwrap();
        assert_eq!(closed.pnl_realised, dec!(8));
    }
}
