use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Determines how the [`crate::simulated::exchange::SimulatedExchange`] evaluates order
/// acceptance against [`Account`] balances and how [`Position`](crate::position::Position)
/// margin is computed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize, Default)]
pub enum AccountType {
    /// No leverage: a `Buy` must be fully funded by free quote `Balance`, a `Sell` on an
    /// instrument with no existing long either requires `allow_cash_positions` or is rejected
    /// outright (§9 Open Question, decided in DESIGN.md).
    #[default]
    Cash,
    /// Orders are accepted against available margin rather than full notional; positions may
    /// be held short without an offsetting cash balance.
    Margin,
    /// Positions are settled as all-or-nothing outcomes rather than continuously marked; not
    /// used by the simulated exchange's own accounting, retained for a venue adapter that maps
    /// prediction-market style settlement onto the same [`Account`] surface.
    Betting,
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Deserialize, Serialize, Constructor)]
pub struct Balance {
    pub total: Decimal,
    pub free: Decimal,
}

impl Balance {
    pub fn used(&self) -> Decimal {
        self.total - self.free
    }

    /// Reserve `amount` of `free` balance against an order in flight, without changing `total`.
    pub fn reserve(&mut self, amount: Decimal) {
        self.free -= amount;
    }

    /// Release a reservation, e.g. on order cancel/reject.
    pub fn release(&mut self, amount: Decimal) {
        self.free += amount;
    }

    /// Settle a fill: `total` moves by `delta` (positive for proceeds, negative for cost plus
    /// fee) and `free` tracks it (the reservation already accounted for any pending cost).
    pub fn settle(&mut self, delta: Decimal) {
        self.total += delta;
        self.free += delta;
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct AssetBalance {
    pub asset: smol_str::SmolStr,
    pub balance: Balance,
    pub time_exchange: DateTime<Utc>,
}

/// Margin requirement and headroom for a leveraged [`AccountType::Margin`] account. Unused
/// under [`AccountType::Cash`], where acceptance is gated on [`Balance::free`] directly.
#[derive(Debug, Copy, Clone, PartialEq, Default, Deserialize, Serialize, Constructor)]
pub struct Margin {
    pub used: Decimal,
    pub available: Decimal,
    pub leverage: Decimal,
}

impl Margin {
    pub fn headroom(&self) -> Decimal {
        self.available - self.used
    }
}

/// The venue account the [`crate::simulated::exchange::SimulatedExchange`] evaluates every
/// order against, and updates on every fill/cancel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Account {
    pub account_type: AccountType,
    pub balances: Vec<AssetBalance>,
    pub margin: Margin,
}

impl Account {
    pub fn balance(&self, asset: &str) -> Option<&Balance> {
        self.balances
            .iter()
            .find(|entry| entry.asset == asset)
            .map(|entry| &entry.balance)
    }

    pub fn balance_mut(&mut self, asset: &str) -> Option<&mut Balance> {
        self.balances
            .iter_mut()
            .find(|entry| entry.asset == asset)
            .map(|entry| &mut entry.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balance_used() {
        let balance = Balance::new(dec!(100), dec!(40));
        assert_eq!(balance.used(), dec!(60));
    }

    #[test]
    fn test_balance_reserve_and_release() {
        let mut balance = Balance::new(dec!(100), dec!(100));
        balance.reserve(dec!(30));
        assert_eq!(balance.free, dec!(70));
        assert_eq!(balance.total, dec!(100));

        balance.release(dec!(30));
        assert_eq!(balance.free, dec!(100));
    }

    #[test]
    fn test_margin_headroom() {
        let margin = Margin::new(dec!(50), dec!(200), dec!(5));
        assert_eq!(margin.headroom(), dec!(150));
    }
}
