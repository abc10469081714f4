use rust_decimal::Decimal;
use std::fmt::Debug;

/// The fee schedule a [`crate::simulated::exchange::SimulatedExchange`] deducts from every
/// fill, per §4.5's "deduct commissions" account update rule.
pub trait CommissionModel: Debug + Send {
    fn commission(&self, price: Decimal, quantity: Decimal) -> Decimal;
}

/// No commission deducted; the default for venues the original backtest left fee-free.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCommission;

impl CommissionModel for ZeroCommission {
    fn commission(&self, _price: Decimal, _quantity: Decimal) -> Decimal {
        Decimal::ZERO
    }
}

/// A flat `rate` applied to notional (`price * quantity`), e.g. `rate = 0.001` for 10bps.
#[derive(Debug, Clone, Copy)]
pub struct FixedRateCommission {
    pub rate: Decimal,
}

impl CommissionModel for FixedRateCommission {
    fn commission(&self, price: Decimal, quantity: Decimal) -> Decimal {
        price * quantity * self.rate
    }
}
