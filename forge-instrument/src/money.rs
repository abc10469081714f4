use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::ops::{Add, Sub};

/// ISO-ish currency / asset code (eg/ `"USD"`, `"ETH"`).
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, Display,
)]
pub struct Currency(pub SmolStr);

impl<T> From<T> for Currency
where
    T: Into<SmolStr>,
{
    fn from(value: T) -> Self {
        Self(value.into())
    }
}

/// An exact decimal amount of a [`Currency`].
///
/// All arithmetic is exact (`rust_decimal`); no floating point is used anywhere balances,
/// margin or PnL are computed, per §3.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, Display)]
#[display("{amount} {currency}")]
pub struct Money {
    pub amount: Decimal,
    pub currency: SmolStr,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<SmolStr>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<SmolStr>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.currency, rhs.currency, "Money currency mismatch");
        Money::new(self.amount + rhs.amount, self.currency)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.currency, rhs.currency, "Money currency mismatch");
        Money::new(self.amount - rhs.amount, self.currency)
    }
}
