use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// General interface for a single pre-trade risk check, per §4.7.
///
/// Mirrors `jackbot`'s `RiskCheck` trait: a check validates one `Input` and returns its own
/// `Error` on failure, so [`crate::engine::RiskEngine`] can run a heterogeneous battery of
/// checks and fold their failures into one [`crate::violation::RiskViolation`].
pub trait RiskCheck {
    type Input;
    type Error;

    fn name() -> &'static str;
    fn check(&self, input: &Self::Input) -> Result<(), Self::Error>;
}

/// Passes if `input <= limit`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor)]
pub struct CheckHigherThan<T> {
    pub limit: T,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor, Error)]
#[error("{name}: input {input} > limit {limit}")]
pub struct CheckFailHigherThan<T> {
    pub name: &'static str,
    pub limit: T,
    pub input: T,
}

impl<T> RiskCheck for CheckHigherThan<T>
where
    T: Clone + PartialOrd + std::fmt::Display,
{
    type Input = T;
    type Error = CheckFailHigherThan<T>;

    fn name() -> &'static str {
        "CheckHigherThan"
    }

    fn check(&self, input: &Self::Input) -> Result<(), Self::Error> {
        if *input <= self.limit {
            Ok(())
        } else {
            Err(CheckFailHigherThan {
                name: Self::name(),
                limit: self.limit.clone(),
                input: input.clone(),
            })
        }
    }
}

/// Notional sanity check: `quantity * price <= limit`, per §4.7's "max-notional per
/// instrument".
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor)]
pub struct CheckMaxNotional {
    pub limit: Decimal,
}

impl RiskCheck for CheckMaxNotional {
    type Input = (Decimal, Decimal);
    type Error = CheckFailHigherThan<Decimal>;

    fn name() -> &'static str {
        "CheckMaxNotional"
    }

    fn check(&self, (quantity, price): &Self::Input) -> Result<(), Self::Error> {
        CheckHigherThan::new(self.limit).check(&(quantity * price))
    }
}

/// Price sanity check: the order price must be within `max_deviation_pct` of the last
/// observed market price, per §4.7's "price sanity (within configurable bands of last
/// market)".
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor)]
pub struct CheckPriceSanity {
    pub max_deviation_pct: Decimal,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Deserialize, Serialize, Constructor, Error)]
#[error("CheckPriceSanity: order price {order_price} deviates {deviation_pct} from last price {last_price}, exceeding band {max_deviation_pct}")]
pub struct CheckFailPriceSanity {
    pub last_price: Decimal,
    pub order_price: Decimal,
    pub deviation_pct: Decimal,
    pub max_deviation_pct: Decimal,
}

impl RiskCheck for CheckPriceSanity {
    /// `(last_market_price, order_price)`.
    type Input = (Decimal, Decimal);
    type Error = CheckFailPriceSanity;

    fn name() -> &'static str {
        "CheckPriceSanity"
    }

    fn check(&self, &(last_price, order_price): &Self::Input) -> Result<(), Self::Error> {
        if last_price == Decimal::ZERO {
            return Ok(());
        }

        let deviation_pct = (order_price - last_price).abs() / last_price;

        if deviation_pct <= self.max_deviation_pct {
            Ok(())
        } else {
            Err(CheckFailPriceSanity {
                last_price,
                order_price,
                deviation_pct,
                max_deviation_pct: self.max_deviation_pct,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_check_higher_than() {
        struct TestCase {
            limit: Decimal,
            input: Decimal,
            expect_ok: bool,
        }

        let cases = vec![
            TestCase { limit: dec!(10), input: dec!(5), expect_ok: true },
            TestCase { limit: dec!(10), input: dec!(10), expect_ok: true },
            TestCase { limit: dec!(10), input: dec!(11), expect_ok: false },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let check = CheckHigherThan::new(test.limit);
            assert_eq!(check.check(&test.input).is_ok(), test.expect_ok, "TC{index} failed");
        }
    }

    #[test]
    fn test_check_max_notional() {
        let check = CheckMaxNotional::new(dec!(1000));
        assert!(check.check(&(dec!(5), dec!(100))).is_ok());
        assert!(check.check(&(dec!(50), dec!(100))).is_err());
    }

    #[test]
    fn test_check_price_sanity_within_band() {
        let check = CheckPriceSanity::new(dec!(0.05));
        assert!(check.check(&(dec!(100), dec!(103))).is_ok());
        assert!(check.check(&(dec!(100), dec!(110))).is_err());
    }

    #[test]
    fn test_check_price_sanity_skips_when_no_last_price() {
        let check = CheckPriceSanity::new(dec!(0.01));
        assert!(check.check(&(dec!(0), dec!(1_000_000))).is_ok());
    }
}
