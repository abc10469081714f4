use crate::{money::Currency, venue::Venue};
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Symbol of an [`Instrument`] on its [`Venue`] (eg/ `"ETHUSD"`).
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, Display,
)]
pub struct Symbol(pub SmolStr);

impl<T> From<T> for Symbol
where
    T: Into<SmolStr>,
{
    fn from(value: T) -> Self {
        Self(value.into())
    }
}

/// Unique identifier for an [`Instrument`], combining its [`Symbol`] and [`Venue`].
///
/// This is the natural key used by collaborators (venue adapters, data loaders) when they
/// reference an instrument; the [`InstrumentIndex`] is the cheap arena key used internally by
/// the engine once an instrument has been registered in the `Cache`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display)]
#[display("{symbol}.{venue}")]
pub struct InstrumentId {
    pub symbol: Symbol,
    pub venue: Venue,
}

impl InstrumentId {
    pub fn new(symbol: impl Into<Symbol>, venue: impl Into<Venue>) -> Self {
        Self {
            symbol: symbol.into(),
            venue: venue.into(),
        }
    }
}

/// Cheap `Copy` arena index assigned to an [`Instrument`] once registered with the `Cache`.
///
/// See the Design Notes on cyclic references: engines and strategies hold this index rather
/// than an owned [`Instrument`], resolving it against the `Cache` when they need the full spec.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, Display,
)]
#[display("InstrumentIndex({_0})")]
pub struct InstrumentIndex(pub usize);

impl InstrumentIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Comprehensive, immutable (once registered) specification of a tradeable instrument.
///
/// Carries the price/quantity precision and tick/lot increments used to construct valid
/// [`crate::Price`] and [`crate::Quantity`] values, per §3 of the data model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Instrument {
    pub id: InstrumentId,
    pub price_precision: u32,
    pub size_precision: u32,
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    pub min_quantity: Decimal,
    pub max_quantity: Decimal,
    pub quote_currency: Currency,
    pub base_currency: Option<Currency>,
    pub is_inverse: bool,
    pub is_quanto: bool,
}

impl Instrument {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: InstrumentId,
        price_precision: u32,
        size_precision: u32,
        tick_size: Decimal,
        lot_size: Decimal,
        min_quantity: Decimal,
        max_quantity: Decimal,
        quote_currency: Currency,
        base_currency: Option<Currency>,
    ) -> Self {
        Self {
            id,
            price_precision,
            size_precision,
            tick_size,
            lot_size,
            min_quantity,
            max_quantity,
            quote_currency,
            base_currency,
            is_inverse: false,
            is_quanto: false,
        }
    }

    /// Round a raw price to this instrument's tick size, per the instrument's rounding policy.
    pub fn round_price(&self, raw: Decimal) -> Decimal {
        if self.tick_size.is_zero() {
            return raw.round_dp(self.price_precision);
        }
        (raw / self.tick_size).round() * self.tick_size
    }

    /// Round a raw quantity down to this instrument's lot size (never round up a size).
    pub fn round_quantity(&self, raw: Decimal) -> Decimal {
        if self.lot_size.is_zero() {
            return raw.round_dp(self.size_precision);
        }
        (raw / self.lot_size).floor() * self.lot_size
    }

    /// `true` if `quantity` is below the minimum tradeable size - used to resolve residual
    /// quantities via `MIN_QUANTITY` cancellation after a fill (§4.4).
    pub fn below_min_quantity(&self, quantity: Decimal) -> bool {
        quantity > Decimal::ZERO && quantity < self.min_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eth_usd() -> Instrument {
        Instrument::new(
            InstrumentId::new("ETHUSD", "SIM"),
            2,
            3,
            dec!(0.1),
            dec!(0.001),
            dec!(0.001),
            dec!(10000),
            Currency::from("USD"),
            Some(Currency::from("ETH")),
        )
    }

    #[test]
    fn test_round_price_snaps_to_tick_size() {
        struct TestCase {
            raw: Decimal,
            expected: Decimal,
        }

        let cases = vec![
            TestCase {
                raw: dec!(3090.24),
                expected: dec!(3090.2),
            },
            TestCase {
                raw: dec!(3090.27),
                expected: dec!(3090.3),
            },
            TestCase {
                raw: dec!(3090.0),
                expected: dec!(3090.0),
            },
        ];

        let instrument = eth_usd();
        for (index, test) in cases.into_iter().enumerate() {
            let actual = instrument.round_price(test.raw);
            assert_eq!(actual, test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_round_quantity_floors_to_lot_size() {
        let instrument = eth_usd();
        assert_eq!(instrument.round_quantity(dec!(1.0004)), dec!(1.0));
        assert_eq!(instrument.round_quantity(dec!(1.0009)), dec!(1.0));
    }

    #[test]
    fn test_below_min_quantity() {
        let instrument = eth_usd();
        assert!(instrument.below_min_quantity(dec!(0.0005)));
        assert!(!instrument.below_min_quantity(dec!(0.001)));
        assert!(!instrument.below_min_quantity(dec!(0)));
    }
}
