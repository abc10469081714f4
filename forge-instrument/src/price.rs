use crate::instrument::Instrument;
use derive_more::{Constructor, Display};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price bound to an instrument's tick size.
///
/// Constructed via [`Price::new`] (rounds to the instrument's tick size per its rounding
/// policy) or [`Price::raw`] (no rounding, for use when a value is already known-valid, eg/
/// round-tripping a stored order).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize, Constructor, Display,
)]
pub struct Price(pub Decimal);

impl Price {
    /// Construct a [`Price`], rounding `raw` to `instrument`'s tick size.
    pub fn rounded(raw: Decimal, instrument: &Instrument) -> Self {
        Self(instrument.round_price(raw))
    }
}

impl std::ops::Add for Price {
    type Output = Price;
    fn add(self, rhs: Self) -> Self::Output {
        Price(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Price {
    type Output = Price;
    fn sub(self, rhs: Self) -> Self::Output {
        Price(self.0 - rhs.0)
    }
}
