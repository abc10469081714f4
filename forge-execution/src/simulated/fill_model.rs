use rand::{Rng, RngCore};
use rust_decimal::Decimal;
use std::fmt::Debug;

/// Decides how much of a marketable order's matched quantity actually fills, modelling
/// liquidity the book snapshot alone cannot capture (hidden size, latency-induced requoting),
/// per §4.5.
pub trait FillModel: Debug + Send {
    /// `matched_quantity` is what the book's own matcher resolved against resting liquidity;
    /// returns the quantity that actually fills, in `[0, matched_quantity]`.
    fn apply(&self, rng: &mut dyn RngCore, matched_quantity: Decimal) -> Decimal;
}

/// Every matched unit fills - the book's own liquidity is the only constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullFillModel;

impl FillModel for FullFillModel {
    fn apply(&self, _rng: &mut dyn RngCore, matched_quantity: Decimal) -> Decimal {
        matched_quantity
    }
}

/// With probability `1 - fill_probability`, the match is dropped entirely (models a resting
/// order that looked fillable but was pulled before the simulated latency elapsed). Otherwise
/// a fraction of `matched_quantity` uniformly drawn from `[min_fill_ratio, 1.0]` fills.
#[derive(Debug, Clone, Copy)]
pub struct PartialFillModel {
    pub fill_probability: f64,
    pub min_fill_ratio: f64,
}

impl FillModel for PartialFillModel {
    fn apply(&self, rng: &mut dyn RngCore, matched_quantity: Decimal) -> Decimal {
        if !rng.random_bool(self.fill_probability) {
            return Decimal::ZERO;
        }

        let ratio = rng.random_range(self.min_fill_ratio..=1.0);
        matched_quantity * Decimal::try_from(ratio).unwrap_or(Decimal::ONE)
    }
}
