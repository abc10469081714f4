use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Identifies an execution venue, real (`"BINANCE"`) or simulated (`"SIM"`).
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor, Display,
)]
pub struct Venue(pub SmolStr);

impl Venue {
    pub fn new_simulated() -> Self {
        Self(SmolStr::new_static("SIM"))
    }
}

impl<T> From<T> for Venue
where
    T: Into<SmolStr>,
{
    fn from(value: T) -> Self {
        Self(value.into())
    }
}
