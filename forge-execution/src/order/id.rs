use derive_more::{Constructor, Display, From};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Identifier assigned by the strategy (or the system, if unspecified) when an order is
/// created, unique for the lifetime of the order. Survives replaces; a cancel-replace keeps
/// the same `ClientOrderId` while receiving a new [`VenueOrderId`].
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From)]
pub struct ClientOrderId(pub SmolStr);

impl ClientOrderId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }

    /// Construct a stack-allocated `ClientOrderId` backed by a 23 byte [`SmolStr`].
    pub fn random() -> Self {
        const URL_SAFE_SYMBOLS: [char; 64] = [
            '_', '-', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e',
            'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v',
            'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
            'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
        ];
        const LEN_NON_ALLOCATING_CID: usize = 23;

        let mut rng = rand::rng();
        let random_utf8: [u8; LEN_NON_ALLOCATING_CID] = std::array::from_fn(|_| {
            *URL_SAFE_SYMBOLS
                .choose(&mut rng)
                .expect("URL_SAFE_SYMBOLS slice is not empty") as u8
        });

        let as_str = std::str::from_utf8(&random_utf8).expect("URL_SAFE_SYMBOLS are valid utf8");
        Self(SmolStr::new_inline(as_str))
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::random()
    }
}

/// Identifier assigned by the venue (simulated exchange) once an order is accepted. `None`
/// until the order leaves [`crate::order::state::ActiveOrderState::Submitted`].
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct VenueOrderId(pub u64);

/// Groups related [`ClientOrderId`]s under an OCO/OTO contingency, see
/// [`crate::order::list::OrderList`].
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From)]
pub struct OrderListId(pub SmolStr);

impl OrderListId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }
}

/// Identifies the strategy that owns an order, for attribution in fills/PnL and for
/// per-strategy risk checks.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From)]
pub struct StrategyId(pub SmolStr);

impl StrategyId {
    pub fn new<S: Into<SmolStr>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn unknown() -> Self {
        Self(SmolStr::new_static("unknown"))
    }
}

/// Uniquely addresses an order within the [`crate::cache::Cache`]: the pair of strategy-
/// assigned and system-wide identifiers is unambiguous even across strategies sharing a
/// `ClientOrderId` namespace collision (which [`ClientOrderId::random`] makes vanishingly rare
/// in practice, but the key is still composite for clarity and for multi-strategy replay).
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor,
)]
pub struct OrderKey {
    pub strategy: StrategyId,
    pub cid: ClientOrderId,
}
