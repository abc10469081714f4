use crate::order::id::VenueOrderId;
use chrono::{DateTime, Utc};
use derive_more::{Constructor, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The full lifecycle state of an order.
///
/// Transition diagram (an order moves strictly forward; there is no path back to
/// [`ActiveOrderState::Initialized`] once submitted):
///
/// ```text
/// Initialized -> Submitted -> Accepted -> PartiallyFilled -> Filled
///                    |            |             |
///                    |            +-> PendingCancel -> Canceled
///                    |            +-> PendingReplace -> Accepted (new price/qty)
///                    +-> Rejected
///                    +-> Denied          (failed a pre-trade risk check, never left the engine)
///                    +-> Dormant -> Accepted (stop/if-touched kind, triggered)
///                              \--> Canceled | Rejected (cascaded from an OTO entry)
/// Accepted -> Expired                    (time_in_force elapsed un-filled)
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub enum OrderState {
    Active(ActiveOrderState),
    Inactive(InactiveOrderState),
}

impl OrderState {
    pub fn is_active(&self) -> bool {
        matches!(self, OrderState::Active(_))
    }

    pub fn venue_order_id(&self) -> Option<VenueOrderId> {
        match self {
            OrderState::Active(state) => state.venue_order_id(),
            OrderState::Inactive(_) => None,
        }
    }

    /// The timestamp of this state's most recent venue-confirmed transition, used to bound
    /// startup reconciliation to `reconciliation_lookback_mins`.
    pub fn ts(&self) -> Option<DateTime<Utc>> {
        match self {
            OrderState::Active(ActiveOrderState::Accepted(accepted))
            | OrderState::Active(ActiveOrderState::PendingCancel(accepted))
            | OrderState::Active(ActiveOrderState::PendingReplace(accepted)) => Some(accepted.ts_accepted),
            OrderState::Active(ActiveOrderState::Dormant(dormant)) => Some(dormant.ts_accepted),
            OrderState::Inactive(InactiveOrderState::Filled(filled)) => Some(filled.ts_filled),
            OrderState::Inactive(InactiveOrderState::Canceled(canceled)) => Some(canceled.ts_canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub enum ActiveOrderState {
    /// Constructed locally, not yet sent to the venue.
    Initialized,
    /// Sent to the venue; awaiting acknowledgement.
    Submitted,
    /// Acknowledged and resting (or fully/partially filled but still working).
    Accepted(Accepted),
    /// A cancel request has been sent; awaiting venue confirmation.
    #[from(skip)]
    PendingCancel(Accepted),
    /// A replace (cancel-then-new at a different price/quantity) has been sent; the working
    /// order is still `Accepted` with its prior terms until the venue confirms the replace.
    #[from(skip)]
    PendingReplace(Accepted),
    /// A stop/if-touched order accepted by the venue but held out of the book pending its
    /// trigger, per §4.4. Also used for an OTO bracket's children: acknowledged but held until
    /// the entry fills.
    Dormant(Dormant),
}

impl ActiveOrderState {
    pub fn venue_order_id(&self) -> Option<VenueOrderId> {
        match self {
            ActiveOrderState::Initialized | ActiveOrderState::Submitted => None,
            ActiveOrderState::Accepted(state)
            | ActiveOrderState::PendingCancel(state)
            | ActiveOrderState::PendingReplace(state) => Some(state.venue_order_id),
            ActiveOrderState::Dormant(dormant) => Some(dormant.venue_order_id),
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(
            self,
            ActiveOrderState::Accepted(_)
                | ActiveOrderState::PendingCancel(_)
                | ActiveOrderState::PendingReplace(_)
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct Accepted {
    pub venue_order_id: VenueOrderId,
    pub ts_accepted: DateTime<Utc>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
}

impl Accepted {
    pub fn quantity_remaining(&self) -> Decimal {
        self.quantity - self.filled_quantity
    }

    pub fn is_partially_filled(&self) -> bool {
        self.filled_quantity > Decimal::ZERO && self.quantity_remaining() > Decimal::ZERO
    }
}

/// An order resting dormant: acknowledged by the venue but not yet live in the book, either
/// because its trigger has not fired or (for an OTO child) its entry has not filled.
/// `trigger_price` is mutable so a `TRAILING_STOP`'s trigger can ratchet as the market moves in
/// its favour.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct Dormant {
    pub venue_order_id: VenueOrderId,
    pub ts_accepted: DateTime<Utc>,
    pub trigger_price: Option<Decimal>,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, From)]
pub enum InactiveOrderState {
    Filled(Filled),
    Canceled(Canceled),
    Rejected(Rejected),
    Expired,
    /// Failed a pre-trade risk check and was never sent to the venue.
    Denied(String),
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct Filled {
    pub venue_order_id: VenueOrderId,
    pub ts_filled: DateTime<Utc>,
    pub avg_price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct Canceled {
    pub venue_order_id: VenueOrderId,
    pub ts_canceled: DateTime<Utc>,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Constructor)]
pub struct Rejected {
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(filled_quantity: Decimal) -> Accepted {
        Accepted::new(VenueOrderId(1), Utc::now(), Decimal::ONE, Decimal::TEN, filled_quantity)
    }

    #[test]
    fn test_quantity_remaining() {
        let state = accepted(Decimal::new(3, 0));
        assert_eq!(state.quantity_remaining(), Decimal::new(7, 0));
    }

    #[test]
    fn test_is_partially_filled() {
        struct TestCase {
            filled_quantity: Decimal,
            expected: bool,
        }

        let cases = vec![
            TestCase { filled_quantity: Decimal::ZERO, expected: false },
            TestCase { filled_quantity: Decimal::new(5, 0), expected: true },
            TestCase { filled_quantity: Decimal::TEN, expected: false },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            assert_eq!(
                accepted(test.filled_quantity).is_partially_filled(),
                test.expected,
                "TC{index} failed"
            );
        }
    }
}
