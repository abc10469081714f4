use crate::order::id::{ClientOrderId, OrderListId};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// How the orders in an [`OrderList`] affect each other.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum ContingencyType {
    /// One-Cancels-the-Other: a fill (or manual cancel) on one member cancels every other
    /// member. Used for take-profit/stop-loss bracket pairs.
    Oco,
    /// One-Triggers-the-Other: the first member (the "entry") must fill before the remaining
    /// members are released into the book; if the entry is instead rejected or cancelled, the
    /// remaining members cascade into the same terminal state. Once released, the remaining
    /// members are additionally OCO with each other.
    Oto,
    /// One-Updates-the-Other: named by the order model but not given distinct resolution
    /// semantics beyond its members (open question, recorded in DESIGN.md); resolved as a
    /// no-op by [`crate::simulated::exchange::SimulatedExchange`].
    Ouo,
}

/// A group of contingently-linked orders, keyed by [`OrderListId`], per §4.5.
///
/// The [`crate::simulated::exchange::SimulatedExchange`] is the authority on resolving
/// contingencies (cancelling OCO siblings, releasing OTO children) as member fills/cancels
/// arrive; this type is the read-only grouping the [`crate::cache::Cache`] exposes.
#[derive(Debug, Clone, Eq, PartialEq, Constructor)]
pub struct OrderList {
    pub id: OrderListId,
    pub contingency: ContingencyType,
    /// Member client order ids, in submission order. For `Oto`, index 0 is the triggering
    /// entry order and the remainder are held until it fills.
    pub members: Vec<ClientOrderId>,
}

impl OrderList {
    pub fn oto_entry(&self) -> Option<&ClientOrderId> {
        matches!(self.contingency, ContingencyType::Oto)
            .then(|| self.members.first())
            .flatten()
    }

    pub fn siblings_of<'a>(&'a self, cid: &ClientOrderId) -> impl Iterator<Item = &'a ClientOrderId> {
        self.members.iter().filter(move |member| *member != cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(s: &str) -> ClientOrderId {
        ClientOrderId::new(s)
    }

    #[test]
    fn test_oco_siblings_excludes_self() {
        let list = OrderList::new(
            OrderListId::new("bracket-1"),
            ContingencyType::Oco,
            vec![cid("tp"), cid("sl")],
        );

        let siblings: Vec<&ClientOrderId> = list.siblings_of(&cid("tp")).collect();
        assert_eq!(siblings, vec![&cid("sl")]);
    }

    #[test]
    fn test_oto_entry_is_first_member() {
        let list = OrderList::new(
            OrderListId::new("bracket-2"),
            ContingencyType::Oto,
            vec![cid("entry"), cid("tp"), cid("sl")],
        );

        assert_eq!(list.oto_entry(), Some(&cid("entry")));
    }

    #[test]
    fn test_oco_has_no_oto_entry() {
        let list = OrderList::new(OrderListId::new("bracket-3"), ContingencyType::Oco, vec![cid("tp"), cid("sl")]);
        assert_eq!(list.oto_entry(), None);
    }
}
