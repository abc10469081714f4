/// Wraps a value to communicate that it is the authoritative current state of some entity,
/// as opposed to an incremental update or delta.
///
/// Used throughout the `Cache` and reconciliation flow: a [`Snapshot<Order>`] received from a
/// venue during reconciliation replaces, rather than merges with, local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snapshot<T>(pub T);

impl<T> Snapshot<T> {
    pub fn as_ref(&self) -> Snapshot<&T> {
        Snapshot(&self.0)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}
