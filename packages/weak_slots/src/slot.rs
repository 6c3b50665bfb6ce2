use crate::{Tracked, WeakTracked};

/// Identifies one registration of an element in one container.
///
/// Tokens are issued in increasing order and never reused by the same container, so a release
/// notification can never be attributed to a slot it does not belong to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct SlotToken(u64);

impl SlotToken {
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    pub(crate) const fn get(self) -> u64 {
        self.0
    }
}

/// One position in the backing storage of a container.
#[derive(Debug)]
pub(crate) enum Slot<T> {
    Occupied {
        token: SlotToken,
        target: WeakTracked<T>,
    },

    /// The element was released and the slot awaits compaction.
    Vacated,
}

impl<T> Slot<T> {
    pub(crate) fn occupied(token: SlotToken, item: &Tracked<T>) -> Self {
        Self::Occupied {
            token,
            target: Tracked::downgrade(item),
        }
    }

    pub(crate) fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied { .. })
    }

    pub(crate) fn token(&self) -> Option<SlotToken> {
        match self {
            Self::Occupied { token, .. } => Some(*token),
            Self::Vacated => None,
        }
    }

    /// Resolves the element if it is still alive. Vacated slots resolve to nothing.
    pub(crate) fn upgrade(&self) -> Option<Tracked<T>> {
        match self {
            Self::Occupied { target, .. } => target.upgrade(),
            Self::Vacated => None,
        }
    }
}
