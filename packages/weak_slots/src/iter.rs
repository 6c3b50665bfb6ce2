use std::fmt;
use std::iter::FusedIterator;

use crate::{Shared, Tracked};

/// Iterator over the live elements of a [`WeakSlotArray`][1], in order.
///
/// Returned by [`WeakSlotArray::iter()`][2]. Each element is resolved at the moment the iterator
/// reaches it, so elements released before that point are skipped and the yielded owners are
/// always alive.
///
/// [1]: crate::WeakSlotArray
/// [2]: crate::WeakSlotArray::iter
pub struct Iter<'a, T> {
    shared: &'a Shared<T>,

    // Physical position of the next slot to inspect. Slots never shift while an iterator is
    // alive, so this stays valid across reclamations.
    cursor: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(shared: &'a Shared<T>) -> Self {
        shared.iterator_started();

        Self { shared, cursor: 0 }
    }
}

impl<T> Iterator for Iter<'_, T> {
    type Item = Tracked<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let (item, resume) = self
            .shared
            .with_table(|table| table.next_live(self.cursor))?;

        self.cursor = resume;

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .shared
            .with_table(|table| table.remaining_from(self.cursor));

        (0, Some(remaining))
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Drop for Iter<'_, T> {
    fn drop(&mut self) {
        self.shared.iterator_finished();
    }
}

impl<T> fmt::Debug for Iter<'_, T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}
