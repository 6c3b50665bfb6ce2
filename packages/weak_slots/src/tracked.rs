use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::{Shared, SlotToken};

/// A strong owner of a value whose release can be observed by [`WeakSlotArray`][1] instances.
///
/// `Tracked<T>` behaves like an [`Rc<T>`]: it can be cloned to create more owners and it
/// dereferences to the value. When the last clone is dropped, every container holding the value
/// by weak reference is notified exactly once and vacates the slot it kept for the value.
///
/// # Examples
///
/// ```
/// use weak_slots::{Tracked, WeakSlotArray};
///
/// let mut array = WeakSlotArray::new();
///
/// let owner = Tracked::new("Alice".to_string());
/// array.push(&owner);
/// assert_eq!(array.len(), 1);
///
/// // The array does not keep the value alive.
/// drop(owner);
/// assert_eq!(array.len(), 0);
/// ```
///
/// [1]: crate::WeakSlotArray
pub struct Tracked<T> {
    inner: Rc<TrackedBox<T>>,
}

/// A non-owning handle to a value owned by one or more [`Tracked<T>`].
///
/// Once the handle stops resolving to a live value, it never resolves again.
pub struct WeakTracked<T> {
    inner: Weak<TrackedBox<T>>,
}

pub(crate) struct TrackedBox<T> {
    value: T,

    // Containers to notify when the last owner is dropped. Each registration fires at most once
    // because the whole list is taken when the box is dropped.
    watchers: RefCell<Vec<Watcher<T>>>,
}

struct Watcher<T> {
    sink: Weak<Shared<T>>,
    token: SlotToken,
}

impl<T> Tracked<T> {
    /// Creates a new owner for the value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(TrackedBox {
                value,
                watchers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Creates a non-owning handle to the value.
    #[must_use]
    pub fn downgrade(this: &Self) -> WeakTracked<T> {
        WeakTracked {
            inner: Rc::downgrade(&this.inner),
        }
    }

    /// Whether two owners refer to the same value (as opposed to equal values).
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.inner, &other.inner)
    }

    /// The number of strong owners of the value, including `this`.
    #[must_use]
    pub fn strong_count(this: &Self) -> usize {
        Rc::strong_count(&this.inner)
    }

    pub(crate) fn watch(&self, sink: Weak<Shared<T>>, token: SlotToken) {
        self.inner.watchers.borrow_mut().push(Watcher { sink, token });
    }

    pub(crate) fn unwatch(&self, sink: &Weak<Shared<T>>, token: SlotToken) {
        self.inner
            .watchers
            .borrow_mut()
            .retain(|watcher| watcher.token != token || !Weak::ptr_eq(&watcher.sink, sink));
    }

    #[cfg(test)]
    pub(crate) fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T: PartialEq> PartialEq for Tracked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.value == other.inner.value
    }
}

impl<T: Eq> Eq for Tracked<T> {}

impl<T: fmt::Debug> fmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&self.inner.value).finish()
    }
}

impl<T> WeakTracked<T> {
    /// Obtains a new owner of the value if it is still alive.
    ///
    /// This is the only way to reach the value through a weak handle, so the liveness check and
    /// the access that follows it cannot be separated.
    #[must_use]
    pub fn upgrade(&self) -> Option<Tracked<T>> {
        self.inner.upgrade().map(|inner| Tracked { inner })
    }

    /// Whether the value still has at least one strong owner.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T> Clone for WeakTracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for WeakTracked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("is_live", &self.is_live())
            .finish()
    }
}

impl<T> Drop for TrackedBox<T> {
    fn drop(&mut self) {
        // The strong count is already zero here, so every weak handle fails to upgrade before
        // any container hears about the release.
        let watchers = mem::take(self.watchers.get_mut());

        for watcher in watchers {
            if let Some(sink) = watcher.sink.upgrade() {
                sink.released(watcher.token);
            }
        }
    }
}
