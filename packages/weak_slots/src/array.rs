use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::{Iter, Options, Result, Slot, SlotTable, SlotToken, Tracked, WeakSlotArrayBuilder};

type Observer = Box<dyn FnMut(usize)>;

/// An ordered sequence that holds its elements by weak reference.
///
/// Elements are inserted as [`Tracked<T>`] owners but the array only keeps a non-owning handle
/// to each of them. When the last owner of an element is dropped anywhere in the program, the
/// array reclaims the slot the element occupied: the element disappears from the logical
/// sequence, [`len()`][1] drops by one and the relative order of the remaining elements is
/// preserved.
///
/// How the vacated slot is physically handled depends on the [`Compaction`][2] mode chosen at
/// construction time. The logical sequence seen through [`get()`][3] and [`iter()`][4] is the
/// same in both modes.
///
/// # Reclamation observers
///
/// If the array is built with [`notify_on_reclaim(true)`][5], closures registered via
/// [`on_reclaim()`][6] are called once per reclaimed slot with the logical index the element
/// occupied immediately before it was reclaimed. Observers may drop other owners and may call
/// back into the array, including to register more observers. Notices caused by an observer are
/// delivered after the current observer call returns.
///
/// # Thread safety
///
/// The array is single-threaded. Neither the array nor [`Tracked<T>`] can be sent to or shared
/// with other threads.
///
/// # Examples
///
/// ```
/// use weak_slots::{Tracked, WeakSlotArray};
///
/// let mut array = WeakSlotArray::new();
///
/// let x = Tracked::new('x');
/// let y = Tracked::new('y');
/// let z = Tracked::new('z');
///
/// array.push(&x);
/// array.push(&y);
/// array.push(&z);
/// assert_eq!(array.len(), 3);
///
/// drop(y);
///
/// assert_eq!(array.len(), 2);
/// assert_eq!(array.iter().map(|item| *item).collect::<String>(), "xz");
/// ```
///
/// [1]: Self::len
/// [2]: crate::Compaction
/// [3]: Self::get
/// [4]: Self::iter
/// [5]: WeakSlotArrayBuilder::notify_on_reclaim
/// [6]: Self::on_reclaim
pub struct WeakSlotArray<T> {
    shared: Rc<Shared<T>>,
}

/// State reachable both from the owner of the array and from the release notifications of its
/// elements, which may arrive at any point in the owner's call stack.
pub(crate) struct Shared<T> {
    /// Slots only hold weak handles, so no element drop logic (and thus no release
    /// notification) can run while the table is borrowed.
    table: RefCell<SlotTable<T>>,

    /// Logical indexes of reclaimed slots that observers have not yet been told about.
    notices: RefCell<VecDeque<usize>>,

    /// Observers not currently being called. During dispatch this only holds observers
    /// registered by the observers themselves, which join the dispatch loop before the next
    /// notice.
    observers: RefCell<Vec<Observer>>,

    dispatching: Cell<bool>,

    /// While any enumeration is in progress, eager reclamation leaves tombstones instead of
    /// shifting slots under the iterator.
    active_iterators: Cell<usize>,

    options: Options,
}

impl<T> Shared<T> {
    /// Entry point for release notifications from [`Tracked<T>`].
    pub(crate) fn released(&self, token: SlotToken) {
        let may_shift = self.active_iterators.get() == 0;

        let reclaimed = self.table.borrow_mut().reclaim(token, may_shift);

        let Some(index) = reclaimed else {
            trace!(token = token.get(), "release of a slot no longer in the array");
            return;
        };

        trace!(
            token = token.get(),
            index,
            compaction = %self.options.compaction(),
            shifted = may_shift,
            "reclaimed slot"
        );

        if self.options.notify_on_reclaim() {
            self.notices.borrow_mut().push_back(index);
            self.dispatch_notices();
        }
    }

    fn dispatch_notices(&self) {
        // Observers may release further elements. The outermost dispatch delivers those notices
        // after the current observer call returns.
        if self.dispatching.replace(true) {
            trace!(
                queued = self.notices.borrow().len(),
                "reclamation notice deferred until the current observer returns"
            );
            return;
        }

        let mut active = mem::take(&mut *self.observers.borrow_mut());

        loop {
            active.append(&mut self.observers.borrow_mut());

            let Some(index) = self.notices.borrow_mut().pop_front() else {
                break;
            };

            for observer in &mut active {
                observer(index);
            }
        }

        *self.observers.borrow_mut() = active;
        self.dispatching.set(false);
    }

    fn register(&self, observer: Observer) {
        self.observers.borrow_mut().push(observer);
    }

    pub(crate) fn options(&self) -> Options {
        self.options
    }

    pub(crate) fn with_table<R>(&self, f: impl FnOnce(&SlotTable<T>) -> R) -> R {
        f(&self.table.borrow())
    }

    fn with_table_mut<R>(&self, f: impl FnOnce(&mut SlotTable<T>) -> R) -> R {
        f(&mut self.table.borrow_mut())
    }

    pub(crate) fn iterator_started(&self) {
        let active = self
            .active_iterators
            .get()
            .checked_add(1)
            .expect("cannot have more than usize::MAX live iterators");
        self.active_iterators.set(active);
    }

    pub(crate) fn iterator_finished(&self) {
        let active = self
            .active_iterators
            .get()
            .checked_sub(1)
            .expect("iterator finished more times than it started");
        self.active_iterators.set(active);
    }
}

impl<T> WeakSlotArray<T> {
    pub(crate) fn new_inner(capacity: usize, options: Options) -> Self {
        debug!(
            capacity,
            compaction = %options.compaction(),
            notify_on_reclaim = options.notify_on_reclaim(),
            item_type = type_name::<T>(),
            "creating weak slot array"
        );

        Self {
            shared: Rc::new(Shared {
                table: RefCell::new(SlotTable::with_capacity(capacity, options.compaction())),
                notices: RefCell::new(VecDeque::new()),
                observers: RefCell::new(Vec::new()),
                dispatching: Cell::new(false),
                active_iterators: Cell::new(0),
                options,
            }),
        }
    }

    /// Creates an empty array with the default configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use weak_slots::{Compaction, WeakSlotArray};
    ///
    /// let array = WeakSlotArray::<u32>::new();
    ///
    /// assert!(array.is_empty());
    /// assert_eq!(array.options().compaction(), Compaction::Eager);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::new_inner(0, Options::default())
    }

    /// Starts building a new [`WeakSlotArray`].
    ///
    /// Use this to reserve capacity up front or to choose the compaction and notification
    /// behavior.
    ///
    /// # Example
    ///
    /// ```rust
    /// use weak_slots::{Compaction, WeakSlotArray};
    ///
    /// let array = WeakSlotArray::<u32>::builder()
    ///     .capacity(16)
    ///     .compaction(Compaction::Lazy)
    ///     .notify_on_reclaim(true)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert!(array.capacity() >= 16);
    /// ```
    pub fn builder() -> WeakSlotArrayBuilder<T> {
        WeakSlotArrayBuilder::new()
    }

    /// The configuration the array was built with.
    #[must_use]
    pub fn options(&self) -> Options {
        self.shared.options()
    }

    /// The number of elements in the logical sequence.
    ///
    /// Elements whose last owner has been dropped are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.with_table(SlotTable::len)
    }

    /// Whether the logical sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of physical slots, including tombstones that await compaction.
    ///
    /// This is never less than [`len()`](Self::len).
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.shared.with_table(SlotTable::slot_count)
    }

    /// The number of slots the array can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.with_table(SlotTable::capacity)
    }

    /// Appends an element to the end of the sequence.
    ///
    /// The array does not keep the element alive.
    ///
    /// # Example
    ///
    /// ```rust
    /// use weak_slots::{Tracked, WeakSlotArray};
    ///
    /// let mut array = WeakSlotArray::new();
    /// let item = Tracked::new(1_u8);
    ///
    /// array.push(&item);
    ///
    /// assert_eq!(array.get(0).unwrap().as_deref(), Some(&1));
    /// ```
    pub fn push(&mut self, item: &Tracked<T>) {
        let token = self.mutate(|table| table.push(item));
        item.watch(self.sink(), token);
    }

    /// Inserts an element at a logical position, shifting later elements towards the end.
    ///
    /// `index` may equal [`len()`](Self::len), which appends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`][crate::Error::IndexOutOfRange] if `index` is greater
    /// than the length. The array is unchanged in that case.
    pub fn insert(&mut self, index: usize, item: &Tracked<T>) -> Result<()> {
        let token = self.mutate(|table| table.insert(index, item))?;
        item.watch(self.sink(), token);

        Ok(())
    }

    /// Removes the element at a logical position, shifting later elements towards the start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`][crate::Error::IndexOutOfRange] if there is no element
    /// at `index`. The array is unchanged in that case.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        let removed = self.mutate(|table| table.remove(index))?;
        self.forget(&removed);

        Ok(())
    }

    /// Replaces the element at a logical position, returning the previous element if it is
    /// still alive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`][crate::Error::IndexOutOfRange] if there is no element
    /// at `index`. The array is unchanged in that case.
    pub fn replace(&mut self, index: usize, item: &Tracked<T>) -> Result<Option<Tracked<T>>> {
        let (token, previous) = self.mutate(|table| table.replace(index, item))?;
        item.watch(self.sink(), token);
        self.forget(&previous);

        Ok(previous.upgrade())
    }

    /// Returns the element at a logical position.
    ///
    /// The result is `Ok(None)` if the element has been released but its slot has not been
    /// reclaimed yet, which can only be observed from within a reclamation observer or from
    /// the drop logic of an element. The array never hands out a released element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`][crate::Error::IndexOutOfRange] if there is no element
    /// at `index`.
    pub fn get(&self, index: usize) -> Result<Option<Tracked<T>>> {
        self.shared.with_table(|table| table.get(index))
    }

    /// Enumerates the live elements in order.
    ///
    /// The iterator is lazy: an element released before the iterator reaches it is skipped.
    /// Call `iter()` again to restart from the beginning.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.shared)
    }

    /// Physically removes all tombstones, returning how many were removed.
    ///
    /// Only arrays using [`Compaction::Lazy`][crate::Compaction::Lazy] accumulate tombstones
    /// for any length of time, though eager arrays can hold some after an enumeration.
    pub fn compact(&mut self) -> usize {
        self.shared.with_table_mut(SlotTable::compact)
    }

    /// Removes all elements from the array.
    pub fn clear(&mut self) {
        let slots = self.shared.with_table_mut(SlotTable::take_all);

        for slot in &slots {
            self.forget(slot);
        }
    }

    /// Registers a closure to call with the logical index of every reclaimed slot.
    ///
    /// Observers are only called if the array was built with
    /// [`notify_on_reclaim(true)`](WeakSlotArrayBuilder::notify_on_reclaim). Removal of an
    /// element through [`remove()`](Self::remove) is not a reclamation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    ///
    /// use weak_slots::{Tracked, WeakSlotArray};
    ///
    /// let mut array = WeakSlotArray::builder()
    ///     .notify_on_reclaim(true)
    ///     .build()
    ///     .unwrap();
    ///
    /// let reclaimed = Rc::new(RefCell::new(Vec::new()));
    /// array.on_reclaim({
    ///     let reclaimed = Rc::clone(&reclaimed);
    ///     move |index| reclaimed.borrow_mut().push(index)
    /// });
    ///
    /// let a = Tracked::new("a");
    /// let b = Tracked::new("b");
    /// array.push(&a);
    /// array.push(&b);
    ///
    /// drop(b);
    ///
    /// assert_eq!(*reclaimed.borrow(), vec![1]);
    /// ```
    pub fn on_reclaim(&mut self, observer: impl FnMut(usize) + 'static) {
        self.shared.register(Box::new(observer));
    }

    /// Runs a mutating operation, compacting first if the compaction mode calls for it.
    fn mutate<R>(&mut self, f: impl FnOnce(&mut SlotTable<T>) -> R) -> R {
        // An exclusive borrow of the array proves that no iterator is alive, even one that was
        // leaked without running its destructor.
        self.shared.active_iterators.set(0);

        self.shared.with_table_mut(|table| {
            table.compact_if_due();
            f(table)
        })
    }

    fn sink(&self) -> Weak<Shared<T>> {
        Rc::downgrade(&self.shared)
    }

    /// Stops watching the element of a slot that left the array through the owner's hands.
    fn forget(&self, slot: &Slot<T>) {
        if let (Some(token), Some(item)) = (slot.token(), slot.upgrade()) {
            item.unwatch(&self.sink(), token);
        }
    }
}

impl<T> Default for WeakSlotArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for WeakSlotArray<T> {
    fn drop(&mut self) {
        // The elements outlive the array, so leave no registrations behind on them.
        self.clear();
    }
}

impl<T> fmt::Debug for WeakSlotArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, slot_count, tombstones) = self
            .shared
            .with_table(|table| (table.len(), table.slot_count(), table.tombstones()));

        f.debug_struct(type_name::<Self>())
            .field("len", &len)
            .field("slot_count", &slot_count)
            .field("tombstones", &tombstones)
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl<'a, T> IntoIterator for &'a WeakSlotArray<T> {
    type Item = Tracked<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: 'a> Extend<&'a Tracked<T>> for WeakSlotArray<T> {
    fn extend<I: IntoIterator<Item = &'a Tracked<T>>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}
