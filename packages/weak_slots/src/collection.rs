use crate::{Iter, Result, Tracked, WeakSlotArray};

/// The capability of an ordered sequence of [`Tracked<T>`] elements.
///
/// Code that only needs to append, insert, remove, read and enumerate elements can depend on
/// this trait instead of on [`WeakSlotArray`] directly.
///
/// # Examples
///
/// ```
/// use weak_slots::{OrderedCollection, Tracked, WeakSlotArray};
///
/// fn first_two<C: OrderedCollection<u32>>(collection: &C) -> Vec<u32> {
///     collection.iter().take(2).map(|item| *item).collect()
/// }
///
/// let mut array = WeakSlotArray::new();
/// let items: Vec<_> = (10..15).map(Tracked::new).collect();
/// array.extend(&items);
///
/// assert_eq!(first_two(&array), vec![10, 11]);
/// ```
pub trait OrderedCollection<T> {
    /// Iterator over the elements of the collection, in order.
    type Iter<'a>: Iterator<Item = Tracked<T>>
    where
        Self: 'a;

    /// Appends an element to the end of the sequence.
    fn push(&mut self, item: &Tracked<T>);

    /// Inserts an element at a position, shifting later elements towards the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`][crate::Error::IndexOutOfRange] if `index` is greater
    /// than the length.
    fn insert(&mut self, index: usize, item: &Tracked<T>) -> Result<()>;

    /// Removes the element at a position, shifting later elements towards the start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`][crate::Error::IndexOutOfRange] if there is no
    /// element at `index`.
    fn remove(&mut self, index: usize) -> Result<()>;

    /// Replaces the element at a position, returning the previous element if it is available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`][crate::Error::IndexOutOfRange] if there is no
    /// element at `index`.
    fn replace(&mut self, index: usize, item: &Tracked<T>) -> Result<Option<Tracked<T>>>;

    /// Returns the element at a position, or `None` if it is no longer available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`][crate::Error::IndexOutOfRange] if there is no
    /// element at `index`.
    fn get(&self, index: usize) -> Result<Option<Tracked<T>>>;

    /// The number of elements in the sequence.
    fn len(&self) -> usize;

    /// Whether the sequence is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerates the elements in order.
    fn iter(&self) -> Self::Iter<'_>;
}

impl<T> OrderedCollection<T> for WeakSlotArray<T> {
    type Iter<'a>
        = Iter<'a, T>
    where
        Self: 'a;

    fn push(&mut self, item: &Tracked<T>) {
        Self::push(self, item);
    }

    fn insert(&mut self, index: usize, item: &Tracked<T>) -> Result<()> {
        Self::insert(self, index, item)
    }

    fn remove(&mut self, index: usize) -> Result<()> {
        Self::remove(self, index)
    }

    fn replace(&mut self, index: usize, item: &Tracked<T>) -> Result<Option<Tracked<T>>> {
        Self::replace(self, index, item)
    }

    fn get(&self, index: usize) -> Result<Option<Tracked<T>>> {
        Self::get(self, index)
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn iter(&self) -> Self::Iter<'_> {
        Self::iter(self)
    }
}
