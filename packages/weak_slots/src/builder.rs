use std::alloc::Layout;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{Compaction, Error, Options, Result, Slot, WeakSlotArray};

/// Builder for creating an instance of [`WeakSlotArray`].
///
/// You only need to use this builder if you want to customize the array configuration.
/// The default configuration used by [`WeakSlotArray::new()`][1] uses eager compaction, does
/// not notify observers and reserves no capacity.
///
/// Options can be set either through typed methods or by name via [`option()`][2], which
/// accepts the textual form used in configuration files.
///
/// # Examples
///
/// ```
/// use weak_slots::{Compaction, WeakSlotArray};
///
/// let array = WeakSlotArray::<u32>::builder()
///     .capacity(8)
///     .compaction(Compaction::Lazy)
///     .build()
///     .unwrap();
/// ```
///
/// ```
/// use weak_slots::{Compaction, WeakSlotArray};
///
/// let array = WeakSlotArray::<u32>::builder()
///     .option("compaction", "lazy")?
///     .option("notify_on_reclaim", "true")?
///     .build()?;
///
/// assert_eq!(array.options().compaction(), Compaction::Lazy);
/// assert!(array.options().notify_on_reclaim());
/// # Ok::<(), weak_slots::Error>(())
/// ```
///
/// [1]: WeakSlotArray::new
/// [2]: Self::option
#[must_use]
pub struct WeakSlotArrayBuilder<T> {
    capacity: usize,
    options: Options,

    _item: PhantomData<T>,
}

impl<T> fmt::Debug for WeakSlotArrayBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSlotArrayBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .field("options", &self.options)
            .finish()
    }
}

impl<T> WeakSlotArrayBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: 0,
            options: Options::default(),
            _item: PhantomData,
        }
    }

    /// Reserves room for at least this many slots up front.
    ///
    /// This is only a hint. The array accepts any number of elements regardless of the hint.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the [compaction mode][Compaction]. This governs what happens to the slot of an
    /// element whose last owner has been dropped.
    pub fn compaction(mut self, compaction: Compaction) -> Self {
        self.options = Options::new(compaction, self.options.notify_on_reclaim());
        self
    }

    /// Whether observers registered via [`WeakSlotArray::on_reclaim()`] are called when a
    /// slot is reclaimed.
    pub fn notify_on_reclaim(mut self, notify: bool) -> Self {
        self.options = Options::new(self.options.compaction(), notify);
        self
    }

    /// Sets an option by name from its textual value.
    ///
    /// Recognized options are [`"compaction"`][Options::COMPACTION] (`"eager"` or `"lazy"`) and
    /// [`"notify_on_reclaim"`][Options::NOTIFY_ON_RECLAIM] (`"true"` or `"false"`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the option name or value is not recognized.
    pub fn option(mut self, name: &str, value: &str) -> Result<Self> {
        self.options.apply(name, value)?;
        Ok(self)
    }

    /// Builds the array with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the capacity hint asks for more memory than
    /// can ever be allocated.
    pub fn build(self) -> Result<WeakSlotArray<T>> {
        if Layout::array::<Slot<T>>(self.capacity).is_err() {
            return Err(Error::InvalidConfiguration {
                problem: format!(
                    "capacity hint of {} slots exceeds the maximum allocation size",
                    self.capacity
                ),
            });
        }

        Ok(WeakSlotArray::new_inner(self.capacity, self.options))
    }
}
