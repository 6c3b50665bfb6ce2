use std::fmt;
use std::str::{FromStr, ParseBoolError};

use crate::{Error, Result};

/// Determines what happens to the slot of an element whose last owner has released it.
///
/// Both modes expose the same logical sequence to the caller. They only differ in when the
/// vacated slot is physically removed from the backing storage.
///
/// In both modes a reclamation locates its slot by scanning the backing storage, so releasing
/// every element of an array of `n` slots costs O(n²) in total. Eager mode additionally shifts
/// the slots after each vacated one.
///
/// # Examples
///
/// ```
/// use weak_slots::{Compaction, WeakSlotArray};
///
/// let array = WeakSlotArray::<String>::builder()
///     .compaction(Compaction::Lazy)
///     .build()
///     .unwrap();
///
/// assert_eq!(array.options().compaction(), Compaction::Lazy);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum Compaction {
    /// The vacated slot is removed as soon as the element is released, shifting all later
    /// slots one position earlier. This is the default.
    #[default]
    Eager,

    /// The vacated slot is left in place as a tombstone that reads and enumeration skip.
    ///
    /// Tombstones are removed by [`WeakSlotArray::compact()`][1] or by a compaction pass that
    /// the next mutating operation runs once tombstones make up at least half of the slots.
    ///
    /// [1]: crate::WeakSlotArray::compact
    Lazy,
}

impl Compaction {
    const EAGER: &'static str = "eager";
    const LAZY: &'static str = "lazy";
}

impl fmt::Display for Compaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager => f.write_str(Self::EAGER),
            Self::Lazy => f.write_str(Self::LAZY),
        }
    }
}

impl FromStr for Compaction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            Self::EAGER => Ok(Self::Eager),
            Self::LAZY => Ok(Self::Lazy),
            other => Err(Error::InvalidConfiguration {
                problem: format!(
                    "'{other}' is not a compaction mode, expected '{}' or '{}'",
                    Self::EAGER,
                    Self::LAZY
                ),
            }),
        }
    }
}

/// The configuration a [`WeakSlotArray`][1] was created with.
///
/// Options are captured at construction time and never change afterwards.
///
/// [1]: crate::WeakSlotArray
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Options {
    compaction: Compaction,
    notify_on_reclaim: bool,
}

impl Options {
    /// Name of the option that selects the [`Compaction`] mode.
    pub const COMPACTION: &'static str = "compaction";

    /// Name of the option that enables reclamation observers.
    pub const NOTIFY_ON_RECLAIM: &'static str = "notify_on_reclaim";

    pub(crate) fn new(compaction: Compaction, notify_on_reclaim: bool) -> Self {
        Self {
            compaction,
            notify_on_reclaim,
        }
    }

    /// How vacated slots are removed from the backing storage.
    #[must_use]
    pub fn compaction(&self) -> Compaction {
        self.compaction
    }

    /// Whether registered reclamation observers are invoked.
    #[must_use]
    pub fn notify_on_reclaim(&self) -> bool {
        self.notify_on_reclaim
    }

    /// Applies a named option given in textual form, as found in configuration files.
    pub(crate) fn apply(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            Self::COMPACTION => {
                self.compaction = value.parse()?;
            }
            Self::NOTIFY_ON_RECLAIM => {
                self.notify_on_reclaim = parse_bool(name, value)?;
            }
            other => {
                return Err(Error::InvalidConfiguration {
                    problem: format!("'{other}' is not a recognized option"),
                });
            }
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    value.parse().map_err(|_parse_error: ParseBoolError| {
        Error::InvalidConfiguration {
            problem: format!("option '{name}' expects 'true' or 'false' but got '{value}'"),
        }
    })
}
