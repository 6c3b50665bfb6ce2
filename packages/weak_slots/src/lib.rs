#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! An ordered sequence that holds its elements by weak reference.
//!
//! This crate provides [`WeakSlotArray`], a mutable ordered container that does not keep its
//! elements alive. Elements are owned through [`Tracked<T>`] handles elsewhere in the program;
//! when the last owner of an element is dropped, every array that contains the element is told
//! about it and reclaims the slot the element occupied.
//!
//! # Key Features
//!
//! - **Non-owning storage**: Inserting an element never extends its lifetime
//! - **Prompt reclamation**: Slots are reclaimed when the last owner drops, not when the array
//!   is next touched
//! - **Order preservation**: Reclamation never reorders the surviving elements
//! - **No dangling reads**: Every access resolves the weak handle at the point of use
//! - **Compaction modes**: [`Compaction::Eager`] shifts later elements immediately,
//!   [`Compaction::Lazy`] leaves tombstones that are compacted in amortized passes
//! - **Reclamation observers**: Optional callbacks receive the index of each reclaimed slot
//! - **Capability trait**: [`OrderedCollection`] lets collaborators depend on the operations
//!   rather than on the concrete container
//!
//! # Examples
//!
//! ```rust
//! use weak_slots::{Compaction, Tracked, WeakSlotArray};
//!
//! let mut array = WeakSlotArray::builder()
//!     .capacity(4)
//!     .compaction(Compaction::Lazy)
//!     .build()
//!     .unwrap();
//!
//! let x = Tracked::new("X");
//! let y = Tracked::new("Y");
//! let z = Tracked::new("Z");
//!
//! array.push(&x);
//! array.push(&y);
//! array.push(&z);
//! assert_eq!(array.len(), 3);
//!
//! // Releasing the only owner of an element removes it from the array.
//! drop(y);
//!
//! assert_eq!(array.len(), 2);
//! assert_eq!(array.get(1).unwrap().as_deref(), Some(&"Z"));
//! assert_eq!(array.iter().map(|item| *item).collect::<Vec<_>>(), vec!["X", "Z"]);
//! ```
//!
//! # Thread safety
//!
//! The container and its element handles are single-threaded. Wrap the owning data structure in
//! your own synchronization if you need to use it from several threads.

mod array;
mod builder;
mod collection;
mod error;
mod iter;
mod options;
mod slot;
mod table;
mod tracked;

pub use array::WeakSlotArray;
pub(crate) use array::Shared;
pub use builder::*;
pub use collection::*;
pub use error::*;
pub use iter::*;
pub use options::*;
pub(crate) use slot::*;
pub(crate) use table::*;
pub use tracked::*;
