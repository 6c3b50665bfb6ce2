use thiserror::Error;

/// Errors that can occur when configuring or operating on a [`WeakSlotArray`][1].
///
/// Reclamation of elements whose owners have released them is never reported as an error.
///
/// [1]: crate::WeakSlotArray
#[derive(Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// An index-bearing operation was given an index outside the current logical bounds.
    #[error("index {index} is out of range for a sequence with {len} live elements")]
    IndexOutOfRange {
        /// The index the caller provided.
        index: usize,

        /// The logical length of the sequence at the time of the call.
        len: usize,
    },

    /// The container could not be created with the requested configuration.
    #[error("invalid configuration: {problem}")]
    InvalidConfiguration {
        /// A human-readable description of the problem.
        problem: String,
    },
}

/// A specialized `Result` type for `weak_slots` operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
