//! Error type for the shrinkler compressor.
//!
//! The compressor's failure modes are narrow by design (see `Pack.c` and
//! `LZParser.c` in the reference source, which fail only on allocation and
//! on addressable-range overflow): there is no file I/O and no container
//! format in this crate, so every other error kind a typical archive crate
//! carries (CRC mismatch, bad magic, path traversal, ...) simply does not
//! apply here.

use thiserror::Error;

/// The error type for `shrinkler-core` operations.
///
/// Allocation failure is deliberately not a variant here: under Rust's
/// global allocator, an allocation failure aborts the process before any
/// `Result` could be constructed, which already matches the "fatal, aborts
/// the compression with a diagnostic" contract this crate inherits from the
/// reference implementation.
#[derive(Debug, Error)]
pub enum Error {
    /// The input does not fit the `u32`-addressed position space used by
    /// the suffix array and the edge arena.
    #[error("input of {len} bytes exceeds the maximum addressable size of {max} bytes")]
    InputTooLarge {
        /// Length of the rejected input, in bytes.
        len: usize,
        /// Maximum input length the compressor can address.
        max: usize,
    },

    /// An internal invariant was violated. Reaching this in a release build
    /// is undefined behavior in the reference implementation; in this crate
    /// the condition is instead checked with `debug_assert!` wherever it
    /// would fire, so this variant exists only for the rare spot where the
    /// caller needs to observe the failure rather than abort.
    #[error("internal invariant violated: {what}")]
    InvariantViolation {
        /// Description of the invariant that was violated.
        what: &'static str,
    },
}

/// Result type alias for `shrinkler-core` operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an input-too-large error.
    pub fn input_too_large(len: usize, max: usize) -> Self {
        Self::InputTooLarge { len, max }
    }

    /// Create an invariant-violation error.
    pub fn invariant(what: &'static str) -> Self {
        Self::InvariantViolation { what }
    }
}
