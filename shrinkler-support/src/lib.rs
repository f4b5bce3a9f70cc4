//! # shrinkler-support
//!
//! The error type shared by [`shrinkler-core`](../shrinkler_core/index.html).
//! Kept as its own crate for the same reason the teacher workspace splits
//! `oxiarc-core` out from its codecs: downstream consumers that only care
//! about the error type (for example a CLI that maps it to an exit code)
//! don't need to pull in the compressor itself.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{Error, Result};
