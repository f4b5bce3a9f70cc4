//! # shrinkler-core
//!
//! The optimizing core of a data compressor in the Shrinkler family:
//! extreme compression ratios for small payloads (demoscene executables,
//! embedded firmware) at the cost of CPU time spent searching for the
//! cheapest possible encoding rather than the fastest one.
//!
//! Three tightly coupled subsystems do the hard engineering, and each
//! gets its own module:
//!
//! - [`range_coder`] — the adaptive binary range coder that both measures
//!   and (on the final pass) emits the bitstream.
//! - [`coder`] — the [`coder::Coder`] trait it shares with two cost-only
//!   flavors used to train and evaluate candidate parses without
//!   touching the real entropy model.
//! - [`model`] — the context layout and the length-prefixed number code
//!   shared by every [`coder::Coder`] implementation.
//! - [`suffix_array`] + [`match_finder`] — SA-IS construction and the
//!   on-demand back-reference candidate enumerator built on top of it.
//! - [`lz_encoder`] — literal/reference/finish symbol encoding and the
//!   small state machine ([`lz_encoder::LZState`]) threaded between them.
//! - [`edge`] — the arena-allocated parse-DAG edges, their max-heap, and
//!   reference counting.
//! - [`parser`] — the cost-optimal parser that ties the match finder and
//!   the edge arena together into a single left-to-right sweep.
//! - [`pack`] — the outer iteration loop: parse, measure, re-train,
//!   re-parse, keep the smallest result, emit it for real.
//!
//! Deliberately out of scope (see the specification's purpose and scope
//! section): raw file I/O, CLI argument parsing, the container/header
//! layout for data-mode output, Amiga-executable (hunk) parsing, and the
//! standalone decompressor — its bitstream format is fixed by this
//! crate's encoder, but implementing a decoder is a consumer's job, not
//! this crate's.
//!
//! ## Usage
//!
//! ```
//! use shrinkler_core::{compress, PackParams};
//!
//! let data = b"the quick brown fox jumps over the lazy dog";
//! let compressed = compress(data, &PackParams::default()).unwrap();
//! assert!(!compressed.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coder;
pub mod edge;
pub mod lz_encoder;
pub mod match_finder;
pub mod model;
pub mod pack;
pub mod parser;
pub mod progress;
pub mod range_coder;
pub mod suffix_array;

pub use pack::{MAX_INPUT_LEN, PackParams, compress, compress_with_progress};
pub use parser::{LZParseResult, ParsedEdge};
pub use progress::{NoProgress, Progress, TextProgress};

/// Integer unit used throughout cost accounting: 1/64 of a bit. All cost
/// arithmetic in this crate is integer, never floating point, once a
/// [`coder::Coder`] table has been built.
pub type BitCost = i64;
