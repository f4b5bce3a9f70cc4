//! The iteration driver: parse, measure, re-train, re-parse, keep the
//! smallest result, emit it through the real range coder.
//!
//! Ported from `Pack.c`'s `pack` entry point. Each iteration's parse runs
//! against a [`SizeMeasuringCoder`] trained from the previous iteration's
//! true symbol frequencies (an exponentially-weighted running model, see
//! [`CountingCoder::merge`]); the very first iteration trains against an
//! all-zero model, which [`SizeMeasuringCoder::new`]'s Laplace smoothing
//! turns into a flat prior rather than a division by zero.

use crate::BitCost;
use crate::coder::{CountingCoder, SizeMeasuringCoder};
use crate::lz_encoder::LZEncoder;
use crate::match_finder::MatchFinder;
use crate::model::{NUMBER_CONTEXT_OFFSET, NUM_CONTEXTS, NUM_NUMBER_CONTEXTS};
use crate::parser::{self, LZParseResult, ParserConfig};
use crate::progress::{NoProgress, Progress};
use crate::range_coder::RangeCoder;

use shrinkler_support::{Error, Result};

/// Largest input this crate will address: the suffix array and edge
/// arena index positions with `i32`, reserving room for the sentinel and
/// the one-past-the-end position.
pub const MAX_INPUT_LEN: usize = (1usize << 30) - 2;

/// Fixed tuning record consumed by [`compress`]. Field names and defaults
/// match the reference `PackParams` record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackParams {
    /// Split KIND/literal contexts by the low bit of output position.
    /// Favors byte-aligned structured data; leave off for byte-granular
    /// unstructured data.
    pub parity_context: bool,
    /// Number of parse/train passes. At least 1.
    pub iterations: u32,
    /// Also try matches shorter than the reported length by up to this
    /// many bytes.
    pub length_margin: i32,
    /// Match length at or above which the parser's skip heuristic
    /// triggers.
    pub skip_length: i32,
    /// Per-side bound on suffix-array extension hops in the match finder.
    pub match_patience: i32,
    /// Cap on the match finder's per-length candidate heap.
    pub max_same_length: usize,
}

impl Default for PackParams {
    /// Shrinkler's published defaults.
    fn default() -> Self {
        Self {
            parity_context: false,
            iterations: 2,
            length_margin: 3,
            skip_length: 2048,
            match_patience: 1000,
            max_same_length: 32,
        }
    }
}

fn edge_capacity_for(input_len: usize) -> usize {
    (input_len.saturating_mul(2)).clamp(1024, 1_000_000)
}

/// Compress `data` under `params`, returning the entropy-coded bitstream
/// (see spec's "Bitstream (data mode)" — the bare `RangeCoder::finish`
/// output, with no container header).
pub fn compress(data: &[u8], params: &PackParams) -> Result<Vec<u8>> {
    compress_with_progress(data, params, &mut NoProgress)
}

/// As [`compress`], but reports sweep progress through `progress` on
/// every iteration.
pub fn compress_with_progress(
    data: &[u8],
    params: &PackParams,
    progress: &mut dyn Progress,
) -> Result<Vec<u8>> {
    if data.len() > MAX_INPUT_LEN {
        return Err(Error::input_too_large(data.len(), MAX_INPUT_LEN));
    }

    let encoder = LZEncoder::new(params.parity_context);
    let mut match_finder = MatchFinder::new(data, 2, params.match_patience, params.max_same_length);
    let parser_config = ParserConfig {
        length_margin: params.length_margin,
        skip_length: params.skip_length,
        edge_capacity: edge_capacity_for(data.len()),
    };
    let max_number = data.len() as u32 + 4;

    let mut running_counts = CountingCoder::new(NUM_CONTEXTS);
    let mut best_result: Option<LZParseResult> = None;
    let mut best_size: BitCost = BitCost::MAX;

    for _ in 0..params.iterations.max(1) {
        let mut measurer = SizeMeasuringCoder::new(&running_counts);
        measurer.set_number_contexts(NUMBER_CONTEXT_OFFSET, NUM_NUMBER_CONTEXTS, max_number);

        match_finder.reset();
        let result = parser::parse(
            data,
            &encoder,
            &mut measurer,
            &mut match_finder,
            &parser_config,
            progress,
        );

        let mut trial = RangeCoder::new(NUM_CONTEXTS);
        parser::encode_result(&encoder, &mut trial, data, &result);
        let trial_bytes = trial.finish();
        let size = trial_bytes.len() as BitCost;

        if size < best_size {
            best_size = size;
            best_result = Some(result.clone());
        }

        let mut tally = CountingCoder::new(NUM_CONTEXTS);
        parser::encode_result(&encoder, &mut tally, data, &result);
        running_counts = CountingCoder::merge(&running_counts, &tally);
    }

    let best_result = best_result.expect("iterations is at least 1");
    let mut final_coder = RangeCoder::new(NUM_CONTEXTS);
    parser::encode_result(&encoder, &mut final_coder, data, &best_result);
    Ok(final_coder.finish())
}
