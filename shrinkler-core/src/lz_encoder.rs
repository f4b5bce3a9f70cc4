//! Encoding of LZ symbols (literal bytes and back-references) into bits
//! under the shared context layout from [`crate::model`].
//!
//! Ported from `LZEncoder.c`, with its tracing hooks dropped: every call
//! site there biases a raw context constant by `+1` before handing it to
//! the coder, which is reproduced literally here rather than folded into
//! the constants themselves, so this stays a direct mirror of the
//! reference arithmetic.

use crate::BitCost;
use crate::coder::Coder;
use crate::model::{
    CONTEXT_KIND, CONTEXT_REPEATED, KIND_LIT, KIND_REF, LENGTH_BASE_CONTEXT, OFFSET_BASE_CONTEXT,
    encode_number,
};

/// The four pieces of state that thread through a sequence of literal and
/// reference emissions: whether anything has been emitted yet, whether the
/// previous symbol was a reference (gating the repeated-offset shortcut),
/// the running output-position parity, and the most recently used offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LZState {
    pub after_first: bool,
    pub prev_was_ref: bool,
    pub parity: i32,
    pub last_offset: i32,
}

impl LZState {
    /// State before anything has been encoded.
    pub fn initial() -> Self {
        Self {
            after_first: false,
            prev_was_ref: false,
            parity: 0,
            last_offset: 0,
        }
    }

    /// Reconstruct the state as of `pos`, given whether the symbol just
    /// before it was a reference and what its offset was. Used by the
    /// parser to re-derive state at an arbitrary edge without replaying
    /// the whole chain.
    pub fn at(pos: i32, prev_was_ref: bool, last_offset: i32) -> Self {
        Self {
            after_first: pos > 0,
            prev_was_ref,
            parity: pos,
            last_offset,
        }
    }
}

/// Encodes literals and references through a [`Coder`] under a fixed
/// parity policy. Holds no coder of its own: every call takes one, so the
/// same encoder configuration can drive a [`crate::coder::CountingCoder`]
/// tally pass, a [`crate::coder::SizeMeasuringCoder`] cost oracle, and the
/// real [`crate::range_coder::RangeCoder`] output pass interchangeably.
#[derive(Debug, Clone, Copy)]
pub struct LZEncoder {
    parity_mask: i32,
}

impl LZEncoder {
    /// `parity_context` enables splitting the KIND and literal contexts by
    /// the low bit of output position (see `Shrinkler.c`'s `--bytes` flag,
    /// which disables it for byte-oriented rather than word-oriented
    /// data).
    pub fn new(parity_context: bool) -> Self {
        Self {
            parity_mask: i32::from(parity_context),
        }
    }

    fn parity_offset(&self, state: &LZState) -> i32 {
        (state.parity & self.parity_mask) << 8
    }

    /// Encode `value` as a literal byte, returning its cost and the state
    /// to use for the next symbol.
    pub fn encode_literal(
        &self,
        coder: &mut dyn Coder,
        value: u8,
        state_before: &LZState,
    ) -> (BitCost, LZState) {
        let parity_offset = self.parity_offset(state_before);
        let mut size = 0;

        if state_before.after_first {
            size += coder.code(1 + CONTEXT_KIND + parity_offset, KIND_LIT);
        }

        let mut context = 1i32;
        for i in (0..8).rev() {
            let bit = (value >> i) & 1;
            size += coder.code(1 + (parity_offset | context), bit);
            context = (context << 1) | i32::from(bit);
        }

        let state_after = LZState {
            after_first: true,
            prev_was_ref: false,
            parity: state_before.parity + 1,
            last_offset: state_before.last_offset,
        };
        (size, state_after)
    }

    /// Encode a back-reference of `length` bytes from `offset` bytes
    /// back, returning its cost and the state to use for the next symbol.
    ///
    /// `offset` must be at least 1, `length` at least 2, and this must not
    /// be the very first symbol in the stream (a reference needs
    /// something behind it).
    pub fn encode_reference(
        &self,
        coder: &mut dyn Coder,
        offset: i32,
        length: i32,
        state_before: &LZState,
    ) -> (BitCost, LZState) {
        debug_assert!(offset >= 1);
        debug_assert!(length >= 2);
        debug_assert!(state_before.after_first);

        let parity_offset = self.parity_offset(state_before);
        let mut size = coder.code(1 + CONTEXT_KIND + parity_offset, KIND_REF);

        let rep_offset = offset == state_before.last_offset;
        if !state_before.prev_was_ref {
            size += coder.code(1 + CONTEXT_REPEATED, u8::from(rep_offset));
        } else {
            // A repeated-offset reference can never immediately follow
            // another reference; the parser must not propose one here.
            debug_assert!(!rep_offset);
        }

        if !rep_offset {
            size += encode_number(coder, OFFSET_BASE_CONTEXT, (offset + 2) as u32);
        }
        size += encode_number(coder, LENGTH_BASE_CONTEXT, length as u32);

        let state_after = LZState {
            after_first: true,
            prev_was_ref: true,
            parity: state_before.parity + length,
            last_offset: offset,
        };
        (size, state_after)
    }

    /// Encode the end-of-stream marker: a reference whose offset-number
    /// decodes to offset 0, which is never a valid back-reference offset.
    pub fn finish(&self, coder: &mut dyn Coder, state_before: &LZState) -> BitCost {
        let parity_offset = self.parity_offset(state_before);
        let mut size = coder.code(1 + CONTEXT_KIND + parity_offset, KIND_REF);
        if !state_before.prev_was_ref {
            size += coder.code(1 + CONTEXT_REPEATED, 0);
        }
        size += encode_number(coder, OFFSET_BASE_CONTEXT, 2);
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::CountingCoder;
    use crate::model::NUM_CONTEXTS;

    #[test]
    fn first_literal_skips_the_kind_bit() {
        let encoder = LZEncoder::new(false);
        let mut coder = CountingCoder::new(NUM_CONTEXTS);
        let (_, after) = encoder.encode_literal(&mut coder, b'A', &LZState::initial());
        assert!(after.after_first);
        assert!(!after.prev_was_ref);
        assert_eq!(after.parity, 1);
    }

    #[test]
    fn reference_after_literal_may_use_repeated_offset() {
        let encoder = LZEncoder::new(false);
        let mut coder = CountingCoder::new(NUM_CONTEXTS);
        let state = LZState {
            after_first: true,
            prev_was_ref: false,
            parity: 5,
            last_offset: 10,
        };
        let (_, after) = encoder.encode_reference(&mut coder, 10, 4, &state);
        assert!(after.prev_was_ref);
        assert_eq!(after.last_offset, 10);
        assert_eq!(after.parity, 9);
    }

    #[test]
    fn reference_costs_more_when_offset_is_new() {
        let encoder = LZEncoder::new(false);
        let state = LZState {
            after_first: true,
            prev_was_ref: false,
            parity: 5,
            last_offset: 10,
        };

        let mut repeated = CountingCoder::new(NUM_CONTEXTS);
        let (_, _) = encoder.encode_reference(&mut repeated, 10, 4, &state);

        // Sanity: a repeated-offset reference does not encode OFFSET at
        // all, so it visits fewer distinct contexts than a fresh offset.
        let mut fresh = CountingCoder::new(NUM_CONTEXTS);
        let (_, _) = encoder.encode_reference(&mut fresh, 99, 4, &state);

        let repeated_visits: u64 = (0..NUM_CONTEXTS)
            .map(|c| {
                let (a, b) = repeated.counts(c);
                a + b
            })
            .sum();
        let fresh_visits: u64 = (0..NUM_CONTEXTS)
            .map(|c| {
                let (a, b) = fresh.counts(c);
                a + b
            })
            .sum();
        assert!(fresh_visits > repeated_visits);
    }

    #[test]
    fn finish_encodes_offset_number_two() {
        let encoder = LZEncoder::new(false);
        let mut coder = CountingCoder::new(NUM_CONTEXTS);
        let state = LZState {
            after_first: true,
            prev_was_ref: true,
            parity: 3,
            last_offset: 7,
        };
        let cost = encoder.finish(&mut coder, &state);
        assert_eq!(cost, 0); // CountingCoder never charges a cost
    }

    #[test]
    fn parity_context_splits_kind_and_literal_contexts() {
        let encoder = LZEncoder::new(true);
        let even = LZState {
            parity: 0,
            ..LZState::initial()
        };
        let odd = LZState {
            parity: 1,
            ..LZState::initial()
        };
        let mut even_coder = CountingCoder::new(NUM_CONTEXTS);
        let mut odd_coder = CountingCoder::new(NUM_CONTEXTS);
        encoder.encode_literal(&mut even_coder, b'Z', &even);
        encoder.encode_literal(&mut odd_coder, b'Z', &odd);

        // Same byte, opposite parity: the two passes must have touched
        // disjoint sets of contexts (the whole point of parity_context).
        let mut shared = false;
        for c in 0..NUM_CONTEXTS {
            let (e0, e1) = even_coder.counts(c);
            let (o0, o1) = odd_coder.counts(c);
            if e0 + e1 > 0 && o0 + o1 > 0 {
                shared = true;
            }
        }
        assert!(!shared);
    }

    #[test]
    fn state_at_matches_manual_construction() {
        let state = LZState::at(10, true, 3);
        assert!(state.after_first);
        assert!(state.prev_was_ref);
        assert_eq!(state.parity, 10);
        assert_eq!(state.last_offset, 3);

        let at_zero = LZState::at(0, false, 0);
        assert!(!at_zero.after_first);
    }
}
