//! The binary range coder: the only [`Coder`] that actually emits bytes.
//!
//! Probabilities are 16-bit values scaled so `0x8000` means P(bit=1) = 50%.
//! The interval is tracked as `[intervalmin, intervalmin + intervalsize)`
//! within a 16-bit window; renormalization shifts both halves left and
//! widens the output bit stream one bit at a time, propagating carries
//! backward into already-emitted bytes. Ported from `RangeCoder.c`.

use crate::BitCost;
use crate::coder::Coder;
use crate::model::BIT_PRECISION;

const PROB_INIT: u16 = 0x8000;
const PROB_SHIFT: u32 = 4;

/// `sizetable[k]` is the precomputed, rounded cost in [`BitCost`] units of an
/// interval occupying fraction `(128 + k) / 256` of the probability space:
/// `round((8 - log2(128 + k)) * 64)`.
fn size_table() -> &'static [i64; 128] {
    use std::sync::OnceLock;
    static TABLE: OnceLock<[i64; 128]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0i64; 128];
        for (k, slot) in table.iter_mut().enumerate() {
            let x = (128 + k) as f64;
            *slot = (0.5 + (8.0 - x.log2()) * f64::from(1u32 << BIT_PRECISION)).floor() as i64;
        }
        table
    })
}

/// Adaptive binary range coder over a flat array of `num_contexts`
/// probability slots.
#[derive(Debug, Clone)]
pub struct RangeCoder {
    contexts: Vec<u16>,
    output: Vec<u8>,
    intervalmin: u32,
    intervalsize: u32,
    /// Index of the next bit to produce in `output`; starts at -1 (no bits
    /// emitted yet), so it is signed and wide enough never to overflow for
    /// any input this crate can address.
    dest_bit: i64,
}

impl RangeCoder {
    /// Create a range coder with `num_contexts` probabilities, all
    /// initialized to 50%.
    pub fn new(num_contexts: usize) -> Self {
        Self {
            contexts: vec![PROB_INIT; num_contexts],
            output: Vec::new(),
            intervalmin: 0,
            intervalsize: 0x8000,
            dest_bit: -1,
        }
    }

    /// Re-initialize every context probability to 50%, leaving the output
    /// buffer and interval state untouched. Used between training
    /// iterations' throwaway re-encodes and before the real final pass.
    pub fn reset_probabilities(&mut self) {
        self.contexts.fill(PROB_INIT);
    }

    fn current_size(&self) -> i64 {
        let index = ((self.intervalsize - 0x8000) >> 8) as usize;
        (self.dest_bit << BIT_PRECISION) + size_table()[index]
    }

    /// Toggle output bits backward from `dest_bit - 1` until a 0→1
    /// transition occurs, growing the output as needed. Implements the
    /// carry chain of a range coder that has already emitted bytes.
    fn add_bit(&mut self) {
        let mut pos = self.dest_bit;
        loop {
            pos -= 1;
            if pos < 0 {
                return;
            }
            let byte_pos = (pos >> 3) as usize;
            let bitmask = 0x80u8 >> (pos & 7);
            while byte_pos >= self.output.len() {
                self.output.push(0);
            }
            self.output[byte_pos] ^= bitmask;
            if self.output[byte_pos] & bitmask != 0 {
                break;
            }
        }
    }

    /// Shrink the interval to a byte-aligned endpoint and trim the output
    /// to the exact number of bytes the emitted bits span. Consumes the
    /// coder since no further `code` calls are meaningful afterward.
    pub fn finish(mut self) -> Vec<u8> {
        let intervalmax = self.intervalmin + self.intervalsize;
        let mut final_min: u32 = 0;
        let mut final_size: u32 = 0x10000;
        while final_min < self.intervalmin || final_min + final_size >= intervalmax {
            if final_min + final_size < intervalmax {
                self.add_bit();
                final_min += final_size;
            }
            self.dest_bit += 1;
            final_size >>= 1;
        }
        let required_bytes = (((self.dest_bit - 1) >> 3) + 1).max(0) as usize;
        self.output.resize(required_bytes, 0);
        self.output
    }
}

impl Coder for RangeCoder {
    fn code(&mut self, context: i32, bit: u8) -> BitCost {
        if context < 0 {
            return 0;
        }
        let ctx = context as usize;
        let size_before = self.current_size();

        let prob = u32::from(self.contexts[ctx]);
        let threshold = (self.intervalsize.wrapping_mul(prob)) >> 16;
        let new_prob = if bit == 0 {
            self.intervalmin += threshold;
            if self.intervalmin & 0x10000 != 0 {
                self.add_bit();
            }
            self.intervalsize -= threshold;
            prob - (prob >> PROB_SHIFT)
        } else {
            self.intervalsize = threshold;
            prob + ((0xffffu32 - prob) >> PROB_SHIFT)
        };
        debug_assert!(new_prob > 0 && new_prob < 0x10000);
        self.contexts[ctx] = new_prob as u16;

        while self.intervalsize < 0x8000 {
            self.dest_bit += 1;
            self.intervalsize <<= 1;
            self.intervalmin <<= 1;
            if self.intervalmin & 0x10000 != 0 {
                self.add_bit();
            }
        }
        self.intervalmin &= 0xffff;

        self.current_size() - size_before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stream_emits_exactly_one_byte() {
        let coder = RangeCoder::new(1);
        let out = coder.finish();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn coding_a_bit_returns_a_positive_cost() {
        let mut coder = RangeCoder::new(1);
        let cost = coder.code(0, 1);
        assert!(cost > 0);
    }

    #[test]
    fn negative_context_is_free() {
        let mut coder = RangeCoder::new(1);
        assert_eq!(coder.code(-1, 1), 0);
    }

    #[test]
    fn reset_probabilities_restores_fifty_percent() {
        let mut coder = RangeCoder::new(2);
        for _ in 0..20 {
            coder.code(0, 1);
        }
        coder.reset_probabilities();
        assert!(coder.contexts.iter().all(|&p| p == PROB_INIT));
    }

    #[test]
    fn repeatedly_coding_the_likely_bit_is_cheap_and_output_grows() {
        let mut coder = RangeCoder::new(1);
        let mut total = 0i64;
        for _ in 0..64 {
            total += coder.code(0, 0);
        }
        let out = coder.finish();
        assert!(!out.is_empty());
        assert!(total > 0);
    }

    #[test]
    fn biased_stream_is_smaller_than_unbiased_stream() {
        let mut biased = RangeCoder::new(1);
        for i in 0..256 {
            biased.code(0, (i % 16 == 0) as u8);
        }
        let biased_out = biased.finish();

        let mut unbiased = RangeCoder::new(1);
        for i in 0..256 {
            unbiased.code(0, (i % 2) as u8);
        }
        let unbiased_out = unbiased.finish();

        assert!(biased_out.len() < unbiased_out.len());
    }
}
