//! The `Coder` abstraction and its two non-entropy-coding flavors.
//!
//! Three things implement "take a (context, bit) pair, return its cost":
//! the real [`RangeCoder`](crate::range_coder::RangeCoder), which actually
//! emits a bitstream; [`CountingCoder`], which just tallies frequencies;
//! and [`SizeMeasuringCoder`], which turns a frequency snapshot into a
//! fixed per-context bit cost. Everything upstream (the LZ encoder, the
//! number code, the parser) is written once against this trait and reused
//! across all three, mirroring `Coder.h`'s virtual-function-pointer
//! interface translated to a trait object.

use crate::BitCost;
use crate::model::BIT_PRECISION;

/// Abstract entropy coder: code a single bit under a context, returning its
/// cost in [`BitCost`] units.
///
/// A `context` `< 0` (the REPEATED pseudo-context) is always a no-op that
/// costs nothing — implementations must not index their context table with
/// it.
pub trait Coder {
    /// Code `bit` under `context`. Returns the cost charged for this bit,
    /// or `0` for a negative (pseudo) context.
    fn code(&mut self, context: i32, bit: u8) -> BitCost;

    /// Whether this coder's `code` is free of side effects, i.e. safe to
    /// call repeatedly for the same (context, bit) without mutating state
    /// — a precondition for the number-code size cache (see
    /// [`crate::model::encode_number`]'s callers in the parser).
    fn cacheable(&self) -> bool {
        false
    }
}

/// Per-context {0,1} tally, used to train a [`SizeMeasuringCoder`] between
/// parser iterations.
#[derive(Debug, Clone)]
pub struct CountingCoder {
    counts: Vec<[u64; 2]>,
}

impl CountingCoder {
    /// Create a counting coder with `num_contexts` all-zero counters.
    pub fn new(num_contexts: usize) -> Self {
        Self {
            counts: vec![[0u64; 2]; num_contexts],
        }
    }

    /// Number of contexts this coder tracks.
    pub fn num_contexts(&self) -> usize {
        self.counts.len()
    }

    /// Raw counts for a context, as `(count_of_0, count_of_1)`.
    pub fn counts(&self, context: usize) -> (u64, u64) {
        let c = self.counts[context];
        (c[0], c[1])
    }

    /// Merge `old` (the running model) and `new` (this iteration's fresh
    /// counts) into a new counter, weighting 3/4 toward `old` — an
    /// exponentially-weighted moving average with alpha = 1/4.
    pub fn merge(old: &CountingCoder, new: &CountingCoder) -> CountingCoder {
        debug_assert_eq!(old.num_contexts(), new.num_contexts());
        let counts = old
            .counts
            .iter()
            .zip(new.counts.iter())
            .map(|(o, n)| [(o[0] * 3 + n[0]) / 4, (o[1] * 3 + n[1]) / 4])
            .collect();
        CountingCoder { counts }
    }
}

impl Coder for CountingCoder {
    fn code(&mut self, context: i32, bit: u8) -> BitCost {
        if context >= 0 && (context as usize) < self.counts.len() {
            self.counts[context as usize][bit as usize] += 1;
        }
        0
    }
}

/// Minimum bit cost charged to any single bit, in [`BitCost`] units.
const MIN_BIT_COST: BitCost = 2;

/// Maximum bit cost charged to any single bit: 12 whole bits.
const MAX_BIT_COST: BitCost = 12 << BIT_PRECISION;

fn size_for_count(count: u64, total: u64) -> BitCost {
    let ratio = total as f64 / count as f64;
    let size = (0.5 + ratio.log2() * f64::from(1u32 << BIT_PRECISION)).floor() as BitCost;
    size.clamp(MIN_BIT_COST, MAX_BIT_COST)
}

/// A fast, side-effect-free cost oracle: a fixed per-context (bit=0, bit=1)
/// [`BitCost`] derived from a [`CountingCoder`] snapshot via Laplace
/// smoothing, used to drive the parser's search without mutating any
/// adaptive state.
#[derive(Debug, Clone)]
pub struct SizeMeasuringCoder {
    context_sizes: Vec<[BitCost; 2]>,
    number_cache: Option<NumberSizeCache>,
}

/// Per-context-group cache of number-code sizes, keyed by
/// `(base_context - number_context_offset) >> 8` as in `Coder.c`.
#[derive(Debug, Clone)]
struct NumberSizeCache {
    number_context_offset: i32,
    /// `sizes[group][n]` is the cost of encoding `n` under that group's
    /// base context, for `n` in `2..max_number`.
    sizes: Vec<Vec<BitCost>>,
}

impl SizeMeasuringCoder {
    /// Build a size-measuring coder from a frequency snapshot.
    pub fn new(counting_coder: &CountingCoder) -> Self {
        let context_sizes = (0..counting_coder.num_contexts())
            .map(|ctx| {
                let (c0, c1) = counting_coder.counts(ctx);
                let count0 = c0 + 1;
                let count1 = c1 + 1;
                let total = count0 + count1;
                [size_for_count(count0, total), size_for_count(count1, total)]
            })
            .collect();
        Self {
            context_sizes,
            number_cache: None,
        }
    }

    /// Precompute a size table for every number-coded context group, so
    /// that [`crate::model::encode_number`] costs become O(1) lookups
    /// during the parser's inner loop. Only meaningful because this
    /// coder's `code` is pure — see [`Coder::cacheable`].
    pub fn set_number_contexts(
        &mut self,
        number_context_offset: i32,
        n_number_contexts: usize,
        max_number: u32,
    ) {
        let max_number = max_number.max(2) as usize;
        let mut sizes = vec![Vec::new(); n_number_contexts];
        for (group, table) in sizes.iter_mut().enumerate() {
            let base_context = number_context_offset + ((group as i32) << 8);
            table.push(0); // unused, index 0 and 1 never occur (n >= 2)
            table.push(0);
            for n in 2..max_number as u32 {
                let cost = crate::model::encode_number(self, base_context, n);
                table.push(cost);
            }
        }
        self.number_cache = Some(NumberSizeCache {
            number_context_offset,
            sizes,
        });
    }

    /// Look up a cached number-code size, if the cache covers `(base_context, n)`.
    pub fn cached_number_size(&self, base_context: i32, n: u32) -> Option<BitCost> {
        let cache = self.number_cache.as_ref()?;
        let group = (base_context - cache.number_context_offset) >> 8;
        let table = cache.sizes.get(group as usize)?;
        table.get(n as usize).copied()
    }
}

impl Coder for SizeMeasuringCoder {
    fn code(&mut self, context: i32, bit: u8) -> BitCost {
        if context >= 0 && (context as usize) < self.context_sizes.len() {
            self.context_sizes[context as usize][bit as usize]
        } else {
            1 << BIT_PRECISION
        }
    }

    fn cacheable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_coder_tallies_bits() {
        let mut coder = CountingCoder::new(4);
        coder.code(0, 1);
        coder.code(0, 1);
        coder.code(0, 0);
        assert_eq!(coder.counts(0), (1, 2));
    }

    #[test]
    fn counting_coder_ignores_negative_context() {
        let mut coder = CountingCoder::new(4);
        assert_eq!(coder.code(-1, 1), 0);
    }

    #[test]
    fn merge_weights_history_three_to_one() {
        let mut old = CountingCoder::new(1);
        for _ in 0..4 {
            old.code(0, 1);
        }
        let new = CountingCoder::new(1);
        let merged = CountingCoder::merge(&old, &new);
        // (4*3 + 0) / 4 == 3
        assert_eq!(merged.counts(0), (0, 3));
    }

    #[test]
    fn size_measuring_coder_clamps_extremes() {
        let mut counting = CountingCoder::new(1);
        for _ in 0..1000 {
            counting.code(0, 0);
        }
        let mut measurer = SizeMeasuringCoder::new(&counting);
        // bit=1 is very rare here, so its cost should hit the cap.
        assert_eq!(measurer.code(0, 1), MAX_BIT_COST);
        // bit=0 is near-certain, so its cost should hit the floor.
        assert_eq!(measurer.code(0, 0), MIN_BIT_COST);
    }

    #[test]
    fn size_measuring_coder_is_cacheable_and_deterministic() {
        let counting = CountingCoder::new(2048);
        let mut measurer = SizeMeasuringCoder::new(&counting);
        assert!(measurer.cacheable());
        measurer.set_number_contexts(crate::model::NUMBER_CONTEXT_OFFSET, 2, 64);
        for n in 2u32..64 {
            let direct = crate::model::encode_number(
                &mut SizeMeasuringCoder::new(&counting),
                crate::model::NUMBER_CONTEXT_OFFSET,
                n,
            );
            let cached = measurer
                .cached_number_size(crate::model::NUMBER_CONTEXT_OFFSET, n)
                .unwrap();
            assert_eq!(direct, cached);
        }
    }
}
