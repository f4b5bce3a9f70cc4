//! Cost-optimal LZ parsing over the reference DAG built from
//! [`crate::match_finder::MatchFinder`] candidates.
//!
//! Ported from `LZParser.c`: a left-to-right sweep over source positions
//! that assimilates the cheapest incoming edge at each position, asks the
//! match finder for every candidate back-reference starting there, and
//! stores the resulting outgoing edges keyed by offset so a later sweep
//! step can pick them back up. `RefEdge.c`/`Heap.c`'s arena and max-heap
//! (see [`crate::edge`]) hold the live part of the DAG; positions that
//! have been swept past are never revisited.

use std::collections::HashMap;

use crate::BitCost;
use crate::coder::Coder;
use crate::edge::{EdgeArena, EdgeHandle, EdgeHeap};
use crate::lz_encoder::{LZEncoder, LZState};
use crate::match_finder::MatchFinder;
use crate::progress::Progress;

/// Tunables for a single parse sweep, independent of the entropy model.
/// Mirrors the subset of `PackParams` (spec "External Interfaces") that
/// the parser itself consumes.
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    /// For each reported match, also try lengths shorter by up to this
    /// many bytes.
    pub length_margin: i32,
    /// Match length at or above which the skip heuristic may trigger.
    pub skip_length: i32,
    /// Maximum number of simultaneously live [`crate::edge::RefEdge`]s.
    pub edge_capacity: usize,
}

/// One chosen back-reference in the final parse: a literal run precedes
/// it implicitly (whatever bytes separate it from the previous edge's end
/// or the start of the file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedEdge {
    /// Source position where the reference begins.
    pub pos: i32,
    /// Back-reference offset.
    pub offset: i32,
    /// Back-reference length.
    pub length: i32,
}

/// The output of [`parse`]: an ordered chain of back-references plus
/// enough bookkeeping to replay it with [`encode_result`].
#[derive(Debug, Clone)]
pub struct LZParseResult {
    /// Chosen references, in increasing `pos` order.
    pub edges: Vec<ParsedEdge>,
    /// Length of the source the parse covers.
    pub source_len: usize,
    /// Trailing zero bytes to additionally encode after the source data,
    /// for callers that need a safety margin for in-place decompression.
    /// Zero for a plain `compress()` call.
    pub zero_padding: u32,
}

/// Precompute `literal_size[i]`: the cost, in [`BitCost`] units, of
/// encoding `data[0..i)` as literals from the initial LZ state, threading
/// state byte by byte. Requires `coder` to be side-effect-free (see
/// [`Coder::cacheable`]) since the parser calls back into these costs
/// throughout the sweep while `coder` itself is re-queried for edges.
fn literal_prefix_sizes(data: &[u8], encoder: &LZEncoder, coder: &mut dyn Coder) -> Vec<BitCost> {
    let mut sizes = Vec::with_capacity(data.len() + 1);
    sizes.push(0);
    let mut state = LZState::initial();
    for &byte in data {
        let (cost, next) = encoder.encode_literal(coder, byte, &state);
        sizes.push(sizes.last().unwrap() + cost);
        state = next;
    }
    sizes
}

/// Insert `handle` into `map` keyed by its offset, adding it to `heap` if
/// it becomes (or stays) the best edge for that offset; otherwise evict
/// the loser. Consumes exactly one reference count's worth of ownership
/// of `handle` either way. Ported from `LZParser.c`'s `put_by_offset`.
fn put_by_offset(
    arena: &mut EdgeArena,
    heap: &mut EdgeHeap,
    map: &mut HashMap<i32, EdgeHandle>,
    handle: EdgeHandle,
) {
    let offset = arena.get(handle).offset;
    match map.get(&offset).copied() {
        None => {
            map.insert(offset, handle);
            heap.insert(arena, handle);
        }
        Some(incumbent) => {
            if arena.get(handle).total_size < arena.get(incumbent).total_size {
                heap.remove(arena, incumbent);
                arena.release(incumbent);
                map.insert(offset, handle);
                heap.insert(arena, handle);
            } else {
                arena.release(handle);
            }
        }
    }
}

/// Release every edge held by a per-target offset map, without touching
/// the heap (callers must already have removed these from the heap, or
/// know they were never in it).
fn release_all(arena: &mut EdgeArena, map: &mut HashMap<i32, EdgeHandle>) {
    for (_, handle) in map.drain() {
        arena.release(handle);
    }
}

/// Pop the single worst (largest `total_size`) edge from `heap` and either
/// release it or discard it, mirroring `LZParser.c`'s `clean_worst_edge`:
///
/// - if it is `best` or `source`, it must survive — drop it from the heap
///   without releasing it (its refcount is still held by the `best`
///   pointer or the chain under construction) and let the caller retry
///   against the next-worst edge;
/// - otherwise, look it up in whichever container could still hold it —
///   `edges_to_pos[target]` if its target lies ahead of the sweep, or
///   `best_for_offset` if the sweep has already passed it — and only
///   erase-and-release it if that container's current entry for its
///   offset is actually this edge (it may already have lost that slot to
///   a cheaper edge via `put_by_offset`, in which case it is left alone).
///
/// Returns `false` only when the heap was empty, the signal for the
/// caller to give up on making room.
fn clean_worst_edge(
    arena: &mut EdgeArena,
    heap: &mut EdgeHeap,
    edges_to_pos: &mut [HashMap<i32, EdgeHandle>],
    best_for_offset: &mut HashMap<i32, EdgeHandle>,
    pos: i32,
    best: EdgeHandle,
    source: EdgeHandle,
) -> bool {
    let Some(victim) = heap.remove_largest(arena) else {
        return false;
    };
    if victim == best || victim == source {
        return true;
    }
    let (victim_target, victim_offset) = {
        let v = arena.get(victim);
        (v.target(), v.offset)
    };
    let container: &mut HashMap<i32, EdgeHandle> = if victim_target > pos {
        &mut edges_to_pos[victim_target as usize]
    } else {
        best_for_offset
    };
    if container.get(&victim_offset) == Some(&victim) {
        container.remove(&victim_offset);
        arena.release(victim);
    }
    true
}

/// Build and evaluate a single candidate reference edge `pos..pos+length`
/// at `offset`, chained from `source`, and file it into
/// `edges_to_pos[pos + length]`. Evicts the arena's most expensive edge
/// (see [`clean_worst_edge`]) when full, protecting `best` and `source`
/// from eviction.
#[allow(clippy::too_many_arguments)]
fn new_edge(
    arena: &mut EdgeArena,
    heap: &mut EdgeHeap,
    edges_to_pos: &mut [HashMap<i32, EdgeHandle>],
    best_for_offset: &mut HashMap<i32, EdgeHandle>,
    encoder: &LZEncoder,
    coder: &mut dyn Coder,
    literal_size: &[BitCost],
    n: i32,
    pos: i32,
    offset: i32,
    length: i32,
    source: EdgeHandle,
    best: EdgeHandle,
) {
    let target = pos + length;
    let (source_offset, source_target, source_total_size) = {
        let src = arena.get(source);
        (src.offset, src.target(), src.total_size)
    };
    let prev_was_ref = pos == source_target;
    if source_offset == offset && prev_was_ref {
        // A reference can never immediately follow another reference with
        // the same offset (see `LZEncoder::encode_reference`'s invariant);
        // a real extension of `source` is already covered by the longer
        // lengths this same sweep step tries against `source` itself.
        return;
    }
    let state_before = LZState::at(pos, prev_was_ref, source_offset);

    let size_before = source_total_size - (literal_size[n as usize] - literal_size[pos as usize]);
    let (edge_size, _) = encoder.encode_reference(coder, offset, length, &state_before);
    let size_after = literal_size[n as usize] - literal_size[target as usize];
    let total_size = size_before + edge_size + size_after;

    while arena.full() {
        if !clean_worst_edge(arena, heap, edges_to_pos, best_for_offset, pos, best, source) {
            break;
        }
    }

    let handle = arena.create(pos, offset, length, total_size, source);
    arena.retain(handle);
    put_by_offset(arena, heap, &mut edges_to_pos[target as usize], handle);
}

/// Run the cost-optimal parse of `data` under `coder` (a pure cost oracle
/// — see [`Coder::cacheable`]), using `match_finder` for candidate
/// back-references. Returns the chosen reference chain.
pub fn parse(
    data: &[u8],
    encoder: &LZEncoder,
    coder: &mut dyn Coder,
    match_finder: &mut MatchFinder,
    config: &ParserConfig,
    progress: &mut dyn Progress,
) -> LZParseResult {
    debug_assert!(coder.cacheable(), "parser requires a side-effect-free coder");
    let n = data.len() as i32;

    let literal_size = literal_prefix_sizes(data, encoder, coder);

    let mut arena = EdgeArena::new(config.edge_capacity.max(1));
    let mut heap = EdgeHeap::new();
    let mut edges_to_pos: Vec<HashMap<i32, EdgeHandle>> =
        (0..=n as usize).map(|_| HashMap::new()).collect();
    let mut best_for_offset: HashMap<i32, EdgeHandle> = HashMap::new();

    let root = arena.create(0, 0, 0, literal_size[n as usize], EdgeHandle::NONE);
    arena.retain(root); // permanent hold, released at the very end
    arena.retain(root); // the `best` pointer's hold
    let mut best = root;

    match_finder.reset();
    progress.begin(n as usize);

    let mut pos: i32 = 0;
    while pos <= n {
        // 1. Assimilate edges that target this position.
        let incoming: Vec<EdgeHandle> = edges_to_pos[pos as usize].drain().map(|(_, h)| h).collect();
        for e in incoming {
            let (e_size, e_offset) = {
                let edge = arena.get(e);
                (edge.total_size, edge.offset)
            };
            let (b_size, b_offset) = {
                let edge = arena.get(best);
                (edge.total_size, edge.offset)
            };
            if e_size < b_size || (e_size == b_size && e_offset < b_offset) {
                arena.retain(e);
                let old_best = best;
                best = e;
                arena.release(old_best);
            }
            heap.remove(&mut arena, e);
            put_by_offset(&mut arena, &mut heap, &mut best_for_offset, e);
        }

        if pos == n {
            break;
        }

        // 2. Enumerate match candidates at this position.
        match_finder.begin_matching(pos);
        let mut candidates: Vec<(i32, i32)> = Vec::new();
        let mut max_match_length = 0i32;
        while let Some((match_pos, raw_length)) = match_finder.next_match() {
            let match_length = raw_length.min(n - pos);
            if match_length < 2 {
                continue;
            }
            max_match_length = max_match_length.max(match_length);
            candidates.push((match_pos, match_length));
        }

        for (match_pos, match_length) in candidates {
            let offset = pos - match_pos;
            let min_length = 2.max(match_length - config.length_margin);
            for length in min_length..=match_length {
                new_edge(
                    &mut arena,
                    &mut heap,
                    &mut edges_to_pos,
                    &mut best_for_offset,
                    encoder,
                    coder,
                    &literal_size,
                    n,
                    pos,
                    offset,
                    length,
                    best,
                    best,
                );
                if arena.get(best).offset != offset {
                    if let Some(&alt_source) = best_for_offset.get(&offset) {
                        new_edge(
                            &mut arena,
                            &mut heap,
                            &mut edges_to_pos,
                            &mut best_for_offset,
                            encoder,
                            coder,
                            &literal_size,
                            n,
                            pos,
                            offset,
                            length,
                            alt_source,
                            best,
                        );
                    }
                }
            }
        }

        // 3. Skip heuristic.
        if max_match_length >= config.skip_length {
            let target = pos + max_match_length;
            if !edges_to_pos[target as usize].is_empty() {
                for t in pos..target {
                    let handles: Vec<EdgeHandle> =
                        edges_to_pos[t as usize].drain().map(|(_, h)| h).collect();
                    for h in handles {
                        heap.remove(&mut arena, h);
                        arena.release(h);
                    }
                }
                release_all(&mut arena, &mut best_for_offset);
                arena.retain(root);
                let old_best = best;
                best = root;
                arena.release(old_best);
                pos = target - 1;
            }
        }

        progress.update(pos as usize);
        pos += 1;
    }
    progress.end();

    // Walk the winning chain before releasing anything it touches.
    let mut edges = Vec::new();
    let mut cursor = best;
    while !arena.is_root(cursor) {
        let edge = arena.get(cursor);
        edges.push(ParsedEdge {
            pos: edge.pos,
            offset: edge.offset,
            length: edge.length,
        });
        cursor = edge.source;
    }
    edges.reverse();

    release_all(&mut arena, &mut best_for_offset);
    arena.release(best);
    arena.release(root);
    debug_assert_eq!(arena.len(), 0, "parse leaked edges from the arena");

    LZParseResult {
        edges,
        source_len: data.len(),
        zero_padding: 0,
    }
}

/// Replay a parse result through `coder`, reconstructing the exact
/// literal/reference symbol sequence the parser chose. Used both to
/// measure the real (non cost-model) size of a candidate result and to
/// produce the final bitstream. Returns the final [`LZState`].
pub fn encode_result(
    encoder: &LZEncoder,
    coder: &mut dyn Coder,
    data: &[u8],
    result: &LZParseResult,
) -> LZState {
    let mut state = LZState::initial();
    let mut cursor = 0usize;

    for edge in &result.edges {
        while cursor < edge.pos as usize {
            let (_, next) = encoder.encode_literal(coder, data[cursor], &state);
            state = next;
            cursor += 1;
        }
        let (_, next) = encoder.encode_reference(coder, edge.offset, edge.length, &state);
        state = next;
        cursor += edge.length as usize;
    }
    while cursor < result.source_len {
        let (_, next) = encoder.encode_literal(coder, data[cursor], &state);
        state = next;
        cursor += 1;
    }

    if result.zero_padding > 0 {
        let (_, next) = encoder.encode_literal(coder, 0, &state);
        state = next;
        if result.zero_padding == 2 {
            let (_, next) = encoder.encode_literal(coder, 0, &state);
            state = next;
        } else if result.zero_padding > 2 {
            let (_, next) = encoder.encode_reference(coder, 1, result.zero_padding as i32 - 1, &state);
            state = next;
        }
    }

    encoder.finish(coder, &state);
    state
}

/// Reconstruct the original bytes from a parse result, purely by
/// replaying its (pos, offset, length) triples against `data` itself —
/// the same LZ77 substitution a real decompressor performs, without any
/// entropy coding involved. Used to sanity-check a parse independent of
/// the bitstream format.
#[cfg(test)]
fn replay(data: &[u8], result: &LZParseResult) -> Vec<u8> {
    let mut out = Vec::with_capacity(result.source_len);
    for edge in &result.edges {
        while out.len() < edge.pos as usize {
            out.push(data[out.len()]);
        }
        for _ in 0..edge.length {
            let src = out.len() - edge.offset as usize;
            let byte = out[src];
            out.push(byte);
        }
    }
    while out.len() < result.source_len {
        out.push(data[out.len()]);
    }
    out
}
