//! Arena-allocated reference-edge pool and the max-heap that evicts the
//! cheapest-looking edge once the arena is full.
//!
//! Grounded on `RefEdge.c/h` (the edge struct and its factory) and
//! `Heap.c/h` (the binary heap keyed by `total_size`). The reference
//! source calls its eviction operation `remove_largest` while documenting
//! it as the way to find the *worst* (highest-cost) edge to discard; both
//! sides agree it is a genuine max-heap, so that's what this module
//! builds. Raw pointers and manual refcounting become arena indices
//! (`EdgeHandle`) and a `refcount` field inside each slot.

use crate::BitCost;

/// Index into an [`EdgeArena`]. `NONE` stands in for a null edge pointer:
/// the root of a parse, or "no cheaper offset known yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeHandle(u32);

impl EdgeHandle {
    /// The null handle.
    pub const NONE: EdgeHandle = EdgeHandle(u32::MAX);

    /// Whether this handle is [`NONE`](Self::NONE).
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// A single candidate in the cost-minimization DAG: a back-reference (or
/// the artificial root) ending at `pos + length`, chained back to
/// `source`.
#[derive(Debug, Clone)]
pub struct RefEdge {
    /// Start position of this edge's reference (or the root sentinel).
    pub pos: i32,
    /// Back-reference offset; meaningless on the root edge.
    pub offset: i32,
    /// Back-reference length; meaningless on the root edge.
    pub length: i32,
    /// Total encoded size, in [`BitCost`] units, of every edge in the
    /// chain from the root up to and including this one.
    pub total_size: BitCost,
    /// The edge this one was chained from; [`EdgeHandle::NONE`] only for
    /// the root.
    pub source: EdgeHandle,
    refcount: i32,
    heap_index: i32,
}

impl RefEdge {
    /// The position this edge's reference (or literal run) reaches.
    pub fn target(&self) -> i32 {
        self.pos + self.length
    }
}

/// Fixed-capacity pool of [`RefEdge`] slots with reference counting, so an
/// edge referenced from several places (a position map, the heap, a
/// chain of later edges) is only freed once nothing points to it anymore.
#[derive(Debug)]
pub struct EdgeArena {
    slots: Vec<Option<RefEdge>>,
    free: Vec<u32>,
}

impl EdgeArena {
    /// Create an arena with room for `capacity` live edges at once.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity as u32).rev().collect(),
        }
    }

    /// Whether the arena has no free slots; the caller must evict (see
    /// [`EdgeHeap::remove_largest`]) before the next [`create`](Self::create).
    pub fn full(&self) -> bool {
        self.free.is_empty()
    }

    /// Number of live edges currently allocated.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Read access to a live edge.
    pub fn get(&self, handle: EdgeHandle) -> &RefEdge {
        self.slots[handle.0 as usize]
            .as_ref()
            .expect("handle refers to a live edge")
    }

    pub(crate) fn heap_index(&self, handle: EdgeHandle) -> i32 {
        self.slots[handle.0 as usize]
            .as_ref()
            .map_or(-1, |e| e.heap_index)
    }

    pub(crate) fn set_heap_index(&mut self, handle: EdgeHandle, index: i32) {
        if let Some(edge) = self.slots[handle.0 as usize].as_mut() {
            edge.heap_index = index;
        }
    }

    /// Allocate a new edge chained from `source` (or [`EdgeHandle::NONE`]
    /// for the root). `source`'s refcount is bumped; the new edge starts
    /// with a refcount of zero, owned implicitly by the caller until it is
    /// stored somewhere via [`retain`](Self::retain).
    pub fn create(
        &mut self,
        pos: i32,
        offset: i32,
        length: i32,
        total_size: BitCost,
        source: EdgeHandle,
    ) -> EdgeHandle {
        if !source.is_none() {
            self.slots[source.0 as usize]
                .as_mut()
                .expect("source is live")
                .refcount += 1;
        }
        let index = self.free.pop().expect("arena not full");
        self.slots[index as usize] = Some(RefEdge {
            pos,
            offset,
            length,
            total_size,
            source,
            refcount: 0,
            heap_index: -1,
        });
        EdgeHandle(index)
    }

    /// Record an additional owner of `handle`.
    pub fn retain(&mut self, handle: EdgeHandle) {
        if handle.is_none() {
            return;
        }
        self.slots[handle.0 as usize]
            .as_mut()
            .expect("handle refers to a live edge")
            .refcount += 1;
    }

    /// Drop one owner of `handle`. Once its refcount reaches zero the slot
    /// is freed and its source is released in turn, recursively
    /// collapsing a chain that nothing reaches anymore.
    pub fn release(&mut self, handle: EdgeHandle) {
        if handle.is_none() {
            return;
        }
        let (should_free, source) = {
            let edge = self.slots[handle.0 as usize]
                .as_mut()
                .expect("handle refers to a live edge");
            edge.refcount -= 1;
            (edge.refcount <= 0, edge.source)
        };
        if should_free {
            self.slots[handle.0 as usize] = None;
            self.free.push(handle.0);
            self.release(source);
        }
    }

    /// Whether `handle` is the artificial root edge (no source).
    pub fn is_root(&self, handle: EdgeHandle) -> bool {
        self.get(handle).source.is_none()
    }
}

/// A max-heap of [`EdgeHandle`]s ordered by `total_size`, with each edge's
/// position in the heap array mirrored back into its slot so any live
/// edge can be removed in O(log n) without a linear search. Ported from
/// `Heap.c`.
#[derive(Debug, Default)]
pub struct EdgeHeap {
    handles: Vec<EdgeHandle>,
}

impl EdgeHeap {
    /// An empty heap.
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Number of edges currently in the heap.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the heap holds no edges.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn size_of(arena: &EdgeArena, handle: EdgeHandle) -> BitCost {
        arena.get(handle).total_size
    }

    fn swap(&mut self, arena: &mut EdgeArena, i: usize, j: usize) {
        self.handles.swap(i, j);
        let hi = self.handles[i];
        let hj = self.handles[j];
        arena.set_heap_index(hi, i as i32);
        arena.set_heap_index(hj, j as i32);
    }

    fn sift_up(&mut self, arena: &mut EdgeArena, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if Self::size_of(arena, self.handles[parent]) >= Self::size_of(arena, self.handles[i])
            {
                break;
            }
            self.swap(arena, parent, i);
            i = parent;
        }
    }

    fn sift_down(&mut self, arena: &mut EdgeArena, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut largest = i;
            if left < self.handles.len()
                && Self::size_of(arena, self.handles[left]) > Self::size_of(arena, self.handles[largest])
            {
                largest = left;
            }
            if right < self.handles.len()
                && Self::size_of(arena, self.handles[right])
                    > Self::size_of(arena, self.handles[largest])
            {
                largest = right;
            }
            if largest == i {
                break;
            }
            self.swap(arena, i, largest);
            i = largest;
        }
    }

    /// Insert `handle` into the heap.
    pub fn insert(&mut self, arena: &mut EdgeArena, handle: EdgeHandle) {
        let index = self.handles.len();
        self.handles.push(handle);
        arena.set_heap_index(handle, index as i32);
        self.sift_up(arena, index);
    }

    /// Remove and return the edge with the largest `total_size`.
    pub fn remove_largest(&mut self, arena: &mut EdgeArena) -> Option<EdgeHandle> {
        if self.handles.is_empty() {
            return None;
        }
        let top = self.handles[0];
        self.remove_at(arena, 0);
        Some(top)
    }

    /// Remove a specific edge from wherever it sits in the heap, if it is
    /// present.
    pub fn remove(&mut self, arena: &mut EdgeArena, handle: EdgeHandle) {
        let index = arena.heap_index(handle);
        if index < 0 {
            return;
        }
        self.remove_at(arena, index as usize);
    }

    fn remove_at(&mut self, arena: &mut EdgeArena, index: usize) {
        let last = self.handles.len() - 1;
        arena.set_heap_index(self.handles[index], -1);
        if index != last {
            self.handles[index] = self.handles[last];
            arena.set_heap_index(self.handles[index], index as i32);
        }
        self.handles.pop();
        if index < self.handles.len() {
            self.sift_down(arena, index);
            self.sift_up(arena, index);
        }
    }

    /// Whether `handle` currently sits in this heap.
    pub fn contains(&self, arena: &EdgeArena, handle: EdgeHandle) -> bool {
        arena.heap_index(handle) >= 0
    }

    /// Drop every edge from the heap, clearing their heap indices but
    /// leaving their refcounts untouched (callers still hold them via
    /// position maps or must [`EdgeArena::release`] them separately).
    pub fn clear(&mut self, arena: &mut EdgeArena) {
        for &h in &self.handles {
            arena.set_heap_index(h, -1);
        }
        self.handles.clear();
    }
}
