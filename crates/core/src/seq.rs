//! The lazy/seq family: `lazy_seq`, `cons`, `chunked_cons`, `chunk_buffer`,
//! `array_chunk`.

use crate::meta::Meta;
use crate::ptr::GcSlice;
use crate::value::Value;
use std::cell::Cell;

/// `lazy_seq { thunk?, realized?, meta? }`.
///
/// Realization is idempotent and memoized: once `state`
/// moves to `Realized`, the thunk is dropped and never invoked again, even
/// if `force` is called concurrently-in-spirit (the core is single
/// threaded, so "concurrently" only means "re-entrantly from the same
/// call stack", which `Cell`'s interior mutability handles correctly since
/// there is no re-entrant mutation here - realization happens once, from
/// the evaluator, before this cell is read again).
#[derive(Clone, Copy, Debug)]
pub struct LazySeqData {
    state: Cell<LazySeqState>,
    pub meta: Meta,
}

#[derive(Clone, Copy, Debug)]
enum LazySeqState {
    Pending(Value),
    Realized(Value),
}

impl LazySeqData {
    pub fn pending(thunk: Value, meta: Meta) -> Self {
        LazySeqData {
            state: Cell::new(LazySeqState::Pending(thunk)),
            meta,
        }
    }

    pub fn is_realized(&self) -> bool {
        matches!(self.state.get(), LazySeqState::Realized(_))
    }

    /// Returns the unrealized thunk, if any; `None` once realized.
    pub fn thunk(&self) -> Option<Value> {
        match self.state.get() {
            LazySeqState::Pending(t) => Some(t),
            LazySeqState::Realized(_) => None,
        }
    }

    /// Returns the realized value, if already forced.
    pub fn realized(&self) -> Option<Value> {
        match self.state.get() {
            LazySeqState::Pending(_) => None,
            LazySeqState::Realized(v) => Some(v),
        }
    }

    /// Record the result of invoking the thunk. The evaluator is
    /// responsible for actually calling the thunk (the analyzer/core has
    /// no evaluator access); this just stores the memoized result.
    ///
    /// Calling this more than once is a no-op after the first call - the
    /// first caller to realize a given `lazy_seq` wins, matching
    /// idempotent-memoization semantics.
    pub fn realize_with(&self, value: Value) {
        if matches!(self.state.get(), LazySeqState::Pending(_)) {
            self.state.set(LazySeqState::Realized(value));
        }
    }
}

/// `cons { first, rest }`: the basic immutable pair.
#[derive(Clone, Copy, Debug)]
pub struct ConsData {
    pub first: Value,
    pub rest: Value,
}

/// `array_chunk { items, off, end }`: a realized, fixed window into a
/// backing array, the unit `chunked_cons` streams through `chunk-next`.
#[derive(Clone, Copy, Debug)]
pub struct ArrayChunkData {
    items: GcSlice<Value>,
    off: usize,
    end: usize,
}

impl ArrayChunkData {
    /// # Safety
    /// `items` must be allocated by a `Heap` and remain alive;
    /// `off <= end <= items.len()`.
    pub unsafe fn new(items: GcSlice<Value>, off: usize, end: usize) -> Self {
        debug_assert!(off <= end && end <= items.len());
        ArrayChunkData { items, off, end }
    }

    pub fn count(&self) -> usize {
        self.end - self.off
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn nth(&self, i: usize) -> Option<Value> {
        if self.off + i < self.end {
            Some(unsafe { self.items.as_slice() }[self.off + i])
        } else {
            None
        }
    }

    pub fn drop_first(&self) -> ArrayChunkData {
        ArrayChunkData {
            items: self.items,
            off: (self.off + 1).min(self.end),
            end: self.end,
        }
    }

    pub fn backing_items(&self) -> GcSlice<Value> {
        self.items
    }
}

/// `chunked_cons { chunk, more }`.
#[derive(Clone, Copy, Debug)]
pub struct ChunkedConsData {
    pub chunk: Value,
    pub more: Value,
}

/// `chunk_buffer`: a transient builder that accumulates items before being
/// turned into an `array_chunk`. Single-threaded, mutable-in-place (it is
/// never itself reachable as a persistent Value once `chunk()` has been
/// called - the evaluator is expected to discard it, mirroring the
/// transient-death-after-persistent! rule the transient collection variants
/// follow).
#[derive(Clone, Copy, Debug)]
pub struct ChunkBufferData {
    buf: GcSlice<Value>,
    count: Cell<usize>,
    dead: Cell<bool>,
}

impl ChunkBufferData {
    /// # Safety
    /// `buf` must be allocated by a `Heap` and remain alive for the life
    /// of this buffer.
    pub unsafe fn new(buf: GcSlice<Value>) -> Self {
        ChunkBufferData {
            buf,
            count: Cell::new(0),
            dead: Cell::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn add(&self, v: Value) -> Result<(), ChunkBufferError> {
        if self.dead.get() {
            return Err(ChunkBufferError::UseAfterChunk);
        }
        let n = self.count.get();
        if n >= self.buf.len() {
            return Err(ChunkBufferError::Full);
        }
        unsafe { self.buf.as_mut_slice() }[n] = v;
        self.count.set(n + 1);
        Ok(())
    }

    /// Finalize the buffer into an `ArrayChunkData` covering the items
    /// added so far, and mark this buffer dead (any further `add` fails).
    pub fn chunk(&self) -> ArrayChunkData {
        self.dead.set(true);
        unsafe { ArrayChunkData::new(self.buf, 0, self.count.get()) }
    }

    pub fn backing_buf(&self) -> GcSlice<Value> {
        self.buf
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkBufferError {
    Full,
    UseAfterChunk,
}

impl std::fmt::Display for ChunkBufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkBufferError::Full => write!(f, "chunk buffer is full"),
            ChunkBufferError::UseAfterChunk => {
                write!(f, "chunk buffer used after being finalized")
            }
        }
    }
}
impl std::error::Error for ChunkBufferError {}
