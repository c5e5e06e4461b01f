use crate::form::SourcePos;
use crate::meta::Meta;
use crate::ptr::GcSlice;
use crate::value::Value;

/// Backing storage for `vector`: an indexed sequence, array-backed for now.
/// A 32-way trie would change how `items` is organized internally without
/// changing this struct's public operations, so that rewrite is deferred
/// (see DESIGN.md).
#[derive(Clone, Copy, Debug)]
pub struct VectorData {
    items: GcSlice<Value>,
    child_positions: GcSlice<SourcePos>,
    pub source: SourcePos,
    pub meta: Meta,
}

impl VectorData {
    /// # Safety
    /// `items`/`child_positions` must be allocated by the same `Heap` and
    /// remain alive, with matching lengths.
    pub unsafe fn new(
        items: GcSlice<Value>,
        child_positions: GcSlice<SourcePos>,
        source: SourcePos,
        meta: Meta,
    ) -> Self {
        debug_assert_eq!(items.len(), child_positions.len());
        VectorData {
            items,
            child_positions,
            source,
            meta,
        }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn nth(&self, i: usize) -> Option<Value> {
        unsafe { self.items.as_slice() }.get(i).copied()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn nth_pos(&self, i: usize) -> SourcePos {
        unsafe { self.child_positions.as_slice() }
            .get(i)
            .copied()
            .unwrap_or(SourcePos::ZERO)
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn first(&self) -> Option<Value> {
        unsafe { self.nth(0) }
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        unsafe { self.items.as_slice() }.iter().copied()
    }

    pub fn backing_items(&self) -> GcSlice<Value> {
        self.items
    }

    pub fn backing_positions(&self) -> GcSlice<SourcePos> {
        self.child_positions
    }
}
