use crate::form::SourcePos;
use crate::meta::Meta;
use crate::ptr::GcSlice;
use crate::value::Value;

/// Backing storage for `list`: an immutable, array-backed, ordered
/// sequence. `rest` shares the same backing array and simply advances
/// `offset` - no copy, no new allocation.
#[derive(Clone, Copy, Debug)]
pub struct ListData {
    items: GcSlice<Value>,
    /// Parallel to `items`; `SourcePos::ZERO` entries mean "no recorded
    /// position" (synthetic data, or a child that was itself synthetic).
    child_positions: GcSlice<SourcePos>,
    offset: usize,
    len: usize,
    pub source: SourcePos,
    pub meta: Meta,
}

impl ListData {
    /// # Safety
    /// `items` and `child_positions` must have been allocated by the same
    /// `Heap` and remain alive; `child_positions.len() == items.len()`.
    pub unsafe fn new_full(
        items: GcSlice<Value>,
        child_positions: GcSlice<SourcePos>,
        source: SourcePos,
        meta: Meta,
    ) -> Self {
        debug_assert_eq!(items.len(), child_positions.len());
        ListData {
            items,
            child_positions,
            offset: 0,
            len: items.len(),
            source,
            meta,
        }
    }

    pub fn count(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn first(&self) -> Option<Value> {
        if self.len == 0 {
            None
        } else {
            Some(unsafe { self.items.as_slice() }[self.offset])
        }
    }

    pub fn rest(&self) -> ListData {
        if self.len == 0 {
            *self
        } else {
            ListData {
                items: self.items,
                child_positions: self.child_positions,
                offset: self.offset + 1,
                len: self.len - 1,
                source: SourcePos::ZERO,
                meta: Meta::none(),
            }
        }
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn nth(&self, i: usize) -> Option<Value> {
        if i >= self.len {
            None
        } else {
            Some(unsafe { self.items.as_slice() }[self.offset + i])
        }
    }

    /// # Safety
    /// The backing arrays must still be alive.
    pub unsafe fn nth_pos(&self, i: usize) -> SourcePos {
        if i >= self.len {
            SourcePos::ZERO
        } else {
            unsafe { self.child_positions.as_slice() }[self.offset + i]
        }
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        unsafe { self.items.as_slice() }[self.offset..self.offset + self.len]
            .iter()
            .copied()
    }

    /// The backing items array, for GC tracing - includes elements already
    /// skipped past by earlier `rest` calls, which is correct: they are
    /// still part of the same allocation and must be traced (or, if truly
    /// unreachable otherwise, collected as part of a separate pass once
    /// every list sharing this array becomes unreachable).
    pub fn backing_items(&self) -> GcSlice<Value> {
        self.items
    }

    pub fn backing_positions(&self) -> GcSlice<SourcePos> {
        self.child_positions
    }
}
