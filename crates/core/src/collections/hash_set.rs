use crate::meta::Meta;
use crate::ptr::GcSlice;
use crate::value::Value;

/// Backing storage for `hash_set`: array-backed with linear membership
/// testing. Iteration order is simply storage order, which is already
/// deterministic within a single process run without needing a real hash
/// table.
#[derive(Clone, Copy, Debug)]
pub struct HashSetData {
    items: GcSlice<Value>,
    pub meta: Meta,
}

impl HashSetData {
    /// # Safety
    /// `items` must be allocated by a `Heap` and remain alive.
    pub unsafe fn new(items: GcSlice<Value>, meta: Meta) -> Self {
        HashSetData { items, meta }
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn contains(&self, v: Value) -> bool {
        unsafe { self.items.as_slice() }
            .iter()
            .any(|&item| crate::eql::value_eq(item, v))
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        unsafe { self.items.as_slice() }.iter().copied()
    }

    pub fn backing_items(&self) -> GcSlice<Value> {
        self.items
    }
}
