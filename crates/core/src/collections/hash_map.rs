use crate::meta::Meta;
use crate::ptr::GcSlice;
use crate::value::Value;

/// Backing storage for `hash_map`: a flat, separate-chaining hash table
/// over GC-owned arrays, used in place of a HAMT. Both representations
/// satisfy the same contract (O(1) average lookup, deterministic
/// within-process iteration order); the trie layout is deferred exactly
/// like `vector`'s (see DESIGN.md) since no observable behavior depends on
/// the internal node shape.
///
/// A `nil` key is stored out of band in `null_value` rather than hashed, so
/// lookups never need a sentinel hash value for it.
#[derive(Clone, Copy, Debug)]
pub struct HashMapData {
    /// `buckets[h % buckets.len()]` is the index of the first entry in that
    /// bucket's chain, or `-1`.
    buckets: GcSlice<i32>,
    keys: GcSlice<Value>,
    vals: GcSlice<Value>,
    /// `next[i]` is the next entry in `keys[i]`'s bucket chain, or `-1`.
    next: GcSlice<i32>,
    count: usize,
    has_null_key: bool,
    null_value: Value,
    pub meta: Meta,
}

impl HashMapData {
    /// # Safety
    /// All `GcSlice`s must be allocated by the same `Heap` and remain
    /// alive; `keys`, `vals`, and `next` must have equal length; every
    /// value in `buckets`/`next` must be `-1` or a valid index less than
    /// `keys.len()`; `buckets` must already reflect the hash of every
    /// key under `value_hash`.
    pub unsafe fn new(
        buckets: GcSlice<i32>,
        keys: GcSlice<Value>,
        vals: GcSlice<Value>,
        next: GcSlice<i32>,
        count: usize,
        has_null_key: bool,
        null_value: Value,
        meta: Meta,
    ) -> Self {
        HashMapData {
            buckets,
            keys,
            vals,
            next,
            count,
            has_null_key,
            null_value,
            meta,
        }
    }

    pub fn count(&self) -> usize {
        self.count + if self.has_null_key { 1 } else { 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// # Safety
    /// The backing arrays must still be alive.
    pub unsafe fn get(&self, key: Value) -> Option<Value> {
        if matches!(key, Value::Nil) {
            return self.has_null_key.then_some(self.null_value);
        }
        if self.buckets.is_empty() {
            return None;
        }
        let h = unsafe { crate::eql::value_hash(key) };
        let mut idx = unsafe { self.buckets.as_slice() }[(h as usize) % self.buckets.len()];
        let keys = unsafe { self.keys.as_slice() };
        let vals = unsafe { self.vals.as_slice() };
        let next = unsafe { self.next.as_slice() };
        while idx >= 0 {
            let i = idx as usize;
            if unsafe { crate::eql::value_eq(keys[i], key) } {
                return Some(vals[i]);
            }
            idx = next[i];
        }
        None
    }

    /// # Safety
    /// The backing arrays must still be alive.
    pub unsafe fn contains(&self, key: Value) -> bool {
        unsafe { self.get(key) }.is_some()
    }

    /// # Safety
    /// The backing arrays must still be alive.
    pub unsafe fn entries(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        let stored = unsafe { self.keys.as_slice() }
            .iter()
            .copied()
            .zip(unsafe { self.vals.as_slice() }.iter().copied());
        let null_entry = self
            .has_null_key
            .then_some((Value::Nil, self.null_value))
            .into_iter();
        stored.chain(null_entry)
    }

    pub fn backing_buckets(&self) -> GcSlice<i32> {
        self.buckets
    }
    pub fn backing_keys(&self) -> GcSlice<Value> {
        self.keys
    }
    pub fn backing_vals(&self) -> GcSlice<Value> {
        self.vals
    }
    pub fn backing_next(&self) -> GcSlice<i32> {
        self.next
    }
}
