use crate::meta::Meta;
use crate::ptr::GcSlice;
use crate::value::Value;

/// Backing storage for `array_map`: insertion-ordered key/value pairs with
/// linear lookup, used below the promotion threshold into `hash_map`. The
/// threshold itself, `ARRAY_MAP_MAX_ENTRIES`, lives next to the constructor
/// helpers in `wisp-gc` since only the allocator knows how to grow a map
/// across representations.
#[derive(Clone, Copy, Debug)]
pub struct ArrayMapData {
    /// Flattened `[k0, v0, k1, v1, ...]`.
    pairs: GcSlice<Value>,
    pub meta: Meta,
}

impl ArrayMapData {
    /// # Safety
    /// `pairs` must be allocated by a `Heap`, remain alive, and have even
    /// length.
    pub unsafe fn new(pairs: GcSlice<Value>, meta: Meta) -> Self {
        debug_assert_eq!(pairs.len() % 2, 0);
        ArrayMapData { pairs, meta }
    }

    pub fn count(&self) -> usize {
        self.pairs.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn get(&self, key: Value) -> Option<Value> {
        let pairs = unsafe { self.pairs.as_slice() };
        let mut i = 0;
        while i < pairs.len() {
            if unsafe { crate::eql::value_eq(pairs[i], key) } {
                return Some(pairs[i + 1]);
            }
            i += 2;
        }
        None
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn contains(&self, key: Value) -> bool {
        unsafe { self.get(key) }.is_some()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn entries(&self) -> impl Iterator<Item = (Value, Value)> + '_ {
        unsafe { self.pairs.as_slice() }
            .chunks_exact(2)
            .map(|kv| (kv[0], kv[1]))
    }

    pub fn backing_pairs(&self) -> GcSlice<Value> {
        self.pairs
    }
}
