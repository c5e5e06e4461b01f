//! Mutable holders: `atom`, `volatile_ref`, and the three transient
//! collection variants (vector, map, set).

use crate::meta::Meta;
use crate::ptr::GcSlice;
use crate::value::Value;
use std::cell::{Cell, RefCell};

/// `atom { value, meta, validator?, watch_keys, watch_fns }`. Swaps go
/// through `compare_and_set` so callers can implement
/// `swap!`/`reset!`/`compare-and-set!` uniformly; the validator, if
/// present, is a callable `Value` the evaluator invokes before a swap
/// commits (this crate has no evaluator, so it only stores the validator
/// and lets the caller enforce it). Watches are a parallel
/// `watch_keys`/`watch_fns` pair rather than a map, mirroring how
/// `add-watch`/`remove-watch` key by an arbitrary (often non-hashable, in
/// this implementation's terms) `Value` - a linear scan by `eql` is exact
/// and avoids needing `Value` to be `Hash` for watch keys specifically.
#[derive(Debug)]
pub struct AtomData {
    value: Cell<Value>,
    pub validator: Cell<Option<Value>>,
    watch_keys: RefCell<Vec<Value>>,
    watch_fns: RefCell<Vec<Value>>,
    pub meta: Meta,
}

impl AtomData {
    pub fn new(value: Value, meta: Meta) -> Self {
        AtomData {
            value: Cell::new(value),
            validator: Cell::new(None),
            watch_keys: RefCell::new(Vec::new()),
            watch_fns: RefCell::new(Vec::new()),
            meta,
        }
    }

    pub fn get(&self) -> Value {
        self.value.get()
    }

    pub fn set(&self, v: Value) {
        self.value.set(v);
    }

    /// Atomic (in the single-threaded sense: no re-entrant mutation can
    /// interleave) compare-and-set, used to build `swap!`/`reset!` without
    /// the caller re-deriving CAS loop logic for each builtin.
    pub fn compare_and_set(&self, expected: Value, new: Value) -> bool {
        let matches = unsafe { crate::eql::value_eq(self.value.get(), expected) };
        if matches {
            self.value.set(new);
        }
        matches
    }

    /// Register `(watch_key, watch_fn)`, replacing any existing entry for
    /// the same key (`eql`-equal), matching `add-watch`'s "re-adding with
    /// the same key updates the fn" behavior.
    ///
    /// # Safety
    /// Any heap-backed payload reachable from `watch_key` must still be
    /// alive.
    pub unsafe fn add_watch(&self, watch_key: Value, watch_fn: Value) {
        let mut keys = self.watch_keys.borrow_mut();
        let mut fns = self.watch_fns.borrow_mut();
        if let Some(i) = (0..keys.len()).find(|&i| unsafe { crate::eql::value_eq(keys[i], watch_key) }) {
            fns[i] = watch_fn;
        } else {
            keys.push(watch_key);
            fns.push(watch_fn);
        }
    }

    /// # Safety
    /// Any heap-backed payload reachable from `watch_key` must still be
    /// alive.
    pub unsafe fn remove_watch(&self, watch_key: Value) {
        let mut keys = self.watch_keys.borrow_mut();
        let mut fns = self.watch_fns.borrow_mut();
        if let Some(i) = (0..keys.len()).find(|&i| unsafe { crate::eql::value_eq(keys[i], watch_key) }) {
            keys.remove(i);
            fns.remove(i);
        }
    }

    /// `(watch_key, watch_fn)` pairs currently registered, for the
    /// evaluator to invoke after a successful swap and for the GC to
    /// trace.
    pub fn watches(&self) -> Vec<(Value, Value)> {
        self.watch_keys
            .borrow()
            .iter()
            .copied()
            .zip(self.watch_fns.borrow().iter().copied())
            .collect()
    }
}

/// `volatile_ref { value }`: like `atom` but with no validator and no
/// compare-and-set contract - a bare mutable cell for `vswap!`.
#[derive(Debug)]
pub struct VolatileRefData {
    value: Cell<Value>,
}

impl VolatileRefData {
    pub fn new(value: Value) -> Self {
        VolatileRefData {
            value: Cell::new(value),
        }
    }

    pub fn get(&self) -> Value {
        self.value.get()
    }

    pub fn set(&self, v: Value) {
        self.value.set(v);
    }
}

/// Transients become permanently unusable once any operation observes them
/// as having escaped their intended single-threaded, single-owner
/// build-then-`persistent!` lifecycle. Each transient variant below tracks
/// its own liveness with a `dead` flag and every mutator checks it first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransientError {
    UseAfterPersistent,
}

impl std::fmt::Display for TransientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transient used after persistent! call")
    }
}
impl std::error::Error for TransientError {}

/// `transient_vector { items, count }`. `conj!` grows in place up to
/// `items.capacity()`; growth beyond that capacity is the caller's
/// responsibility (reallocate via the heap and build a new
/// `TransientVectorData`), since this struct only owns a fixed backing
/// slice.
#[derive(Clone, Copy, Debug)]
pub struct TransientVectorData {
    items: GcSlice<Value>,
    count: Cell<usize>,
    dead: Cell<bool>,
}

impl TransientVectorData {
    /// # Safety
    /// `items` must be allocated by a `Heap` and remain alive.
    pub unsafe fn new(items: GcSlice<Value>, count: usize) -> Self {
        debug_assert!(count <= items.len());
        TransientVectorData {
            items,
            count: Cell::new(count),
            dead: Cell::new(false),
        }
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn is_dead(&self) -> bool {
        self.dead.get()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn conj(&self, v: Value) -> Result<(), TransientError> {
        if self.dead.get() {
            return Err(TransientError::UseAfterPersistent);
        }
        let n = self.count.get();
        debug_assert!(n < self.items.len(), "caller must grow backing storage first");
        unsafe { self.items.as_mut_slice() }[n] = v;
        self.count.set(n + 1);
        Ok(())
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn assoc(&self, i: usize, v: Value) -> Result<(), TransientError> {
        if self.dead.get() {
            return Err(TransientError::UseAfterPersistent);
        }
        if i >= self.count.get() {
            return Err(TransientError::UseAfterPersistent);
        }
        unsafe { self.items.as_mut_slice() }[i] = v;
        Ok(())
    }

    /// Mark dead and hand back the backing slice (truncated to `count`) so
    /// the caller can wrap it in a `VectorData`.
    pub fn persistent(&self) -> GcSlice<Value> {
        self.dead.set(true);
        self.items
    }

    pub fn backing_items(&self) -> GcSlice<Value> {
        self.items
    }
}

/// `transient_map`: array-backed (like `array_map`) while small; this crate
/// does not implement the hash-map-backed transient representation since
/// nothing observable distinguishes the two once `persistent!` runs.
#[derive(Clone, Copy, Debug)]
pub struct TransientMapData {
    pairs: GcSlice<Value>,
    count: Cell<usize>,
    dead: Cell<bool>,
}

impl TransientMapData {
    /// # Safety
    /// `pairs` must be allocated by a `Heap`, remain alive, and have even
    /// length.
    pub unsafe fn new(pairs: GcSlice<Value>, count: usize) -> Self {
        debug_assert!(count * 2 <= pairs.len());
        TransientMapData {
            pairs,
            count: Cell::new(count),
            dead: Cell::new(false),
        }
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn is_dead(&self) -> bool {
        self.dead.get()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn assoc(&self, key: Value, val: Value) -> Result<(), TransientError> {
        if self.dead.get() {
            return Err(TransientError::UseAfterPersistent);
        }
        let n = self.count.get();
        let pairs = unsafe { self.pairs.as_mut_slice() };
        for i in 0..n {
            if unsafe { crate::eql::value_eq(pairs[i * 2], key) } {
                pairs[i * 2 + 1] = val;
                return Ok(());
            }
        }
        debug_assert!((n + 1) * 2 <= pairs.len(), "caller must grow backing storage first");
        pairs[n * 2] = key;
        pairs[n * 2 + 1] = val;
        self.count.set(n + 1);
        Ok(())
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn get(&self, key: Value) -> Option<Value> {
        let n = self.count.get();
        let pairs = unsafe { self.pairs.as_slice() };
        (0..n)
            .find(|&i| unsafe { crate::eql::value_eq(pairs[i * 2], key) })
            .map(|i| pairs[i * 2 + 1])
    }

    pub fn persistent(&self) -> GcSlice<Value> {
        self.dead.set(true);
        self.pairs
    }

    pub fn backing_pairs(&self) -> GcSlice<Value> {
        self.pairs
    }
}

/// `transient_set`: array-backed, same shape as `hash_set`'s storage.
#[derive(Clone, Copy, Debug)]
pub struct TransientSetData {
    items: GcSlice<Value>,
    count: Cell<usize>,
    dead: Cell<bool>,
}

impl TransientSetData {
    /// # Safety
    /// `items` must be allocated by a `Heap` and remain alive.
    pub unsafe fn new(items: GcSlice<Value>, count: usize) -> Self {
        debug_assert!(count <= items.len());
        TransientSetData {
            items,
            count: Cell::new(count),
            dead: Cell::new(false),
        }
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn is_dead(&self) -> bool {
        self.dead.get()
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn conj(&self, v: Value) -> Result<(), TransientError> {
        if self.dead.get() {
            return Err(TransientError::UseAfterPersistent);
        }
        let n = self.count.get();
        let items = unsafe { self.items.as_slice() };
        if items[..n].iter().any(|&x| unsafe { crate::eql::value_eq(x, v) }) {
            return Ok(());
        }
        debug_assert!(n < self.items.len(), "caller must grow backing storage first");
        unsafe { self.items.as_mut_slice() }[n] = v;
        self.count.set(n + 1);
        Ok(())
    }

    /// # Safety
    /// The backing array must still be alive.
    pub unsafe fn contains(&self, v: Value) -> bool {
        let n = self.count.get();
        unsafe { self.items.as_slice() }[..n]
            .iter()
            .any(|&x| crate::eql::value_eq(x, v))
    }

    pub fn persistent(&self) -> GcSlice<Value> {
        self.dead.set(true);
        self.items
    }

    pub fn backing_items(&self) -> GcSlice<Value> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atom_compare_and_set_only_commits_on_match() {
        let a = AtomData::new(Value::Integer(1), Meta::none());
        assert!(!a.compare_and_set(Value::Integer(99), Value::Integer(2)));
        assert_eq!(a.get(), Value::Integer(1));
        assert!(a.compare_and_set(Value::Integer(1), Value::Integer(2)));
        assert_eq!(a.get(), Value::Integer(2));
    }

    #[test]
    fn volatile_ref_get_set_roundtrip() {
        let v = VolatileRefData::new(Value::Nil);
        v.set(Value::Boolean(true));
        assert_eq!(v.get(), Value::Boolean(true));
    }

    #[test]
    fn atom_watch_add_replace_remove() {
        let a = AtomData::new(Value::Integer(0), Meta::none());
        unsafe {
            a.add_watch(Value::Keyword(kw("w")), Value::Integer(1));
            assert_eq!(a.watches(), vec![(Value::Keyword(kw("w")), Value::Integer(1))]);
            a.add_watch(Value::Keyword(kw("w")), Value::Integer(2));
            assert_eq!(a.watches(), vec![(Value::Keyword(kw("w")), Value::Integer(2))]);
            a.remove_watch(Value::Keyword(kw("w")));
            assert!(a.watches().is_empty());
        }
    }

    fn kw(s: &'static str) -> crate::symbol::Keyword {
        use std::ptr::NonNull;
        let bytes: &'static [u8] = s.as_bytes();
        let ptr = NonNull::new(bytes.as_ptr() as *mut u8).unwrap();
        let gcstr = unsafe { crate::ptr::GcStr(GcSlice::from_raw(ptr, bytes.len())) };
        crate::symbol::Keyword::simple(gcstr)
    }
}
