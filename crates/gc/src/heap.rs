//! `Heap`: the tracked allocator plus mark-and-sweep collector (spec.md
//! 4.2). Every `wisp-core` heap-backed `Value` payload is allocated,
//! traced, and swept exclusively through this type - nothing else in the
//! workspace calls the system allocator directly for `Value` payloads.

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ptr::NonNull;

use wisp_core::ptr::{GcPtr, GcSlice, GcStr};
use wisp_core::symbol::{Keyword, Symbol};
use wisp_core::{Meta, Value};

use crate::config::GcConfig;
use crate::free_pool::FreePools;
use crate::roots::Roots;
use crate::stats::GcStats;

type DropFn = unsafe fn(*mut u8);

unsafe fn drop_glue<T>(ptr: *mut u8) {
    // SAFETY: caller (only `Heap::reclaim`) guarantees `ptr` addresses a
    // live, fully-initialized `T` that has not yet been dropped.
    unsafe { std::ptr::drop_in_place(ptr as *mut T) }
}

struct AllocEntry {
    layout: Layout,
    marked: bool,
    drop_fn: Option<DropFn>,
}

/// Tracked mark-and-sweep heap with size-class free-pool recycling.
///
/// Single-threaded by design (spec.md 5): every method takes `&self` and
/// uses interior mutability (`RefCell`/`Cell`) rather than `&mut self`,
/// since the analyzer, evaluator, and GC all share one `Heap` through
/// shared references within one cooperative thread of control.
pub struct Heap {
    table: RefCell<HashMap<usize, AllocEntry>>,
    free_pools: RefCell<FreePools>,
    bytes_allocated: Cell<usize>,
    alloc_count: Cell<u64>,
    collect_count: Cell<u64>,
    threshold: Cell<usize>,
    config: GcConfig,
}

impl Heap {
    pub fn new(config: GcConfig) -> Self {
        Heap {
            table: RefCell::new(HashMap::new()),
            free_pools: RefCell::new(FreePools::new(config.max_free_classes, config.free_class_capacity)),
            bytes_allocated: Cell::new(0),
            alloc_count: Cell::new(0),
            collect_count: Cell::new(0),
            threshold: Cell::new(config.initial_threshold),
            config,
        }
    }

    pub fn stats(&self) -> GcStats {
        let pools = self.free_pools.borrow();
        GcStats {
            bytes_allocated: self.bytes_allocated.get(),
            alloc_count: self.alloc_count.get(),
            collect_count: self.collect_count.get(),
            threshold: self.threshold.get(),
            tracked_count: self.table.borrow().len(),
            free_pool_hits: pools.hits,
            free_pool_misses: pools.misses,
        }
    }

    // ---- allocation -----------------------------------------------------

    fn alloc_bytes(&self, layout: Layout, drop_fn: Option<DropFn>) -> Option<NonNull<u8>> {
        let ptr = {
            let mut pools = self.free_pools.borrow_mut();
            match pools.take(layout) {
                Some(p) => p,
                None => {
                    // SAFETY: `layout` has nonzero size for every caller in
                    // this module (GcSlice::empty short-circuits before
                    // reaching here, and every `T` we alloc_cell is sized).
                    let raw = unsafe { std::alloc::alloc(layout) };
                    NonNull::new(raw)?
                }
            }
        };
        {
            let mut table = self.table.borrow_mut();
            if table.try_reserve(1).is_err() {
                // Tracking-map growth failed: free what we just took/alloc'd
                // and report failure, per spec.md 4.2 failure semantics.
                unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
                return None;
            }
            table.insert(
                ptr.as_ptr() as usize,
                AllocEntry {
                    layout,
                    marked: false,
                    drop_fn,
                },
            );
        }
        self.bytes_allocated.set(self.bytes_allocated.get() + layout.size());
        self.alloc_count.set(self.alloc_count.get() + 1);
        Some(ptr)
    }

    /// Allocate a single tracked `T` and move `value` into it.
    pub fn alloc_cell<T>(&self, value: T) -> Option<GcPtr<T>> {
        let layout = Layout::new::<T>();
        let drop_fn: Option<DropFn> = std::mem::needs_drop::<T>().then_some(drop_glue::<T> as DropFn);
        let ptr = self.alloc_bytes(layout, drop_fn)?;
        let typed = ptr.cast::<T>();
        // SAFETY: `typed` is freshly allocated, properly aligned, sized
        // `size_of::<T>()`, and not yet read - writing `value` into it is
        // the first and only initialization.
        unsafe { std::ptr::write(typed.as_ptr(), value) };
        // SAFETY: `typed` now holds a live, initialized `T` tracked by this
        // heap, matching `GcPtr::from_raw`'s contract.
        Some(unsafe { GcPtr::from_raw(typed) })
    }

    /// Allocate a tracked array and copy `items` into it. `T: Copy` rules
    /// out any `Drop` impl, so slice allocations never need drop glue.
    pub fn alloc_slice_copy<T: Copy>(&self, items: &[T]) -> Option<GcSlice<T>> {
        if items.is_empty() {
            return Some(GcSlice::empty());
        }
        let layout = Layout::array::<T>(items.len()).ok()?;
        let ptr = self.alloc_bytes(layout, None)?;
        let typed = ptr.cast::<T>();
        // SAFETY: `typed` points at `items.len()` freshly allocated,
        // properly aligned slots of size `size_of::<T>()`; copying `items`
        // (all `Copy`) into them is a valid bulk initialization.
        unsafe { std::ptr::copy_nonoverlapping(items.as_ptr(), typed.as_ptr(), items.len()) };
        // SAFETY: `typed` now addresses `items.len()` live, initialized
        // `T`s tracked by this heap, matching `GcSlice::from_raw`'s
        // contract.
        Some(unsafe { GcSlice::from_raw(typed, items.len()) })
    }

    pub fn alloc_str(&self, s: &str) -> Option<GcStr> {
        self.alloc_slice_copy(s.as_bytes()).map(GcStr)
    }

    // ---- marking ---------------------------------------------------------

    pub fn mark_ptr(&self, addr: usize) {
        if let Some(entry) = self.table.borrow_mut().get_mut(&addr) {
            entry.marked = true;
        }
    }

    /// Returns `true` the first time a given address is marked during this
    /// trace, `false` on every later call - the sole cycle-termination
    /// rule (spec.md 4.2/8). Addresses outside the tracking table (static
    /// or interned data) are silently ignored and report `false`, so a
    /// caller treating `false` as "already visited, stop recursing" never
    /// infinite-loops on an untracked pointer either.
    pub fn mark_and_check(&self, addr: usize) -> bool {
        match self.table.borrow_mut().get_mut(&addr) {
            Some(entry) if !entry.marked => {
                entry.marked = true;
                true
            }
            _ => false,
        }
    }

    pub fn mark_slice<T>(&self, slice: GcSlice<T>) {
        if slice.is_empty() {
            return;
        }
        self.mark_ptr(slice.addr());
    }

    fn mark_and_check_ptr<T>(&self, ptr: GcPtr<T>) -> bool {
        self.mark_and_check(ptr.addr())
    }

    fn trace_meta(&self, meta: Meta) {
        if let Some(map) = meta.0 {
            // SAFETY: forwarding to the same exhaustive `trace_value`
            // switch used for every other `hash_map`-typed payload.
            unsafe { self.trace_value(Value::HashMap(map)) };
        }
    }

    fn trace_symbol(&self, sym: Symbol) {
        if let Some(ns) = sym.ns {
            self.mark_slice(ns.0);
        }
        self.mark_slice(sym.name.0);
        self.trace_meta(sym.meta);
    }

    fn trace_keyword(&self, kw: Keyword) {
        if let Some(ns) = kw.ns {
            self.mark_slice(ns.0);
        }
        self.mark_slice(kw.name.0);
    }

    /// Exhaustive switch over every `Value` variant (spec.md 4.2 "an
    /// implementer MUST NOT use a default arm"). Adding a variant to
    /// `wisp_core::Value` without adding a matching arm here is a
    /// compile-time failure, by design.
    ///
    /// # Safety
    /// Every heap-backed payload reachable from `v` must still be alive.
    pub unsafe fn trace_value(&self, v: Value) {
        match v {
            Value::Nil
            | Value::Boolean(_)
            | Value::Integer(_)
            | Value::Float(_)
            | Value::Char(_)
            | Value::BuiltinFn(_) => {}

            Value::Str(s) => self.mark_slice(s.0),

            Value::Symbol(s) => self.trace_symbol(s),
            Value::Keyword(k) => self.trace_keyword(k),

            Value::List(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.backing_items());
                    self.mark_slice(data.backing_positions());
                    for item in unsafe { data.iter() } {
                        unsafe { self.trace_value(item) };
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::Vector(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.backing_items());
                    self.mark_slice(data.backing_positions());
                    for item in unsafe { data.iter() } {
                        unsafe { self.trace_value(item) };
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::ArrayMap(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.backing_pairs());
                    for (k, val) in unsafe { data.entries() } {
                        unsafe {
                            self.trace_value(k);
                            self.trace_value(val);
                        }
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::HashMap(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.backing_buckets());
                    self.mark_slice(data.backing_keys());
                    self.mark_slice(data.backing_vals());
                    self.mark_slice(data.backing_next());
                    for (k, val) in unsafe { data.entries() } {
                        unsafe {
                            self.trace_value(k);
                            self.trace_value(val);
                        }
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::HashSet(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.backing_items());
                    for item in unsafe { data.iter() } {
                        unsafe { self.trace_value(item) };
                    }
                    self.trace_meta(data.meta);
                }
            }

            Value::LazySeq(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    if let Some(thunk) = data.thunk() {
                        unsafe { self.trace_value(thunk) };
                    }
                    if let Some(realized) = data.realized() {
                        unsafe { self.trace_value(realized) };
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::Cons(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    unsafe {
                        self.trace_value(data.first);
                        self.trace_value(data.rest);
                    }
                }
            }
            Value::ChunkedCons(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    unsafe {
                        self.trace_value(data.chunk);
                        self.trace_value(data.more);
                    }
                }
            }
            Value::ChunkBuffer(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.backing_buf());
                }
            }
            Value::ArrayChunk(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.backing_items());
                }
            }

            Value::Atom(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    unsafe { self.trace_value(data.get()) };
                    if let Some(validator) = data.validator.get() {
                        unsafe { self.trace_value(validator) };
                    }
                    for (key, watch_fn) in data.watches() {
                        unsafe {
                            self.trace_value(key);
                            self.trace_value(watch_fn);
                        }
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::VolatileRef(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    unsafe { self.trace_value(data.get()) };
                }
            }
            Value::TransientVector(p) => {
                if self.mark_and_check_ptr(p) {
                    self.mark_slice(unsafe { p.as_ref() }.backing_items());
                }
            }
            Value::TransientMap(p) => {
                if self.mark_and_check_ptr(p) {
                    self.mark_slice(unsafe { p.as_ref() }.backing_pairs());
                }
            }
            Value::TransientSet(p) => {
                if self.mark_and_check_ptr(p) {
                    self.mark_slice(unsafe { p.as_ref() }.backing_items());
                }
            }

            Value::Fn(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.arities);
                    for arity in unsafe { data.arities.as_slice() } {
                        self.mark_slice(arity.fixed_params);
                        for sym in unsafe { arity.fixed_params.as_slice() } {
                            self.trace_symbol(*sym);
                        }
                        if let Some(variadic) = arity.variadic_param {
                            self.trace_symbol(variadic);
                        }
                    }
                    self.mark_slice(data.closed_over);
                    for captured in unsafe { data.closed_over.as_slice() } {
                        unsafe { self.trace_value(*captured) };
                    }
                    if let Some(name) = data.name {
                        self.trace_symbol(name);
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::Protocol(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.method_names);
                    for name in unsafe { data.method_names.as_slice() } {
                        self.trace_symbol(*name);
                    }
                    self.trace_symbol(data.name);
                    self.trace_meta(data.meta);
                }
            }
            Value::ProtocolFn(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.trace_symbol(data.protocol);
                    self.trace_symbol(data.method_name);
                    self.trace_meta(data.meta);
                }
            }
            Value::MultiFn(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    unsafe {
                        self.trace_value(data.dispatch_fn);
                        self.trace_value(data.default_dispatch_value);
                    }
                    for dispatch_val in data.dispatch_values() {
                        unsafe { self.trace_value(dispatch_val) };
                    }
                    self.trace_symbol(data.name);
                    self.trace_meta(data.meta);
                }
            }

            Value::Delay(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    if let Some(thunk) = data.thunk() {
                        unsafe { self.trace_value(thunk) };
                    }
                    if let Some(realized) = data.realized() {
                        unsafe { self.trace_value(realized) };
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::Reduced(p) => {
                if self.mark_and_check_ptr(p) {
                    unsafe { self.trace_value(p.as_ref().value) };
                }
            }

            Value::VarRef(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.trace_symbol(data.sym);
                    self.mark_slice(data.ns_name.0);
                    unsafe { self.trace_value(data.root) };
                    if let Some(doc) = data.doc {
                        self.mark_slice(doc.0);
                    }
                    if let Some(arglists) = data.arglists {
                        unsafe { self.trace_value(arglists) };
                    }
                    self.trace_meta(data.meta);
                }
            }
            Value::Regex(p) => {
                if self.mark_and_check_ptr(p) {
                    let data = unsafe { p.as_ref() };
                    self.mark_slice(data.pattern.0);
                    self.trace_meta(data.meta);
                }
            }
        }
    }

    pub fn trace_roots(&self, roots: &Roots) {
        for slice in roots.gc_value_slices {
            self.mark_slice(*slice);
            for v in unsafe { slice.as_slice() } {
                unsafe { self.trace_value(*v) };
            }
        }
        for slice in roots.stack_slices {
            for v in slice.iter() {
                unsafe { self.trace_value(*v) };
            }
        }
        for v in roots.values {
            unsafe { self.trace_value(*v) };
        }
        for (root, meta) in roots.var_roots {
            unsafe {
                self.trace_value(*root);
                self.trace_value(*meta);
            }
        }
        for v in roots.binding_values {
            unsafe { self.trace_value(*v) };
        }
    }

    // ---- sweep / collect --------------------------------------------------

    fn reclaim(&self, addr: usize, entry: AllocEntry) {
        if let Some(drop_fn) = entry.drop_fn {
            // SAFETY: `addr` has not been marked reachable this cycle, so
            // nothing else can observe or re-enter this allocation; this is
            // the one and only drop of the value that lived here.
            unsafe { drop_fn(addr as *mut u8) };
        }
        let ptr = NonNull::new(addr as *mut u8).expect("tracked address is never null");
        let pooled = self.free_pools.borrow_mut().give(ptr, entry.layout);
        if !pooled {
            // SAFETY: `ptr`/`entry.layout` match the allocation made for
            // this address in `alloc_bytes`, and we just removed it from
            // the tracking table (sole owner at this point).
            unsafe { std::alloc::dealloc(ptr.as_ptr(), entry.layout) };
        }
    }

    fn sweep(&self) {
        let dead: Vec<(usize, AllocEntry)> = {
            let mut table = self.table.borrow_mut();
            let dead_addrs: Vec<usize> = table
                .iter_mut()
                .filter_map(|(&addr, entry)| {
                    if entry.marked {
                        entry.marked = false;
                        None
                    } else {
                        Some(addr)
                    }
                })
                .collect();
            dead_addrs
                .into_iter()
                .map(|addr| (addr, table.remove(&addr).expect("addr just observed in table")))
                .collect()
        };
        for (addr, entry) in dead {
            self.reclaim(addr, entry);
        }
        self.bytes_allocated.set(
            self.table
                .borrow()
                .values()
                .map(|e| e.layout.size())
                .sum(),
        );
    }

    pub fn collect(&self, roots: &Roots) {
        self.trace_roots(roots);
        self.sweep();
        self.collect_count.set(self.collect_count.get() + 1);
    }

    pub fn should_collect(&self) -> bool {
        self.bytes_allocated.get() >= self.threshold.get()
    }

    pub fn collect_if_needed(&self, roots: &Roots) {
        if !self.should_collect() {
            return;
        }
        self.collect(roots);
        if self.bytes_allocated.get() >= self.threshold.get() {
            let new_threshold = self.bytes_allocated.get() * 2;
            self.threshold.set(new_threshold);
            if self.config.verbose {
                eprintln!(
                    "wisp-gc: live set still over threshold after collect, growing threshold to {new_threshold} bytes"
                );
            }
        }
    }

    /// Free every tracked allocation and every pooled free-list entry, in
    /// that order (spec.md 5 "deinit ... scoped-acquisition point").
    pub fn deinit(&self) {
        let entries: Vec<(usize, AllocEntry)> = self.table.borrow_mut().drain().collect();
        for (addr, entry) in entries {
            if let Some(drop_fn) = entry.drop_fn {
                unsafe { drop_fn(addr as *mut u8) };
            }
            unsafe { std::alloc::dealloc(addr as *mut u8, entry.layout) };
        }
        self.free_pools.borrow_mut().drain(|ptr, layout| unsafe {
            std::alloc::dealloc(ptr.as_ptr(), layout);
        });
        self.bytes_allocated.set(0);
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        self.deinit();
    }
}
