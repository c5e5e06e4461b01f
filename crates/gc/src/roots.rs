//! The root set `trace_roots` walks, per spec.md 4.2.
//!
//! `wisp-gc` cannot depend on `wisp-runtime` (dependency order is the
//! reverse), so the Environment and the dynamic-binding frame stack are not
//! named here by type - the caller (ultimately `wisp-runtime`/the
//! evaluator) flattens them into the plain slices below before calling
//! `Heap::collect`/`Heap::collect_if_needed`. This mirrors how the spec
//! itself describes roots as a walk order over four *categories*, not over
//! concrete owning types.

use wisp_core::{GcSlice, Value};

/// One `collect` call's complete root set, built fresh by the caller every
/// time (this crate never caches a `Roots` across collections - the
/// evaluator's stacks and the binding frame stack change every turn).
#[derive(Default)]
pub struct Roots<'a> {
    /// GC-allocated value arrays (constant pools, closures) - the backing
    /// array itself is a tracked allocation and must be marked, then each
    /// element traced.
    pub gc_value_slices: &'a [GcSlice<Value>],
    /// Evaluator-owned, non-GC-allocated value slices (operand stack,
    /// locals array) - only the elements need tracing, since the slice's
    /// backing memory is an ordinary Rust allocation the GC never tracked.
    pub stack_slices: &'a [&'a [Value]],
    /// Individual root values (current exception register, and the like).
    pub values: &'a [Value],
    /// One `(var.root, var.meta-as-value)` pair per Var in the
    /// Environment, flattened by the caller from a namespace->var walk.
    /// `var.meta` is `Value::Nil` when the Var carries no metadata.
    pub var_roots: &'a [(Value, Value)],
    /// Every bound Value on the dynamic-binding frame stack, oldest- or
    /// newest-first (spec.md 4.2 says either order is correct).
    pub binding_values: &'a [Value],
}

impl<'a> Roots<'a> {
    pub fn new() -> Self {
        Roots::default()
    }
}
