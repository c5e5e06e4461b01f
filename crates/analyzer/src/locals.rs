//! The locals stack: a mutable, ordered sequence of `(name, index)` bindings
//! in scope during one compilation unit (spec.md 4.4).
//!
//! Indices are monotonically increasing within a unit - shrinking the stack
//! on scope exit never reclaims an index, it only removes names from
//! resolution. This matches the evaluator contract that a `local_ref.idx`
//! names a fixed slot in that unit's frame for its entire lifetime, not a
//! slot number that gets reused by a later, unrelated binding.

use std::rc::Rc;

pub struct Locals {
    entries: Vec<(Rc<str>, usize)>,
    next_idx: usize,
}

impl Locals {
    pub fn new() -> Self {
        Locals {
            entries: Vec::new(),
            next_idx: 0,
        }
    }

    /// Pushes `name` as a new, innermost local and returns its index.
    pub fn push(&mut self, name: Rc<str>) -> usize {
        let idx = self.next_idx;
        self.next_idx += 1;
        self.entries.push((name, idx));
        idx
    }

    /// A resumption point for `shrink_to`, capturing the current scope
    /// depth (not the index counter, which never rewinds).
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    pub fn shrink_to(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    /// Innermost-first resolution: a later push shadows an earlier one with
    /// the same name.
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.entries.iter().rev().find(|(n, _)| &**n == name).map(|(_, idx)| *idx)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}

impl Default for Locals {
    fn default() -> Self {
        Locals::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_binding_shadows_an_earlier_one() {
        let mut locals = Locals::new();
        locals.push("x".into());
        let inner = locals.push("x".into());
        assert_eq!(locals.resolve("x"), Some(inner));
    }

    #[test]
    fn shrink_removes_names_but_never_rewinds_the_index_counter() {
        let mut locals = Locals::new();
        let mark = locals.mark();
        locals.push("x".into());
        locals.shrink_to(mark);
        assert!(!locals.contains("x"));
        let y = locals.push("y".into());
        assert_eq!(y, 1); // not reused, even though "x" occupied slot 0
    }
}
