//! The dynamic-binding frame stack backing `binding`/thread-local rebinding
//! of `^:dynamic` Vars (spec.md 4.3).
//!
//! A frame is a flat array of `(Var, Value)` entries plus a pointer to the
//! previous frame, exactly per spec.md: `push_bindings` conses a new frame
//! onto the chain, `pop_bindings` drops back to its parent, and
//! `thread_binding` walks the chain from the top looking for the
//! most-recent entry for a given Var. Frames are reference-counted
//! (`Rc<Frame>`) rather than stored in a flat `Vec` so that `pop_bindings`
//! restoring the exact prior frame pointer is a pointer copy, giving the
//! LIFO-pairing invariant (push then pop restores pointer-identical state)
//! for free.

use std::cell::RefCell;
use std::rc::Rc;

use wisp_core::Value;

use crate::var::Var;

struct Frame {
    entries: RefCell<Vec<(Rc<Var>, Value)>>,
    parent: Option<Rc<Frame>>,
}

#[derive(Default)]
pub struct BindingStack {
    top: RefCell<Option<Rc<Frame>>>,
}

impl BindingStack {
    pub fn new() -> Self {
        BindingStack::default()
    }

    pub fn push_bindings(&self, entries: Vec<(Rc<Var>, Value)>) {
        let frame = Rc::new(Frame {
            entries: RefCell::new(entries),
            parent: self.top.borrow().clone(),
        });
        *self.top.borrow_mut() = Some(frame);
    }

    /// Pops the top frame. Popping an empty stack is a no-op rather than a
    /// panic - the reference semantics treat it as already balanced.
    pub fn pop_bindings(&self) {
        let parent = self.top.borrow().as_ref().and_then(|f| f.parent.clone());
        *self.top.borrow_mut() = parent;
    }

    /// Most recently pushed binding for `var`, if any frame on the current
    /// chain binds it.
    pub fn thread_binding(&self, var: &Rc<Var>) -> Option<Value> {
        let mut frame = self.top.borrow().clone();
        while let Some(f) = frame {
            for (bound_var, value) in f.entries.borrow().iter() {
                if Rc::ptr_eq(bound_var, var) {
                    return Some(*value);
                }
            }
            frame = f.parent.clone();
        }
        None
    }

    /// Mutates the innermost existing binding for `var` in place. Returns
    /// `false` (and does nothing) if `var` has no active thread binding -
    /// `set!` on a dynamic Var outside a `binding` scope is a caller-level
    /// error, not something this stack manufactures a frame for.
    pub fn set_thread_binding(&self, var: &Rc<Var>, value: Value) -> bool {
        let mut frame = self.top.borrow().clone();
        while let Some(f) = frame {
            let mut entries = f.entries.borrow_mut();
            if let Some(entry) = entries.iter_mut().find(|(v, _)| Rc::ptr_eq(v, var)) {
                entry.1 = value;
                return true;
            }
            drop(entries);
            frame = f.parent.clone();
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.top.borrow().is_none()
    }

    /// Depth of the frame chain, for tests and diagnostics.
    pub fn depth(&self) -> usize {
        let mut frame = self.top.borrow().clone();
        let mut n = 0;
        while let Some(f) = frame {
            n += 1;
            frame = f.parent.clone();
        }
        n
    }

    /// Every bound `Value` across the whole chain, for handing to
    /// `wisp_gc::Roots::binding_values`.
    pub fn collect_values(&self) -> Vec<Value> {
        let mut out = Vec::new();
        let mut frame = self.top.borrow().clone();
        while let Some(f) = frame {
            out.extend(f.entries.borrow().iter().map(|(_, v)| *v));
            frame = f.parent.clone();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Rc<Var> {
        Var::new(name.into(), "user".into())
    }

    #[test]
    fn push_then_pop_restores_identical_state() {
        let stack = BindingStack::new();
        assert!(stack.is_empty());
        let v = var("x");
        stack.push_bindings(vec![(v.clone(), Value::Integer(1))]);
        assert_eq!(stack.depth(), 1);
        stack.pop_bindings();
        assert!(stack.is_empty());
    }

    #[test]
    fn thread_binding_sees_most_recent_frame_first() {
        let stack = BindingStack::new();
        let v = var("x");
        stack.push_bindings(vec![(v.clone(), Value::Integer(1))]);
        stack.push_bindings(vec![(v.clone(), Value::Integer(2))]);
        assert_eq!(stack.thread_binding(&v), Some(Value::Integer(2)));
        stack.pop_bindings();
        assert_eq!(stack.thread_binding(&v), Some(Value::Integer(1)));
    }

    #[test]
    fn set_thread_binding_mutates_innermost_frame_only() {
        let stack = BindingStack::new();
        let v = var("x");
        stack.push_bindings(vec![(v.clone(), Value::Integer(1))]);
        stack.push_bindings(vec![(v.clone(), Value::Integer(2))]);
        assert!(stack.set_thread_binding(&v, Value::Integer(99)));
        assert_eq!(stack.thread_binding(&v), Some(Value::Integer(99)));
        stack.pop_bindings();
        assert_eq!(stack.thread_binding(&v), Some(Value::Integer(1)));
    }

    #[test]
    fn set_thread_binding_without_an_active_frame_fails() {
        let stack = BindingStack::new();
        let v = var("x");
        assert!(!stack.set_thread_binding(&v, Value::Integer(1)));
    }

    #[test]
    fn pop_on_empty_stack_is_a_no_op() {
        let stack = BindingStack::new();
        stack.pop_bindings();
        assert!(stack.is_empty());
    }

    #[test]
    fn collect_values_spans_the_whole_chain() {
        let stack = BindingStack::new();
        stack.push_bindings(vec![(var("x"), Value::Integer(1))]);
        stack.push_bindings(vec![(var("y"), Value::Integer(2))]);
        let mut values = stack.collect_values();
        values.sort_by_key(|v| match v {
            Value::Integer(n) => *n,
            _ => 0,
        });
        assert_eq!(values, vec![Value::Integer(1), Value::Integer(2)]);
    }
}
