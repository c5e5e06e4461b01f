//! `Var`: a named, namespace-scoped cell holding a `Value`, with optional
//! dynamic binding (spec.md 3.2).
//!
//! A `Var`'s own bookkeeping (name, namespace name, doc, flags) lives in
//! plain Rust-owned storage (`Rc<str>`, `Cell`/`RefCell`) rather than on the
//! GC heap - a `Var` is not itself a `Value` and the Namespace registry is
//! not part of the Value shape graph `wisp-gc::Heap::trace_value` walks.
//! Only `Var::root` and `Var::meta` are `Value`s the GC must trace, via the
//! Environment root category (spec.md 4.2, root order 3). When the
//! analyzer needs to hand a live Var to evaluated code (the `var` special
//! form), it takes a GC-allocated *snapshot* (`wisp_core::refs::VarRefData`)
//! rather than exposing this struct directly - see that module's doc
//! comment for why.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wisp_core::{Meta, Value};

#[derive(Debug)]
pub struct Var {
    pub name: Rc<str>,
    pub ns_name: Rc<str>,
    root: Cell<Value>,
    dynamic: Cell<bool>,
    is_macro: Cell<bool>,
    is_private: Cell<bool>,
    is_const: Cell<bool>,
    doc: RefCell<Option<Rc<str>>>,
    arglists: Cell<Option<Value>>,
    meta: Cell<Meta>,
}

impl Var {
    pub fn new(name: Rc<str>, ns_name: Rc<str>) -> Rc<Var> {
        Rc::new(Var {
            name,
            ns_name,
            root: Cell::new(Value::Nil),
            dynamic: Cell::new(false),
            is_macro: Cell::new(false),
            is_private: Cell::new(false),
            is_const: Cell::new(false),
            doc: RefCell::new(None),
            arglists: Cell::new(None),
            meta: Cell::new(Meta::none()),
        })
    }

    pub fn root(&self) -> Value {
        self.root.get()
    }

    pub fn bind_root(&self, value: Value) {
        self.root.set(value);
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic.get()
    }

    pub fn set_dynamic(&self, dynamic: bool) {
        self.dynamic.set(dynamic);
    }

    pub fn is_macro(&self) -> bool {
        self.is_macro.get()
    }

    pub fn set_macro(&self) {
        self.is_macro.set(true);
    }

    pub fn is_private(&self) -> bool {
        self.is_private.get()
    }

    pub fn set_private(&self) {
        self.is_private.set(true);
    }

    pub fn is_const(&self) -> bool {
        self.is_const.get()
    }

    pub fn set_const(&self) {
        self.is_const.set(true);
    }

    pub fn doc(&self) -> Option<Rc<str>> {
        self.doc.borrow().clone()
    }

    pub fn set_doc(&self, doc: Rc<str>) {
        *self.doc.borrow_mut() = Some(doc);
    }

    pub fn arglists(&self) -> Option<Value> {
        self.arglists.get()
    }

    pub fn set_arglists(&self, arglists: Value) {
        self.arglists.set(Some(arglists));
    }

    pub fn meta(&self) -> Meta {
        self.meta.get()
    }

    pub fn set_meta(&self, meta: Meta) {
        self.meta.set(meta);
    }

    /// `Value` to feed the GC tracer for this Var's metadata: `Value::Nil`
    /// when absent, so callers building `wisp_gc::Roots::var_roots` never
    /// need to special-case "no meta" themselves.
    pub fn meta_as_value(&self) -> Value {
        match self.meta.get().0 {
            Some(map) => Value::HashMap(map),
            None => Value::Nil,
        }
    }

    /// Fully-qualified `ns/name`, used in error messages and printed
    /// representations.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.ns_name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_dynamic_var_deref_equals_root() {
        let v = Var::new("x".into(), "user".into());
        v.bind_root(Value::Integer(1));
        assert_eq!(v.root(), Value::Integer(1));
        assert!(!v.is_dynamic());
    }

    #[test]
    fn meta_as_value_is_nil_when_absent() {
        let v = Var::new("x".into(), "user".into());
        assert_eq!(v.meta_as_value(), Value::Nil);
    }

    #[test]
    fn flags_default_false_and_are_one_way_latches() {
        let v = Var::new("x".into(), "user".into());
        assert!(!v.is_macro());
        v.set_macro();
        assert!(v.is_macro());
    }
}
