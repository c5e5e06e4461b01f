//! `Env`: the single mutable-state owner for a running core, tying together
//! the namespace registry, the current namespace, the dynamic-binding
//! stack, and error reporting (spec.md 4.3, 4.4.5; SPEC_FULL.md 6).
//!
//! Named and shaped after the teacher's single-struct-owns-mutable-state
//! convention (`compiler/src/resolver.rs`'s `Resolver` owning
//! `included_files`/`project_root`, `compiler/src/codegen.rs`'s `CodeGen`
//! owning virtual-stack state) rather than scattering namespace/binding/
//! error state across free functions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wisp_core::Value;

use crate::bindings::BindingStack;
use crate::error::ErrorContext;
use crate::namespace::Namespace;
use crate::var::Var;

pub struct Env {
    namespaces: RefCell<HashMap<Rc<str>, Rc<Namespace>>>,
    current_ns: RefCell<Rc<str>>,
    pub bindings: BindingStack,
    pub errors: ErrorContext,
}

impl Env {
    /// `current` is the namespace made current on construction (interned if
    /// it does not already exist) - every core needs at least one namespace
    /// to start analyzing forms in.
    pub fn new(current: &str) -> Env {
        let env = Env {
            namespaces: RefCell::new(HashMap::new()),
            current_ns: RefCell::new(current.into()),
            bindings: BindingStack::new(),
            errors: ErrorContext::new(),
        };
        env.find_or_create(current);
        env
    }

    pub fn find_or_create(&self, name: &str) -> Rc<Namespace> {
        if let Some(ns) = self.namespaces.borrow().get(name) {
            return ns.clone();
        }
        let name: Rc<str> = name.into();
        let ns = Rc::new(Namespace::new(name.clone()));
        self.namespaces.borrow_mut().insert(name, ns.clone());
        ns
    }

    pub fn find(&self, name: &str) -> Option<Rc<Namespace>> {
        self.namespaces.borrow().get(name).cloned()
    }

    pub fn current_namespace(&self) -> Rc<Namespace> {
        let name = self.current_ns.borrow().clone();
        self.find_or_create(&name)
    }

    pub fn set_current_namespace(&self, name: &str) {
        self.find_or_create(name);
        *self.current_ns.borrow_mut() = name.into();
    }

    /// Qualified resolution: `ns_or_alias` is first looked up as an alias of
    /// `from`, then as a namespace name directly; the var is then looked up
    /// among that namespace's *own* interned vars (never its refers), and
    /// is visible unless private and `from` is not the defining namespace.
    pub fn resolve_qualified(&self, from: &Namespace, ns_or_alias: &str, name: &str) -> Option<Rc<Var>> {
        let target_name = from.alias_target(ns_or_alias).unwrap_or_else(|| ns_or_alias.into());
        let target = self.find(&target_name)?;
        let var = target.local(name)?;
        if var.is_private() && from.name != target.name {
            return None;
        }
        Some(var)
    }

    /// One `(var.root, var.meta-as-value)` pair per uniquely-owned Var
    /// across every namespace, flattened for `wisp_gc::Roots::var_roots`.
    /// Refers are skipped: they alias a Var already reachable via its
    /// owning namespace's mappings, so tracing them again would be
    /// redundant, not incorrect, but there is no reason to pay for it twice.
    pub fn gc_var_roots(&self) -> Vec<(Value, Value)> {
        self.namespaces
            .borrow()
            .values()
            .flat_map(|ns| ns.vars())
            .map(|var| (var.root(), var.meta_as_value()))
            .collect()
    }

    /// Every bound value on the dynamic-binding stack, for
    /// `wisp_gc::Roots::binding_values`.
    pub fn gc_binding_values(&self) -> Vec<Value> {
        self.bindings.collect_values()
    }

    /// Builds the Environment's contribution to a `wisp_gc::Heap::collect`
    /// call out of previously computed `gc_var_roots`/`gc_binding_values`
    /// slices - split from those two accessors because the caller (the
    /// evaluator) still needs to fold in its own operand-stack and
    /// exception-register roots before calling `collect`.
    pub fn gc_roots<'a>(&self, var_roots: &'a [(Value, Value)], binding_values: &'a [Value]) -> wisp_gc::Roots<'a> {
        wisp_gc::Roots {
            var_roots,
            binding_values,
            ..wisp_gc::Roots::new()
        }
    }

    /// `deref` semantics: non-dynamic vars always read the root; dynamic
    /// vars read the innermost thread binding if one is active, falling
    /// back to the root otherwise (spec.md 4.3).
    pub fn deref(&self, var: &Rc<Var>) -> Value {
        if var.is_dynamic() {
            if let Some(bound) = self.bindings.thread_binding(var) {
                return bound;
            }
        }
        var.root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_or_create_is_idempotent() {
        let env = Env::new("user");
        let a = env.find_or_create("user.core");
        let b = env.find_or_create("user.core");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn deref_falls_back_to_root_without_a_thread_binding() {
        let env = Env::new("user");
        let ns = env.current_namespace();
        let var = ns.intern("x".into());
        var.bind_root(Value::Integer(7));
        var.set_dynamic(true);
        assert_eq!(env.deref(&var), Value::Integer(7));
    }

    #[test]
    fn deref_prefers_an_active_thread_binding_for_dynamic_vars() {
        let env = Env::new("user");
        let ns = env.current_namespace();
        let var = ns.intern("x".into());
        var.bind_root(Value::Integer(7));
        var.set_dynamic(true);

        env.bindings.push_bindings(vec![(var.clone(), Value::Integer(99))]);
        assert_eq!(env.deref(&var), Value::Integer(99));
        env.bindings.pop_bindings();
        assert_eq!(env.deref(&var), Value::Integer(7));
    }

    #[test]
    fn resolve_qualified_respects_privacy_outside_the_defining_namespace() {
        let env = Env::new("user");
        let lib = env.find_or_create("my.lib");
        let private_var = lib.intern("secret".into());
        private_var.set_private();

        let user = env.current_namespace();
        assert!(env.resolve_qualified(&user, "my.lib", "secret").is_none());
        assert!(env.resolve_qualified(&lib, "my.lib", "secret").is_some());
    }

    #[test]
    fn resolve_qualified_follows_an_alias() {
        let env = Env::new("user");
        let lib = env.find_or_create("my.lib");
        let public_var = lib.intern("helper".into());

        let user = env.current_namespace();
        user.add_alias("lib".into(), "my.lib".into());
        let resolved = env.resolve_qualified(&user, "lib", "helper").unwrap();
        assert!(Rc::ptr_eq(&resolved, &public_var));
    }

    #[test]
    fn gc_var_roots_skips_refers_to_avoid_duplicate_entries() {
        let env = Env::new("user");
        let lib = env.find_or_create("my.lib");
        let shared = lib.intern("x".into());
        shared.bind_root(Value::Integer(1));

        let user = env.current_namespace();
        user.refer("x".into(), shared).unwrap();

        let roots = env.gc_var_roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].0, Value::Integer(1));
    }

    #[test]
    fn gc_roots_exposes_var_and_binding_slices() {
        let env = Env::new("user");
        let var_roots = env.gc_var_roots();
        let binding_values = env.gc_binding_values();
        let roots = env.gc_roots(&var_roots, &binding_values);
        assert!(roots.var_roots.is_empty());
        assert!(roots.binding_values.is_empty());
    }
}
