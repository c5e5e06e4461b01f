//! `Namespace`: a name-to-Var registry plus the refer/alias tables that back
//! qualified and unqualified symbol resolution (spec.md 3.2, 4.3).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::var::Var;

#[derive(Debug)]
pub enum ReferError {
    /// `name` already has a local mapping in the referring namespace; a
    /// `refer` would silently shadow it, which spec.md 4.3 forbids.
    AlreadyMapped { name: Rc<str> },
}

impl std::fmt::Display for ReferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferError::AlreadyMapped { name } => {
                write!(f, "{name} already refers to an existing var in this namespace")
            }
        }
    }
}

impl std::error::Error for ReferError {}

pub struct Namespace {
    pub name: Rc<str>,
    /// Vars interned directly into this namespace; the namespace is their
    /// sole owner.
    mappings: RefCell<HashMap<Rc<str>, Rc<Var>>>,
    /// Vars pulled in from other namespaces (`refer`/`use`); these entries
    /// alias a `Var` owned elsewhere and must never be mistaken for locally
    /// interned vars when deciding visibility for a qualified lookup from
    /// the defining namespace.
    refers: RefCell<HashMap<Rc<str>, Rc<Var>>>,
    /// alias name -> target namespace name.
    aliases: RefCell<HashMap<Rc<str>, Rc<str>>>,
}

impl Namespace {
    pub fn new(name: Rc<str>) -> Namespace {
        Namespace {
            name,
            mappings: RefCell::new(HashMap::new()),
            refers: RefCell::new(HashMap::new()),
            aliases: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the existing Var for `name`, or interns a fresh, unbound one.
    /// Interning is idempotent - a second `intern` for the same name returns
    /// the same `Var`, never replacing it (redefinition rebinds the root via
    /// `Var::bind_root`, it does not create a new Var identity).
    pub fn intern(&self, name: Rc<str>) -> Rc<Var> {
        if let Some(existing) = self.mappings.borrow().get(&name) {
            return existing.clone();
        }
        let var = Var::new(name.clone(), self.name.clone());
        self.mappings.borrow_mut().insert(name, var.clone());
        var
    }

    pub fn refer(&self, name: Rc<str>, var: Rc<Var>) -> Result<(), ReferError> {
        if self.mappings.borrow().contains_key(&name) {
            return Err(ReferError::AlreadyMapped { name });
        }
        self.refers.borrow_mut().insert(name, var);
        Ok(())
    }

    pub fn add_alias(&self, alias: Rc<str>, target: Rc<str>) {
        self.aliases.borrow_mut().insert(alias, target);
    }

    /// alias -> target namespace name, if `alias` names one.
    pub fn alias_target(&self, alias: &str) -> Option<Rc<str>> {
        self.aliases.borrow().get(alias).cloned()
    }

    /// Unqualified resolution order: this namespace's own mappings first,
    /// then referred-in vars (spec.md 4.3).
    pub fn resolve(&self, name: &str) -> Option<Rc<Var>> {
        if let Some(var) = self.mappings.borrow().get(name) {
            return Some(var.clone());
        }
        self.refers.borrow().get(name).cloned()
    }

    /// The var locally interned under `name`, ignoring refers - used for
    /// qualified lookups (`ns/x` always means "the var `ns` itself
    /// interned", never one it merely refers in).
    pub fn local(&self, name: &str) -> Option<Rc<Var>> {
        self.mappings.borrow().get(name).cloned()
    }

    pub fn vars(&self) -> Vec<Rc<Var>> {
        self.mappings.borrow().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let ns = Namespace::new("user".into());
        let a = ns.intern("x".into());
        let b = ns.intern("x".into());
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn refer_refuses_to_shadow_a_local_mapping() {
        let ns = Namespace::new("user".into());
        ns.intern("x".into());
        let other = Namespace::new("other.ns".into());
        let foreign = other.intern("x".into());
        let err = ns.refer("x".into(), foreign).unwrap_err();
        assert!(matches!(err, ReferError::AlreadyMapped { .. }));
    }

    #[test]
    fn resolve_prefers_local_mapping_over_refer() {
        let ns = Namespace::new("user".into());
        let local = ns.intern("x".into());
        local.bind_root(wisp_core::Value::Integer(1));

        let other = Namespace::new("other.ns".into());
        let foreign = other.intern("y".into());
        ns.refer("y".into(), foreign.clone()).unwrap();

        assert!(Rc::ptr_eq(&ns.resolve("x").unwrap(), &local));
        assert!(Rc::ptr_eq(&ns.resolve("y").unwrap(), &foreign));
        assert!(ns.local("y").is_none());
    }
}
