//! `var_ref` and `regex`: two Value variants whose real state lives outside
//! the GC-traced heap.

use crate::meta::Meta;
use crate::ptr::GcStr;
use crate::symbol::Symbol;
use crate::value::Value;

/// `var_ref { sym, ns_name, root, dynamic, macro, doc?, arglists?, meta? }`.
///
/// This is a GC-allocated *snapshot* of a `Var`'s fields taken when `(var
/// x)` is evaluated, not the live, mutable `Var` itself - the runtime
/// crate's `Var` lives in an ordinary `Rc<RefCell<_>>`, owned by its
/// `Namespace`, outside the heap this crate's GC traces. Snapshotting keeps
/// `Value` a plain GC-traced tagged union without reaching across into
/// runtime-owned, non-`Copy` state.
#[derive(Clone, Copy, Debug)]
pub struct VarRefData {
    pub sym: Symbol,
    pub ns_name: GcStr,
    pub root: Value,
    pub dynamic: bool,
    pub is_macro: bool,
    pub doc: Option<GcStr>,
    pub arglists: Option<Value>,
    pub meta: Meta,
}

/// `regex { pattern, meta }`.
///
/// A compiled `regex::Regex` owns heap allocations of its own (its
/// compiled program and cache tables) that know nothing about this
/// collector's mark-and-sweep - storing one directly inside GC-managed
/// memory would silently leak every time `Heap::collect` recycles the
/// slot without running `Regex`'s destructor. Instead this struct keeps
/// only the source pattern inside the heap and looks the compiled form up
/// in a process-wide cache the first time it is needed.
#[derive(Clone, Copy, Debug)]
pub struct RegexData {
    pub pattern: GcStr,
    pub meta: Meta,
}

impl RegexData {
    pub fn new(pattern: GcStr, meta: Meta) -> Self {
        RegexData { pattern, meta }
    }

    /// # Safety
    /// The backing string storage for `pattern` must still be alive.
    pub unsafe fn compiled(&self) -> Result<std::rc::Rc<regex::Regex>, regex::Error> {
        let pattern = unsafe { self.pattern.as_str() };
        regex_cache::get_or_compile(pattern)
    }
}

mod regex_cache {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    thread_local! {
        static CACHE: RefCell<HashMap<String, Rc<regex::Regex>>> = RefCell::new(HashMap::new());
    }

    pub fn get_or_compile(pattern: &str) -> Result<Rc<regex::Regex>, regex::Error> {
        CACHE.with(|cache| {
            if let Some(re) = cache.borrow().get(pattern) {
                return Ok(re.clone());
            }
            let compiled = Rc::new(regex::Regex::new(pattern)?);
            cache.borrow_mut().insert(pattern.to_string(), compiled.clone());
            Ok(compiled)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn regex_cache_reuses_compiled_pattern() {
        let a = regex_cache::get_or_compile("a+b").unwrap();
        let b = regex_cache::get_or_compile("a+b").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
