//! Callables: `fn_val`, `protocol`, `protocol_fn`, `multi_fn`.

use crate::meta::Meta;
use crate::ptr::GcSlice;
use crate::symbol::Symbol;
use crate::value::Value;
use std::cell::RefCell;

/// One arity of a `fn*`: fixed parameter count, optional variadic tail, and
/// a reference to the analyzed body the evaluator will run. The body lives
/// outside this crate (it is an `analyzer::Node`); we hold it as an opaque
/// handle so `wisp-core` does not depend on `wisp-analyzer`.
#[derive(Clone, Copy, Debug)]
pub struct FnArity {
    pub fixed_params: GcSlice<Symbol>,
    pub variadic_param: Option<Symbol>,
    /// Opaque index into the owning `fn_val`'s body table; resolved by the
    /// evaluator, not interpreted here.
    pub body: usize,
}

impl FnArity {
    pub fn min_args(&self) -> usize {
        self.fixed_params.len()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic_param.is_some()
    }

    pub fn accepts(&self, argc: usize) -> bool {
        if self.is_variadic() {
            argc >= self.min_args()
        } else {
            argc == self.min_args()
        }
    }
}

/// `fn_val { name?, arities, closed_over, meta }`. `closed_over` is the
/// captured lexical environment at the point of `fn*` evaluation, stored as
/// a GC-owned slice of (symbol-independent) Values in capture order; the
/// evaluator is the only party that knows how to map an arity's free
/// variables back onto this slice.
#[derive(Clone, Copy, Debug)]
pub struct FnValData {
    pub name: Option<Symbol>,
    pub arities: GcSlice<FnArity>,
    pub closed_over: GcSlice<Value>,
    pub meta: Meta,
}

impl FnValData {
    /// # Safety
    /// `arities` and `closed_over` must be allocated by a `Heap` and remain
    /// alive.
    pub unsafe fn new(
        name: Option<Symbol>,
        arities: GcSlice<FnArity>,
        closed_over: GcSlice<Value>,
        meta: Meta,
    ) -> Self {
        FnValData {
            name,
            arities,
            closed_over,
            meta,
        }
    }

    /// # Safety
    /// `arities` must still be alive.
    pub unsafe fn arity_for(&self, argc: usize) -> Option<FnArity> {
        unsafe { self.arities.as_slice() }
            .iter()
            .copied()
            .find(|a| a.accepts(argc))
    }
}

/// `protocol { name, method_sigs, meta }`: a named set of method signatures
/// (arity lists only - dispatch is by first-argument type, resolved
/// externally by whatever maintains the protocol's implementor table).
#[derive(Clone, Copy, Debug)]
pub struct ProtocolData {
    pub name: Symbol,
    pub method_names: GcSlice<Symbol>,
    pub meta: Meta,
}

impl ProtocolData {
    /// # Safety
    /// `method_names` must be allocated by a `Heap` and remain alive.
    pub unsafe fn new(name: Symbol, method_names: GcSlice<Symbol>, meta: Meta) -> Self {
        ProtocolData {
            name,
            method_names,
            meta,
        }
    }
}

/// `protocol_fn { protocol, method_name, meta }`: the callable Var root
/// bound for each protocol method - invoking it dispatches on the runtime
/// type of its first argument. The actual per-type implementor table is
/// owned by the runtime crate (it is mutable, process-global state, not
/// part of a GC-traced Value graph), so this struct only names which
/// protocol/method it dispatches for.
#[derive(Clone, Copy, Debug)]
pub struct ProtocolFnData {
    pub protocol: Symbol,
    pub method_name: Symbol,
    pub meta: Meta,
}

/// `multi_fn { dispatch_fn, methods, default, meta }`. `methods` maps a
/// dispatch value to an analyzed method body; since dispatch values are
/// arbitrary Values and this must be mutable (methods are added one
/// `defmethod` at a time, after the `multi_fn` already exists and may be
/// referenced), it is stored as a `RefCell` over a simple association list
/// rather than the array-backed collections used for ordinary immutable
/// Values.
#[derive(Debug)]
pub struct MultiFnData {
    pub name: Symbol,
    pub dispatch_fn: Value,
    pub default_dispatch_value: Value,
    methods: RefCell<Vec<(Value, usize)>>,
    pub meta: Meta,
}

impl MultiFnData {
    pub fn new(name: Symbol, dispatch_fn: Value, default_dispatch_value: Value, meta: Meta) -> Self {
        MultiFnData {
            name,
            dispatch_fn,
            default_dispatch_value,
            methods: RefCell::new(Vec::new()),
            meta,
        }
    }

    /// # Safety
    /// Any heap-backed payload reachable from `dispatch_val` must still be
    /// alive for the duration of this call.
    pub unsafe fn add_method(&self, dispatch_val: Value, body: usize) {
        let mut methods = self.methods.borrow_mut();
        if let Some(slot) = methods
            .iter_mut()
            .find(|(v, _)| unsafe { crate::eql::value_eq(*v, dispatch_val) })
        {
            slot.1 = body;
        } else {
            methods.push((dispatch_val, body));
        }
    }

    /// # Safety
    /// Any heap-backed payload reachable from `dispatch_val` must still be
    /// alive.
    pub unsafe fn method_for(&self, dispatch_val: Value) -> Option<usize> {
        self.methods
            .borrow()
            .iter()
            .find(|(v, _)| unsafe { crate::eql::value_eq(*v, dispatch_val) })
            .map(|(_, body)| *body)
    }

    pub fn method_count(&self) -> usize {
        self.methods.borrow().len()
    }

    /// Dispatch values currently registered, for GC tracing.
    pub fn dispatch_values(&self) -> Vec<Value> {
        self.methods.borrow().iter().map(|(v, _)| *v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_arity_accepts_variadic_and_fixed() {
        let fixed = FnArity {
            fixed_params: GcSlice::empty(),
            variadic_param: None,
            body: 0,
        };
        assert!(fixed.accepts(0));
        assert!(!fixed.accepts(1));
    }

    #[test]
    fn multi_fn_add_and_lookup_method() {
        let name = Symbol::simple(unsafe { leak_gcstr("foo") });
        let mf = MultiFnData::new(name, Value::Nil, Value::Keyword(default_kw()), Meta::none());
        unsafe {
            mf.add_method(Value::Integer(1), 42);
            assert_eq!(mf.method_for(Value::Integer(1)), Some(42));
            assert_eq!(mf.method_for(Value::Integer(2)), None);
            mf.add_method(Value::Integer(1), 43);
            assert_eq!(mf.method_for(Value::Integer(1)), Some(43));
        }
        assert_eq!(mf.method_count(), 1);
    }

    fn default_kw() -> crate::symbol::Keyword {
        crate::symbol::Keyword::simple(unsafe { leak_gcstr("default") })
    }

    /// Test-only helper: leak a `&'static str` into a `GcStr` without a
    /// real `Heap`, since these unit tests only exercise pointer-free
    /// logic (string contents, not GC lifetime).
    unsafe fn leak_gcstr(s: &'static str) -> crate::ptr::GcStr {
        use std::ptr::NonNull;
        let bytes: &'static [u8] = s.as_bytes();
        let ptr = NonNull::new(bytes.as_ptr() as *mut u8).unwrap();
        unsafe { crate::ptr::GcStr(crate::ptr::GcSlice::from_raw(ptr, bytes.len())) }
    }
}
