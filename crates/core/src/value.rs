//! `Value`: the tagged union every other type in this crate exists to back.
//!
//! Every variant is either a primitive that fits in a machine word, or a
//! handle (`GcPtr`/`GcSlice`/`GcStr`) into memory owned and swept by a
//! `wisp-gc::Heap`. `Value` is `Copy` - passing one around never clones
//! heap data, only the handle - which is what lets the evaluator push and
//! pop values on an ordinary Rust stack without its own bookkeeping.

use crate::collections::{ArrayMapData, HashMapData, HashSetData, ListData, VectorData};
use crate::control::{DelayData, ReducedData};
use crate::func::{FnValData, MultiFnData, ProtocolData, ProtocolFnData};
use crate::holders::{AtomData, TransientMapData, TransientSetData, TransientVectorData, VolatileRefData};
use crate::ptr::{GcPtr, GcStr};
use crate::refs::{RegexData, VarRefData};
use crate::seq::{ArrayChunkData, ChunkBufferData, ChunkedConsData, ConsData, LazySeqData};
use crate::symbol::{Keyword, Symbol};

/// Identifies one of the built-in functions the evaluator implements in
/// native Rust (`+`, `conj`, `assoc`, ...). The table mapping this id to an
/// actual function pointer lives in the evaluator, not here - `wisp-core`
/// only needs something `Copy`/`Eq`/`Hash` to stand in for "this value is
/// callable and refers to built-in number N".
pub type BuiltinFnId = u32;

#[derive(Clone, Copy, Debug)]
pub enum Value {
    // --- Primitives ---
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Char(char),
    BuiltinFn(BuiltinFnId),

    // --- Text and atoms ---
    Str(GcStr),
    Symbol(Symbol),
    Keyword(Keyword),

    // --- Persistent collections ---
    List(GcPtr<ListData>),
    Vector(GcPtr<VectorData>),
    ArrayMap(GcPtr<ArrayMapData>),
    HashMap(GcPtr<HashMapData>),
    HashSet(GcPtr<HashSetData>),

    // --- Lazy/seq family ---
    LazySeq(GcPtr<LazySeqData>),
    Cons(GcPtr<ConsData>),
    ChunkedCons(GcPtr<ChunkedConsData>),
    ChunkBuffer(GcPtr<ChunkBufferData>),
    ArrayChunk(GcPtr<ArrayChunkData>),

    // --- Mutable holders ---
    Atom(GcPtr<AtomData>),
    VolatileRef(GcPtr<VolatileRefData>),
    TransientVector(GcPtr<TransientVectorData>),
    TransientMap(GcPtr<TransientMapData>),
    TransientSet(GcPtr<TransientSetData>),

    // --- Callables ---
    Fn(GcPtr<FnValData>),
    Protocol(GcPtr<ProtocolData>),
    ProtocolFn(GcPtr<ProtocolFnData>),
    MultiFn(GcPtr<MultiFnData>),

    // --- Control-flow carriers ---
    Delay(GcPtr<DelayData>),
    Reduced(GcPtr<ReducedData>),

    // --- External references ---
    VarRef(GcPtr<VarRefData>),
    Regex(GcPtr<RegexData>),
}

impl Value {
    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Truthiness per the usual Lisp-family rule: everything is truthy
    /// except `nil` and `false`.
    pub fn is_truthy(self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::BuiltinFn(_) => "builtin_fn",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::ArrayMap(_) => "array_map",
            Value::HashMap(_) => "hash_map",
            Value::HashSet(_) => "hash_set",
            Value::LazySeq(_) => "lazy_seq",
            Value::Cons(_) => "cons",
            Value::ChunkedCons(_) => "chunked_cons",
            Value::ChunkBuffer(_) => "chunk_buffer",
            Value::ArrayChunk(_) => "array_chunk",
            Value::Atom(_) => "atom",
            Value::VolatileRef(_) => "volatile_ref",
            Value::TransientVector(_) => "transient_vector",
            Value::TransientMap(_) => "transient_map",
            Value::TransientSet(_) => "transient_set",
            Value::Fn(_) => "fn",
            Value::Protocol(_) => "protocol",
            Value::ProtocolFn(_) => "protocol_fn",
            Value::MultiFn(_) => "multi_fn",
            Value::Delay(_) => "delay",
            Value::Reduced(_) => "reduced",
            Value::VarRef(_) => "var_ref",
            Value::Regex(_) => "regex",
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(
            self,
            Value::List(_)
                | Value::Vector(_)
                | Value::ArrayMap(_)
                | Value::HashMap(_)
                | Value::HashSet(_)
        )
    }

    pub fn is_seqable(self) -> bool {
        self.is_collection()
            || matches!(
                self,
                Value::Nil | Value::LazySeq(_) | Value::Cons(_) | Value::ChunkedCons(_) | Value::Str(_)
            )
    }

    pub fn is_map(self) -> bool {
        matches!(self, Value::ArrayMap(_) | Value::HashMap(_))
    }

    pub fn is_fn_like(self) -> bool {
        matches!(
            self,
            Value::Fn(_) | Value::BuiltinFn(_) | Value::ProtocolFn(_) | Value::MultiFn(_)
        )
    }
}

/// Structural equality, not pointer equality - `Value` derives `PartialEq`
/// only for use in plain Rust contexts (test assertions, `Option<Value>`
/// comparisons against a known literal). Collection members are compared by
/// address here, *not* by [`crate::eql::value_eq`]'s structural rules - use
/// `eql::value_eq` directly whenever language-level `=` semantics are
/// required.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (BuiltinFn(a), BuiltinFn(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Symbol(a), Symbol(b)) => a == b,
            (Keyword(a), Keyword(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Vector(a), Vector(b)) => a == b,
            (ArrayMap(a), ArrayMap(b)) => a == b,
            (HashMap(a), HashMap(b)) => a == b,
            (HashSet(a), HashSet(b)) => a == b,
            (LazySeq(a), LazySeq(b)) => a == b,
            (Cons(a), Cons(b)) => a == b,
            (ChunkedCons(a), ChunkedCons(b)) => a == b,
            (ChunkBuffer(a), ChunkBuffer(b)) => a == b,
            (ArrayChunk(a), ArrayChunk(b)) => a == b,
            (Atom(a), Atom(b)) => a == b,
            (VolatileRef(a), VolatileRef(b)) => a == b,
            (TransientVector(a), TransientVector(b)) => a == b,
            (TransientMap(a), TransientMap(b)) => a == b,
            (TransientSet(a), TransientSet(b)) => a == b,
            (Fn(a), Fn(b)) => a == b,
            (Protocol(a), Protocol(b)) => a == b,
            (ProtocolFn(a), ProtocolFn(b)) => a == b,
            (MultiFn(a), MultiFn(b)) => a == b,
            (Delay(a), Delay(b)) => a == b,
            (Reduced(a), Reduced(b)) => a == b,
            (VarRef(a), VarRef(b)) => a == b,
            (Regex(a), Regex(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_excludes_only_nil_and_false() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::Str(GcStr(crate::ptr::GcSlice::empty())).is_truthy());
    }

    #[test]
    fn type_name_covers_primitives() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Integer(1).type_name(), "integer");
        assert_eq!(Value::Float(1.0).type_name(), "float");
    }

    #[test]
    fn collections_are_seqable_and_maps_are_a_subset() {
        assert!(Value::Nil.is_seqable());
        assert!(!Value::Nil.is_collection());
        assert!(!Value::Integer(1).is_seqable());
    }
}
