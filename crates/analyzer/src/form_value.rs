//! The Form <-> Value bridge (spec.md 4.5), used by `quote` and by macro
//! expansion's round trip.

use std::rc::Rc;

use wisp_core::form::{Form, FormData, SourcePos};
use wisp_core::refs::RegexData;
use wisp_core::symbol::{Keyword, Symbol};
use wisp_core::{Meta, Value};
use wisp_gc::collections::{build_hash_set, build_list, build_map_auto, build_vector};
use wisp_gc::Heap;
use wisp_runtime::Env;

use crate::bridge::{BridgeError, MacroBridge};

/// Form -> Value. Fails (returns `None`) only on GC allocation failure.
pub fn form_to_value(heap: &Heap, env: &Env, form: &Form) -> Option<Value> {
    let source = form.pos();
    match &form.data {
        FormData::Nil => Some(Value::Nil),
        FormData::Boolean(b) => Some(Value::Boolean(*b)),
        FormData::Integer(n) => Some(Value::Integer(*n)),
        FormData::Float(f) => Some(Value::Float(*f)),
        // No BigInt/BigDecimal/Ratio Value variant exists in this core
        // (spec.md 1 lists bignum arithmetic as out of scope, referenced
        // only as an opaque type); the closest faithful representation
        // available is the literal source text, preserved as a string.
        FormData::BigInt(text) | FormData::BigDecimal(text) => heap.alloc_str(text).map(Value::Str),
        FormData::Ratio(n, d) => heap.alloc_str(&format!("{n}/{d}")).map(Value::Str),
        FormData::Char(c) => Some(Value::Char(*c)),
        FormData::String(s) => heap.alloc_str(s).map(Value::Str),
        FormData::Symbol { ns, name } => {
            let name = heap.alloc_str(name)?;
            let sym = match ns {
                Some(ns) => Symbol::qualified(heap.alloc_str(ns)?, name),
                None => Symbol::simple(name),
            };
            Some(Value::Symbol(sym))
        }
        FormData::Keyword { ns, name, auto_resolve } => {
            keyword_form_to_value(heap, env, ns.as_deref(), name, *auto_resolve)
        }
        FormData::List(children) => {
            let (items, positions) = convert_children(heap, env, children)?;
            build_list(heap, &items, &positions, source, Meta::none()).map(Value::List)
        }
        FormData::Vector(children) => {
            let (items, positions) = convert_children(heap, env, children)?;
            build_vector(heap, &items, &positions, source, Meta::none()).map(Value::Vector)
        }
        FormData::Map(flat) => {
            let (values, _) = convert_children(heap, env, flat)?;
            let pairs: Vec<(Value, Value)> = values.chunks_exact(2).map(|kv| (kv[0], kv[1])).collect();
            build_map_auto(heap, &pairs, Meta::none())
        }
        FormData::Set(children) => {
            let (items, _) = convert_children(heap, env, children)?;
            build_hash_set(heap, &items, Meta::none()).map(Value::HashSet)
        }
        FormData::Regex(source_text) => {
            let pattern = heap.alloc_str(source_text)?;
            heap.alloc_cell(RegexData::new(pattern, Meta::none())).map(Value::Regex)
        }
        // Tagged literals analyze as nil unless extended (spec.md 6).
        FormData::Tag { .. } => Some(Value::Nil),
    }
}

fn convert_children(heap: &Heap, env: &Env, children: &[Form]) -> Option<(Vec<Value>, Vec<SourcePos>)> {
    let mut values = Vec::with_capacity(children.len());
    let mut positions = Vec::with_capacity(children.len());
    for child in children {
        values.push(form_to_value(heap, env, child)?);
        positions.push(child.pos());
    }
    Some((values, positions))
}

/// Auto-resolved keywords: `::alias/name` resolves `alias` through the
/// current namespace's alias table; `::name` (no explicit ns) promotes to
/// `current_ns/name`. An unknown alias is stored literally as the
/// keyword's namespace rather than silently substituted (spec.md 9, open
/// question 3 - confirmed behavior, not a bug to paper over).
fn keyword_form_to_value(heap: &Heap, env: &Env, ns: Option<&str>, name: &str, auto_resolve: bool) -> Option<Value> {
    if !auto_resolve {
        let name = heap.alloc_str(name)?;
        let kw = match ns {
            Some(ns) => Keyword::qualified(heap.alloc_str(ns)?, name),
            None => Keyword::simple(name),
        };
        return Some(Value::Keyword(kw));
    }

    let current = env.current_namespace();
    let resolved_ns: Rc<str> = match ns {
        Some(alias) => current.alias_target(alias).unwrap_or_else(|| alias.into()),
        None => current.name.clone(),
    };
    let ns = heap.alloc_str(&resolved_ns)?;
    let name = heap.alloc_str(name)?;
    Some(Value::Keyword(Keyword::qualified(ns, name)))
}

/// Value -> Form, the inverse direction. Lazy sequences and cons chains are
/// realized through `bridge` first (spec.md 4.5); non-data Values (fns,
/// atoms, transients, opaque refs) convert to `nil` since they cannot
/// appear as macro output semantically.
pub fn value_to_form(heap: &Heap, bridge: &dyn MacroBridge, value: Value) -> Result<Form, BridgeError> {
    match value {
        Value::Nil => Ok(Form::synthetic(FormData::Nil)),
        Value::Boolean(b) => Ok(Form::synthetic(FormData::Boolean(b))),
        Value::Integer(n) => Ok(Form::synthetic(FormData::Integer(n))),
        Value::Float(f) => Ok(Form::synthetic(FormData::Float(f))),
        Value::Char(c) => Ok(Form::synthetic(FormData::Char(c))),
        Value::Str(s) => Ok(Form::synthetic(FormData::String(unsafe { s.as_str() }.into()))),
        Value::Symbol(sym) => Ok(Form::synthetic(FormData::Symbol {
            ns: unsafe { sym.ns_str() }.map(Into::into),
            name: unsafe { sym.name_str() }.into(),
        })),
        Value::Keyword(kw) => Ok(Form::synthetic(FormData::Keyword {
            ns: unsafe { kw.ns_str() }.map(Into::into),
            name: unsafe { kw.name_str() }.into(),
            auto_resolve: false,
        })),
        Value::List(list) => {
            let data = unsafe { list.as_ref() };
            let mut children = Vec::with_capacity(data.count());
            for i in 0..data.count() {
                let child_val = unsafe { data.nth(i) }.unwrap_or(Value::Nil);
                let recorded = unsafe { data.nth_pos(i) };
                children.push(child_form(heap, bridge, child_val, recorded)?);
            }
            Ok(Form::new(FormData::List(children.into()), data.source.line, data.source.column))
        }
        Value::Vector(vec) => {
            let data = unsafe { vec.as_ref() };
            let mut children = Vec::with_capacity(data.count());
            for i in 0..data.count() {
                let child_val = unsafe { data.nth(i) }.unwrap_or(Value::Nil);
                let recorded = unsafe { data.nth_pos(i) };
                children.push(child_form(heap, bridge, child_val, recorded)?);
            }
            Ok(Form::new(FormData::Vector(children.into()), data.source.line, data.source.column))
        }
        Value::ArrayMap(m) => {
            let data = unsafe { m.as_ref() };
            let mut flat = Vec::with_capacity(data.count() * 2);
            for (k, v) in unsafe { data.entries() } {
                flat.push(value_to_form(heap, bridge, k)?);
                flat.push(value_to_form(heap, bridge, v)?);
            }
            Ok(Form::synthetic(FormData::Map(flat.into())))
        }
        Value::HashMap(m) => {
            let data = unsafe { m.as_ref() };
            let mut flat = Vec::with_capacity(data.count() * 2);
            for (k, v) in unsafe { data.entries() } {
                flat.push(value_to_form(heap, bridge, k)?);
                flat.push(value_to_form(heap, bridge, v)?);
            }
            Ok(Form::synthetic(FormData::Map(flat.into())))
        }
        Value::HashSet(s) => {
            let data = unsafe { s.as_ref() };
            let mut children = Vec::with_capacity(data.count());
            for v in unsafe { data.iter() } {
                children.push(value_to_form(heap, bridge, v)?);
            }
            Ok(Form::synthetic(FormData::Set(children.into())))
        }
        Value::LazySeq(_) | Value::Cons(_) | Value::ChunkedCons(_) => {
            let items = realize_seq_items(heap, bridge, value)?;
            let mut children = Vec::with_capacity(items.len());
            for item in items {
                children.push(value_to_form(heap, bridge, item)?);
            }
            Ok(Form::synthetic(FormData::List(children.into())))
        }
        // Non-data Values cannot appear as macro/quote output semantically.
        _ => Ok(Form::synthetic(FormData::Nil)),
    }
}

fn child_form(heap: &Heap, bridge: &dyn MacroBridge, value: Value, recorded: SourcePos) -> Result<Form, BridgeError> {
    let mut form = value_to_form(heap, bridge, value)?;
    if form.line == 0 && form.column == 0 && !recorded.is_zero() {
        form.line = recorded.line;
        form.column = recorded.column;
    }
    Ok(form)
}

/// Walks a lazy-seq/cons/chunked-cons chain to completion, realizing every
/// pending thunk through `bridge`, and returns the flattened element list.
fn realize_seq_items(heap: &Heap, bridge: &dyn MacroBridge, mut value: Value) -> Result<Vec<Value>, BridgeError> {
    let mut items = Vec::new();
    loop {
        match value {
            Value::Nil => return Ok(items),
            Value::Cons(c) => {
                let data = unsafe { c.as_ref() };
                items.push(data.first);
                value = data.rest;
            }
            Value::LazySeq(ls) => {
                let data = unsafe { ls.as_ref() };
                let realized = match data.realized() {
                    Some(v) => v,
                    None => {
                        let thunk = data.thunk().expect("pending lazy_seq always carries a thunk");
                        let result = bridge.call_fn(thunk, &[])?;
                        data.realize_with(result);
                        result
                    }
                };
                value = realized;
            }
            Value::ChunkedCons(cc) => {
                let data = unsafe { cc.as_ref() };
                if let Value::ArrayChunk(chunk) = data.chunk {
                    let chunk_data = unsafe { chunk.as_ref() };
                    for i in 0..chunk_data.count() {
                        if let Some(v) = unsafe { chunk_data.nth(i) } {
                            items.push(v);
                        }
                    }
                }
                value = data.more;
            }
            Value::List(l) => {
                let data = unsafe { l.as_ref() };
                items.extend(unsafe { data.iter() });
                return Ok(items);
            }
            Value::Vector(v) => {
                let data = unsafe { v.as_ref() };
                items.extend(unsafe { data.iter() });
                return Ok(items);
            }
            _ => return Ok(items),
        }
        let _ = heap; // heap kept for signature symmetry/future chunk allocation needs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_gc::GcConfig;

    struct NoopBridge;
    impl MacroBridge for NoopBridge {
        fn call_fn(&self, _callable: Value, _args: &[Value]) -> Result<Value, BridgeError> {
            Err(BridgeError("no callables in this test".into()))
        }
    }

    #[test]
    fn round_trips_a_simple_list() {
        let heap = Heap::new(GcConfig::new());
        let env = Env::new("user");
        let form = Form::new(
            FormData::List(vec![Form::new(FormData::Integer(1), 1, 2), Form::new(FormData::Integer(2), 1, 4)].into()),
            1,
            0,
        );
        let value = form_to_value(&heap, &env, &form).unwrap();
        let bridge = NoopBridge;
        let back = value_to_form(&heap, &bridge, value).unwrap();
        assert_eq!(back.line, 1);
        match back.data {
            FormData::List(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0].line, 1);
                assert_eq!(children[0].column, 2);
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn auto_resolved_keyword_with_unknown_alias_keeps_the_alias_literally() {
        let heap = Heap::new(GcConfig::new());
        let env = Env::new("user");
        let form = Form::synthetic(FormData::Keyword {
            ns: Some("nope".into()),
            name: "x".into(),
            auto_resolve: true,
        });
        let value = form_to_value(&heap, &env, &form).unwrap();
        match value {
            Value::Keyword(kw) => assert_eq!(unsafe { kw.ns_str() }, Some("nope")),
            other => panic!("expected a keyword, got {other:?}"),
        }
    }

    #[test]
    fn non_data_value_converts_to_nil_form() {
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let atom = heap
            .alloc_cell(wisp_core::holders::AtomData::new(Value::Integer(1), Meta::none()))
            .unwrap();
        let form = value_to_form(&heap, &bridge, Value::Atom(atom)).unwrap();
        assert!(form.is_nil());
    }
}
