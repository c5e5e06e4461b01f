//! Builder helpers that turn plain Rust slices into GC-owned persistent
//! collections, in one place, since - per `wisp_core::collections::array_map`'s
//! doc comment - "only the allocator knows how to grow a map across
//! representations". Callers (the Form->Value bridge, the evaluator's
//! collection-construction builtins) should use these rather than hand-
//! rolling `alloc_slice_copy` plus the raw `*Data::new` constructors.

use wisp_core::collections::{ArrayMapData, HashMapData, HashSetData, ListData, VectorData};
use wisp_core::eql::{value_eq, value_hash};
use wisp_core::form::SourcePos;
use wisp_core::ptr::GcPtr;
use wisp_core::{Meta, Value};

use crate::heap::Heap;

/// Above this many entries, a map literal is built as a `hash_map` instead
/// of an `array_map` (spec.md 3.1: array_map is for "up to N entries").
pub const ARRAY_MAP_MAX_ENTRIES: usize = 8;

pub fn build_list(heap: &Heap, items: &[Value], positions: &[SourcePos], source: SourcePos, meta: Meta) -> Option<GcPtr<ListData>> {
    debug_assert_eq!(items.len(), positions.len());
    let items = heap.alloc_slice_copy(items)?;
    let positions = heap.alloc_slice_copy(positions)?;
    heap.alloc_cell(unsafe { ListData::new_full(items, positions, source, meta) })
}

pub fn build_vector(heap: &Heap, items: &[Value], positions: &[SourcePos], source: SourcePos, meta: Meta) -> Option<GcPtr<VectorData>> {
    debug_assert_eq!(items.len(), positions.len());
    let items = heap.alloc_slice_copy(items)?;
    let positions = heap.alloc_slice_copy(positions)?;
    heap.alloc_cell(unsafe { VectorData::new(items, positions, source, meta) })
}

pub fn build_array_map(heap: &Heap, pairs: &[(Value, Value)], meta: Meta) -> Option<GcPtr<ArrayMapData>> {
    let mut flat: Vec<Value> = Vec::with_capacity(pairs.len() * 2);
    for (k, v) in pairs {
        if let Some(slot) = flat.chunks_exact(2).position(|kv| unsafe { value_eq(kv[0], *k) }) {
            flat[slot * 2 + 1] = *v;
        } else {
            flat.push(*k);
            flat.push(*v);
        }
    }
    let pairs = heap.alloc_slice_copy(&flat)?;
    heap.alloc_cell(unsafe { ArrayMapData::new(pairs, meta) })
}

pub fn build_hash_set(heap: &Heap, items: &[Value], meta: Meta) -> Option<GcPtr<HashSetData>> {
    let mut deduped: Vec<Value> = Vec::with_capacity(items.len());
    for v in items {
        if !deduped.iter().any(|existing| unsafe { value_eq(*existing, *v) }) {
            deduped.push(*v);
        }
    }
    let items = heap.alloc_slice_copy(&deduped)?;
    heap.alloc_cell(unsafe { HashSetData::new(items, meta) })
}

pub fn build_hash_map(heap: &Heap, pairs: &[(Value, Value)], meta: Meta) -> Option<GcPtr<HashMapData>> {
    let mut keys: Vec<Value> = Vec::new();
    let mut vals: Vec<Value> = Vec::new();
    let mut has_null_key = false;
    let mut null_value = Value::Nil;

    for (k, v) in pairs {
        if matches!(k, Value::Nil) {
            has_null_key = true;
            null_value = *v;
            continue;
        }
        if let Some(i) = keys.iter().position(|existing| unsafe { value_eq(*existing, *k) }) {
            vals[i] = *v;
        } else {
            keys.push(*k);
            vals.push(*v);
        }
    }

    let bucket_count = keys.len().max(1).next_power_of_two();
    let mut buckets = vec![-1i32; bucket_count];
    let mut next = vec![-1i32; keys.len()];
    for (i, key) in keys.iter().enumerate() {
        let h = unsafe { value_hash(*key) };
        let b = (h as usize) % bucket_count;
        next[i] = buckets[b];
        buckets[b] = i as i32;
    }

    let buckets = heap.alloc_slice_copy(&buckets)?;
    let keys_slice = heap.alloc_slice_copy(&keys)?;
    let vals_slice = heap.alloc_slice_copy(&vals)?;
    let next_slice = heap.alloc_slice_copy(&next)?;
    let count = keys.len();
    heap.alloc_cell(unsafe {
        HashMapData::new(buckets, keys_slice, vals_slice, next_slice, count, has_null_key, null_value, meta)
    })
}

/// Chooses `array_map` below `ARRAY_MAP_MAX_ENTRIES`, `hash_map` at or above
/// it, and returns the resulting Value directly - the choice between the
/// two representations is an implementation detail callers should not have
/// to make themselves.
pub fn build_map_auto(heap: &Heap, pairs: &[(Value, Value)], meta: Meta) -> Option<Value> {
    if pairs.len() < ARRAY_MAP_MAX_ENTRIES {
        build_array_map(heap, pairs, meta).map(Value::ArrayMap)
    } else {
        build_hash_map(heap, pairs, meta).map(Value::HashMap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GcConfig;

    fn kw_val(heap: &Heap, s: &str) -> Value {
        Value::Keyword(wisp_core::symbol::Keyword::simple(heap.alloc_str(s).unwrap()))
    }

    #[test]
    fn build_array_map_dedupes_last_write_wins() {
        let heap = Heap::new(GcConfig::new());
        let k = kw_val(&heap, "a");
        let map = build_array_map(&heap, &[(k, Value::Integer(1)), (k, Value::Integer(2))], Meta::none()).unwrap();
        assert_eq!(unsafe { map.as_ref().count() }, 1);
        assert_eq!(unsafe { map.as_ref().get(k) }, Some(Value::Integer(2)));
    }

    #[test]
    fn build_hash_map_handles_nil_key_out_of_band() {
        let heap = Heap::new(GcConfig::new());
        let map = build_hash_map(&heap, &[(Value::Nil, Value::Integer(7))], Meta::none()).unwrap();
        assert_eq!(unsafe { map.as_ref().get(Value::Nil) }, Some(Value::Integer(7)));
        assert_eq!(unsafe { map.as_ref().count() }, 1);
    }

    #[test]
    fn build_map_auto_picks_array_map_below_threshold() {
        let heap = Heap::new(GcConfig::new());
        let pairs = vec![(Value::Integer(1), Value::Integer(1))];
        match build_map_auto(&heap, &pairs, Meta::none()).unwrap() {
            Value::ArrayMap(_) => {}
            other => panic!("expected array_map, got {other:?}"),
        }
    }

    #[test]
    fn build_hash_set_dedupes() {
        let heap = Heap::new(GcConfig::new());
        let set = build_hash_set(&heap, &[Value::Integer(1), Value::Integer(1), Value::Integer(2)], Meta::none()).unwrap();
        assert_eq!(unsafe { set.as_ref().count() }, 2);
    }
}
