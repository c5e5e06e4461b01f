//! Integration-style GC scenarios spanning multiple `wisp-core` types,
//! mirroring the teacher's `runtime/tests/test_thread_migration.rs`
//! precedent of exercising cross-module behavior from outside the crate.

use wisp_core::collections::ListData;
use wisp_core::form::SourcePos;
use wisp_core::meta::Meta;
use wisp_core::Value;
use wisp_gc::{GcConfig, Heap, Roots};

#[test]
fn list_rest_shares_backing_array_and_both_survive_collection() {
    let heap = Heap::new(GcConfig::new());
    let items = heap
        .alloc_slice_copy(&[Value::Integer(1), Value::Integer(2), Value::Integer(3)])
        .unwrap();
    let positions = heap
        .alloc_slice_copy(&[SourcePos::ZERO, SourcePos::ZERO, SourcePos::ZERO])
        .unwrap();
    let list = heap
        .alloc_cell(unsafe { ListData::new_full(items, positions, SourcePos::ZERO, Meta::none()) })
        .unwrap();
    let rest = unsafe { list.as_ref() }.rest();
    let rest_list = heap.alloc_cell(rest).unwrap();

    assert_eq!(unsafe { rest_list.as_ref().first() }, Some(Value::Integer(2)));

    let roots = Roots {
        values: &[Value::List(list), Value::List(rest_list)],
        ..Roots::new()
    };
    heap.collect(&roots);
    // list, rest_list, and the one shared backing items array (positions
    // included) all remain tracked.
    assert_eq!(heap.stats().tracked_count, 4);
}

#[test]
fn sweeping_an_empty_heap_is_a_no_op_and_bumps_collect_count() {
    let heap = Heap::new(GcConfig::new());
    heap.collect(&Roots::new());
    assert_eq!(heap.stats().collect_count, 1);
    assert_eq!(heap.stats().tracked_count, 0);
    heap.collect(&Roots::new());
    assert_eq!(heap.stats().collect_count, 2);
}

#[test]
fn unreachable_values_freed_after_dropping_the_last_root() {
    let heap = Heap::new(GcConfig::new());
    let kept = heap.alloc_str("kept").unwrap();
    {
        let roots = Roots {
            values: &[Value::Str(kept)],
            ..Roots::new()
        };
        heap.collect(&roots);
    }
    assert_eq!(heap.stats().tracked_count, 1);
    heap.collect(&Roots::new());
    assert_eq!(heap.stats().tracked_count, 0);
}
