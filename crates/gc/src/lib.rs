//! `wisp-gc`: the tracked mark-and-sweep collector backing every
//! heap-allocated `wisp-core::Value` payload.
//!
//! `wisp-core` defines the *shapes* GC-managed memory holds; this crate is
//! the only thing that actually calls the system allocator for them, and
//! the only thing that knows how to walk the full Value shape graph
//! (`Heap::trace_value`) to decide what is still reachable.

pub mod collections;
pub mod config;
pub mod free_pool;
pub mod heap;
pub mod roots;
pub mod stats;

pub use config::GcConfig;
pub use heap::Heap;
pub use roots::Roots;
pub use stats::GcStats;

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_core::ptr::GcStr;
    use wisp_core::Value;

    #[test]
    fn alloc_tracks_bytes_and_count() {
        let heap = Heap::new(GcConfig::new());
        let s = heap.alloc_str("hello").unwrap();
        assert_eq!(unsafe { s.as_str() }, "hello");
        let stats = heap.stats();
        assert_eq!(stats.alloc_count, 1);
        assert_eq!(stats.bytes_allocated, 5);
        assert_eq!(stats.tracked_count, 1);
    }

    #[test]
    fn empty_slice_allocation_is_not_tracked() {
        let heap = Heap::new(GcConfig::new());
        let s: wisp_core::ptr::GcSlice<u8> = heap.alloc_slice_copy(&[]).unwrap();
        assert!(s.is_empty());
        assert_eq!(heap.stats().tracked_count, 0);
    }

    #[test]
    fn unreachable_allocation_is_swept() {
        let heap = Heap::new(GcConfig::new());
        let _kept = heap.alloc_str("kept").unwrap();
        let _dropped = heap.alloc_str("dropped").unwrap();
        assert_eq!(heap.stats().tracked_count, 2);

        let kept_value = Value::Str(_kept);
        let roots = Roots {
            values: &[kept_value],
            ..Roots::new()
        };
        heap.collect(&roots);
        assert_eq!(heap.stats().tracked_count, 1);
        assert_eq!(unsafe { _kept.as_str() }, "kept");
    }

    #[test]
    fn collect_with_empty_roots_frees_everything() {
        let heap = Heap::new(GcConfig::new());
        heap.alloc_str("a").unwrap();
        heap.alloc_str("b").unwrap();
        heap.collect(&Roots::new());
        assert_eq!(heap.stats().tracked_count, 0);
        assert_eq!(heap.stats().bytes_allocated, 0);
    }

    #[test]
    fn mark_and_check_is_true_only_on_first_mark() {
        let heap = Heap::new(GcConfig::new());
        let s: GcStr = heap.alloc_str("x").unwrap();
        let addr = s.0.addr();
        assert!(heap.mark_and_check(addr));
        assert!(!heap.mark_and_check(addr));
    }

    #[test]
    fn collect_if_needed_grows_threshold_when_still_over() {
        let heap = Heap::new(GcConfig::new().with_initial_threshold(1));
        let kept = heap.alloc_str("kept-alive").unwrap();
        let kept_value = Value::Str(kept);
        let roots = Roots {
            values: &[kept_value],
            ..Roots::new()
        };
        assert!(heap.should_collect());
        heap.collect_if_needed(&roots);
        assert!(heap.stats().threshold > 1);
    }

    #[test]
    fn cyclic_structure_via_atom_terminates_and_is_collectible() {
        use wisp_core::holders::AtomData;
        use wisp_core::meta::Meta;

        let heap = Heap::new(GcConfig::new());
        let items = heap.alloc_slice_copy(&[Value::Integer(1)]).unwrap();
        let positions = heap
            .alloc_slice_copy(&[wisp_core::form::SourcePos::ZERO])
            .unwrap();
        let vector = heap
            .alloc_cell(unsafe {
                wisp_core::collections::VectorData::new(items, positions, wisp_core::form::SourcePos::ZERO, Meta::none())
            })
            .unwrap();

        let atom = heap.alloc_cell(AtomData::new(Value::Vector(vector), Meta::none())).unwrap();

        // Point the vector's sole element back at the atom, forming a cycle:
        // vector -> atom -> vector.
        unsafe { items.as_mut_slice()[0] = Value::Atom(atom) };

        let root = Value::Atom(atom);
        let roots = Roots {
            values: &[root],
            ..Roots::new()
        };
        heap.collect(&roots);
        assert_eq!(heap.stats().tracked_count, 4); // atom, vector, items slice, positions slice

        heap.collect(&Roots::new());
        assert_eq!(heap.stats().tracked_count, 0);
    }
}
