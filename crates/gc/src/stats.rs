//! `GcStats`: point-in-time counters exposed via `Heap::stats()`, in the
//! style of the teacher's `AggregateMemoryStats`
//! (`core/src/memory_stats.rs`) - a small plain struct snapshotting
//! counters a caller can log or assert on, rather than a live handle into
//! the collector's internals.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    pub bytes_allocated: usize,
    pub alloc_count: u64,
    pub collect_count: u64,
    pub threshold: usize,
    pub tracked_count: usize,
    pub free_pool_hits: u64,
    pub free_pool_misses: u64,
}
