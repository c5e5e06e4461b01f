//! Builder-style GC configuration, in the style of the teacher's
//! `CompilerConfig` (`compiler/src/config.rs`): constructed with `::new()`,
//! extended with `.with_*()` methods, passed by reference into the
//! constructor that needs it.

/// Tunables for a [`crate::Heap`]. All fields have sane defaults; callers
/// typically only override one or two for tests (a tiny initial threshold
/// to force early collection, say).
#[derive(Debug, Clone, Copy)]
pub struct GcConfig {
    /// Bytes allocated before the first `collect_if_needed` triggers a
    /// collection. Doubles every time live bytes are still over threshold
    /// after a collection (spec.md 4.2 "grow threshold").
    pub initial_threshold: usize,
    /// Maximum number of distinct `(size, alignment)` free-pool classes
    /// tracked at once. Allocations that would need a 17th class bypass
    /// pooling entirely and go straight to the backing allocator.
    pub max_free_classes: usize,
    /// Per-class capacity; a class at capacity deallocates further
    /// incoming frees instead of growing its LIFO stack.
    pub free_class_capacity: usize,
    /// Emit `eprintln!` diagnostics on threshold growth and free-pool
    /// overflow, matching the teacher's gated-diagnostic style
    /// (`watchdog.rs`).
    pub verbose: bool,
}

impl GcConfig {
    pub fn new() -> Self {
        GcConfig {
            initial_threshold: 1 << 20, // 1 MiB, per spec.md 4.2
            max_free_classes: 16,
            free_class_capacity: 4096,
            verbose: false,
        }
    }

    pub fn with_initial_threshold(mut self, bytes: usize) -> Self {
        self.initial_threshold = bytes;
        self
    }

    pub fn with_max_free_classes(mut self, n: usize) -> Self {
        self.max_free_classes = n;
        self
    }

    pub fn with_free_class_capacity(mut self, n: usize) -> Self {
        self.free_class_capacity = n;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig::new()
    }
}
