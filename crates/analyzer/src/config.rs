//! Builder-style analyzer configuration, matching `wisp_gc::GcConfig`'s
//! `::new()`/`.with_*()` idiom (itself grounded in the teacher's
//! `CompilerConfig`).

#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    /// Maximum `analyze` recursion depth before bailing with an
    /// `internal_error` rather than overflowing the host stack. Generous
    /// by default - this only guards against pathological or
    /// self-referential macro expansion, not ordinary deeply nested code.
    pub max_depth: usize,
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        AnalyzerConfig { max_depth: 512 }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig::new()
    }
}
