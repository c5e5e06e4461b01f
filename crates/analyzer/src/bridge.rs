//! The evaluator bridge macro expansion calls through (spec.md 4.4.4, 6).
//!
//! The analyzer has no evaluator of its own - it only knows how to turn
//! Forms into Values and back. Invoking a macro's callable `Value` is
//! delegated to whatever owns function application, via this single-method
//! trait, following the `GcStrategy`-style "trait instead of vtable" guidance
//! (spec.md 9).

use wisp_core::Value;

#[derive(Clone, Debug)]
pub struct BridgeError(pub String);

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for BridgeError {}

pub trait MacroBridge {
    /// Invoke `callable` (a macro Var's root, or any callable Value) with
    /// `args` and return its result. Implementations dispatch between
    /// builtin and interpreted callables themselves - the analyzer does
    /// not need to know which kind it is calling.
    fn call_fn(&self, callable: Value, args: &[Value]) -> Result<Value, BridgeError>;
}
