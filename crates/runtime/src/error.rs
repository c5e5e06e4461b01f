//! `ErrorContext`: the last-error slot and call-stack record errors are
//! reported through (spec.md 4.4.5, 7).
//!
//! Grounded in the teacher's FFI error-slot pattern (`runtime/src/error.rs`:
//! `set_runtime_error`/`take_runtime_error`/`has_runtime_error`), but owned
//! by `Env` rather than kept in a `thread_local!` - this core is
//! single-threaded cooperative and the Environment is already the one
//! mutable-state owner (spec.md 4.4 "no operation is re-entrant"), so a
//! plain `RefCell` field does the same job without the FFI-boundary
//! indirection the teacher needed `CString` caching for.

use wisp_core::form::SourcePos;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    SyntaxError,
    NumberError,
    StringError,
    NameError,
    ArityError,
    ValueError,
    TypeError,
    ArithmeticError,
    IndexError,
    IoError,
    InternalError,
    OutOfMemory,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::SyntaxError => "syntax_error",
            ErrorKind::NumberError => "number_error",
            ErrorKind::StringError => "string_error",
            ErrorKind::NameError => "name_error",
            ErrorKind::ArityError => "arity_error",
            ErrorKind::ValueError => "value_error",
            ErrorKind::TypeError => "type_error",
            ErrorKind::ArithmeticError => "arithmetic_error",
            ErrorKind::IndexError => "index_error",
            ErrorKind::IoError => "io_error",
            ErrorKind::InternalError => "internal_error",
            ErrorKind::OutOfMemory => "out_of_memory",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Analysis,
    Eval,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Parse => "parse",
            Phase::Analysis => "analysis",
            Phase::Eval => "eval",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyzerError {
    pub kind: ErrorKind,
    pub phase: Phase,
    pub message: String,
    pub location: SourcePos,
}

impl std::fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) at {}:{}: {}",
            self.kind, self.phase, self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for AnalyzerError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallFrame {
    pub fn_name: String,
    pub ns: String,
    pub file: String,
    pub line: u32,
}

#[derive(Default)]
pub struct ErrorContext {
    last_error: std::cell::RefCell<Option<AnalyzerError>>,
    call_stack: std::cell::RefCell<Vec<CallFrame>>,
}

impl ErrorContext {
    pub fn new() -> Self {
        ErrorContext::default()
    }

    /// Fail fast, fail once: the first error recorded for a compilation
    /// unit sticks. Later calls are no-ops until `clear` runs.
    pub fn record(&self, error: AnalyzerError) {
        let mut slot = self.last_error.borrow_mut();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    pub fn has_error(&self) -> bool {
        self.last_error.borrow().is_some()
    }

    pub fn peek(&self) -> Option<AnalyzerError> {
        self.last_error.borrow().clone()
    }

    pub fn take(&self) -> Option<AnalyzerError> {
        self.last_error.borrow_mut().take()
    }

    pub fn clear(&self) {
        *self.last_error.borrow_mut() = None;
    }

    pub fn push_frame(&self, frame: CallFrame) {
        self.call_stack.borrow_mut().push(frame);
    }

    pub fn pop_frame(&self) -> Option<CallFrame> {
        self.call_stack.borrow_mut().pop()
    }

    pub fn call_stack(&self) -> Vec<CallFrame> {
        self.call_stack.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(msg: &str) -> AnalyzerError {
        AnalyzerError {
            kind: ErrorKind::NameError,
            phase: Phase::Analysis,
            message: msg.to_string(),
            location: SourcePos::ZERO,
        }
    }

    #[test]
    fn fail_fast_fail_once_keeps_the_first_error() {
        let ctx = ErrorContext::new();
        ctx.record(err("first"));
        ctx.record(err("second"));
        assert_eq!(ctx.peek().unwrap().message, "first");
    }

    #[test]
    fn clear_allows_a_new_error_to_be_recorded() {
        let ctx = ErrorContext::new();
        ctx.record(err("first"));
        ctx.clear();
        ctx.record(err("second"));
        assert_eq!(ctx.take().unwrap().message, "second");
        assert!(!ctx.has_error());
    }

    #[test]
    fn call_stack_is_lifo() {
        let ctx = ErrorContext::new();
        ctx.push_frame(CallFrame {
            fn_name: "outer".into(),
            ns: "user".into(),
            file: "<repl>".into(),
            line: 1,
        });
        ctx.push_frame(CallFrame {
            fn_name: "inner".into(),
            ns: "user".into(),
            file: "<repl>".into(),
            line: 2,
        });
        assert_eq!(ctx.pop_frame().unwrap().fn_name, "inner");
        assert_eq!(ctx.pop_frame().unwrap().fn_name, "outer");
        assert!(ctx.pop_frame().is_none());
    }
}
