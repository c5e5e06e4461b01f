//! `wisp-runtime`: the Namespace/Var model, dynamic-binding frame stack, and
//! error-reporting context an analyzer or evaluator is built on top of.
//!
//! This crate depends on `wisp-gc` only for `Value` being traced from the
//! Environment (spec.md 4.2 root order 3-4); it does not itself call into
//! the allocator - `Namespace`/`Var` bookkeeping lives in ordinary
//! `Rc`/`RefCell` storage outside the GC heap (see `var` module docs).

pub mod bindings;
pub mod env;
pub mod error;
pub mod namespace;
pub mod var;

pub use bindings::BindingStack;
pub use env::Env;
pub use error::{AnalyzerError, CallFrame, ErrorContext, ErrorKind, Phase};
pub use namespace::{Namespace, ReferError};
pub use var::Var;
