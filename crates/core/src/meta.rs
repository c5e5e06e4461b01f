//! Optional metadata attached to symbols, collections, and Vars.
//!
//! Metadata is itself a `hash_map` Value, but every collection and atom
//! carries it as an `Option` rather than forcing an empty-map allocation on
//! the hot path of, say, `(list 1 2 3)`.

use crate::collections::hash_map::HashMapData;
use crate::ptr::GcPtr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Meta(pub Option<GcPtr<HashMapData>>);

impl Meta {
    pub fn none() -> Self {
        Meta(None)
    }

    pub fn of(map: GcPtr<HashMapData>) -> Self {
        Meta(Some(map))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }
}

impl Default for Meta {
    fn default() -> Self {
        Meta::none()
    }
}
