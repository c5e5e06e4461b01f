//! Structural equality (`eql`) and the matching structural hash.
//!
//! Equality is value-wise for primitives and structural for collections;
//! identity is used only internally by the GC's mark set. `value_hash`
//! must agree with `value_eq` - two values that compare equal must hash
//! equal - since both back `hash_map`/`hash_set` membership.

use crate::value::Value;
use std::hash::{Hash, Hasher};

/// # Safety
/// Any heap-backed payload reachable from `a`/`b` must still be alive.
pub unsafe fn value_eq(a: Value, b: Value) -> bool {
    use Value::*;
    match (a, b) {
        (Nil, Nil) => true,
        (Boolean(x), Boolean(y)) => x == y,
        (Integer(x), Integer(y)) => x == y,
        (Float(x), Float(y)) => x == y,
        (Integer(x), Float(y)) | (Float(y), Integer(x)) => (x as f64) == y,
        (Char(x), Char(y)) => x == y,
        (BuiltinFn(x), BuiltinFn(y)) => x == y,
        (Str(x), Str(y)) => unsafe { x.as_str() == y.as_str() },
        (Symbol(x), Symbol(y)) => x == y,
        (Keyword(x), Keyword(y)) => x == y,
        (List(x), List(y)) => unsafe { seq_eq(x.as_ref().iter(), y.as_ref().iter()) },
        (Vector(x), Vector(y)) => unsafe { seq_eq(x.as_ref().iter(), y.as_ref().iter()) },
        (List(x), Vector(y)) | (Vector(y), List(x)) => {
            unsafe { seq_eq(x.as_ref().iter(), y.as_ref().iter()) }
        }
        (ArrayMap(x), ArrayMap(y)) => unsafe { map_eq_array_array(x.as_ref(), y.as_ref()) },
        (HashMap(x), HashMap(y)) => unsafe { map_eq_hash_hash(x.as_ref(), y.as_ref()) },
        (ArrayMap(x), HashMap(y)) | (HashMap(y), ArrayMap(x)) => unsafe {
            map_eq_array_hash(x.as_ref(), y.as_ref())
        },
        (HashSet(x), HashSet(y)) => unsafe { set_eq(x.as_ref(), y.as_ref()) },
        _ => false,
    }
}

unsafe fn seq_eq(mut a: impl Iterator<Item = Value>, mut b: impl Iterator<Item = Value>) -> bool {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) => {
                if !unsafe { value_eq(x, y) } {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

unsafe fn map_eq_array_array(
    a: &crate::collections::ArrayMapData,
    b: &crate::collections::ArrayMapData,
) -> bool {
    if a.count() != b.count() {
        return false;
    }
    unsafe {
        a.entries()
            .all(|(k, v)| b.get(k).map(|bv| value_eq(v, bv)).unwrap_or(false))
    }
}

unsafe fn map_eq_hash_hash(
    a: &crate::collections::HashMapData,
    b: &crate::collections::HashMapData,
) -> bool {
    if a.count() != b.count() {
        return false;
    }
    unsafe {
        a.entries()
            .all(|(k, v)| b.get(k).map(|bv| value_eq(v, bv)).unwrap_or(false))
    }
}

unsafe fn map_eq_array_hash(
    a: &crate::collections::ArrayMapData,
    b: &crate::collections::HashMapData,
) -> bool {
    if a.count() != b.count() {
        return false;
    }
    unsafe {
        a.entries()
            .all(|(k, v)| b.get(k).map(|bv| value_eq(v, bv)).unwrap_or(false))
    }
}

unsafe fn set_eq(a: &crate::collections::HashSetData, b: &crate::collections::HashSetData) -> bool {
    if a.count() != b.count() {
        return false;
    }
    unsafe { a.iter().all(|v| b.contains(v)) }
}

/// # Safety
/// Any heap-backed payload reachable from `v` must still be alive.
pub unsafe fn value_hash(v: Value) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    unsafe { hash_into(v, &mut hasher) };
    hasher.finish()
}

unsafe fn hash_into(v: Value, hasher: &mut impl Hasher) {
    use Value::*;
    match v {
        Nil => 0u8.hash(hasher),
        Boolean(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Integer(n) => {
            2u8.hash(hasher);
            n.hash(hasher);
        }
        Float(f) => {
            2u8.hash(hasher);
            // Integral floats must hash like the equal integer (1.0 == 1).
            if f.fract() == 0.0 && f.is_finite() {
                (f as i64).hash(hasher);
            } else {
                f.to_bits().hash(hasher);
            }
        }
        Char(c) => {
            3u8.hash(hasher);
            c.hash(hasher);
        }
        Str(s) => {
            4u8.hash(hasher);
            unsafe { s.as_str() }.hash(hasher);
        }
        Symbol(s) => {
            5u8.hash(hasher);
            unsafe { s.ns_str() }.hash(hasher);
            unsafe { s.name_str() }.hash(hasher);
        }
        Keyword(k) => {
            6u8.hash(hasher);
            unsafe { k.ns_str() }.hash(hasher);
            unsafe { k.name_str() }.hash(hasher);
        }
        List(l) => {
            7u8.hash(hasher);
            for item in unsafe { l.as_ref().iter() } {
                unsafe { hash_into(item, hasher) };
            }
        }
        Vector(vec) => {
            7u8.hash(hasher);
            for item in unsafe { vec.as_ref().iter() } {
                unsafe { hash_into(item, hasher) };
            }
        }
        ArrayMap(m) => {
            8u8.hash(hasher);
            let mut acc: u64 = 0;
            for (k, val) in unsafe { m.as_ref().entries() } {
                acc ^= unsafe { value_hash(k) }.wrapping_mul(31).wrapping_add(unsafe { value_hash(val) });
            }
            acc.hash(hasher);
        }
        HashMap(m) => {
            8u8.hash(hasher);
            let mut acc: u64 = 0;
            for (k, val) in unsafe { m.as_ref().entries() } {
                acc ^= unsafe { value_hash(k) }.wrapping_mul(31).wrapping_add(unsafe { value_hash(val) });
            }
            acc.hash(hasher);
        }
        HashSet(s) => {
            9u8.hash(hasher);
            let mut acc: u64 = 0;
            for item in unsafe { s.as_ref().iter() } {
                acc ^= unsafe { value_hash(item) };
            }
            acc.hash(hasher);
        }
        BuiltinFn(p) => {
            10u8.hash(hasher);
            p.hash(hasher);
        }
        _ => {
            // Non-hashable-in-practice variants (functions, atoms, channels,
            // transients, ...) still need *a* hash to satisfy the
            // `Eq`-requires-`Hash` contract if ever placed in a Rust
            // `HashMap` of our own; identity is the only sensible fallback.
            11u8.hash(hasher);
        }
    }
}
