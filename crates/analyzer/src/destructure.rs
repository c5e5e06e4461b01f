//! Destructuring expansion (spec.md 4.4.3): sequential `[a b & rest :as all]`
//! and associative `{:keys [...] :strs [...] sym :key :or {...} :as all}`
//! binding patterns, rewritten into a flat, ordered list of synthetic `let`
//! bindings. `let`, `loop`, and `fn` parameter lists all funnel through
//! [`expand_binding`] so the three special forms share one expansion path.

use std::rc::Rc;

use wisp_core::form::{Form, FormData};
use wisp_runtime::error::{AnalyzerError, ErrorKind};

use crate::forms;
use crate::Analyzer;

/// Expands `pattern` bound to `init`, returning `(name, init_form)` pairs in
/// dependency order: a plain symbol pattern needs no temp at all, while a
/// compound pattern introduces a gensym'd temporary bound to `init` once
/// (so side effects in `init` happen exactly once) followed by one pair per
/// destructured name, each reading off that temporary.
pub fn expand_binding(az: &mut Analyzer, pattern: &Form, init: Form) -> Result<Vec<(Rc<str>, Form)>, AnalyzerError> {
    match &pattern.data {
        FormData::Symbol { ns: None, name } => Ok(vec![(name.clone(), init)]),
        FormData::Vector(children) => {
            let tmp = az.gensym();
            let mut out = vec![(tmp.clone(), init)];
            expand_sequential(az, children, &tmp, &mut out)?;
            Ok(out)
        }
        FormData::Map(flat) => {
            let tmp = az.gensym();
            let mut out = vec![(tmp.clone(), init)];
            expand_associative(az, flat, &tmp, &mut out)?;
            Ok(out)
        }
        _ => Err(az.err(ErrorKind::SyntaxError, pattern.pos(), "invalid binding form, expected a symbol, vector, or map")),
    }
}

/// `[a b & rest :as all]`: positional elements peel off `(nth tmp i)`, `&`
/// switches to `(nthrest tmp i)` for the remainder, `:as` binds the whole
/// (post-peeling) temporary under its own name, and a nested pattern in any
/// of those positions recurses through [`expand_binding`] against a further
/// synthetic temporary.
fn expand_sequential(az: &mut Analyzer, children: &Rc<[Form]>, tmp: &Rc<str>, out: &mut Vec<(Rc<str>, Form)>) -> Result<(), AnalyzerError> {
    let mut i = 0usize;
    let mut idx = 0i64;
    while i < children.len() {
        let elem = &children[i];

        if forms::is_amp_symbol(elem) {
            let rest_pattern = children
                .get(i + 1)
                .ok_or_else(|| az.err(ErrorKind::SyntaxError, elem.pos(), "missing binding form after &"))?;
            let rest_init = forms::call_form("nthrest", vec![forms::sym_form(tmp), forms::int_form(idx)]);
            out.extend(expand_binding(az, rest_pattern, rest_init)?);
            i += 2;
            continue;
        }

        if let Some(name) = forms::keyword_simple_name(elem) {
            if name == "as" {
                let as_name = children
                    .get(i + 1)
                    .and_then(|f| forms::symbol_name(f).ok())
                    .ok_or_else(|| az.err(ErrorKind::SyntaxError, elem.pos(), ":as must be followed by a symbol"))?;
                out.push((as_name, forms::sym_form(tmp)));
                i += 2;
                continue;
            }
            return Err(az.err(ErrorKind::SyntaxError, elem.pos(), format!("unsupported sequential destructuring keyword :{name}")));
        }

        let elem_init = forms::call_form("nth", vec![forms::sym_form(tmp), forms::int_form(idx)]);
        out.extend(expand_binding(az, elem, elem_init)?);
        idx += 1;
        i += 1;
    }
    Ok(())
}

/// `{:keys [a b] :strs [c] sym :key :or {a 1} :as all}`: `:keys`/`:strs`
/// expand to `(get tmp :a)`/`(get tmp "c")` lookups under the symbol's own
/// name, a bare `sym :key` pair is an explicit key-to-name mapping, `:or`
/// wraps any of the above (by name) in `(if-some [v lookup] v default)`
/// equivalent via `get`'s default-argument form instead, and `:as` binds the
/// whole map.
fn expand_associative(az: &mut Analyzer, flat: &Rc<[Form]>, tmp: &Rc<str>, out: &mut Vec<(Rc<str>, Form)>) -> Result<(), AnalyzerError> {
    let mut as_name: Option<Rc<str>> = None;
    let mut or_defaults: Vec<(Rc<str>, Form)> = Vec::new();
    let mut entries: Vec<(Rc<str>, Form)> = Vec::new();

    let mut i = 0usize;
    while i + 1 < flat.len() {
        let key = &flat[i];
        let val = &flat[i + 1];

        match forms::keyword_simple_name(key) {
            Some("keys") => {
                let names = forms::vector_children(val).map_err(|_| az.err(ErrorKind::SyntaxError, val.pos(), ":keys must be followed by a vector of symbols"))?;
                for n in names.iter() {
                    let name = forms::symbol_name(n).map_err(|_| az.err(ErrorKind::SyntaxError, n.pos(), ":keys entries must be symbols"))?;
                    let lookup = forms::call_form("get", vec![forms::sym_form(tmp), Form::synthetic(FormData::Keyword { ns: None, name: name.clone(), auto_resolve: false })]);
                    entries.push((name, lookup));
                }
            }
            Some("strs") => {
                let names = forms::vector_children(val).map_err(|_| az.err(ErrorKind::SyntaxError, val.pos(), ":strs must be followed by a vector of symbols"))?;
                for n in names.iter() {
                    let name = forms::symbol_name(n).map_err(|_| az.err(ErrorKind::SyntaxError, n.pos(), ":strs entries must be symbols"))?;
                    let lookup = forms::call_form("get", vec![forms::sym_form(tmp), Form::synthetic(FormData::String(name.clone()))]);
                    entries.push((name, lookup));
                }
            }
            Some("or") => {
                let pairs = match &val.data {
                    FormData::Map(f) => f.clone(),
                    _ => return Err(az.err(ErrorKind::SyntaxError, val.pos(), ":or must be followed by a map")),
                };
                let mut j = 0usize;
                while j + 1 < pairs.len() {
                    let name = forms::symbol_name(&pairs[j]).map_err(|_| az.err(ErrorKind::SyntaxError, pairs[j].pos(), ":or keys must be symbols"))?;
                    or_defaults.push((name, pairs[j + 1].clone()));
                    j += 2;
                }
            }
            Some("as") => {
                as_name = Some(forms::symbol_name(val).map_err(|_| az.err(ErrorKind::SyntaxError, val.pos(), ":as must be followed by a symbol"))?);
            }
            _ => {
                // A bare `sym :key` pair: an explicit rename mapping a
                // destructured name to an arbitrary map key (spec.md 4.4.3).
                let name = forms::symbol_name(key).map_err(|_| az.err(ErrorKind::SyntaxError, key.pos(), "invalid associative destructuring entry"))?;
                let lookup = forms::call_form("get", vec![forms::sym_form(tmp), val.clone()]);
                entries.push((name, lookup));
            }
        }
        i += 2;
    }

    for (name, lookup) in entries {
        let init = match or_defaults.iter().find(|(d, _)| *d == name) {
            Some((_, default)) => forms::call_form("get", vec![forms::sym_form(tmp), keyword_arg_of(&lookup), default.clone()]),
            None => lookup,
        };
        out.push((name, init));
    }
    if let Some(as_name) = as_name {
        out.push((as_name, forms::sym_form(tmp)));
    }
    Ok(())
}

/// Pulls the key argument back out of a `(get tmp key)` call built above, so
/// an `:or` default can be folded into `get`'s three-argument form instead
/// of wrapping the lookup in a second conditional.
fn keyword_arg_of(get_call: &Form) -> Form {
    match &get_call.data {
        FormData::List(children) => children[2].clone(),
        _ => unreachable!("keyword_arg_of is only ever called on a (get tmp key) form this module built"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeError, MacroBridge};
    use wisp_core::Value;
    use wisp_gc::{GcConfig, Heap};
    use wisp_runtime::Env;

    struct NoopBridge;
    impl MacroBridge for NoopBridge {
        fn call_fn(&self, _callable: Value, _args: &[Value]) -> Result<Value, BridgeError> {
            Err(BridgeError("no callables in this test".into()))
        }
    }

    fn sym(name: &str) -> Form {
        forms::sym_form(name)
    }

    #[test]
    fn sequential_destructuring_collects_rest_and_as() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        // [a & more :as all]
        let pattern = Form::synthetic(FormData::Vector(
            vec![sym("a"), sym("&"), sym("more"), Form::synthetic(FormData::Keyword { ns: None, name: "as".into(), auto_resolve: false }), sym("all")].into(),
        ));
        let pairs = expand_binding(&mut az, &pattern, sym("coll")).unwrap();
        let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_ref()).collect();
        assert_eq!(names[1], "a");
        assert_eq!(names[2], "more");
        assert_eq!(names[3], "all");
    }

    #[test]
    fn associative_destructuring_keys_and_or_default() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        let kw = |s: &str| Form::synthetic(FormData::Keyword { ns: None, name: s.into(), auto_resolve: false });
        // {:keys [a b] :or {b 2}}
        let pattern = Form::synthetic(FormData::Map(
            vec![
                kw("keys"),
                Form::synthetic(FormData::Vector(vec![sym("a"), sym("b")].into())),
                kw("or"),
                Form::synthetic(FormData::Map(vec![sym("b"), Form::synthetic(FormData::Integer(2))].into())),
            ]
            .into(),
        ));
        let pairs = expand_binding(&mut az, &pattern, sym("m")).unwrap();
        let names: Vec<&str> = pairs.iter().map(|(n, _)| n.as_ref()).collect();
        assert!(names.contains(&"a"));
        assert!(names.contains(&"b"));
        let b_init = &pairs.iter().find(|(n, _)| n.as_ref() == "b").unwrap().1;
        match &b_init.data {
            FormData::List(children) => assert_eq!(children.len(), 4), // get tmp :b 2
            other => panic!("expected a get call with a default, got {other:?}"),
        }
    }

    #[test]
    fn plain_symbol_pattern_needs_no_temporary() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        let pairs = expand_binding(&mut az, &sym("x"), Form::synthetic(FormData::Integer(1))).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.as_ref(), "x");
    }
}
