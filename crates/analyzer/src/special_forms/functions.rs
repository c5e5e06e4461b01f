//! `fn*`/`def`/`defmacro` (spec.md 4.4.2).

use std::rc::Rc;

use wisp_core::form::{Form, FormData, SourcePos};
use wisp_runtime::error::{AnalyzerError, ErrorKind};

use super::binding::analyze_body;
use crate::destructure;
use crate::forms;
use crate::node::{FnArity, Node, NodeKind};
use crate::{analyze_bindings_sequential, Analyzer};

/// `(fn* name? ([params] body*)+)` or the single-arity shorthand
/// `(fn* name? [params] body*)`. `name`, when present, is bound as a local
/// visible to every arity's body - the only way a fn literal can refer to
/// itself before any `def` gives it a Var (spec.md 4.4.2).
pub fn analyze_fn(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    let mut rest = args;
    let name = match rest.first() {
        Some(Form { data: FormData::Symbol { ns: None, name }, .. }) => {
            rest = &rest[1..];
            Some(name.clone())
        }
        _ => None,
    };
    if rest.is_empty() {
        return Err(az.err(ErrorKind::SyntaxError, pos, "fn* requires at least one arity"));
    }

    az.with_scope(|az| {
        if let Some(name) = &name {
            az.push_local(name.clone());
        }

        let arities = if matches!(rest[0].data, FormData::Vector(_)) {
            vec![analyze_shorthand_arity(az, rest[0].pos(), &rest[0], &rest[1..])?]
        } else {
            let mut arities = Vec::with_capacity(rest.len());
            for arity_form in rest {
                arities.push(analyze_arity(az, arity_form)?);
            }
            arities
        };

        Ok(Node::new(NodeKind::Fn { name, arities }, pos))
    })
}

/// `([params] body*)`, the multi-arity form's per-arity list.
pub(crate) fn analyze_arity(az: &mut Analyzer, arity_form: &Form) -> Result<FnArity, AnalyzerError> {
    let children = forms::list_children(arity_form).map_err(|_| az.err(ErrorKind::SyntaxError, arity_form.pos(), "expected an arity list"))?;
    if children.is_empty() || !matches!(children[0].data, FormData::Vector(_)) {
        return Err(az.err(ErrorKind::SyntaxError, arity_form.pos(), "arity must start with a parameter vector"));
    }
    analyze_shorthand_arity(az, arity_form.pos(), &children[0], &children[1..])
}

pub(crate) fn analyze_shorthand_arity(az: &mut Analyzer, pos: SourcePos, param_vec: &Form, body: &[Form]) -> Result<FnArity, AnalyzerError> {
    let patterns = forms::vector_children(param_vec).expect("caller confirmed a vector");

    az.with_scope(|az| {
        let mut params = Vec::new();
        let mut variadic = false;
        let mut extra: Vec<(Rc<str>, Form)> = Vec::new();

        let mut i = 0usize;
        while i < patterns.len() {
            let pattern = &patterns[i];
            if forms::is_amp_symbol(pattern) {
                let rest_pattern = patterns
                    .get(i + 1)
                    .ok_or_else(|| az.err(ErrorKind::SyntaxError, pattern.pos(), "missing parameter name after &"))?;
                params.push(bind_param(az, rest_pattern, &mut extra)?);
                variadic = true;
                i += 2;
                continue;
            }
            params.push(bind_param(az, pattern, &mut extra)?);
            i += 1;
        }

        let extra_bindings = analyze_bindings_sequential(az, extra)?;
        let body_node = analyze_body(az, body, pos)?;
        let body_node = if extra_bindings.is_empty() {
            body_node
        } else {
            Node::new(NodeKind::Let { bindings: extra_bindings, body: Box::new(body_node) }, pos)
        };

        Ok(FnArity { params, variadic, body: Box::new(body_node) })
    })
}

/// A plain symbol parameter becomes the real parameter slot directly. A
/// compound pattern gets a gensym'd parameter slot instead, with the
/// destructuring rewritten as extra `let`-style bindings the caller wraps
/// the arity body in - the evaluator only ever binds positional arguments
/// to plain names (spec.md 4.4.3's rewrite-to-`let` strategy, applied here
/// to parameter lists instead of a `let*`'s own binding vector).
fn bind_param(az: &mut Analyzer, pattern: &Form, extra: &mut Vec<(Rc<str>, Form)>) -> Result<Rc<str>, AnalyzerError> {
    match &pattern.data {
        FormData::Symbol { ns: None, name } => {
            az.push_local(name.clone());
            Ok(name.clone())
        }
        FormData::Vector(_) | FormData::Map(_) => {
            let slot = az.gensym();
            az.push_local(slot.clone());
            extra.extend(destructure::expand_binding(az, pattern, forms::sym_form(&slot))?);
            Ok(slot)
        }
        _ => Err(az.err(ErrorKind::SyntaxError, pattern.pos(), "invalid parameter form")),
    }
}

/// `(def name doc-string? init?)`. Interning happens before `init` is
/// analyzed so that a self-referential `init` (`(def f (fn* f [n] ...))`)
/// can resolve `f` as a Var if it ever needs to, and so a macro's own Var
/// exists (with `is_macro` already set, for `defmacro`) before any later
/// top-level form in the same compilation unit is analyzed.
pub fn analyze_def(az: &mut Analyzer, pos: SourcePos, args: &[Form], is_macro: bool) -> Result<Node, AnalyzerError> {
    if args.is_empty() {
        return Err(az.err(ErrorKind::SyntaxError, pos, "def requires a symbol"));
    }
    let name = forms::symbol_name(&args[0]).map_err(|_| az.err(ErrorKind::SyntaxError, args[0].pos(), "def requires a symbol"))?;

    let (doc, init_form) = match args.len() {
        1 => (None, None),
        2 => (None, Some(&args[1])),
        3 => match &args[1].data {
            FormData::String(s) => (Some(s.clone()), Some(&args[2])),
            _ => return Err(az.err(ErrorKind::SyntaxError, args[1].pos(), "def's second argument must be a docstring when 3 arguments are given")),
        },
        _ => return Err(az.err(ErrorKind::ArityError, pos, "def takes 1 to 3 arguments")),
    };

    let var = az.env.current_namespace().intern(name.clone());
    if let Some(doc) = doc {
        var.set_doc(doc);
    }
    if is_macro {
        var.set_macro();
    }

    let init = match init_form {
        Some(f) => Some(Box::new(az.analyze(f)?)),
        None => None,
    };
    Ok(Node::new(NodeKind::Def { sym_name: name, init, is_macro }, pos))
}

/// `(defmacro name ([params] body*)+)`, lowered to the same shape as
/// `(def name (fn* name ...))` with `is_macro` latched true - `defmacro`
/// introduces no Node kind of its own (spec.md 3.3 lists none).
pub fn analyze_defmacro(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    if args.is_empty() {
        return Err(az.err(ErrorKind::SyntaxError, pos, "defmacro requires a symbol"));
    }
    let name = forms::symbol_name(&args[0]).map_err(|_| az.err(ErrorKind::SyntaxError, args[0].pos(), "defmacro requires a symbol"))?;

    let var = az.env.current_namespace().intern(name.clone());
    var.set_macro();

    let mut fn_args = Vec::with_capacity(args.len());
    fn_args.push(args[0].clone());
    fn_args.extend(args[1..].iter().cloned());
    let fn_form = forms::call_form("fn*", fn_args);
    let init = az.analyze(&fn_form)?;

    Ok(Node::new(NodeKind::Def { sym_name: name, init: Some(Box::new(init)), is_macro: true }, pos))
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

    #[test]
    fn destructured_param_exposes_its_names_to_the_body_through_a_wrapping_let() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        // (fn* [[a b]] (vector a b))  -- destructured single positional param
        let param_vec = Form::synthetic(FormData::Vector(
            vec![Form::synthetic(FormData::Vector(vec![forms::sym_form("a"), forms::sym_form("b")].into()))].into(),
        ));
        let body = vec![forms::call_form("vector", vec![forms::sym_form("a"), forms::sym_form("b")])];
        let mut fn_args = vec![param_vec];
        fn_args.extend(body);
        let form = forms::call_form("fn*", fn_args);

        let node = az.analyze(&form).unwrap();
        match node.kind {
            NodeKind::Fn { arities, .. } => {
                assert_eq!(arities[0].params.len(), 1);
                match &arities[0].body.kind {
                    NodeKind::Let { bindings, .. } => assert_eq!(bindings.len(), 2),
                    other => panic!("expected a wrapping let for the destructured param, got {other:?}"),
                }
            }
            other => panic!("expected fn, got {other:?}"),
        }
    }

    #[test]
    fn defmacro_interns_a_macro_var_before_its_body_is_analyzed() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        let form = forms::call_form(
            "defmacro",
            vec![
                forms::sym_form("ignore-it"),
                Form::synthetic(FormData::Vector(vec![forms::sym_form("x")].into())),
                forms::sym_form("x"),
            ],
        );
        az.analyze(&form).unwrap();
        let var = env.current_namespace().resolve("ignore-it").unwrap();
        assert!(var.is_macro());
    }
}
