//! `let*`/`loop*`/`recur` (spec.md 4.4.2, 4.4.3).

use std::rc::Rc;

use wisp_core::form::{Form, FormData, SourcePos};
use wisp_runtime::error::{AnalyzerError, ErrorKind};

use crate::destructure;
use crate::node::{Node, NodeKind};
use crate::{analyze_bindings_sequential, Analyzer};

/// Shared by `let*` and `loop*`: both take `(bindings-vector body*)` and
/// differ only in which `Node` variant wraps the result and in being a
/// legal `recur` target. Binding patterns may be destructuring forms
/// ([`destructure::expand_binding`]); each pair's init sees every name
/// bound by an earlier pair in the same binding vector, never a later one.
pub fn analyze_let(az: &mut Analyzer, pos: SourcePos, args: &[Form], is_loop: bool) -> Result<Node, AnalyzerError> {
    if args.is_empty() {
        let what = if is_loop { "loop*" } else { "let*" };
        return Err(az.err(ErrorKind::SyntaxError, pos, format!("{what} requires a binding vector")));
    }
    let pairs = match &args[0].data {
        FormData::Vector(c) => c.clone(),
        _ => return Err(az.err(ErrorKind::SyntaxError, args[0].pos(), "let/loop bindings must be a vector")),
    };
    if pairs.len() % 2 != 0 {
        return Err(az.err(ErrorKind::SyntaxError, args[0].pos(), "let/loop bindings vector must have an even number of forms"));
    }

    az.with_scope(|az| {
        let mut flat: Vec<(Rc<str>, Form)> = Vec::new();
        let mut i = 0usize;
        while i < pairs.len() {
            let pattern = &pairs[i];
            let init = &pairs[i + 1];
            flat.extend(destructure::expand_binding(az, pattern, init.clone())?);
            i += 2;
        }
        let bindings = analyze_bindings_sequential(az, flat)?;
        let body = analyze_body(az, &args[1..], pos)?;
        let kind = if is_loop {
            NodeKind::Loop { bindings, body: Box::new(body) }
        } else {
            NodeKind::Let { bindings, body: Box::new(body) }
        };
        Ok(Node::new(kind, pos))
    })
}

/// `(recur arg*)`: analyzed in the caller's current scope, with no check
/// here that a `loop*`/`fn*` tail position actually encloses it - spec.md
/// 4.4.2 leaves non-tail-position `recur` and arity mismatches as an
/// eval-time concern (the analyzer has no notion of "tail position").
pub fn analyze_recur(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    let mut analyzed = Vec::with_capacity(args.len());
    for a in args {
        analyzed.push(az.analyze(a)?);
    }
    Ok(Node::new(NodeKind::Recur { args: analyzed }, pos))
}

/// Wraps zero-or-more body forms into a single `Node`: empty bodies analyze
/// as a `nil` constant, a single form analyzes directly (no pointless `do`
/// wrapper), and multiple forms wrap in `Do`.
pub(crate) fn analyze_body(az: &mut Analyzer, body: &[Form], pos: SourcePos) -> Result<Node, AnalyzerError> {
    match body {
        [] => Ok(Node::new(NodeKind::Constant(wisp_core::Value::Nil), pos)),
        [single] => az.analyze(single),
        many => {
            let mut statements = Vec::with_capacity(many.len());
            for f in many {
                statements.push(az.analyze(f)?);
            }
            Ok(Node::new(NodeKind::Do { statements }, pos))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeError, MacroBridge};
    use crate::forms;
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
    fn later_binding_sees_an_earlier_one_in_the_same_vector() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        // (let* [a 1 b a] b)
        let form = forms::call_form(
            "let*",
            vec![
                Form::synthetic(FormData::Vector(vec![forms::sym_form("a"), forms::int_form(1), forms::sym_form("b"), forms::sym_form("a")].into())),
                forms::sym_form("b"),
            ],
        );
        let node = az.analyze(&form).unwrap();
        match node.kind {
            NodeKind::Let { bindings, .. } => {
                assert_eq!(bindings.len(), 2);
                match &bindings[1].1.kind {
                    NodeKind::LocalRef { name, .. } => assert_eq!(name.as_ref(), "a"),
                    other => panic!("expected b's init to resolve a as a local, got {other:?}"),
                }
            }
            other => panic!("expected let, got {other:?}"),
        }
    }

    #[test]
    fn bindings_do_not_leak_out_of_the_let_scope() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        let form = forms::call_form(
            "let*",
            vec![Form::synthetic(FormData::Vector(vec![forms::sym_form("a"), forms::int_form(1)].into())), forms::sym_form("a")],
        );
        az.analyze(&form).unwrap();
        assert!(!az.locals().contains("a"));
    }
}
