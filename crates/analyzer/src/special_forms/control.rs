//! `if`/`do`/`quote`/`var`/`throw`/`try` (spec.md 4.4.2).

use wisp_core::form::{Form, FormData, SourcePos};
use wisp_core::refs::VarRefData;
use wisp_core::symbol::Symbol;
use wisp_core::Value;
use wisp_runtime::error::{AnalyzerError, ErrorKind};

use crate::form_value;
use crate::forms;
use crate::node::{CatchClause, Node, NodeKind};
use crate::Analyzer;

/// `(if test then else?)`. A missing `else` is recorded as `None`, never a
/// synthesized `nil` constant Node, so an evaluator can special-case the
/// two-argument form (e.g. for tail-call/short-circuit analysis) without
/// pattern-matching through a fabricated branch.
pub fn analyze_if(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    if args.len() < 2 || args.len() > 3 {
        return Err(az.err(ErrorKind::ArityError, pos, "if requires 2 or 3 arguments"));
    }
    let test = az.analyze(&args[0])?;
    let then = az.analyze(&args[1])?;
    let els = match args.get(2) {
        Some(f) => Some(Box::new(az.analyze(f)?)),
        None => None,
    };
    Ok(Node::new(
        NodeKind::If { test: Box::new(test), then: Box::new(then), els },
        pos,
    ))
}

/// `(do)` is `constant nil` (spec.md 4.4.2), not an empty `Do` node - so a
/// consumer never has to special-case a zero-statement `Do` to get the
/// right value out of it.
pub fn analyze_do(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    if args.is_empty() {
        return Ok(Node::new(NodeKind::Constant(Value::Nil), pos));
    }
    let mut statements = Vec::with_capacity(args.len());
    for a in args {
        statements.push(az.analyze(a)?);
    }
    Ok(Node::new(NodeKind::Do { statements }, pos))
}

/// `(quote form)`: the argument is never analyzed, only converted straight
/// to a Value through the Form->Value bridge (spec.md 4.5) - a quoted form
/// can contain symbols that would not resolve at all as code.
pub fn analyze_quote(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    if args.len() != 1 {
        return Err(az.err(ErrorKind::ArityError, pos, "quote requires exactly 1 argument"));
    }
    match form_value::form_to_value(az.heap, az.env, &args[0]) {
        Some(value) => Ok(Node::new(NodeKind::Quote { value }, pos)),
        None => Err(az.err(ErrorKind::OutOfMemory, pos, "allocation failed analyzing a quoted form")),
    }
}

/// `(var sym)`: resolves `sym` then snapshots the found Var's fields into a
/// GC-allocated `var_ref` constant (spec.md 3.1's `var_ref`) - the live
/// `Var` itself never crosses into heap-traced `Value` space (see
/// `wisp_core::refs` doc comment).
pub fn analyze_var(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    if args.len() != 1 {
        return Err(az.err(ErrorKind::ArityError, pos, "var requires exactly 1 argument"));
    }
    let (ns, name) = match &args[0].data {
        FormData::Symbol { ns, name } => (ns.clone(), name.clone()),
        _ => return Err(az.err(ErrorKind::SyntaxError, args[0].pos(), "var requires a symbol argument")),
    };
    let current = az.env.current_namespace();
    let var = match &ns {
        Some(ns_name) => az.env.resolve_qualified(&current, ns_name, &name),
        None => current.resolve(&name),
    };
    let var = match var {
        Some(v) => v,
        None => {
            let display = match &ns {
                Some(ns_name) => format!("{ns_name}/{name}"),
                None => name.to_string(),
            };
            return Err(az.err(ErrorKind::NameError, pos, format!("Unable to resolve var: {display}")));
        }
    };

    let name_str = az.heap.alloc_str(&var.name).ok_or_else(|| az.err(ErrorKind::OutOfMemory, pos, "allocation failed building a var reference"))?;
    let ns_name = az.heap.alloc_str(&var.ns_name).ok_or_else(|| az.err(ErrorKind::OutOfMemory, pos, "allocation failed building a var reference"))?;
    let doc = match var.doc() {
        Some(d) => Some(az.heap.alloc_str(&d).ok_or_else(|| az.err(ErrorKind::OutOfMemory, pos, "allocation failed building a var reference"))?),
        None => None,
    };

    let data = VarRefData {
        sym: Symbol::qualified(ns_name, name_str),
        ns_name,
        root: var.root(),
        dynamic: var.is_dynamic(),
        is_macro: var.is_macro(),
        doc,
        arglists: var.arglists(),
        meta: var.meta(),
    };
    let ptr = az.heap.alloc_cell(data).ok_or_else(|| az.err(ErrorKind::OutOfMemory, pos, "allocation failed building a var reference"))?;
    Ok(Node::new(NodeKind::Constant(Value::VarRef(ptr)), pos))
}

pub fn analyze_throw(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    if args.len() != 1 {
        return Err(az.err(ErrorKind::ArityError, pos, "throw requires exactly 1 argument"));
    }
    let expr = az.analyze(&args[0])?;
    Ok(Node::new(NodeKind::Throw { expr: Box::new(expr) }, pos))
}

/// `(try expr* (catch binding expr*)? (finally expr*)?)`. `catch`/`finally`
/// clauses are recognized structurally (a trailing list headed by the
/// matching symbol), not by special-form lookup - they are only meaningful
/// inside `try` and are never dispatched on their own.
pub fn analyze_try(az: &mut Analyzer, pos: SourcePos, args: &[Form]) -> Result<Node, AnalyzerError> {
    let mut body_end = args.len();
    let mut finally: Option<Vec<Node>> = None;
    let mut catch: Option<CatchClause> = None;

    if body_end > 0 && forms::is_headed_by(&args[body_end - 1], "finally") {
        let clause = forms::list_children(&args[body_end - 1]).expect("is_headed_by confirmed a list");
        let mut statements = Vec::with_capacity(clause.len() - 1);
        for f in &clause[1..] {
            statements.push(az.analyze(f)?);
        }
        finally = Some(statements);
        body_end -= 1;
    }

    if body_end > 0 && forms::is_headed_by(&args[body_end - 1], "catch") {
        let clause = forms::list_children(&args[body_end - 1]).expect("is_headed_by confirmed a list");
        // `(catch Type name body*)`: the exception type symbol is parsed
        // and discarded (spec.md 3.3's `CatchClause` carries no type field
        // - this core has no typed-exception hierarchy among its Value
        // variants, only opaque thrown Values), so skipping straight past
        // it to the binding name is the only faithful reading that doesn't
        // invent a field the Node shape doesn't have.
        if clause.len() < 3 {
            return Err(az.err(ErrorKind::SyntaxError, args[body_end - 1].pos(), "catch requires a type and a binding symbol"));
        }
        forms::symbol_name(&clause[1])
            .map_err(|_| az.err(ErrorKind::SyntaxError, clause[1].pos(), "catch's type must be a symbol"))?;
        let binding_name = forms::symbol_name(&clause[2])
            .map_err(|_| az.err(ErrorKind::SyntaxError, clause[2].pos(), "catch's binding must be a symbol"))?;
        let statements = az.with_scope(|az| {
            az.push_local(binding_name.clone());
            let mut statements = Vec::with_capacity(clause.len().saturating_sub(3));
            for f in &clause[3..] {
                statements.push(az.analyze(f)?);
            }
            Ok(statements)
        })?;
        catch = Some(CatchClause { binding_name, body: statements });
        body_end -= 1;
    }

    let mut body = Vec::with_capacity(body_end);
    for f in &args[..body_end] {
        body.push(az.analyze(f)?);
    }
    Ok(Node::new(NodeKind::Try { body, catch, finally }, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeError, MacroBridge};
    use wisp_gc::{GcConfig, Heap};
    use wisp_runtime::Env;

    struct NoopBridge;
    impl MacroBridge for NoopBridge {
        fn call_fn(&self, _callable: Value, _args: &[Value]) -> Result<Value, BridgeError> {
            Err(BridgeError("no callables in this test".into()))
        }
    }

    #[test]
    fn if_without_else_is_none_not_a_synthetic_nil() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);
        let form = forms::call_form("if", vec![Form::synthetic(FormData::Boolean(true)), forms::int_form(1)]);
        let node = az.analyze(&form).unwrap();
        match node.kind {
            NodeKind::If { els, .. } => assert!(els.is_none()),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn try_with_catch_and_finally_binds_the_catch_symbol_only_in_its_own_clause() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        let throw_form = forms::call_form("throw", vec![forms::int_form(1)]);
        let catch_clause = forms::call_form("catch", vec![forms::sym_form("Exception"), forms::sym_form("e"), forms::sym_form("e")]);
        let finally_clause = forms::call_form("finally", vec![forms::int_form(0)]);
        let form = forms::call_form("try", vec![throw_form, catch_clause, finally_clause]);

        let node = az.analyze(&form).unwrap();
        match node.kind {
            NodeKind::Try { catch, finally, .. } => {
                assert!(catch.is_some());
                assert!(finally.is_some());
            }
            other => panic!("expected try, got {other:?}"),
        }
        assert!(!az.locals().contains("e"));
    }
}
