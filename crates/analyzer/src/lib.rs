//! `wisp-analyzer`: the macro-aware Form -> Node lowering pass (spec.md 3.3,
//! 4.4, 4.5).
//!
//! [`Analyzer`] is the single mutable-state owner for one compilation unit,
//! following the teacher's `Resolver`/`CodeGen` convention (`wisp-runtime`'s
//! `Env` doc comment traces the same idiom back further): it carries the
//! locals stack, the gensym counter for destructuring/`for` expansion, and a
//! recursion-depth guard, and borrows the `Env`, `Heap`, and `MacroBridge` it
//! needs from its caller rather than owning them.

pub mod bridge;
pub mod config;
pub mod destructure;
pub mod form_value;
pub mod forms;
pub mod locals;
pub mod node;
pub mod special_forms;

use std::rc::Rc;

use wisp_core::form::{Form, FormData, SourcePos};
use wisp_core::Value;
use wisp_gc::Heap;
use wisp_runtime::error::{AnalyzerError, ErrorKind, Phase};
use wisp_runtime::Env;

use bridge::MacroBridge;
use config::AnalyzerConfig;
use locals::Locals;
use node::{Node, NodeKind};

pub struct Analyzer<'a> {
    pub env: &'a Env,
    pub heap: &'a Heap,
    pub bridge: &'a dyn MacroBridge,
    pub config: AnalyzerConfig,
    locals: Locals,
    depth: usize,
    gensym_counter: u64,
}

impl<'a> Analyzer<'a> {
    pub fn new(env: &'a Env, heap: &'a Heap, bridge: &'a dyn MacroBridge) -> Self {
        Analyzer::with_config(env, heap, bridge, AnalyzerConfig::new())
    }

    pub fn with_config(env: &'a Env, heap: &'a Heap, bridge: &'a dyn MacroBridge, config: AnalyzerConfig) -> Self {
        Analyzer {
            env,
            heap,
            bridge,
            config,
            locals: Locals::new(),
            depth: 0,
            gensym_counter: 0,
        }
    }

    /// A fresh name no source form can ever spell, for destructuring's
    /// synthetic temporaries and `for`'s desugared bindings (spec.md 4.4.3).
    pub fn gensym(&mut self) -> Rc<str> {
        let n = self.gensym_counter;
        self.gensym_counter += 1;
        format!("__destructure_{n}").into()
    }

    /// Builds a located `AnalyzerError`, fail-fast-fail-once (spec.md 7):
    /// the first one constructed for a compilation unit sticks in
    /// `env.errors`, every later one is still returned to the immediate
    /// caller but does not overwrite the recorded one.
    pub fn err(&self, kind: ErrorKind, pos: SourcePos, message: impl Into<String>) -> AnalyzerError {
        let error = AnalyzerError {
            kind,
            phase: Phase::Analysis,
            message: message.into(),
            location: pos,
        };
        self.env.errors.record(error.clone());
        error
    }

    /// Runs `f` with a fresh locals scope, shrinking back to the prior mark
    /// when `f` returns - whether it succeeded or failed - mirroring the
    /// scoped-acquisition idiom spec.md 9 asks for (push/pop always pair,
    /// including on the error path, without needing a `Drop` guard since
    /// `f` never panics across an open scope here).
    pub fn with_scope<T>(&mut self, f: impl FnOnce(&mut Analyzer<'a>) -> Result<T, AnalyzerError>) -> Result<T, AnalyzerError> {
        let mark = self.locals.mark();
        let result = f(self);
        self.locals.shrink_to(mark);
        result
    }

    pub(crate) fn locals(&self) -> &Locals {
        &self.locals
    }

    pub(crate) fn push_local(&mut self, name: Rc<str>) -> usize {
        self.locals.push(name)
    }

    /// `analyze(form) -> Node`, deterministic for a given `(form, env,
    /// locals)` (spec.md 4.4 contract). Guards against runaway recursion
    /// (pathological or self-referential macro expansion) with
    /// `AnalyzerConfig::max_depth` rather than overflowing the host stack.
    pub fn analyze(&mut self, form: &Form) -> Result<Node, AnalyzerError> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            self.depth -= 1;
            return Err(self.err(ErrorKind::InternalError, form.pos(), "maximum analysis recursion depth exceeded"));
        }
        let result = self.analyze_inner(form);
        self.depth -= 1;
        result
    }

    fn analyze_inner(&mut self, form: &Form) -> Result<Node, AnalyzerError> {
        let pos = form.pos();
        match &form.data {
            FormData::Symbol { ns, name } => self.analyze_symbol(pos, ns.as_deref(), name),
            FormData::List(children) => self.analyze_list(pos, children),
            FormData::Vector(children) => self.analyze_literal_collection(pos, "vector", children),
            FormData::Map(flat) => self.analyze_map_literal(pos, flat),
            FormData::Set(children) => self.analyze_literal_collection(pos, "hash-set", children),
            _ => self.analyze_constant_literal(form),
        }
    }

    /// Primitives, strings, keywords, regex literals, and tagged literals:
    /// none of them can contain a runtime-only sub-expression, so they
    /// convert straight to a `constant` Node via the Form->Value bridge
    /// (spec.md 4.5).
    fn analyze_constant_literal(&mut self, form: &Form) -> Result<Node, AnalyzerError> {
        match form_value::form_to_value(self.heap, self.env, form) {
            Some(value) => Ok(Node::new(NodeKind::Constant(value), form.pos())),
            None => Err(self.err(ErrorKind::OutOfMemory, form.pos(), "allocation failed analyzing a literal")),
        }
    }

    /// Unqualified symbols resolve against the locals stack first
    /// (innermost-first); everything else resolves through the current
    /// namespace, qualified or not, per spec.md 3.2's order (spec.md 4.4.1
    /// item 1 plus the fallback `var_ref` path). The stored `var_ref.ns` is
    /// the *defining* namespace the lookup actually found - not necessarily
    /// what the symbol wrote - so downstream consumers never have to redo
    /// resolution (an open-question resolution recorded in DESIGN.md).
    fn analyze_symbol(&mut self, pos: SourcePos, ns: Option<&str>, name: &Rc<str>) -> Result<Node, AnalyzerError> {
        if ns.is_none() {
            if let Some(idx) = self.locals.resolve(name) {
                return Ok(Node::new(NodeKind::LocalRef { name: name.clone(), idx }, pos));
            }
        }
        let current = self.env.current_namespace();
        let var = match ns {
            Some(ns_name) => self.env.resolve_qualified(&current, ns_name, name),
            None => current.resolve(name),
        };
        match var {
            Some(v) => Ok(Node::new(NodeKind::VarRef { ns: Some(v.ns_name.clone()), name: v.name.clone() }, pos)),
            None => {
                let display = match ns {
                    Some(ns_name) => format!("{ns_name}/{name}"),
                    None => name.to_string(),
                };
                Err(self.err(ErrorKind::NameError, pos, format!("Unable to resolve symbol: {display}")))
            }
        }
    }

    fn analyze_list(&mut self, pos: SourcePos, children: &Rc<[Form]>) -> Result<Node, AnalyzerError> {
        if children.is_empty() {
            return self.analyze_constant_literal(&Form::new(FormData::List(children.clone()), pos.line, pos.column));
        }
        let head = &children[0];
        let args = &children[1..];

        if let FormData::Symbol { ns, name } = &head.data {
            let shadowed = ns.is_none() && self.locals.contains(name);
            if !shadowed {
                if ns.is_none() {
                    if let Some(sf) = special_forms::lookup(name) {
                        return special_forms::analyze(self, sf, pos, args);
                    }
                }
                let current = self.env.current_namespace();
                let var = match ns {
                    Some(ns_name) => self.env.resolve_qualified(&current, ns_name, name),
                    None => current.resolve(name),
                };
                if let Some(var) = var {
                    if var.is_macro() {
                        return self.expand_macro(pos, &var, args);
                    }
                }
            }
        }

        let callee = self.analyze(head)?;
        let mut analyzed_args = Vec::with_capacity(args.len());
        for a in args {
            analyzed_args.push(self.analyze(a)?);
        }
        Ok(Node::new(NodeKind::Call { callee: Box::new(callee), args: analyzed_args }, pos))
    }

    /// `[1 2 x]`/`#{1 2 x}` are not listed as dedicated Node kinds (spec.md
    /// 3.3 only names `constant`/`call`/... as leaves/compounds) - the
    /// literal desugars into a call to the matching builtin constructor,
    /// exactly the way Clojure's own compiler treats vector/set literals
    /// that contain a non-constant sub-expression (supplemented design
    /// decision, recorded in DESIGN.md).
    fn analyze_literal_collection(&mut self, pos: SourcePos, ctor: &str, children: &Rc<[Form]>) -> Result<Node, AnalyzerError> {
        let callee = self.analyze(&forms::sym_form(ctor))?;
        let mut args = Vec::with_capacity(children.len());
        for c in children.iter() {
            args.push(self.analyze(c)?);
        }
        Ok(Node::new(NodeKind::Call { callee: Box::new(callee), args }, pos))
    }

    fn analyze_map_literal(&mut self, pos: SourcePos, flat: &Rc<[Form]>) -> Result<Node, AnalyzerError> {
        let callee = self.analyze(&forms::sym_form("hash-map"))?;
        let mut args = Vec::with_capacity(flat.len());
        for c in flat.iter() {
            args.push(self.analyze(c)?);
        }
        Ok(Node::new(NodeKind::Call { callee: Box::new(callee), args }, pos))
    }

    /// The sole analyzer->evaluator coupling (spec.md 4.4.4): convert each
    /// argument Form to a Value, invoke the macro through the bridge,
    /// convert the result back to a Form, and re-analyze it.
    fn expand_macro(&mut self, pos: SourcePos, var: &Rc<wisp_runtime::Var>, args: &[Form]) -> Result<Node, AnalyzerError> {
        let mut arg_values = Vec::with_capacity(args.len());
        for a in args {
            match form_value::form_to_value(self.heap, self.env, a) {
                Some(v) => arg_values.push(v),
                None => return Err(self.err(ErrorKind::OutOfMemory, pos, "allocation failed converting macro argument")),
            }
        }
        let macro_fn = var.root();
        let result = self
            .bridge
            .call_fn(macro_fn, &arg_values)
            .map_err(|_| self.err(ErrorKind::ValueError, pos, "macro expansion failed"))?;
        let expanded = form_value::value_to_form(self.heap, self.bridge, result)
            .map_err(|_| self.err(ErrorKind::ValueError, pos, "macro expansion failed"))?;
        self.analyze(&expanded)
    }
}

/// Analyzes each `(name, Form)` pair in order, pushing `name` as a local
/// immediately after analyzing its init - so a later pair in the same list
/// (as destructuring expansion produces: `T` first, then elements that
/// reference `T`) sees exactly the names it depends on and no others.
/// Shared by `let`/`loop` bindings and by `fn` parameter destructuring's
/// synthesized wrapping `let`.
pub(crate) fn analyze_bindings_sequential(
    az: &mut Analyzer,
    raw: Vec<(Rc<str>, Form)>,
) -> Result<Vec<(Rc<str>, Node)>, AnalyzerError> {
    let mut out = Vec::with_capacity(raw.len());
    for (name, form) in raw {
        let node = az.analyze(&form)?;
        az.push_local(name.clone());
        out.push((name, node));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge::BridgeError;
    use wisp_gc::GcConfig;

    struct NoopBridge;
    impl MacroBridge for NoopBridge {
        fn call_fn(&self, _callable: Value, _args: &[Value]) -> Result<Value, BridgeError> {
            Err(BridgeError("no callables in this test".into()))
        }
    }

    fn int(n: i64, line: u32, col: u16) -> Form {
        Form::new(FormData::Integer(n), line, col)
    }

    fn sym(name: &str) -> Form {
        forms::sym_form(name)
    }

    #[test]
    fn simple_let_binds_one_local_to_a_constant() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        // (let [x 1] x)
        let form = forms::call_form(
            "let",
            vec![
                Form::synthetic(FormData::Vector(vec![sym("x"), int(1, 1, 1)].into())),
                sym("x"),
            ],
        );
        let node = az.analyze(&form).unwrap();
        match node.kind {
            NodeKind::Let { bindings, body } => {
                assert_eq!(bindings.len(), 1);
                assert_eq!(bindings[0].0.as_ref(), "x");
                match &body.kind {
                    NodeKind::LocalRef { name, .. } => assert_eq!(name.as_ref(), "x"),
                    other => panic!("expected local_ref body, got {other:?}"),
                }
            }
            other => panic!("expected a let node, got {other:?}"),
        }
    }

    #[test]
    fn nested_fn_self_reference_resolves_to_a_local() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        // (fn fact [n] (fact n))
        let form = forms::call_form(
            "fn",
            vec![
                sym("fact"),
                Form::synthetic(FormData::Vector(vec![sym("n")].into())),
                forms::call_form("fact", vec![sym("n")]),
            ],
        );
        let node = az.analyze(&form).unwrap();
        match node.kind {
            NodeKind::Fn { name, arities } => {
                assert_eq!(name.unwrap().as_ref(), "fact");
                assert_eq!(arities.len(), 1);
                match &arities[0].body.kind {
                    NodeKind::Call { callee, .. } => match &callee.kind {
                        NodeKind::LocalRef { name, .. } => assert_eq!(name.as_ref(), "fact"),
                        other => panic!("expected the self-reference to resolve as a local, got {other:?}"),
                    },
                    other => panic!("expected a call, got {other:?}"),
                }
            }
            other => panic!("expected an fn node, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_symbol_is_a_name_error_recorded_once() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        let err = az.analyze(&sym("nope")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NameError);
        assert!(env.errors.has_error());
        assert_eq!(env.errors.peek().unwrap().message, err.message);
    }

    #[test]
    fn if_without_else_records_none_not_a_synthetic_nil_node() {
        let env = Env::new("user");
        let heap = Heap::new(GcConfig::new());
        let bridge = NoopBridge;
        let mut az = Analyzer::new(&env, &heap, &bridge);

        let form = forms::call_form("if", vec![sym_bool(true), int(1, 1, 1)]);
        let node = az.analyze(&form).unwrap();
        match node.kind {
            NodeKind::If { els, .. } => assert!(els.is_none()),
            other => panic!("expected an if node, got {other:?}"),
        }
    }

    fn sym_bool(b: bool) -> Form {
        Form::synthetic(FormData::Boolean(b))
    }
}
