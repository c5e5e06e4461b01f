//! `Node`: the analyzer's output AST (spec.md 3.3).
//!
//! Every node carries the source position of the Form it was analyzed
//! from; synthetic nodes (produced by destructuring expansion or macro
//! rewriting with no corresponding source Form) carry `SourcePos::ZERO`,
//! never a fabricated position (spec.md 6, source-position invariant).

use std::rc::Rc;

use wisp_core::form::SourcePos;
use wisp_core::Value;

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub pos: SourcePos,
}

impl Node {
    pub fn new(kind: NodeKind, pos: SourcePos) -> Node {
        Node { kind, pos }
    }

    pub fn synthetic(kind: NodeKind) -> Node {
        Node {
            kind,
            pos: SourcePos::ZERO,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FnArity {
    pub params: Vec<Rc<str>>,
    pub variadic: bool,
    pub body: Box<Node>,
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub binding_name: Rc<str>,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug)]
pub struct MethodSig {
    pub name: Rc<str>,
    /// One parameter-name list per declared arity (arity count implied by
    /// list length); the body is supplied later by `extend-type`/`defrecord`.
    pub arglists: Vec<Vec<Rc<str>>>,
}

#[derive(Clone, Debug)]
pub struct ExtendMethod {
    pub name: Rc<str>,
    pub arities: Vec<FnArity>,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    // --- Leaves ---
    Constant(Value),
    LocalRef { name: Rc<str>, idx: usize },
    VarRef { ns: Option<Rc<str>>, name: Rc<str> },
    Quote { value: Value },

    // --- Compound ---
    If {
        test: Box<Node>,
        then: Box<Node>,
        els: Option<Box<Node>>,
    },
    Do {
        statements: Vec<Node>,
    },
    Let {
        bindings: Vec<(Rc<str>, Node)>,
        body: Box<Node>,
    },
    Loop {
        bindings: Vec<(Rc<str>, Node)>,
        body: Box<Node>,
    },
    Recur {
        args: Vec<Node>,
    },
    Fn {
        name: Option<Rc<str>>,
        arities: Vec<FnArity>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Throw {
        expr: Box<Node>,
    },
    Try {
        body: Vec<Node>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Node>>,
    },
    Def {
        sym_name: Rc<str>,
        init: Option<Box<Node>>,
        is_macro: bool,
    },
    Defprotocol {
        name: Rc<str>,
        method_sigs: Vec<MethodSig>,
    },
    ExtendType {
        type_name: Rc<str>,
        protocol_name: Rc<str>,
        methods: Vec<ExtendMethod>,
    },
    Defmulti {
        name: Rc<str>,
        dispatch_fn: Box<Node>,
    },
    Defmethod {
        name: Rc<str>,
        dispatch_val: Box<Node>,
        arity: FnArity,
    },
    LazySeqNode {
        body_fn: Box<Node>,
    },
    /// Not named in spec.md 3.3's Node list, but required to carry field
    /// order for the synthesized `->Name` constructor (spec.md 4.4.2);
    /// without it `defrecord` would have nowhere to remember which
    /// positional argument maps to which field once macro-style expansion
    /// re-analyzes the constructor `fn`.
    Defrecord {
        name: Rc<str>,
        fields: Vec<Rc<str>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_node_carries_zero_position() {
        let n = Node::synthetic(NodeKind::Constant(Value::Nil));
        assert!(n.pos.is_zero());
    }
}
