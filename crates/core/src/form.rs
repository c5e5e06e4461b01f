//! `Form`: the reader's output, consumed by the analyzer.
//!
//! The reader itself lives outside this crate; this module only defines the
//! shape the analyzer is handed.

use std::rc::Rc;

/// A source position, shared by `Form` and by the per-child position arrays
/// recorded on `list`/`vector` Values during Form->Value conversion.
///
/// Synthetic data (constructed at runtime, not read from source) uses
/// `SourcePos::ZERO` - never a fabricated non-zero position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub line: u32,
    pub column: u16,
}

impl SourcePos {
    pub const ZERO: SourcePos = SourcePos { line: 0, column: 0 };

    pub fn new(line: u32, column: u16) -> Self {
        SourcePos { line, column }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// One reader-level datum. `FormData::List`/`Vector`/`Map`/`Set` carry their
/// children as plain `Form`s (not yet Values) so the analyzer can walk
/// unexpanded macro arguments without forcing an allocation through the GC.
#[derive(Clone, Debug, PartialEq)]
pub enum FormData {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    BigInt(Rc<str>),
    BigDecimal(Rc<str>),
    Ratio(i64, i64),
    Char(char),
    String(Rc<str>),
    Symbol {
        ns: Option<Rc<str>>,
        name: Rc<str>,
    },
    Keyword {
        ns: Option<Rc<str>>,
        name: Rc<str>,
        auto_resolve: bool,
    },
    List(Rc<[Form]>),
    Vector(Rc<[Form]>),
    /// Flat `k, v, k, v, ...` pairs, as read.
    Map(Rc<[Form]>),
    Set(Rc<[Form]>),
    Regex(Rc<str>),
    /// Tagged literal (`#foo bar`); analyzed as `nil` unless extended.
    Tag {
        tag: Rc<str>,
        value: Box<Form>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Form {
    pub data: FormData,
    pub line: u32,
    pub column: u16,
}

impl Form {
    pub fn new(data: FormData, line: u32, column: u16) -> Self {
        Form { data, line, column }
    }

    pub fn synthetic(data: FormData) -> Self {
        Form {
            data,
            line: 0,
            column: 0,
        }
    }

    pub fn pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.column)
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.data, FormData::Nil)
    }
}
