//! Small Form-construction/inspection helpers shared by destructuring
//! expansion and special-form analysis.
//!
//! These build and read synthetic `Form`s only - they never touch the GC
//! heap or the environment, which keeps them trivially reusable from both
//! `destructure.rs` and every `special_forms/*` module without threading an
//! `Analyzer` through functions that don't need one.

use std::rc::Rc;

use wisp_core::form::{Form, FormData};

pub fn sym_form(name: &str) -> Form {
    Form::synthetic(FormData::Symbol { ns: None, name: name.into() })
}

pub fn int_form(n: i64) -> Form {
    Form::synthetic(FormData::Integer(n))
}

/// `(head arg0 arg1 ...)`, synthetic (zero source position).
pub fn call_form(head: &str, args: Vec<Form>) -> Form {
    let mut children = Vec::with_capacity(args.len() + 1);
    children.push(sym_form(head));
    children.extend(args);
    Form::synthetic(FormData::List(children.into()))
}

/// `[pattern]` - a one-element parameter vector, used to build the
/// predicate/body `fn*`s that `for`'s desugaring needs (spec.md 4.4.2).
pub fn single_param_vector(pattern: &Form) -> Form {
    Form::synthetic(FormData::Vector(vec![pattern.clone()].into()))
}

pub fn is_amp_symbol(form: &Form) -> bool {
    matches!(&form.data, FormData::Symbol { ns: None, name } if &**name == "&")
}

/// True if `form` is a list whose head is the unqualified symbol `head`
/// (used to spot `(catch ...)`/`(finally ...)` clauses inside `try`).
pub fn is_headed_by(form: &Form, head: &str) -> bool {
    match &form.data {
        FormData::List(children) => {
            matches!(children.first(), Some(Form { data: FormData::Symbol { ns: None, name }, .. }) if &**name == head)
        }
        _ => false,
    }
}

pub fn keyword_simple_name(form: &Form) -> Option<&str> {
    match &form.data {
        FormData::Keyword { ns: None, name, .. } => Some(name),
        _ => None,
    }
}

/// `Err(())` on anything but an unqualified symbol; callers turn that into
/// a located `AnalyzerError` since only they know the right message.
pub fn symbol_name(form: &Form) -> Result<Rc<str>, ()> {
    match &form.data {
        FormData::Symbol { ns: None, name } => Ok(name.clone()),
        _ => Err(()),
    }
}

pub fn list_children(form: &Form) -> Result<Rc<[Form]>, ()> {
    match &form.data {
        FormData::List(c) => Ok(c.clone()),
        _ => Err(()),
    }
}

pub fn vector_children(form: &Form) -> Result<Rc<[Form]>, ()> {
    match &form.data {
        FormData::Vector(c) => Ok(c.clone()),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_form_places_head_before_args() {
        let f = call_form("nth", vec![sym_form("T"), int_form(0)]);
        match f.data {
            FormData::List(children) => {
                assert_eq!(children.len(), 3);
                assert_eq!(symbol_name(&children[0]).unwrap().as_ref(), "nth");
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn is_headed_by_ignores_non_matching_lists() {
        let f = call_form("finally", vec![]);
        assert!(is_headed_by(&f, "finally"));
        assert!(!is_headed_by(&f, "catch"));
    }
}
