// ABOUTME: Boolean natives; the short-circuit forms live with the operatives

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE};
use crate::term::Term;
use std::rc::Rc;

/// Boolean negation. Strict: non-booleans are a type error (use `bool?` or a
/// comparison first).
fn builtin_not(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("!", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Term::Bool(b) => Ok(Term::Bool(!b)),
        other => Err(EvalError::type_err("!", "bool", other)),
    }
}

/// Truthiness of any value, per the booleanness table
fn builtin_truthy(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("truthy?", ARITY_ONE, args.len()));
    }
    Ok(Term::Bool(args[0].truthy()))
}

pub fn register(env: &Rc<Environment>) {
    env.define("!", Term::Native("!", builtin_not));
    env.define("not", Term::Native("not", builtin_not));
    env.define("truthy?", Term::Native("truthy?", builtin_truthy));
}
