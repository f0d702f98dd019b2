// ABOUTME: Comparison natives: = != < > <= >=

use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_TWO};
use crate::term::Term;
use std::cmp::Ordering;
use std::rc::Rc;

/// Orders two terms when they are comparable (numbers with numbers, strings
/// with strings); anything else is a type error.
fn compare(function: &str, a: &Term, b: &Term) -> Result<Ordering, EvalError> {
    match (a, b) {
        (Term::Num(x), Term::Num(y)) => x
            .partial_cmp(y)
            .ok_or_else(|| EvalError::runtime(format!("{}: not comparable", function))),
        (Term::Str(x), Term::Str(y)) => Ok(x.cmp(y)),
        (Term::Num(_), other) | (Term::Str(_), other) => {
            Err(EvalError::type_err(function, a.type_name(), other))
        }
        (other, _) => Err(EvalError::type_err(function, "num or str", other)),
    }
}

fn chain(
    function: &'static str,
    args: &[Term],
    accept: fn(Ordering) -> bool,
) -> Result<Term, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity(function, ARITY_AT_LEAST_TWO, args.len()));
    }
    for pair in args.windows(2) {
        if !accept(compare(function, &pair[0], &pair[1])?) {
            return Ok(Term::Bool(false));
        }
    }
    Ok(Term::Bool(true))
}

/// Structural equality over any terms
fn builtin_eq(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() < 2 {
        return Err(EvalError::arity("=", ARITY_AT_LEAST_TWO, args.len()));
    }
    Ok(Term::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn builtin_ne(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    match builtin_eq(args, _env)? {
        Term::Bool(b) => Ok(Term::Bool(!b)),
        other => Ok(other),
    }
}

fn builtin_lt(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    chain("<", args, |o| o == Ordering::Less)
}

fn builtin_gt(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    chain(">", args, |o| o == Ordering::Greater)
}

fn builtin_le(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    chain("<=", args, |o| o != Ordering::Greater)
}

fn builtin_ge(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    chain(">=", args, |o| o != Ordering::Less)
}

pub fn register(env: &Rc<Environment>) {
    env.define("=", Term::Native("=", builtin_eq));
    env.define("!=", Term::Native("!=", builtin_ne));
    env.define("<", Term::Native("<", builtin_lt));
    env.define(">", Term::Native(">", builtin_gt));
    env.define("<=", Term::Native("<=", builtin_le));
    env.define(">=", Term::Native(">=", builtin_ge));
}
