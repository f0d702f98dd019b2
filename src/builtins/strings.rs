// ABOUTME: String natives

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE, ARITY_TWO};
use crate::term::Term;
use std::rc::Rc;

fn as_str<'a>(function: &str, term: &'a Term) -> Result<&'a str, EvalError> {
    match term {
        Term::Str(s) => Ok(s),
        other => Err(EvalError::type_err(function, "str", other)),
    }
}

fn builtin_len(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("str/len", ARITY_ONE, args.len()));
    }
    Ok(Term::Num(as_str("str/len", &args[0])?.chars().count() as f64))
}

/// Concatenates the printed form of every argument
fn builtin_concat(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    let mut out = String::new();
    for arg in args {
        out.push_str(&arg.print_string());
    }
    Ok(Term::Str(out))
}

fn builtin_contains(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("str/contains?", ARITY_TWO, args.len()));
    }
    let haystack = as_str("str/contains?", &args[0])?;
    let needle = as_str("str/contains?", &args[1])?;
    Ok(Term::Bool(haystack.contains(needle)))
}

fn builtin_split(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("str/split", ARITY_TWO, args.len()));
    }
    let text = as_str("str/split", &args[0])?;
    let separator = as_str("str/split", &args[1])?;
    if separator.is_empty() {
        return Err(EvalError::runtime("str/split: empty separator"));
    }
    let parts = text
        .split(separator)
        .map(|part| Term::Str(part.to_string()))
        .collect();
    Ok(Term::list(parts))
}

fn builtin_trim(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("str/trim", ARITY_ONE, args.len()));
    }
    Ok(Term::Str(as_str("str/trim", &args[0])?.trim().to_string()))
}

/// Parses a string as a number; Nil when it does not parse
fn builtin_num(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("str/num", ARITY_ONE, args.len()));
    }
    let text = as_str("str/num", &args[0])?;
    match text.trim().parse::<f64>() {
        Ok(n) => Ok(Term::Num(n)),
        Err(_) => Ok(Term::Nil),
    }
}

/// Readable rendering of any value as a string
fn builtin_to_str(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("->str", ARITY_ONE, args.len()));
    }
    Ok(Term::Str(args[0].print_string()))
}

pub fn register(env: &Rc<Environment>) {
    env.define("str/len", Term::Native("str/len", builtin_len));
    env.define("str/concat", Term::Native("str/concat", builtin_concat));
    env.define("str/contains?", Term::Native("str/contains?", builtin_contains));
    env.define("str/split", Term::Native("str/split", builtin_split));
    env.define("str/trim", Term::Native("str/trim", builtin_trim));
    env.define("str/num", Term::Native("str/num", builtin_num));
    env.define("->str", Term::Native("->str", builtin_to_str));
}
