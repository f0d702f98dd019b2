// ABOUTME: Arithmetic natives: + - * / % and a few numeric helpers

use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_ONE, ARITY_ONE, ARITY_TWO};
use crate::term::Term;
use std::rc::Rc;

fn num(function: &str, term: &Term) -> Result<f64, EvalError> {
    match term {
        Term::Num(n) => Ok(*n),
        other => Err(EvalError::type_err(function, "num", other)),
    }
}

/// Returns the sum of all arguments.
///
/// ```lisp
/// (+ 1 2 3) => 6
/// (+) => 0
/// ```
fn builtin_add(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    let mut sum = 0.0;
    for arg in args {
        sum += num("+", arg)?;
    }
    Ok(Term::Num(sum))
}

/// Subtracts subsequent arguments from the first; negates a single argument.
fn builtin_sub(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity("-", ARITY_AT_LEAST_ONE, 0));
    }
    let first = num("-", &args[0])?;
    if args.len() == 1 {
        return Ok(Term::Num(-first));
    }
    let mut result = first;
    for arg in &args[1..] {
        result -= num("-", arg)?;
    }
    Ok(Term::Num(result))
}

/// Returns the product of all arguments.
fn builtin_mul(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    let mut product = 1.0;
    for arg in args {
        product *= num("*", arg)?;
    }
    Ok(Term::Num(product))
}

/// Divides the first argument by the rest; reciprocal for a single argument.
fn builtin_div(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity("/", ARITY_AT_LEAST_ONE, 0));
    }
    let first = num("/", &args[0])?;
    if args.len() == 1 {
        if first == 0.0 {
            return Err(EvalError::runtime("/: division by zero"));
        }
        return Ok(Term::Num(1.0 / first));
    }
    let mut result = first;
    for arg in &args[1..] {
        let divisor = num("/", arg)?;
        if divisor == 0.0 {
            return Err(EvalError::runtime("/: division by zero"));
        }
        result /= divisor;
    }
    Ok(Term::Num(result))
}

/// Remainder of num1 divided by num2.
fn builtin_mod(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("%", ARITY_TWO, args.len()));
    }
    let a = num("%", &args[0])?;
    let b = num("%", &args[1])?;
    if b == 0.0 {
        return Err(EvalError::runtime("%: division by zero"));
    }
    Ok(Term::Num(a % b))
}

fn builtin_abs(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("abs", ARITY_ONE, args.len()));
    }
    Ok(Term::Num(num("abs", &args[0])?.abs()))
}

fn builtin_floor(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("floor", ARITY_ONE, args.len()));
    }
    Ok(Term::Num(num("floor", &args[0])?.floor()))
}

fn builtin_ceil(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("ceil", ARITY_ONE, args.len()));
    }
    Ok(Term::Num(num("ceil", &args[0])?.ceil()))
}

fn builtin_sqrt(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("sqrt", ARITY_ONE, args.len()));
    }
    let n = num("sqrt", &args[0])?;
    if n < 0.0 {
        return Err(EvalError::runtime("sqrt: negative argument"));
    }
    Ok(Term::Num(n.sqrt()))
}

fn builtin_min(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity("min", ARITY_AT_LEAST_ONE, 0));
    }
    let mut best = num("min", &args[0])?;
    for arg in &args[1..] {
        best = best.min(num("min", arg)?);
    }
    Ok(Term::Num(best))
}

fn builtin_max(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.is_empty() {
        return Err(EvalError::arity("max", ARITY_AT_LEAST_ONE, 0));
    }
    let mut best = num("max", &args[0])?;
    for arg in &args[1..] {
        best = best.max(num("max", arg)?);
    }
    Ok(Term::Num(best))
}

pub fn register(env: &Rc<Environment>) {
    env.define("+", Term::Native("+", builtin_add));
    env.define("-", Term::Native("-", builtin_sub));
    env.define("*", Term::Native("*", builtin_mul));
    env.define("/", Term::Native("/", builtin_div));
    env.define("%", Term::Native("%", builtin_mod));
    env.define("abs", Term::Native("abs", builtin_abs));
    env.define("floor", Term::Native("floor", builtin_floor));
    env.define("ceil", Term::Native("ceil", builtin_ceil));
    env.define("sqrt", Term::Native("sqrt", builtin_sqrt));
    env.define("min", Term::Native("min", builtin_min));
    env.define("max", Term::Native("max", builtin_max));
}
