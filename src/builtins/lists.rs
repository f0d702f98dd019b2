// ABOUTME: List natives built on the shared-storage cons representation

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE, ARITY_TWO};
use crate::term::{Cons, Term};
use std::rc::Rc;

fn as_list(function: &str, term: &Term) -> Result<Cons, EvalError> {
    match term {
        Term::Cons(c) => Ok(c.clone()),
        Term::Nil => Ok(Cons::new(vec![])),
        other => Err(EvalError::type_err(function, "list", other)),
    }
}

/// Builds a list from its arguments
fn builtin_list(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    Ok(Term::list(args.to_vec()))
}

/// Prepends an element; the tail must already be a list
fn builtin_cons(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("cons", ARITY_TWO, args.len()));
    }
    let tail = as_list("cons", &args[1])?;
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(args[0].clone());
    items.extend(tail.iter().cloned());
    Ok(Term::list(items))
}

fn builtin_first(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("first", ARITY_ONE, args.len()));
    }
    let list = as_list("first", &args[0])?;
    match list.first() {
        Some(item) => Ok(item.clone()),
        None => Err(EvalError::runtime("first: empty list")),
    }
}

/// O(1) tail: shares the backing array at the next offset
fn builtin_rest(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("rest", ARITY_ONE, args.len()));
    }
    let list = as_list("rest", &args[0])?;
    if list.is_empty() {
        return Err(EvalError::runtime("rest: empty list"));
    }
    Ok(Term::from_cons(list.rest()))
}

fn builtin_empty(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("empty?", ARITY_ONE, args.len()));
    }
    let list = as_list("empty?", &args[0])?;
    Ok(Term::Bool(list.is_empty()))
}

fn builtin_nil(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("nil?", ARITY_ONE, args.len()));
    }
    Ok(Term::Bool(args[0] == Term::Nil))
}

fn builtin_len(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("list/len", ARITY_ONE, args.len()));
    }
    let list = as_list("list/len", &args[0])?;
    Ok(Term::Num(list.len() as f64))
}

fn builtin_nth(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("list/nth", ARITY_TWO, args.len()));
    }
    let list = as_list("list/nth", &args[0])?;
    let index = match &args[1] {
        Term::Num(n) if *n >= 0.0 && n.fract() == 0.0 => *n as usize,
        other => return Err(EvalError::type_err("list/nth", "index", other)),
    };
    match list.at(index) {
        Some(item) => Ok(item.clone()),
        None => Err(EvalError::runtime(format!(
            "list/nth: index {} out of bounds for length {}",
            index,
            list.len()
        ))),
    }
}

fn builtin_reverse(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("list/reverse", ARITY_ONE, args.len()));
    }
    let mut items = as_list("list/reverse", &args[0])?.to_vec();
    items.reverse();
    Ok(Term::list(items))
}

fn builtin_concat(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    let mut items = Vec::new();
    for arg in args {
        items.extend(as_list("list/concat", arg)?.iter().cloned());
    }
    Ok(Term::list(items))
}

/// Sorts numbers or strings in natural order; mixed lists are a type error
fn builtin_sort(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("list/sort", ARITY_ONE, args.len()));
    }
    let mut items = as_list("list/sort", &args[0])?.to_vec();
    let all_nums = items.iter().all(|t| matches!(t, Term::Num(_)));
    let all_strs = items.iter().all(|t| matches!(t, Term::Str(_)));
    if all_nums {
        items.sort_by(|a, b| match (a, b) {
            (Term::Num(x), Term::Num(y)) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
            _ => std::cmp::Ordering::Equal,
        });
    } else if all_strs {
        items.sort_by(|a, b| match (a, b) {
            (Term::Str(x), Term::Str(y)) => x.cmp(y),
            _ => std::cmp::Ordering::Equal,
        });
    } else {
        return Err(EvalError::runtime(
            "list/sort: elements must be all numbers or all strings",
        ));
    }
    Ok(Term::list(items))
}

fn builtin_has(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("list/has?", ARITY_TWO, args.len()));
    }
    let list = as_list("list/has?", &args[0])?;
    let found = list.iter().any(|item| *item == args[1]);
    Ok(Term::Bool(found))
}

pub fn register(env: &Rc<Environment>) {
    env.define("list", Term::Native("list", builtin_list));
    env.define("cons", Term::Native("cons", builtin_cons));
    env.define("first", Term::Native("first", builtin_first));
    env.define("head", Term::Native("head", builtin_first));
    env.define("rest", Term::Native("rest", builtin_rest));
    env.define("tail", Term::Native("tail", builtin_rest));
    env.define("empty?", Term::Native("empty?", builtin_empty));
    env.define("nil?", Term::Native("nil?", builtin_nil));
    env.define("list/len", Term::Native("list/len", builtin_len));
    env.define("list/nth", Term::Native("list/nth", builtin_nth));
    env.define("list/reverse", Term::Native("list/reverse", builtin_reverse));
    env.define("list/concat", Term::Native("list/concat", builtin_concat));
    env.define("list/sort", Term::Native("list/sort", builtin_sort));
    env.define("list/has?", Term::Native("list/has?", builtin_has));
}
