// ABOUTME: Table natives: keyword-keyed, insertion-ordered maps

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE, ARITY_TWO, ARITY_THREE};
use crate::term::{Hash, Term};
use std::rc::Rc;

fn as_table(function: &str, term: &Term) -> Result<Hash, EvalError> {
    match term {
        Term::Hash(h) => Ok(h.clone()),
        other => Err(EvalError::type_err(function, "table", other)),
    }
}

fn as_key(function: &str, term: &Term) -> Result<String, EvalError> {
    match term {
        Term::Key(k) => Ok(k.clone()),
        other => Err(EvalError::type_err(function, "keyword", other)),
    }
}

/// Builds a table from a flat key/value sequence; keys keep insertion order
fn builtin_table(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() % 2 != 0 {
        return Err(EvalError::runtime(
            "table: expected an even number of arguments",
        ));
    }
    let table = Term::table();
    if let Term::Hash(h) = &table {
        let mut map = h.borrow_mut();
        for pair in args.chunks(2) {
            let key = as_key("table", &pair[0])?;
            map.insert(key, pair[1].clone());
        }
    }
    Ok(table)
}

/// Value for a key, or Nil when absent
fn builtin_fetch(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("fetch", ARITY_TWO, args.len()));
    }
    let table = as_table("fetch", &args[0])?;
    let key = as_key("fetch", &args[1])?;
    let map = table.borrow();
    Ok(map.get(&key).cloned().unwrap_or(Term::Nil))
}

/// Stores a value under a key and returns the table
fn builtin_store(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 3 {
        return Err(EvalError::arity("store", ARITY_THREE, args.len()));
    }
    let table = as_table("store", &args[0])?;
    let key = as_key("store", &args[1])?;
    table.borrow_mut().insert(key, args[2].clone());
    Ok(args[0].clone())
}

/// Removes a key (order of the remaining keys is preserved) and returns the
/// table
fn builtin_delete(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("delete", ARITY_TWO, args.len()));
    }
    let table = as_table("delete", &args[0])?;
    let key = as_key("delete", &args[1])?;
    table.borrow_mut().shift_remove(&key);
    Ok(args[0].clone())
}

fn builtin_exists(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 2 {
        return Err(EvalError::arity("exists", ARITY_TWO, args.len()));
    }
    let table = as_table("exists", &args[0])?;
    let key = as_key("exists", &args[1])?;
    let present = table.borrow().contains_key(&key);
    Ok(Term::Bool(present))
}

/// Keys in insertion order
fn builtin_keys(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("table/keys", ARITY_ONE, args.len()));
    }
    let table = as_table("table/keys", &args[0])?;
    let keys = table
        .borrow()
        .keys()
        .map(|k| Term::Key(k.clone()))
        .collect();
    Ok(Term::list(keys))
}

fn builtin_len(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("table/len", ARITY_ONE, args.len()));
    }
    let table = as_table("table/len", &args[0])?;
    let len = table.borrow().len();
    Ok(Term::Num(len as f64))
}

pub fn register(env: &Rc<Environment>) {
    env.define("table", Term::Native("table", builtin_table));
    env.define("fetch", Term::Native("fetch", builtin_fetch));
    env.define("store", Term::Native("store", builtin_store));
    env.define("delete", Term::Native("delete", builtin_delete));
    env.define("exists", Term::Native("exists", builtin_exists));
    env.define("table/keys", Term::Native("table/keys", builtin_keys));
    env.define("table/len", Term::Native("table/len", builtin_len));
}
