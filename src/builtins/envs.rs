// ABOUTME: Environment introspection natives; environments are first-class

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ZERO_OR_ONE};
use crate::term::Term;
use std::rc::Rc;

fn target_env(
    function: &str,
    args: &[Term],
    env: &Rc<Environment>,
) -> Result<Rc<Environment>, EvalError> {
    match args {
        [] => Ok(env.clone()),
        [Term::Env(e)] => Ok(e.clone()),
        [other] => Err(EvalError::type_err(function, "environment", other)),
        _ => Err(EvalError::arity(function, ARITY_ZERO_OR_ONE, args.len())),
    }
}

/// The calling scope, reified as a value
fn builtin_current(args: &[Term], env: &Rc<Environment>) -> Result<Term, EvalError> {
    if !args.is_empty() {
        return Err(EvalError::arity("env/current", "0", args.len()));
    }
    Ok(Term::Env(env.clone()))
}

/// Names bound in the local frame of a scope
fn builtin_keys(args: &[Term], env: &Rc<Environment>) -> Result<Term, EvalError> {
    let target = target_env("env/keys", args, env)?;
    let keys = target.keys().into_iter().map(Term::Str).collect();
    Ok(Term::list(keys))
}

/// Scope-chain length from a scope to the root
fn builtin_depth(args: &[Term], env: &Rc<Environment>) -> Result<Term, EvalError> {
    let target = target_env("env/depth", args, env)?;
    Ok(Term::Num(target.depth() as f64))
}

/// Whether a symbol is visible from a scope
fn builtin_exists(args: &[Term], env: &Rc<Environment>) -> Result<Term, EvalError> {
    match args {
        [Term::Sym(name)] | [Term::Str(name)] => Ok(Term::Bool(env.exists(name))),
        [other] => Err(EvalError::type_err("env/exists?", "symbol", other)),
        _ => Err(EvalError::arity("env/exists?", "1", args.len())),
    }
}

/// Removes a binding from the local frame only; whether it was there
fn builtin_delete(args: &[Term], env: &Rc<Environment>) -> Result<Term, EvalError> {
    match args {
        [Term::Sym(name)] | [Term::Str(name)] => Ok(Term::Bool(env.delete(name))),
        [other] => Err(EvalError::type_err("env/delete!", "symbol", other)),
        _ => Err(EvalError::arity("env/delete!", "1", args.len())),
    }
}

pub fn register(env: &Rc<Environment>) {
    env.define("env/current", Term::Native("env/current", builtin_current));
    env.define("env/keys", Term::Native("env/keys", builtin_keys));
    env.define("env/depth", Term::Native("env/depth", builtin_depth));
    env.define("env/exists?", Term::Native("env/exists?", builtin_exists));
    env.define("env/delete!", Term::Native("env/delete!", builtin_delete));
}
