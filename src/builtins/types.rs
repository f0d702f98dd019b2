// ABOUTME: Type predicates and type introspection

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE};
use crate::term::Term;
use std::rc::Rc;

fn predicate(
    name: &'static str,
    args: &[Term],
    test: fn(&Term) -> bool,
) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity(name, ARITY_ONE, args.len()));
    }
    Ok(Term::Bool(test(&args[0])))
}

fn builtin_num_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("num?", args, |t| matches!(t, Term::Num(_)))
}

fn builtin_str_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("str?", args, |t| matches!(t, Term::Str(_)))
}

fn builtin_sym_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("sym?", args, |t| matches!(t, Term::Sym(_)))
}

fn builtin_key_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("key?", args, |t| matches!(t, Term::Key(_)))
}

fn builtin_bool_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("bool?", args, |t| matches!(t, Term::Bool(_)))
}

fn builtin_list_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("list?", args, |t| {
        matches!(t, Term::Cons(_) | Term::Nil)
    })
}

fn builtin_table_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("table?", args, |t| matches!(t, Term::Hash(_)))
}

fn builtin_fn_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("fn?", args, Term::is_callable)
}

fn builtin_exception_p(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    predicate("exception?", args, |t| matches!(t, Term::Exception(_)))
}

fn builtin_type_of(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("type-of", ARITY_ONE, args.len()));
    }
    Ok(Term::Str(args[0].type_name().to_string()))
}

pub fn register(env: &Rc<Environment>) {
    env.define("num?", Term::Native("num?", builtin_num_p));
    env.define("str?", Term::Native("str?", builtin_str_p));
    env.define("sym?", Term::Native("sym?", builtin_sym_p));
    env.define("key?", Term::Native("key?", builtin_key_p));
    env.define("bool?", Term::Native("bool?", builtin_bool_p));
    env.define("list?", Term::Native("list?", builtin_list_p));
    env.define("table?", Term::Native("table?", builtin_table_p));
    env.define("fn?", Term::Native("fn?", builtin_fn_p));
    env.define("exception?", Term::Native("exception?", builtin_exception_p));
    env.define("type-of", Term::Native("type-of", builtin_type_of));
}
