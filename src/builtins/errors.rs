// ABOUTME: Exception natives: raising, constructing, and inspecting

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE, ARITY_ONE_OR_TWO};
use crate::term::Term;
use std::rc::Rc;

/// Raises its argument. A value that is not already an exception is wrapped
/// into one carrying the value as payload; a thrown string becomes the
/// exception's message.
fn builtin_throw(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("throw", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Term::Exception(e) => Err(EvalError::from_exception(e)),
        Term::Str(s) => Err(EvalError::Thrown {
            message: s.clone(),
            payload: Some(args[0].clone()),
        }),
        other => Err(EvalError::Thrown {
            message: other.to_string(),
            payload: Some(other.clone()),
        }),
    }
}

/// Constructs an exception value without raising it
fn builtin_exception(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.is_empty() || args.len() > 2 {
        return Err(EvalError::arity("exception", ARITY_ONE_OR_TWO, args.len()));
    }
    let message = match &args[0] {
        Term::Str(s) => s.clone(),
        other => return Err(EvalError::type_err("exception", "str", other)),
    };
    Ok(Term::exception(message, args.get(1).cloned()))
}

fn builtin_message(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("exception/message", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Term::Exception(e) => Ok(Term::Str(e.message.clone())),
        other => Err(EvalError::type_err("exception/message", "exception", other)),
    }
}

fn builtin_payload(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("exception/payload", ARITY_ONE, args.len()));
    }
    match &args[0] {
        Term::Exception(e) => Ok(e.payload.clone().unwrap_or(Term::Nil)),
        other => Err(EvalError::type_err("exception/payload", "exception", other)),
    }
}

pub fn register(env: &Rc<Environment>) {
    env.define("throw", Term::Native("throw", builtin_throw));
    env.define("exception", Term::Native("exception", builtin_exception));
    env.define(
        "exception/message",
        Term::Native("exception/message", builtin_message),
    );
    env.define(
        "exception/payload",
        Term::Native("exception/payload", builtin_payload),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throw_wraps_strings() {
        let e = Environment::new();
        match builtin_throw(&[Term::Str("oops".into())], &e) {
            Err(EvalError::Thrown { message, payload }) => {
                assert_eq!(message, "oops");
                assert_eq!(payload, Some(Term::Str("oops".into())));
            }
            other => panic!("expected thrown, got {:?}", other),
        }
    }

    #[test]
    fn test_throw_wraps_values_as_payload() {
        let e = Environment::new();
        match builtin_throw(&[Term::Num(7.0)], &e) {
            Err(EvalError::Thrown { payload, .. }) => {
                assert_eq!(payload, Some(Term::Num(7.0)))
            }
            other => panic!("expected thrown, got {:?}", other),
        }
    }

    #[test]
    fn test_exception_accessors() {
        let e = Environment::new();
        let exc = builtin_exception(&[Term::Str("bad".into()), Term::Num(1.0)], &e).unwrap();
        assert_eq!(
            builtin_message(&[exc.clone()], &e).unwrap(),
            Term::Str("bad".into())
        );
        assert_eq!(builtin_payload(&[exc], &e).unwrap(), Term::Num(1.0));
    }
}
