// ABOUTME: JSON natives mapping terms to serde_json values and back

use crate::env::Environment;
use crate::error::{EvalError, ARITY_ONE};
use crate::term::Term;
use serde_json::Value;
use std::rc::Rc;

fn to_json(term: &Term) -> Result<Value, EvalError> {
    match term {
        Term::Unit | Term::Nil => Ok(Value::Null),
        Term::Bool(b) => Ok(Value::Bool(*b)),
        Term::Num(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .ok_or_else(|| EvalError::runtime("json/encode: non-finite number")),
        Term::Str(s) => Ok(Value::String(s.clone())),
        Term::Key(k) | Term::Sym(k) => Ok(Value::String(k.clone())),
        Term::Cons(items) => {
            let mut array = Vec::with_capacity(items.len());
            for item in items.iter() {
                array.push(to_json(item)?);
            }
            Ok(Value::Array(array))
        }
        Term::Hash(h) => {
            let mut object = serde_json::Map::new();
            for (key, value) in h.borrow().iter() {
                object.insert(key.clone(), to_json(value)?);
            }
            Ok(Value::Object(object))
        }
        other => Err(EvalError::type_err("json/encode", "data", other)),
    }
}

fn from_json(value: Value) -> Term {
    match value {
        Value::Null => Term::Nil,
        Value::Bool(b) => Term::Bool(b),
        Value::Number(n) => Term::Num(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Term::Str(s),
        Value::Array(items) => Term::list(items.into_iter().map(from_json).collect()),
        Value::Object(object) => {
            let table = Term::table();
            if let Term::Hash(h) = &table {
                let mut map = h.borrow_mut();
                for (key, value) in object {
                    map.insert(key, from_json(value));
                }
            }
            table
        }
    }
}

fn builtin_encode(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("json/encode", ARITY_ONE, args.len()));
    }
    let value = to_json(&args[0])?;
    serde_json::to_string(&value)
        .map(Term::Str)
        .map_err(|e| EvalError::runtime(format!("json/encode: {}", e)))
}

fn builtin_decode(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::arity("json/decode", ARITY_ONE, args.len()));
    }
    let text = match &args[0] {
        Term::Str(s) => s,
        other => return Err(EvalError::type_err("json/decode", "str", other)),
    };
    serde_json::from_str::<Value>(text)
        .map(from_json)
        .map_err(|e| EvalError::runtime(format!("json/decode: {}", e)))
}

pub fn register(env: &Rc<Environment>) {
    env.define("json/encode", Term::Native("json/encode", builtin_encode));
    env.define("json/decode", Term::Native("json/decode", builtin_decode));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_list() {
        let e = Environment::new();
        let value =
            builtin_encode(&[Term::list(vec![Term::Num(1.0), Term::Str("x".into())])], &e)
                .unwrap();
        assert_eq!(value, Term::Str("[1.0,\"x\"]".into()));
    }

    #[test]
    fn test_decode_object_to_table() {
        let e = Environment::new();
        let decoded = builtin_decode(&[Term::Str("{\"a\": 1, \"b\": [true, null]}".into())], &e)
            .unwrap();
        match decoded {
            Term::Hash(h) => {
                let map = h.borrow();
                assert_eq!(map.get("a"), Some(&Term::Num(1.0)));
                assert_eq!(
                    map.get("b"),
                    Some(&Term::list(vec![Term::Bool(true), Term::Nil]))
                );
            }
            other => panic!("expected table, got {}", other),
        }
    }

    #[test]
    fn test_lambda_does_not_encode() {
        let e = Environment::new();
        assert!(builtin_encode(&[Term::Native("x", |_, _| Ok(Term::Nil))], &e).is_err());
    }
}
