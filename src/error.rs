// ABOUTME: Error types for parse and evaluation failures in the interpreter

use crate::term::{ExceptionTerm, Term};
use thiserror::Error;

// ===== Arity constant strings (shared by builtin argument checks) =====
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";
pub const ARITY_THREE: &str = "3";
pub const ARITY_AT_LEAST_ONE: &str = "at least 1";
pub const ARITY_AT_LEAST_TWO: &str = "at least 2";
pub const ARITY_ZERO_OR_ONE: &str = "0-1";
pub const ARITY_ONE_OR_TWO: &str = "1-2";
pub const ARITY_TWO_OR_THREE: &str = "2-3";

/// Reader-level failures (the SyntaxError family)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unrecognized token at '{0}'")]
    UnrecognizedToken(String),

    #[error("unclosed string literal")]
    UnclosedString,

    #[error("unmatched closing paren")]
    UnmatchedParen,

    #[error("unexpected end of input inside list")]
    UnclosedList,

    #[error("unexpected trailing input: '{0}'")]
    TrailingInput(String),
}

/// Evaluator-level failures. Every variant becomes an exception term and a
/// throw continuation inside the machine; none of them panic.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("undefined symbol: {0}")]
    Lookup(String),

    /// Arity error with function name, expected count/range, and actual count
    #[error("{function}: expected {expected} argument{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    Arity {
        function: String,
        expected: String, // "2", "1-3", "at least 1"
        actual: usize,
    },

    /// Type mismatch with function name, expected type, and actual type
    #[error("{function}: expected {expected}, got {actual}")]
    Type {
        function: String,
        expected: String,
        actual: String,
    },

    /// Runtime error with free-form message
    #[error("{0}")]
    Runtime(String),

    /// A value raised by `throw`; carries the original term as payload
    #[error("{message}")]
    Thrown {
        message: String,
        payload: Option<Term>,
    },

    /// Should-not-happen invariant violation in the step loop
    #[error("internal error: {0}")]
    Internal(String),
}

impl EvalError {
    /// Create an arity error with expected and actual counts
    pub fn arity(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvalError::Arity {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    /// Create a type mismatch error for an argument
    pub fn type_err(function: &str, expected: &str, actual: &Term) -> Self {
        EvalError::Type {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        EvalError::Runtime(message.into())
    }

    /// Every evaluator failure propagates as an exception term
    pub fn into_exception(self) -> Term {
        match self {
            EvalError::Thrown { message, payload } => Term::exception(message, payload),
            other => Term::exception(other.to_string(), None),
        }
    }

    /// Recovers the error form of an exception delivered back to the host
    pub fn from_exception(exception: &ExceptionTerm) -> Self {
        EvalError::Thrown {
            message: exception.message.clone(),
            payload: exception.payload.clone(),
        }
    }
}

/// Umbrella error for the driver surfaces (CLI, file loading, REPL)
#[derive(Error, Debug, Clone)]
pub enum SlightError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_message_pluralizes() {
        let one = EvalError::arity("first", ARITY_ONE, 2);
        assert_eq!(one.to_string(), "first: expected 1 argument, got 2");
        let two = EvalError::arity("cons", ARITY_TWO, 1);
        assert_eq!(two.to_string(), "cons: expected 2 arguments, got 1");
    }

    #[test]
    fn test_type_error_names_types() {
        let err = EvalError::type_err("+", "num", &Term::Str("x".into()));
        assert_eq!(err.to_string(), "+: expected num, got str");
    }

    #[test]
    fn test_thrown_round_trips_through_exception() {
        let err = EvalError::Thrown {
            message: "oops".into(),
            payload: Some(Term::Num(1.0)),
        };
        match err.into_exception() {
            Term::Exception(e) => {
                assert_eq!(e.message, "oops");
                assert_eq!(e.payload, Some(Term::Num(1.0)));
                let back = EvalError::from_exception(&e);
                assert_eq!(back.to_string(), "oops");
            }
            other => panic!("expected exception, got {}", other),
        }
    }
}
