// ABOUTME: Term types representing Slight data structures and compiled expressions

use crate::env::Environment;
use crate::error::EvalError;
use crate::kont::Kont;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A builtin applicative: arguments arrive pre-evaluated on the operand stack.
pub type NativeFn = fn(&[Term], &Rc<Environment>) -> Result<Term, EvalError>;

/// A builtin operative (fexpr): receives its argument list unevaluated and
/// answers with the continuations to push, in push order.
pub type OperativeFn = fn(Term, &Rc<Environment>) -> Result<Vec<Kont>, EvalError>;

/// An array-backed list with structural sharing: `rest` is the same backing
/// array at `offset + 1`, so taking the tail is O(1).
#[derive(Debug, Clone)]
pub struct Cons {
    items: Rc<Vec<Term>>,
    offset: usize,
}

impl Cons {
    pub fn new(items: Vec<Term>) -> Self {
        Cons {
            items: Rc::new(items),
            offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len().saturating_sub(self.offset)
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.items.len()
    }

    pub fn at(&self, index: usize) -> Option<&Term> {
        self.items.get(self.offset + index)
    }

    pub fn first(&self) -> Option<&Term> {
        self.at(0)
    }

    pub fn rest(&self) -> Cons {
        Cons {
            items: self.items.clone(),
            offset: (self.offset + 1).min(self.items.len()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.items[self.offset.min(self.items.len())..].iter()
    }

    pub fn to_vec(&self) -> Vec<Term> {
        self.iter().cloned().collect()
    }

    /// True when both views share the same backing array at the same offset.
    pub fn shares_storage(&self, other: &Cons) -> bool {
        Rc::ptr_eq(&self.items, &other.items) && self.offset == other.offset
    }
}

impl PartialEq for Cons {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

/// A closure. Holds a strong reference to its definition-site environment;
/// a fresh frame is derived from it at call time.
#[derive(Debug)]
pub struct LambdaTerm {
    pub params: Vec<String>,
    pub body: Term,
    pub env: Rc<Environment>,
}

/// A raised (and catchable) value. `payload` carries whatever was thrown
/// when it was not already an exception.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTerm {
    pub message: String,
    pub payload: Option<Term>,
}

pub type Hash = Rc<RefCell<IndexMap<String, Term>>>;

#[derive(Debug, Clone)]
pub enum Term {
    /// Return value of side-effect primitives. Distinct from Nil.
    Unit,
    /// The empty list.
    Nil,
    Bool(bool),
    Num(f64),
    Str(String),
    Sym(String),
    /// Self-evaluating keyword (`:name`).
    Key(String),
    Cons(Cons),
    /// Insertion-ordered keyword-to-term table.
    Hash(Hash),
    Lambda(Rc<LambdaTerm>),
    Native(&'static str, NativeFn),
    FExpr(&'static str, OperativeFn),
    Exception(Rc<ExceptionTerm>),
    Env(Rc<Environment>),
}

impl Term {
    /// Builds a list term, collapsing the empty case to Nil.
    pub fn list(items: Vec<Term>) -> Term {
        if items.is_empty() {
            Term::Nil
        } else {
            Term::Cons(Cons::new(items))
        }
    }

    pub fn from_cons(cons: Cons) -> Term {
        if cons.is_empty() {
            Term::Nil
        } else {
            Term::Cons(cons)
        }
    }

    pub fn exception(message: impl Into<String>, payload: Option<Term>) -> Term {
        Term::Exception(Rc::new(ExceptionTerm {
            message: message.into(),
            payload,
        }))
    }

    pub fn table() -> Term {
        Term::Hash(Rc::new(RefCell::new(IndexMap::new())))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Term::Unit => "unit",
            Term::Nil => "nil",
            Term::Bool(_) => "bool",
            Term::Num(_) => "num",
            Term::Str(_) => "str",
            Term::Sym(_) => "symbol",
            Term::Key(_) => "keyword",
            Term::Cons(_) => "list",
            Term::Hash(_) => "table",
            Term::Lambda(_) => "lambda",
            Term::Native(..) => "native",
            Term::FExpr(..) => "operative",
            Term::Exception(_) => "exception",
            Term::Env(_) => "environment",
        }
    }

    /// Booleanness: Nil, false, 0, the empty string, and the empty list are
    /// false; everything else is true.
    pub fn truthy(&self) -> bool {
        match self {
            Term::Nil => false,
            Term::Bool(b) => *b,
            Term::Num(n) => *n != 0.0,
            Term::Str(s) => !s.is_empty(),
            Term::Cons(c) => !c.is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Term::Lambda(_) | Term::Native(..) | Term::FExpr(..))
    }

    /// Identity test used by the IfElse shortcut. Cons clones share their
    /// backing storage, so pointer equality identifies the same source node;
    /// atoms compare structurally, which is safe because re-evaluating an
    /// atom has no effects.
    pub fn same_node(&self, other: &Term) -> bool {
        match (self, other) {
            (Term::Cons(a), Term::Cons(b)) => a.shares_storage(b),
            (Term::Hash(a), Term::Hash(b)) => Rc::ptr_eq(a, b),
            (Term::Cons(_), _) | (_, Term::Cons(_)) => false,
            (Term::Hash(_), _) | (_, Term::Hash(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Copy used at process boundaries: tables are duplicated so no process
    /// can observe another's mutations.
    pub fn deep_copy(&self) -> Term {
        match self {
            Term::Hash(h) => {
                let copied: IndexMap<String, Term> = h
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_copy()))
                    .collect();
                Term::Hash(Rc::new(RefCell::new(copied)))
            }
            Term::Cons(c) => Term::Cons(Cons::new(c.iter().map(Term::deep_copy).collect())),
            other => other.clone(),
        }
    }

    /// Rendering for user-facing output: strings print raw, everything else
    /// as its readable form.
    pub fn print_string(&self) -> String {
        match self {
            Term::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Unit, Term::Unit) => true,
            (Term::Nil, Term::Nil) => true,
            // The empty list normalizes to Nil at builtin boundaries, but a
            // shared-storage rest can still be an empty Cons.
            (Term::Nil, Term::Cons(c)) | (Term::Cons(c), Term::Nil) => c.is_empty(),
            (Term::Bool(a), Term::Bool(b)) => a == b,
            (Term::Num(a), Term::Num(b)) => a == b,
            (Term::Str(a), Term::Str(b)) => a == b,
            (Term::Sym(a), Term::Sym(b)) => a == b,
            (Term::Key(a), Term::Key(b)) => a == b,
            (Term::Cons(a), Term::Cons(b)) => a == b,
            (Term::Hash(a), Term::Hash(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Term::Lambda(a), Term::Lambda(b)) => Rc::ptr_eq(a, b),
            (Term::Native(_, a), Term::Native(_, b)) => std::ptr::fn_addr_eq(*a, *b),
            (Term::FExpr(_, a), Term::FExpr(_, b)) => std::ptr::fn_addr_eq(*a, *b),
            (Term::Exception(a), Term::Exception(b)) => a == b,
            (Term::Env(a), Term::Env(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Unit => write!(f, "#<unit>"),
            Term::Nil => write!(f, "()"),
            Term::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Term::Num(n) => {
                // Whole numbers display without a trailing decimal
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Term::Str(s) => write!(f, "\"{}\"", s),
            Term::Sym(s) => write!(f, "{}", s),
            Term::Key(k) => write!(f, ":{}", k),
            Term::Cons(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Term::Hash(h) => {
                write!(f, "{{")?;
                for (i, (key, value)) in h.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, ":{} {}", key, value)?;
                }
                write!(f, "}}")
            }
            Term::Lambda(_) => write!(f, "#<lambda>"),
            Term::Native(name, _) => write!(f, "#<native:{}>", name),
            Term::FExpr(name, _) => write!(f, "#<operative:{}>", name),
            Term::Exception(e) => write!(f, "#<error: {}>", e.message),
            Term::Env(_) => write!(f, "#<environment>"),
        }
    }
}
