// ABOUTME: Environment module for managing lexical bindings and scope chains

use crate::error::EvalError;
use crate::term::Term;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Term>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates a new root environment with no parent
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    fn with_parent(parent: Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent),
        })
    }

    /// Defines a binding in THIS scope; never walks the parent chain
    pub fn define(&self, name: impl Into<String>, value: Term) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Looks up a symbol in this scope and parent scopes recursively
    pub fn get(&self, name: &str) -> Option<Term> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        if let Some(ref parent) = self.parent {
            return parent.get(name);
        }
        None
    }

    /// Like `get`, but a missing symbol comes back as an exception term
    /// rather than an optional; lookup failures never panic.
    pub fn lookup(&self, name: &str) -> Term {
        match self.get(name) {
            Some(value) => value,
            None => Term::exception(format!("undefined symbol: {}", name), None),
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        if self.bindings.borrow().contains_key(name) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.exists(name),
            None => false,
        }
    }

    /// Rebinds an existing symbol, walking the chain to the scope that
    /// defined it (`set!` semantics).
    pub fn assign(&self, name: &str, value: Term) -> Result<(), EvalError> {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(EvalError::Lookup(name.to_string())),
        }
    }

    /// Removes a binding from THIS scope only; returns whether it existed
    pub fn delete(&self, name: &str) -> bool {
        self.bindings.borrow_mut().remove(name).is_some()
    }

    /// A fresh empty child whose parent is this environment. Closures
    /// capture a chain node, not a copy, so they observe later definitions
    /// in the enclosing scope.
    pub fn capture(self: &Rc<Self>) -> Rc<Environment> {
        Environment::with_parent(self.clone())
    }

    /// A child with one binding per parameter, used at call time. When an
    /// exception is bound, `<param>.message` and `<param>.payload` are also
    /// installed so catch handlers can read them as plain symbols.
    pub fn derive(
        self: &Rc<Self>,
        params: &[String],
        args: Vec<Term>,
    ) -> Result<Rc<Environment>, EvalError> {
        if params.len() != args.len() {
            return Err(EvalError::arity(
                "call",
                params.len().to_string(),
                args.len(),
            ));
        }
        let child = Environment::with_parent(self.clone());
        for (param, arg) in params.iter().zip(args.into_iter()) {
            if let Term::Exception(e) = &arg {
                child.define(format!("{}.message", param), Term::Str(e.message.clone()));
                child.define(
                    format!("{}.payload", param),
                    e.payload.clone().unwrap_or(Term::Nil),
                );
            }
            child.define(param.clone(), arg);
        }
        Ok(child)
    }

    /// Number of scopes from here to the root, inclusive
    pub fn depth(&self) -> usize {
        match &self.parent {
            Some(parent) => parent.depth() + 1,
            None => 1,
        }
    }

    /// Names bound in THIS scope
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Flattens every binding visible from this scope into a fresh root.
    /// Used when spawning a process: the child sees the parent's world as it
    /// was, and neither side observes the other's later changes. Tables are
    /// deep-copied at the boundary.
    pub fn snapshot(&self) -> Rc<Environment> {
        let root = Environment::new();
        self.copy_into(&root);
        root
    }

    fn copy_into(&self, target: &Rc<Environment>) {
        // Parents first so local bindings shadow them
        if let Some(parent) = &self.parent {
            parent.copy_into(target);
        }
        for (name, value) in self.bindings.borrow().iter() {
            target.define(name.clone(), value.deep_copy());
        }
    }
}
