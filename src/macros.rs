// ABOUTME: Macro table and the expansion pass that runs between parse and evaluation

use crate::env::Environment;
use crate::error::EvalError;
use crate::kont::{SYS_ERROR, SYS_EXIT};
use crate::machine::Machine;
use crate::term::Term;
use std::collections::HashMap;
use std::rc::Rc;

/// Hard cap on iterative re-expansion of a single form
pub const EXPANSION_DEPTH_CAP: usize = 100;

#[derive(Debug, Clone)]
struct MacroDef {
    params: Vec<String>,
    body: Term,
}

/// Per-process macro table. Macros rewrite the term tree before evaluation;
/// fexprs act at run time — the two never mix.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    macros: HashMap<String, MacroDef>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        MacroRegistry {
            macros: HashMap::new(),
        }
    }

    pub fn define(&mut self, name: String, params: Vec<String>, body: Term) {
        self.macros.insert(name, MacroDef { params, body });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Runs the expansion pass over one top-level term. A `defmacro` form is
    /// consumed here (registered, nothing left to evaluate); anything else
    /// comes back rewritten and ready for the machine.
    pub fn expand(&mut self, term: Term, env: &Rc<Environment>) -> Result<Option<Term>, EvalError> {
        if let Some((name, params, body)) = parse_defmacro(&term)? {
            self.define(name, params, body);
            return Ok(None);
        }
        self.expand_term(term, env).map(Some)
    }

    /// Rewrites every macro call in the tree. Expansion at each node is
    /// iterative so a macro may expand into another macro call, with a hard
    /// depth cap to catch self-expanding definitions.
    pub fn expand_term(&self, term: Term, env: &Rc<Environment>) -> Result<Term, EvalError> {
        let mut current = term;
        let mut depth = 0;

        loop {
            let call = match &current {
                Term::Cons(c) if !c.is_empty() => c.clone(),
                _ => return Ok(current),
            };
            let head = match call.first() {
                Some(Term::Sym(name)) => name.clone(),
                _ => break,
            };
            if head == "quote" {
                // Quoted trees are data; leave them untouched
                return Ok(current);
            }
            let Some(def) = self.macros.get(&head).cloned() else {
                break;
            };

            depth += 1;
            if depth > EXPANSION_DEPTH_CAP {
                return Err(EvalError::runtime(format!(
                    "macro expansion depth exceeded for '{}'",
                    head
                )));
            }
            current = apply_macro(&def, call.rest().to_vec(), env)?;
        }

        // No macro at the head; expand the children
        match current {
            Term::Cons(c) => {
                let mut items = Vec::with_capacity(c.len());
                for item in c.iter() {
                    items.push(self.expand_term(item.clone(), env)?);
                }
                Ok(Term::list(items))
            }
            other => Ok(other),
        }
    }
}

/// Recognizes `(defmacro name (params…) body…)`
fn parse_defmacro(term: &Term) -> Result<Option<(String, Vec<String>, Term)>, EvalError> {
    let Term::Cons(call) = term else {
        return Ok(None);
    };
    match call.first() {
        Some(Term::Sym(s)) if s == "defmacro" => {}
        _ => return Ok(None),
    }

    let parts = call.rest().to_vec();
    if parts.len() < 3 {
        return Err(EvalError::runtime(
            "defmacro: expected name, params, and body",
        ));
    }

    let name = match &parts[0] {
        Term::Sym(n) => n.clone(),
        other => {
            return Err(EvalError::type_err("defmacro", "symbol", other));
        }
    };

    let params = match &parts[1] {
        Term::Nil => Vec::new(),
        Term::Cons(list) => {
            let mut params = Vec::new();
            for p in list.iter() {
                match p {
                    Term::Sym(s) => params.push(s.clone()),
                    other => {
                        return Err(EvalError::type_err("defmacro", "symbol", other));
                    }
                }
            }
            params
        }
        other => return Err(EvalError::type_err("defmacro", "list", other)),
    };

    // Several body forms run in sequence; the last one is the expansion
    let body = if parts.len() > 3 {
        let mut forms = vec![Term::Sym("begin".to_string())];
        forms.extend_from_slice(&parts[2..]);
        Term::list(forms)
    } else {
        parts[2].clone()
    };

    Ok(Some((name, params, body)))
}

/// Evaluates a macro body with the raw (unevaluated) arguments bound to its
/// parameters. Runs on its own machine; macro bodies are list surgery and
/// may not reach for host effects.
fn apply_macro(def: &MacroDef, args: Vec<Term>, env: &Rc<Environment>) -> Result<Term, EvalError> {
    if def.params.len() != args.len() {
        return Err(EvalError::arity(
            "macro",
            def.params.len().to_string(),
            args.len(),
        ));
    }
    let frame = env.capture();
    for (param, arg) in def.params.iter().zip(args.into_iter()) {
        frame.define(param.clone(), arg);
    }
    run_pure(def.body.clone(), &frame)
}

/// Runs a term to a value on a fresh machine, rejecting every suspension
/// other than normal completion.
pub fn run_pure(term: Term, env: &Rc<Environment>) -> Result<Term, EvalError> {
    let mut machine = Machine::new(env.clone());
    let start = Machine::evaluate_term(term, env);
    let host = machine.run(vec![start]);
    match host.action() {
        Some(SYS_EXIT) => Ok(host.stack.into_iter().last().unwrap_or(Term::Unit)),
        Some(SYS_ERROR) => match host.stack.into_iter().last() {
            Some(Term::Exception(e)) => Err(EvalError::from_exception(&e)),
            _ => Err(EvalError::Internal("error exit with no exception".into())),
        },
        Some(action) => Err(EvalError::runtime(format!(
            "host action {} not available during macro expansion",
            action
        ))),
        None => Err(EvalError::Internal("machine returned a non-host step".into())),
    }
}

/// Convenience used by tests and the runtime: expand one parsed program
/// against a registry, dropping consumed definitions.
pub fn expand_program(
    registry: &mut MacroRegistry,
    terms: Vec<Term>,
    env: &Rc<Environment>,
) -> Result<Vec<Term>, EvalError> {
    let mut out = Vec::with_capacity(terms.len());
    for term in terms {
        if let Some(expanded) = registry.expand(term, env)? {
            out.push(expanded);
        }
    }
    Ok(out)
}
