// ABOUTME: Continuation types: one queued pending step of execution each

use crate::env::Environment;
use crate::term::{Cons, Term};
use std::rc::Rc;

// ===== Host action names =====
// The machine suspends on these; their meaning lives in the dispatcher.
pub const SYS_EXIT: &str = "SYS::exit";
pub const SYS_ERROR: &str = "SYS::error";
pub const SYS_INCLUDE: &str = "SYS::include";
pub const IO_PRINT: &str = "IO::print";
pub const IO_SAY: &str = "IO::say";
pub const IO_READLINE: &str = "IO::readline";
pub const IO_REPL: &str = "IO::repl";
pub const AI_REPL: &str = "AI::repl";
pub const PROC_SPAWN: &str = "process::spawn";
pub const PROC_SEND: &str = "process::send";
pub const PROC_RECV: &str = "process::recv";
pub const PROC_SELF: &str = "process::self";
pub const PROC_ALIVE: &str = "process::is-alive";
pub const PROC_KILL: &str = "process::kill";
pub const PROC_LIST: &str = "process::list";

/// The step-specific payload of a continuation.
#[derive(Debug, Clone)]
pub enum Op {
    /// Suspension point: the machine hands control to the host dispatcher.
    Host { action: String, args: Vec<Term> },
    /// Propagate an exception, unwinding until a Catch is found.
    Throw { exception: Term },
    /// Establishes an exception handler for whatever is delivered to it.
    Catch { handler: Term },
    /// Choose a branch based on the value delivered to this continuation.
    IfElse { cond: Term, then: Term, alt: Term },
    /// Bind the delivered value to a name in the local scope.
    Define { name: String },
    /// Rebind an existing name, walking the scope chain (`set!`).
    Assign { name: String },
    /// Push the carried value onto the next continuation's stack.
    Return { value: Term },
    /// Generic "evaluate this term" entry.
    EvalExpr { term: Term },
    /// Evaluate the term delivered to this continuation.
    EvalTos,
    /// Evaluate a call expression: head, then arguments.
    EvalCons { call: Cons },
    /// Walk successive argument terms, relaying evaluated values downward.
    EvalConsRest { rest: Cons },
    /// The callable has been delivered; decide how to apply it to `args`.
    ApplyExpr { args: Term },
    /// Invoke a fexpr with its unevaluated argument list.
    ApplyOperative { callable: Term, args: Term },
    /// Invoke a lambda or native with pre-evaluated args on the stack.
    ApplyApplicative { callable: Term },
}

/// A single queued pending step. Every continuation owns an operand stack
/// and an environment reference; values only move between continuations via
/// explicit pushes onto the next stack.
#[derive(Debug, Clone)]
pub struct Kont {
    pub stack: Vec<Term>,
    pub env: Rc<Environment>,
    pub op: Op,
}

impl Kont {
    pub fn new(op: Op, env: Rc<Environment>) -> Self {
        Kont {
            stack: Vec::new(),
            env,
            op,
        }
    }

    pub fn ret(value: Term, env: Rc<Environment>) -> Self {
        Kont::new(Op::Return { value }, env)
    }

    pub fn eval(term: Term, env: Rc<Environment>) -> Self {
        Kont::new(Op::EvalExpr { term }, env)
    }

    pub fn throw(exception: Term, env: Rc<Environment>) -> Self {
        Kont::new(Op::Throw { exception }, env)
    }

    pub fn host(action: &str, args: Vec<Term>, env: Rc<Environment>) -> Self {
        Kont::new(
            Op::Host {
                action: action.to_string(),
                args,
            },
            env,
        )
    }

    pub fn is_host(&self) -> bool {
        matches!(self.op, Op::Host { .. })
    }

    /// The action name when this is a host continuation.
    pub fn action(&self) -> Option<&str> {
        match &self.op {
            Op::Host { action, .. } => Some(action.as_str()),
            _ => None,
        }
    }

    /// Short tag for step tracing.
    pub fn op_name(&self) -> &'static str {
        match &self.op {
            Op::Host { .. } => "Host",
            Op::Throw { .. } => "Throw",
            Op::Catch { .. } => "Catch",
            Op::IfElse { .. } => "IfElse",
            Op::Define { .. } => "Define",
            Op::Assign { .. } => "Assign",
            Op::Return { .. } => "Return",
            Op::EvalExpr { .. } => "EvalExpr",
            Op::EvalTos => "EvalTOS",
            Op::EvalCons { .. } => "EvalCons",
            Op::EvalConsRest { .. } => "EvalConsRest",
            Op::ApplyExpr { .. } => "ApplyExpr",
            Op::ApplyOperative { .. } => "ApplyOperative",
            Op::ApplyApplicative { .. } => "ApplyApplicative",
        }
    }
}
