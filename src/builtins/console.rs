// ABOUTME: Console operatives: every I/O is a host suspension

use crate::builtins::forms::host_with_args;
use crate::env::Environment;
use crate::error::EvalError;
use crate::kont::{Kont, IO_PRINT, IO_READLINE, IO_SAY, AI_REPL};
use crate::term::Term;
use std::rc::Rc;

/// `(print v…)` — writes the evaluated operands to stdout
fn op_print(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    Ok(host_with_args(IO_PRINT, vec![], args, env))
}

/// `(say v…)` — like print, with a trailing newline
fn op_say(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    Ok(host_with_args(IO_SAY, vec![], args, env))
}

/// `(readline)` — reads one line; Nil on end of input
fn op_readline(_args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    Ok(vec![Kont::host(IO_READLINE, vec![], env.clone())])
}

/// `(agent/repl prompt)` — hands the prompt to the configured external agent
/// and evaluates whatever it answers
fn op_agent_repl(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    Ok(host_with_args(AI_REPL, vec![], args, env))
}

pub fn register(env: &Rc<Environment>) {
    env.define("print", Term::FExpr("print", op_print));
    env.define("say", Term::FExpr("say", op_say));
    env.define("readline", Term::FExpr("readline", op_readline));
    env.define("agent/repl", Term::FExpr("agent/repl", op_agent_repl));
}
