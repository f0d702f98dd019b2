// ABOUTME: Process operatives: every primitive defers to the scheduler

use crate::builtins::forms::{args_vec, host_with_args};
use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_ONE, ARITY_ONE, ARITY_TWO, ARITY_ZERO_OR_ONE};
use crate::kont::{
    Kont, Op, PROC_ALIVE, PROC_KILL, PROC_LIST, PROC_RECV, PROC_SELF, PROC_SEND, PROC_SPAWN,
};
use crate::term::Term;
use std::rc::Rc;

/// `(spawn target arg…)` — target is a named function or a code string; the
/// argument terms travel unevaluated and the child evaluates them against
/// its own snapshot. Returns the new PID immediately.
fn op_spawn(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let raw = args_vec(&args);
    if raw.is_empty() {
        return Err(EvalError::arity("spawn", ARITY_AT_LEAST_ONE, 0));
    }
    Ok(vec![Kont::new(
        Op::Host {
            action: PROC_SPAWN.to_string(),
            args: raw,
        },
        env.clone(),
    )])
}

/// `(send to-pid data)` — non-blocking enqueue; throws when the target does
/// not exist
fn op_send(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let raw = args_vec(&args);
    if raw.len() != 2 {
        return Err(EvalError::arity("send", ARITY_TWO, raw.len()));
    }
    Ok(host_with_args(PROC_SEND, vec![], args, env))
}

/// `(recv)` blocks until a message arrives; `(recv ms)` yields Nil after the
/// deadline. The result is `(from-pid data)`.
fn op_recv(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let raw = args_vec(&args);
    if raw.len() > 1 {
        return Err(EvalError::arity("recv", ARITY_ZERO_OR_ONE, raw.len()));
    }
    Ok(host_with_args(PROC_RECV, vec![], args, env))
}

/// `(self)` — the current PID
fn op_self(_args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    Ok(vec![Kont::host(PROC_SELF, vec![], env.clone())])
}

fn op_is_alive(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let raw = args_vec(&args);
    if raw.len() != 1 {
        return Err(EvalError::arity("is-alive?", ARITY_ONE, raw.len()));
    }
    Ok(host_with_args(PROC_ALIVE, vec![], args, env))
}

/// `(kill pid)` — marks the process dead and drops its queue and mailbox
fn op_kill(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let raw = args_vec(&args);
    if raw.len() != 1 {
        return Err(EvalError::arity("kill", ARITY_ONE, raw.len()));
    }
    Ok(host_with_args(PROC_KILL, vec![], args, env))
}

/// `(processes)` — PIDs of every live process
fn op_processes(_args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    Ok(vec![Kont::host(PROC_LIST, vec![], env.clone())])
}

pub fn register(env: &Rc<Environment>) {
    env.define("spawn", Term::FExpr("spawn", op_spawn));
    env.define("send", Term::FExpr("send", op_send));
    env.define("recv", Term::FExpr("recv", op_recv));
    env.define("self", Term::FExpr("self", op_self));
    env.define("is-alive?", Term::FExpr("is-alive?", op_is_alive));
    env.define("kill", Term::FExpr("kill", op_kill));
    env.define("processes", Term::FExpr("processes", op_processes));
}
