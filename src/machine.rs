// ABOUTME: The step loop: an explicit-stack continuation machine

use crate::env::Environment;
use crate::error::EvalError;
use crate::kont::{Kont, Op, SYS_ERROR, SYS_EXIT};
use crate::term::Term;
use log::trace;
use std::rc::Rc;

/// The abstract machine for one process. Owns the continuation queue (top of
/// the vec is the next step) and runs until it either surfaces a host
/// continuation or exhausts the queue. Deep user recursion consumes queue
/// entries, never host stack frames.
#[derive(Debug)]
pub struct Machine {
    queue: Vec<Kont>,
    ticks: u64,
    root: Rc<Environment>,
    /// Values returned with an empty queue; carried out on `SYS::exit`.
    residue: Vec<Term>,
}

impl Machine {
    pub fn new(root: Rc<Environment>) -> Self {
        Machine {
            queue: Vec::new(),
            ticks: 0,
            root,
            residue: Vec::new(),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn depth(&self) -> usize {
        self.queue.len()
    }

    /// Discards all pending work (used when a process is killed).
    pub fn clear(&mut self) {
        self.queue.clear();
        self.residue.clear();
    }

    /// The initial continuation for a term: self-evaluating terms return
    /// themselves, symbols return their binding (or throw), call expressions
    /// enter the EvalCons path, and exceptions propagate.
    pub fn evaluate_term(term: Term, env: &Rc<Environment>) -> Kont {
        match term {
            Term::Sym(ref name) => match env.lookup(name) {
                Term::Exception(e) if env.get(name).is_none() => {
                    Kont::throw(Term::Exception(e), env.clone())
                }
                value => Kont::ret(value, env.clone()),
            },
            Term::Cons(call) if !call.is_empty() => {
                Kont::new(Op::EvalCons { call }, env.clone())
            }
            // A bare empty call list is just the empty list
            Term::Cons(call) => Kont::ret(Term::from_cons(call), env.clone()),
            Term::Exception(_) => Kont::throw(term, env.clone()),
            other => Kont::ret(other, env.clone()),
        }
    }

    /// Runs the machine. `program` is in program order: its first element
    /// executes first (elements are pushed in reverse). Returns the host
    /// continuation that suspended the loop, or a synthetic `SYS::exit`
    /// carrying the final value once the queue is exhausted.
    pub fn run(&mut self, program: Vec<Kont>) -> Kont {
        for kont in program.into_iter().rev() {
            self.queue.push(kont);
        }
        loop {
            match self.queue.last() {
                None => {
                    let mut exit = Kont::host(SYS_EXIT, vec![], self.root.clone());
                    exit.stack = std::mem::take(&mut self.residue);
                    return exit;
                }
                Some(top) if top.is_host() => {
                    return self.queue.pop().unwrap_or_else(|| {
                        Kont::host(SYS_EXIT, vec![], self.root.clone())
                    });
                }
                Some(_) => self.step(),
            }
        }
    }

    /// Pushes a value onto the stack of the continuation now on top. With an
    /// empty queue the value is the machine's final result.
    fn return_value(&mut self, value: Term) {
        match self.queue.last_mut() {
            Some(top) => top.stack.push(value),
            None => self.residue.push(value),
        }
    }

    /// Unwinds the queue, discarding partial work, until a Catch is on top;
    /// the exception becomes that catch's sole stack value. An empty queue
    /// surfaces the exception as `SYS::error`.
    fn unwind(&mut self, exception: Term, env: Rc<Environment>) {
        loop {
            match self.queue.last_mut() {
                Some(top) if matches!(top.op, Op::Catch { .. }) => {
                    top.stack.clear();
                    top.stack.push(exception);
                    return;
                }
                Some(_) => {
                    self.queue.pop();
                }
                None => {
                    let mut error = Kont::host(SYS_ERROR, vec![], env);
                    error.stack.push(exception);
                    self.queue.push(error);
                    return;
                }
            }
        }
    }

    fn throw_error(&mut self, error: EvalError, env: Rc<Environment>) {
        self.unwind(error.into_exception(), env);
    }

    /// Executes the continuation on top of the queue. Pushes use LIFO
    /// semantics: whatever is pushed last runs first.
    fn step(&mut self) {
        let Some(mut kont) = self.queue.pop() else {
            return;
        };
        self.ticks += 1;
        trace!(
            "tick {} op {} depth {} stack {}",
            self.ticks,
            kont.op_name(),
            self.queue.len(),
            kont.stack.len()
        );

        match kont.op {
            // run() returns host continuations before stepping; if one is
            // ever seen here, put it back so the outer loop can surface it.
            Op::Host { action, args } => {
                kont.op = Op::Host { action, args };
                self.queue.push(kont);
            }

            Op::Throw { exception } => self.unwind(exception, kont.env),

            Op::Catch { handler } => match kont.stack.pop() {
                Some(value @ Term::Exception(_)) => {
                    let mut apply = Kont::new(
                        Op::ApplyApplicative { callable: handler },
                        kont.env,
                    );
                    apply.stack.push(value);
                    self.queue.push(apply);
                }
                Some(value) => self.return_value(value),
                None => self.throw_error(
                    EvalError::Internal("catch reached with no value".into()),
                    kont.env,
                ),
            },

            Op::Define { name } => match kont.stack.pop() {
                Some(value) => {
                    kont.env.define(name, value);
                    self.return_value(Term::Unit);
                }
                None => self.throw_error(
                    EvalError::Internal("define reached with no value".into()),
                    kont.env,
                ),
            },

            Op::Assign { name } => match kont.stack.pop() {
                Some(value) => match kont.env.assign(&name, value) {
                    Ok(()) => self.return_value(Term::Unit),
                    Err(e) => self.throw_error(e, kont.env),
                },
                None => self.throw_error(
                    EvalError::Internal("set! reached with no value".into()),
                    kont.env,
                ),
            },

            Op::Return { value } => self.return_value(value),

            Op::IfElse { cond, then, alt } => match kont.stack.pop() {
                Some(value) => {
                    let branch = if value.truthy() { &then } else { &alt };
                    // Shortcut: a branch that is the very condition term has
                    // already been evaluated; return its value directly.
                    if branch.same_node(&cond) {
                        self.return_value(value);
                    } else {
                        let next = Self::evaluate_term(branch.clone(), &kont.env);
                        self.queue.push(next);
                    }
                }
                None => self.throw_error(
                    EvalError::Internal("if reached with no condition value".into()),
                    kont.env,
                ),
            },

            Op::EvalExpr { term } => {
                let next = Self::evaluate_term(term, &kont.env);
                self.queue.push(next);
            }

            Op::EvalTos => match kont.stack.pop() {
                Some(term) => {
                    let next = Self::evaluate_term(term, &kont.env);
                    self.queue.push(next);
                }
                None => self.throw_error(
                    EvalError::Internal("eval reached with no value".into()),
                    kont.env,
                ),
            },

            Op::EvalCons { call } => {
                let Some(head) = call.first().cloned() else {
                    self.return_value(Term::Nil);
                    return;
                };
                let args = Term::from_cons(call.rest());
                self.queue
                    .push(Kont::new(Op::ApplyExpr { args }, kont.env.clone()));
                let next = Self::evaluate_term(head, &kont.env);
                self.queue.push(next);
            }

            Op::EvalConsRest { rest } => {
                let Some(first) = rest.first().cloned() else {
                    // Nothing left: just relay what accumulated here
                    for value in kont.stack {
                        self.return_value(value);
                    }
                    return;
                };
                let tail = rest.rest();
                if !tail.is_empty() {
                    self.queue.push(Kont::new(
                        Op::EvalConsRest { rest: tail },
                        kont.env.clone(),
                    ));
                }
                // Forward already-evaluated values so they accumulate on the
                // stack of the applicative below
                for value in kont.stack {
                    self.return_value(value);
                }
                let next = Self::evaluate_term(first, &kont.env);
                self.queue.push(next);
            }

            Op::ApplyExpr { args } => match kont.stack.pop() {
                Some(callable @ Term::FExpr(..)) => {
                    self.queue
                        .push(Kont::new(Op::ApplyOperative { callable, args }, kont.env));
                }
                Some(callable @ (Term::Lambda(_) | Term::Native(..))) => {
                    self.queue.push(Kont::new(
                        Op::ApplyApplicative { callable },
                        kont.env.clone(),
                    ));
                    if let Term::Cons(rest) = args {
                        if !rest.is_empty() {
                            self.queue
                                .push(Kont::new(Op::EvalConsRest { rest }, kont.env));
                        }
                    }
                }
                Some(other) => self.throw_error(
                    EvalError::Type {
                        function: "apply".into(),
                        expected: "callable".into(),
                        actual: other.type_name().into(),
                    },
                    kont.env,
                ),
                None => self.throw_error(
                    EvalError::Internal("apply reached with no callable".into()),
                    kont.env,
                ),
            },

            Op::ApplyOperative { callable, args } => match callable {
                Term::FExpr(_, operative) => match operative(args, &kont.env) {
                    Ok(konts) => {
                        for k in konts {
                            self.queue.push(k);
                        }
                    }
                    Err(e) => self.throw_error(e, kont.env),
                },
                other => self.throw_error(
                    EvalError::Internal(format!(
                        "operative application of a {}",
                        other.type_name()
                    )),
                    kont.env,
                ),
            },

            Op::ApplyApplicative { callable } => match callable {
                Term::Native(_, native) => match native(&kont.stack, &kont.env) {
                    Ok(value) => self.return_value(value),
                    Err(e) => self.throw_error(e, kont.env),
                },
                Term::Lambda(lambda) => {
                    match lambda.env.derive(&lambda.params, kont.stack) {
                        Ok(frame) => {
                            self.queue.push(Kont::eval(lambda.body.clone(), frame));
                        }
                        Err(e) => self.throw_error(e, kont.env),
                    }
                }
                other => self.throw_error(
                    EvalError::Internal(format!(
                        "applicative application of a {}",
                        other.type_name()
                    )),
                    kont.env,
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kont::SYS_ERROR;

    fn run_term(term: Term, env: &Rc<Environment>) -> Kont {
        let mut machine = Machine::new(env.clone());
        let start = Machine::evaluate_term(term, env);
        machine.run(vec![start])
    }

    fn exit_value(host: Kont) -> Term {
        assert_eq!(host.action(), Some(SYS_EXIT));
        host.stack.into_iter().last().unwrap_or(Term::Unit)
    }

    #[test]
    fn test_self_evaluating() {
        let env = Environment::new();
        assert_eq!(exit_value(run_term(Term::Num(42.0), &env)), Term::Num(42.0));
        assert_eq!(
            exit_value(run_term(Term::Str("hi".into()), &env)),
            Term::Str("hi".into())
        );
        assert_eq!(exit_value(run_term(Term::Nil, &env)), Term::Nil);
        assert_eq!(
            exit_value(run_term(Term::Key("k".into()), &env)),
            Term::Key("k".into())
        );
    }

    #[test]
    fn test_symbol_lookup() {
        let env = Environment::new();
        env.define("x", Term::Num(7.0));
        assert_eq!(
            exit_value(run_term(Term::Sym("x".into()), &env)),
            Term::Num(7.0)
        );
    }

    #[test]
    fn test_undefined_symbol_surfaces_as_error() {
        let env = Environment::new();
        let host = run_term(Term::Sym("missing".into()), &env);
        assert_eq!(host.action(), Some(SYS_ERROR));
        match host.stack.last() {
            Some(Term::Exception(e)) => assert!(e.message.contains("missing")),
            other => panic!("expected exception on stack, got {:?}", other),
        }
    }

    #[test]
    fn test_native_call_with_args_in_order() {
        fn pack(args: &[Term], _env: &Rc<Environment>) -> Result<Term, EvalError> {
            Ok(Term::list(args.to_vec()))
        }
        let env = Environment::new();
        env.define("pack", Term::Native("pack", pack));
        let call = Term::list(vec![
            Term::Sym("pack".into()),
            Term::Num(1.0),
            Term::Num(2.0),
            Term::Num(3.0),
        ]);
        let value = exit_value(run_term(call, &env));
        assert_eq!(
            value,
            Term::list(vec![Term::Num(1.0), Term::Num(2.0), Term::Num(3.0)])
        );
    }

    #[test]
    fn test_calling_a_number_throws() {
        let env = Environment::new();
        let call = Term::list(vec![Term::Num(42.0), Term::Num(1.0)]);
        let host = run_term(call, &env);
        assert_eq!(host.action(), Some(SYS_ERROR));
    }

    #[test]
    fn test_host_continuation_suspends() {
        let env = Environment::new();
        let mut machine = Machine::new(env.clone());
        // The returned value accumulates on the host's operand stack before
        // the machine suspends on it
        let host = machine.run(vec![
            Kont::ret(Term::Num(9.0), env.clone()),
            Kont::host("IO::print", vec![], env.clone()),
        ]);
        assert_eq!(host.action(), Some("IO::print"));
        assert_eq!(host.stack, vec![Term::Num(9.0)]);
        // Resuming with a value drains the queue to a normal exit
        let done = machine.run(vec![Kont::ret(Term::Unit, env)]);
        assert_eq!(done.action(), Some(SYS_EXIT));
    }

    #[test]
    fn test_exhausted_queue_carries_final_value() {
        let env = Environment::new();
        let mut machine = Machine::new(env.clone());
        let host = machine.run(vec![Kont::ret(Term::Num(5.0), env)]);
        assert_eq!(exit_value(host), Term::Num(5.0));
    }

    #[test]
    fn test_ticks_increase() {
        let env = Environment::new();
        let mut machine = Machine::new(env.clone());
        machine.run(vec![Kont::ret(Term::Nil, env)]);
        assert!(machine.ticks() > 0);
    }
}
