// ABOUTME: Core language operatives: binding, branching, quoting, exceptions

use crate::env::Environment;
use crate::error::{EvalError, ARITY_AT_LEAST_ONE, ARITY_AT_LEAST_TWO, ARITY_ONE, ARITY_TWO, ARITY_TWO_OR_THREE};
use crate::kont::{Kont, Op, SYS_INCLUDE};
use crate::term::{LambdaTerm, Term};
use std::rc::Rc;

/// Raw operand list of an operative as a vec (Nil reads as no arguments)
pub(crate) fn args_vec(args: &Term) -> Vec<Term> {
    match args {
        Term::Cons(c) => c.to_vec(),
        _ => Vec::new(),
    }
}

/// Several body forms run in sequence; a single form stands alone
pub(crate) fn begin_wrap(forms: &[Term]) -> Term {
    match forms {
        [single] => single.clone(),
        _ => {
            let mut items = vec![Term::Sym("begin".to_string())];
            items.extend_from_slice(forms);
            Term::list(items)
        }
    }
}

fn sym_name(term: &Term, function: &str) -> Result<String, EvalError> {
    match term {
        Term::Sym(name) => Ok(name.clone()),
        other => Err(EvalError::type_err(function, "symbol", other)),
    }
}

fn param_names(term: &Term, function: &str) -> Result<Vec<String>, EvalError> {
    match term {
        Term::Nil => Ok(Vec::new()),
        Term::Cons(list) => {
            let mut params = Vec::new();
            for item in list.iter() {
                params.push(sym_name(item, function)?);
            }
            Ok(params)
        }
        other => Err(EvalError::type_err(function, "list", other)),
    }
}

fn lambda_term(params: Vec<String>, body: Term, env: &Rc<Environment>) -> Term {
    Term::Lambda(Rc::new(LambdaTerm {
        params,
        body,
        env: env.clone(),
    }))
}

/// A host suspension fed by evaluating its operands: the host continuation
/// sits below an EvalConsRest chain, so evaluated values accumulate on its
/// operand stack in source order.
pub(crate) fn host_with_args(
    action: &str,
    payload: Vec<Term>,
    args: Term,
    env: &Rc<Environment>,
) -> Vec<Kont> {
    let mut konts = vec![Kont::host(action, payload, env.clone())];
    if let Term::Cons(rest) = args {
        if !rest.is_empty() {
            konts.push(Kont::new(Op::EvalConsRest { rest }, env.clone()));
        }
    }
    konts
}

/// `(def name value)` — the value is evaluated, then bound
fn op_def(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() != 2 {
        return Err(EvalError::arity("def", ARITY_TWO, items.len()));
    }
    let name = sym_name(&items[0], "def")?;
    Ok(vec![
        Kont::new(Op::Define { name }, env.clone()),
        Kont::eval(items[1].clone(), env.clone()),
    ])
}

/// `(defun (name params…) body…)` — sugar for binding a lambda
fn op_defun(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() < 2 {
        return Err(EvalError::arity("defun", ARITY_AT_LEAST_TWO, items.len()));
    }
    let signature = match &items[0] {
        Term::Cons(c) if !c.is_empty() => c.to_vec(),
        other => return Err(EvalError::type_err("defun", "list", other)),
    };
    let name = sym_name(&signature[0], "defun")?;
    let mut params = Vec::new();
    for param in &signature[1..] {
        params.push(sym_name(param, "defun")?);
    }
    let lambda = lambda_term(params, begin_wrap(&items[1..]), env);
    Ok(vec![
        Kont::new(Op::Define { name }, env.clone()),
        Kont::ret(lambda, env.clone()),
    ])
}

/// `(lambda (params…) body…)` — captures the surrounding environment as-is;
/// the fresh frame appears at call time via derive
fn op_lambda(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() < 2 {
        return Err(EvalError::arity("lambda", ARITY_AT_LEAST_TWO, items.len()));
    }
    let params = param_names(&items[0], "lambda")?;
    let lambda = lambda_term(params, begin_wrap(&items[1..]), env);
    Ok(vec![Kont::ret(lambda, env.clone())])
}

/// `(set! name value)` — rebinds in the scope that defined the name
fn op_set(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() != 2 {
        return Err(EvalError::arity("set!", ARITY_TWO, items.len()));
    }
    let name = sym_name(&items[0], "set!")?;
    Ok(vec![
        Kont::new(Op::Assign { name }, env.clone()),
        Kont::eval(items[1].clone(), env.clone()),
    ])
}

/// `(quote x)` — returns the argument unevaluated
fn op_quote(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() != 1 {
        return Err(EvalError::arity("quote", ARITY_ONE, items.len()));
    }
    Ok(vec![Kont::ret(items[0].clone(), env.clone())])
}

/// `(eval x)` — evaluates x to a term, then evaluates that term
fn op_eval(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() != 1 {
        return Err(EvalError::arity("eval", ARITY_ONE, items.len()));
    }
    Ok(vec![
        Kont::new(Op::EvalTos, env.clone()),
        Kont::eval(items[0].clone(), env.clone()),
    ])
}

/// `(if cond then else?)`
fn op_if(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() < 2 || items.len() > 3 {
        return Err(EvalError::arity("if", ARITY_TWO_OR_THREE, items.len()));
    }
    let cond = items[0].clone();
    let then = items[1].clone();
    let alt = items.get(2).cloned().unwrap_or(Term::Nil);
    Ok(vec![
        Kont::new(Op::IfElse { cond: cond.clone(), then, alt }, env.clone()),
        Kont::eval(cond, env.clone()),
    ])
}

/// `(cond (test expr…)…)` — desugars into nested ifs
fn op_cond(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let clauses = args_vec(&args);
    let mut desugared = Term::Nil;
    for clause in clauses.iter().rev() {
        let parts = match clause {
            Term::Cons(c) if !c.is_empty() => c.to_vec(),
            other => return Err(EvalError::type_err("cond", "clause list", other)),
        };
        let test = parts[0].clone();
        // A bare test clause yields the test's own value; the branch term is
        // the very condition term, so it is not evaluated twice
        let then = if parts.len() == 1 {
            test.clone()
        } else {
            begin_wrap(&parts[1..])
        };
        desugared = Term::list(vec![Term::Sym("if".to_string()), test, then, desugared]);
    }
    Ok(vec![Kont::eval(desugared, env.clone())])
}

/// `(let ((name value)…) body…)` — desugars to an immediate lambda call;
/// the lambda value goes in head position directly, so shadowed names
/// cannot change its meaning
fn op_let(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.is_empty() {
        return Err(EvalError::arity("let", ARITY_AT_LEAST_ONE, 0));
    }
    let bindings = match &items[0] {
        Term::Nil => Vec::new(),
        Term::Cons(c) => c.to_vec(),
        other => return Err(EvalError::type_err("let", "binding list", other)),
    };

    let mut names = Vec::new();
    let mut values = Vec::new();
    for binding in bindings {
        let pair = match &binding {
            Term::Cons(c) if c.len() == 2 => c.to_vec(),
            other => return Err(EvalError::type_err("let", "(name value) pair", other)),
        };
        names.push(sym_name(&pair[0], "let")?);
        values.push(pair[1].clone());
    }

    let lambda = lambda_term(names, begin_wrap(&items[1..]), env);
    let mut call = vec![lambda];
    call.extend(values);
    Ok(vec![Kont::eval(Term::list(call), env.clone())])
}

/// `(begin e…)` — each expression in order; the value is the last one.
/// Intermediate values land on the following EvalExpr's stack and vanish
/// with it.
fn op_begin(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.is_empty() {
        return Ok(vec![Kont::ret(Term::Nil, env.clone())]);
    }
    Ok(items
        .into_iter()
        .rev()
        .map(|term| Kont::eval(term, env.clone()))
        .collect())
}

/// `(&& a b)` — evaluates a once; a falsy a is the result, otherwise b
fn op_and(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() != 2 {
        return Err(EvalError::arity("&&", ARITY_TWO, items.len()));
    }
    let lhs = items[0].clone();
    let rhs = items[1].clone();
    Ok(vec![
        Kont::new(
            Op::IfElse {
                cond: lhs.clone(),
                then: rhs,
                alt: lhs.clone(),
            },
            env.clone(),
        ),
        Kont::eval(lhs, env.clone()),
    ])
}

/// `(|| a b)` — evaluates a once; a truthy a is the result, otherwise b
fn op_or(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() != 2 {
        return Err(EvalError::arity("||", ARITY_TWO, items.len()));
    }
    let lhs = items[0].clone();
    let rhs = items[1].clone();
    Ok(vec![
        Kont::new(
            Op::IfElse {
                cond: lhs.clone(),
                then: lhs.clone(),
                alt: rhs,
            },
            env.clone(),
        ),
        Kont::eval(lhs, env.clone()),
    ])
}

/// `(try body (catch e handler…))` — installs the handler under the body's
/// evaluation; the handler receives the exception as its single argument
fn op_try(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() != 2 {
        return Err(EvalError::arity("try", ARITY_TWO, items.len()));
    }
    let clause = match &items[1] {
        Term::Cons(c) if c.len() >= 3 => c.to_vec(),
        other => return Err(EvalError::type_err("try", "(catch name body) clause", other)),
    };
    match &clause[0] {
        Term::Sym(s) if s == "catch" => {}
        other => return Err(EvalError::type_err("try", "catch clause", other)),
    }
    let param = sym_name(&clause[1], "catch")?;
    let handler = lambda_term(vec![param], begin_wrap(&clause[2..]), env);

    Ok(vec![
        Kont::new(Op::Catch { handler }, env.clone()),
        Kont::eval(items[0].clone(), env.clone()),
    ])
}

/// `(include path)` — a host concern: resolution and circularity tracking
/// live in the runtime
fn op_include(args: Term, env: &Rc<Environment>) -> Result<Vec<Kont>, EvalError> {
    let items = args_vec(&args);
    if items.len() != 1 {
        return Err(EvalError::arity("include", ARITY_ONE, items.len()));
    }
    Ok(host_with_args(SYS_INCLUDE, vec![], args, env))
}

pub fn register(env: &Rc<Environment>) {
    env.define("def", Term::FExpr("def", op_def));
    env.define("defun", Term::FExpr("defun", op_defun));
    env.define("lambda", Term::FExpr("lambda", op_lambda));
    env.define("set!", Term::FExpr("set!", op_set));
    env.define("quote", Term::FExpr("quote", op_quote));
    env.define("eval", Term::FExpr("eval", op_eval));
    env.define("if", Term::FExpr("if", op_if));
    env.define("?:", Term::FExpr("?:", op_if));
    env.define("cond", Term::FExpr("cond", op_cond));
    env.define("let", Term::FExpr("let", op_let));
    env.define("begin", Term::FExpr("begin", op_begin));
    env.define("&&", Term::FExpr("&&", op_and));
    env.define("and", Term::FExpr("and", op_and));
    env.define("||", Term::FExpr("||", op_or));
    env.define("or", Term::FExpr("or", op_or));
    env.define("try", Term::FExpr("try", op_try));
    env.define("include", Term::FExpr("include", op_include));
}
