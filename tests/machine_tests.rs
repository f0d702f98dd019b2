// ABOUTME: End-to-end machine tests: evaluation, closures, control flow, exceptions

use pretty_assertions::assert_eq;
use slight::config::RuntimeConfig;
use slight::error::{EvalError, SlightError};
use slight::runtime::Runtime;
use slight::term::Term;

fn eval(source: &str) -> Term {
    Runtime::new(RuntimeConfig::default())
        .expect("runtime")
        .eval_source(source)
        .expect("eval")
}

fn eval_err(source: &str) -> EvalError {
    match Runtime::new(RuntimeConfig::default())
        .expect("runtime")
        .eval_source(source)
    {
        Err(SlightError::Eval(e)) => e,
        other => panic!("expected eval error, got {:?}", other),
    }
}

fn num(n: f64) -> Term {
    Term::Num(n)
}

#[test]
fn test_arithmetic_nested_calls() {
    assert_eq!(eval("(+ (- 20 10) (* 4 (+ 3 2)))"), num(30.0));
}

#[test]
fn test_argument_evaluation_is_left_to_right() {
    let value = eval(
        "(def order (list))
         (defun (note x) (begin (set! order (cons x order)) x))
         (+ (note 1) (note 2) (note 3))
         (list/reverse order)",
    );
    assert_eq!(value, Term::list(vec![num(1.0), num(2.0), num(3.0)]));
}

#[test]
fn test_closure_over_maker() {
    assert_eq!(
        eval("(def mk (lambda (x) (lambda (y) (+ x y)))) ((mk 10) 20)"),
        num(30.0)
    );
}

#[test]
fn test_currying_across_defs() {
    assert_eq!(
        eval(
            "(def add (lambda (x y) (+ x y)))
             (def add10 (lambda (y) (add 10 y)))
             (add10 20)"
        ),
        num(30.0)
    );
}

#[test]
fn test_closures_observe_later_definitions() {
    // The lambda captures the scope itself, not a copy of it
    assert_eq!(
        eval("(defun (probe) later) (def later 42) (probe)"),
        num(42.0)
    );
}

#[test]
fn test_lexical_not_dynamic_scope() {
    assert_eq!(
        eval(
            "(def x 1)
             (defun (reads-x) x)
             (defun (shadows) (let ((x 99)) (reads-x)))
             (shadows)"
        ),
        num(1.0)
    );
}

#[test]
fn test_deep_recursion_does_not_overflow() {
    // 50k frames of non-tail recursion: the machine queue absorbs it
    assert_eq!(
        eval(
            "(defun (count n) (if (= n 0) 0 (+ 1 (count (- n 1)))))
             (count 50000)"
        ),
        num(50000.0)
    );
}

#[test]
fn test_quote_yields_the_term_itself() {
    assert_eq!(
        eval("(quote (1 two \"three\"))"),
        Term::list(vec![
            num(1.0),
            Term::Sym("two".into()),
            Term::Str("three".into()),
        ])
    );
    assert_eq!(eval("'x"), Term::Sym("x".into()));
}

#[test]
fn test_eval_of_quote_matches_direct_evaluation() {
    assert_eq!(eval("(eval (quote (+ 1 2)))"), eval("(+ 1 2)"));
    assert_eq!(eval("(eval (quote (list 1 2)))"), eval("(list 1 2)"));
}

#[test]
fn test_if_branches_and_truthiness() {
    assert_eq!(eval("(if true 1 2)"), num(1.0));
    assert_eq!(eval("(if false 1 2)"), num(2.0));
    assert_eq!(eval("(if () 1 2)"), num(2.0));
    assert_eq!(eval("(if 0 1 2)"), num(2.0));
    assert_eq!(eval("(if \"\" 1 2)"), num(2.0));
    assert_eq!(eval("(if 7 1 2)"), num(1.0));
    // No else branch
    assert_eq!(eval("(if false 1)"), Term::Nil);
}

#[test]
fn test_untaken_branch_is_not_evaluated() {
    assert_eq!(eval("(if true 1 (throw \"untaken\"))"), num(1.0));
    assert_eq!(eval("(if false (throw \"untaken\") 2)"), num(2.0));
}

#[test]
fn test_short_circuit_forms_return_operand_values() {
    assert_eq!(eval("(|| () 5)"), num(5.0));
    assert_eq!(eval("(|| 3 (throw \"untaken\"))"), num(3.0));
    assert_eq!(eval("(&& () (throw \"untaken\"))"), Term::Nil);
    assert_eq!(eval("(&& 3 5)"), num(5.0));
}

#[test]
fn test_short_circuit_evaluates_lhs_once() {
    assert_eq!(
        eval(
            "(def hits 0)
             (defun (bump) (begin (set! hits (+ hits 1)) hits))
             (|| (bump) 99)
             hits"
        ),
        num(1.0)
    );
}

#[test]
fn test_begin_sequences_and_yields_last() {
    assert_eq!(eval("(begin 1 2 3)"), num(3.0));
    assert_eq!(eval("(begin)"), Term::Nil);
    assert_eq!(eval("(begin (def x 1) (set! x 9) x)"), num(9.0));
}

#[test]
fn test_cond_picks_first_truthy_clause() {
    assert_eq!(
        eval("(cond ((= 1 2) 10) ((= 1 1) 20) (true 30))"),
        num(20.0)
    );
    assert_eq!(eval("(cond ((= 1 2) 10))"), Term::Nil);
}

#[test]
fn test_let_binds_and_shadows() {
    assert_eq!(eval("(let ((x 10) (y 20)) (+ x y))"), num(30.0));
    assert_eq!(eval("(def x 1) (let ((x 5)) x)"), num(5.0));
    assert_eq!(eval("(def y 1) (let ((y 5)) y) y"), num(1.0));
}

#[test]
fn test_set_walks_to_defining_scope() {
    assert_eq!(
        eval(
            "(def counter 0)
             (defun (tick) (set! counter (+ counter 1)))
             (tick) (tick) (tick)
             counter"
        ),
        num(3.0)
    );
}

#[test]
fn test_set_of_unbound_symbol_throws() {
    let err = eval_err("(set! ghost 1)");
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn test_undefined_symbol_throws() {
    let err = eval_err("nowhere");
    assert!(err.to_string().contains("undefined symbol"));
}

#[test]
fn test_arity_mismatch_throws() {
    let err = eval_err("((lambda (x) x) 1 2)");
    assert!(matches!(err, EvalError::Thrown { .. }));
    assert!(err.to_string().contains("argument"));
}

#[test]
fn test_type_error_on_bad_operands() {
    let err = eval_err("(+ 1 \"two\")");
    assert!(err.to_string().contains("expected num"));
}

#[test]
fn test_catch_binds_exception_and_message() {
    assert_eq!(
        eval("(try (throw \"oops\") (catch e e.message))"),
        Term::Str("oops".into())
    );
    assert_eq!(eval("(try 42 (catch e 0))"), num(42.0));
}

#[test]
fn test_thrown_value_becomes_payload() {
    assert_eq!(
        eval("(try (throw (list 1 2)) (catch e e.payload))"),
        Term::list(vec![num(1.0), num(2.0)])
    );
    assert_eq!(
        eval("(try (throw \"msg\") (catch e (exception/message e)))"),
        Term::Str("msg".into())
    );
}

#[test]
fn test_unwinding_discards_partial_work() {
    // The throw happens mid-argument-evaluation; the pending + never runs
    assert_eq!(
        eval("(try (+ 1 (throw \"stop\") 2) (catch e 99))"),
        num(99.0)
    );
}

#[test]
fn test_nested_catch_rethrow() {
    assert_eq!(
        eval(
            "(try
               (try (throw \"inner\") (catch e (throw \"outer\")))
               (catch e e.message))"
        ),
        Term::Str("outer".into())
    );
}

#[test]
fn test_builtin_errors_are_catchable() {
    assert_eq!(eval("(try (+ 1 \"x\") (catch e :caught))"), Term::Key("caught".into()));
    assert_eq!(eval("(try (first ()) (catch e :caught))"), Term::Key("caught".into()));
}

#[test]
fn test_table_laws_from_source() {
    assert_eq!(
        eval("(fetch (store (table) :k 5) :k)"),
        num(5.0)
    );
    assert_eq!(
        eval("(exists (store (table) :k 5) :k)"),
        Term::Bool(true)
    );
    assert_eq!(
        eval("(exists (delete (store (table) :k 5) :k) :k)"),
        Term::Bool(false)
    );
}

#[test]
fn test_list_laws_from_source() {
    assert_eq!(eval("(first (cons 9 (list 1 2)))"), num(9.0));
    assert_eq!(
        eval("(rest (cons 9 (list 1 2)))"),
        Term::list(vec![num(1.0), num(2.0)])
    );
    assert_eq!(eval("(rest (cons 9 ()))"), Term::Nil);
}

#[test]
fn test_keywords_self_evaluate() {
    assert_eq!(eval(":name"), Term::Key("name".into()));
}

#[test]
fn test_exceptions_are_first_class() {
    assert_eq!(
        eval("(exception/message (exception \"bad\" 7))"),
        Term::Str("bad".into())
    );
    assert_eq!(eval("(exception? (exception \"bad\"))"), Term::Bool(true));
    // Catching hands back the exception itself as a value
    assert_eq!(
        eval("(exception? (try (throw \"x\") (catch e e)))"),
        Term::Bool(true)
    );
}

#[test]
fn test_environment_introspection() {
    assert_eq!(eval("(let ((a 1)) (env/keys))"), Term::list(vec![Term::Str("a".into())]));
    assert_eq!(eval("(env/exists? (quote +))"), Term::Bool(true));
    assert_eq!(eval("(env/exists? (quote missing!))"), Term::Bool(false));
}

#[test]
fn test_prelude_list_helpers() {
    assert_eq!(
        eval("(list/filter (lambda (x) (> x 1)) (list 1 2 3))"),
        Term::list(vec![num(2.0), num(3.0)])
    );
    assert_eq!(
        eval("(list/reduce (lambda (acc x) (+ acc x)) 0 (list/range 1 101))"),
        num(5050.0)
    );
    assert_eq!(eval("(list/sum (list 1 2 3))"), num(6.0));
}

#[test]
fn test_json_round_trip() {
    assert_eq!(
        eval("(fetch (json/decode \"{\\\"a\\\": [1, 2]}\") :a)"),
        Term::list(vec![num(1.0), num(2.0)])
    );
    assert_eq!(
        eval("(json/decode (json/encode (list 1 true ())))"),
        Term::list(vec![num(1.0), Term::Bool(true), Term::Nil])
    );
}
