// ABOUTME: End-to-end tests: file loading, include resolution, mixed programs

use pretty_assertions::assert_eq;
use slight::config::RuntimeConfig;
use slight::error::SlightError;
use slight::runtime::Runtime;
use slight::term::Term;
use std::fs;
use std::path::Path;

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default()).expect("runtime")
}

fn runtime_with_includes(dirs: Vec<std::path::PathBuf>) -> Runtime {
    Runtime::new(RuntimeConfig {
        include_paths: dirs,
        ..RuntimeConfig::default()
    })
    .expect("runtime")
}

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn num(n: f64) -> Term {
    Term::Num(n)
}

#[test]
fn test_run_file_evaluates_top_to_bottom() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = write(
        dir.path(),
        "main.sl",
        "(def a 1)\n(def b 2)\n(+ a b)\n",
    );
    assert_eq!(runtime().run_file(&script).expect("run"), num(3.0));
}

#[test]
fn test_include_by_absolute_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let lib = write(dir.path(), "lib.sl", "(def shared 10)\n(* shared 2)\n");
    let program = format!("(def x (include \"{}\")) (list x shared)", lib.display());
    assert_eq!(
        runtime().eval_source(&program).expect("eval"),
        Term::list(vec![num(20.0), num(10.0)])
    );
}

#[test]
fn test_include_searches_configured_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "util.sl", "(defun (triple n) (* 3 n))\n");
    let mut rt = runtime_with_includes(vec![dir.path().to_path_buf()]);
    assert_eq!(
        rt.eval_source("(include \"util.sl\") (triple 7)").expect("eval"),
        num(21.0)
    );
}

#[test]
fn test_include_resolves_relative_to_including_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "helper.sl", "(def helped 5)\n");
    let main = write(
        dir.path(),
        "main.sl",
        "(include \"helper.sl\")\n(+ helped 1)\n",
    );
    assert_eq!(runtime().run_file(&main).expect("run"), num(6.0));
}

#[test]
fn test_nested_includes() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "inner.sl", "(def deepest 1)\n");
    write(
        dir.path(),
        "outer.sl",
        "(include \"inner.sl\")\n(def outer (+ deepest 1))\n",
    );
    let main = write(
        dir.path(),
        "main.sl",
        "(include \"outer.sl\")\n(list deepest outer)\n",
    );
    assert_eq!(
        runtime().run_file(&main).expect("run"),
        Term::list(vec![num(1.0), num(2.0)])
    );
}

#[test]
fn test_circular_include_throws() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "a.sl", "(include \"b.sl\")\n");
    write(dir.path(), "b.sl", "(include \"a.sl\")\n");
    let main = write(dir.path(), "main.sl", "(include \"a.sl\")\n");
    match runtime().run_file(&main) {
        Err(SlightError::Eval(e)) => assert!(e.to_string().contains("circular")),
        other => panic!("expected circular include error, got {:?}", other),
    }
}

#[test]
fn test_include_errors_are_catchable() {
    assert_eq!(
        runtime()
            .eval_source("(try (include \"no-such-file.sl\") (catch e :missing))")
            .expect("eval"),
        Term::Key("missing".into())
    );
}

#[test]
fn test_same_file_may_load_twice_sequentially() {
    let dir = tempfile::tempdir().expect("tempdir");
    let lib = write(dir.path(), "lib.sl", "(def marker 1)\n");
    let program = format!(
        "(include \"{lib}\") (include \"{lib}\") marker",
        lib = lib.display()
    );
    assert_eq!(runtime().eval_source(&program).expect("eval"), num(1.0));
}

#[test]
fn test_included_macros_are_usable() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "macros.sl",
        "(defmacro thrice (x) (list (quote *) 3 x))\n",
    );
    let main = write(
        dir.path(),
        "main.sl",
        "(include \"macros.sl\")\n(thrice 4)\n",
    );
    assert_eq!(runtime().run_file(&main).expect("run"), num(12.0));
}

#[test]
fn test_uncaught_exception_in_file_fails_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let main = write(dir.path(), "main.sl", "(def ok 1)\n(throw \"bad file\")\n");
    match runtime().run_file(&main) {
        Err(SlightError::Eval(e)) => assert_eq!(e.to_string(), "bad file"),
        other => panic!("expected eval error, got {:?}", other),
    }
}

#[test]
fn test_parse_error_reports_as_syntax_failure() {
    match runtime().eval_source("(def x") {
        Err(SlightError::Parse(_)) => {}
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_fibonacci_program() {
    assert_eq!(
        runtime()
            .eval_source(
                "(defun (fib n)
                   (if (< n 2)
                       n
                       (+ (fib (- n 1)) (fib (- n 2)))))
                 (fib 15)"
            )
            .expect("eval"),
        num(610.0)
    );
}

#[test]
fn test_worker_pool_round_trip() {
    // Three workers each square one number and report back; the parent
    // collects all three answers in sender-independent order
    let value = runtime()
        .eval_source(
            "(defun (worker parent n) (send parent (* n n)))
             (def me (self))
             (spawn worker me 2)
             (spawn worker me 3)
             (spawn worker me 4)
             (list/sort (list (head (tail (recv 1000)))
                              (head (tail (recv 1000)))
                              (head (tail (recv 1000)))))",
        )
        .expect("eval");
    assert_eq!(value, Term::list(vec![num(4.0), num(9.0), num(16.0)]));
}

#[test]
fn test_stateful_counter_program() {
    let value = runtime()
        .eval_source(
            "(def counter 0)
             (defun (bump!) (set! counter (+ counter 1)))
             (list/map (lambda (i) (bump!)) (list/range 0 5))
             (counter-report)
             counter",
        );
    // counter-report is undefined: the error mentions the symbol
    match value {
        Err(SlightError::Eval(e)) => assert!(e.to_string().contains("counter-report")),
        other => panic!("expected undefined symbol error, got {:?}", other),
    }
}

#[test]
fn test_table_program_with_iteration() {
    let value = runtime()
        .eval_source(
            "(def scores (table :ada 3 :ben 5))
             (store scores :cy 7)
             (list/map (lambda (k) (fetch scores k)) (table/keys scores))",
        )
        .expect("eval");
    assert_eq!(value, Term::list(vec![num(3.0), num(5.0), num(7.0)]));
}
