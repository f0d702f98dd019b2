// ABOUTME: Actor runtime tests: spawn, mailboxes, ordering, timeouts, kill

use pretty_assertions::assert_eq;
use slight::config::RuntimeConfig;
use slight::error::SlightError;
use slight::runtime::Runtime;
use slight::term::Term;

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default()).expect("runtime")
}

fn eval(source: &str) -> Term {
    runtime().eval_source(source).expect("eval")
}

fn num(n: f64) -> Term {
    Term::Num(n)
}

#[test]
fn test_self_is_pid_zero_at_top_level() {
    assert_eq!(eval("(self)"), num(0.0));
}

#[test]
fn test_spawn_returns_fresh_pids() {
    assert_eq!(eval("(spawn \"1\")"), num(1.0));
    assert_eq!(eval("(spawn \"1\") (spawn \"2\")"), num(2.0));
}

#[test]
fn test_actor_echo_round_trip() {
    // The child answers the sender with the received payload
    let value = eval(
        "(def child (spawn \"(let ((m (recv))) (send (head m) (head (tail m))))\"))
         (send child 42)
         (recv 1000)",
    );
    assert_eq!(value, Term::list(vec![num(1.0), num(42.0)]));
}

#[test]
fn test_spawn_named_function_with_serialized_args() {
    // Serialized arguments are evaluated by the child, so the parent pid
    // travels as a binding captured in the snapshot
    let value = eval(
        "(defun (echo-twice parent x) (send parent (* x 2)))
         (def me (self))
         (spawn echo-twice me 21)
         (recv 1000)",
    );
    assert_eq!(value, Term::list(vec![num(1.0), num(42.0)]));
}

#[test]
fn test_spawn_anonymous_lambda_fails_clearly() {
    let value = eval("(try (spawn (lambda () 1)) (catch e e.message))");
    match value {
        Term::Str(message) => assert!(message.contains("spawn")),
        other => panic!("expected message string, got {}", other),
    }
}

#[test]
fn test_message_order_is_fifo_per_sender() {
    let value = eval(
        "(spawn \"(send 0 1) (send 0 2) (send 0 3)\")
         (list (head (tail (recv 1000)))
               (head (tail (recv 1000)))
               (head (tail (recv 1000))))",
    );
    assert_eq!(value, Term::list(vec![num(1.0), num(2.0), num(3.0)]));
}

#[test]
fn test_recv_zero_on_empty_mailbox_is_nil() {
    let started = std::time::Instant::now();
    assert_eq!(eval("(recv 0)"), Term::Nil);
    assert!(started.elapsed() < std::time::Duration::from_millis(500));
}

#[test]
fn test_recv_timeout_expires_to_nil() {
    let started = std::time::Instant::now();
    assert_eq!(eval("(recv 30)"), Term::Nil);
    let elapsed = started.elapsed();
    assert!(elapsed >= std::time::Duration::from_millis(25));
    assert!(elapsed < std::time::Duration::from_secs(5));
}

#[test]
fn test_blocking_recv_wakes_on_send() {
    // The child blocks with no timeout; the parent's send wakes it and the
    // child acknowledges back
    let value = eval(
        "(def child (spawn \"(let ((m (recv))) (send (head m) :ack))\"))
         (send child :ping)
         (recv 1000)",
    );
    assert_eq!(value, Term::list(vec![num(1.0), Term::Key("ack".into())]));
}

#[test]
fn test_send_to_missing_process_throws() {
    let value = eval("(try (send 99 1) (catch e e.message))");
    match value {
        Term::Str(message) => assert!(message.contains("no such process")),
        other => panic!("expected message string, got {}", other),
    }
}

#[test]
fn test_is_alive_and_kill() {
    let value = eval(
        "(def child (spawn \"(recv)\"))
         (recv 20)
         (list (is-alive? child) (kill child) (is-alive? child) (kill child))",
    );
    assert_eq!(
        value,
        Term::list(vec![
            Term::Bool(true),
            Term::Bool(true),
            Term::Bool(false),
            Term::Bool(false),
        ])
    );
}

#[test]
fn test_send_to_killed_process_throws() {
    let value = eval(
        "(def child (spawn \"(recv)\"))
         (kill child)
         (try (send child 1) (catch e :dead))",
    );
    assert_eq!(value, Term::Key("dead".into()));
}

#[test]
fn test_processes_lists_live_pids() {
    assert_eq!(eval("(processes)"), Term::list(vec![num(0.0)]));
    let value = eval(
        "(def child (spawn \"(recv)\"))
         (recv 20)
         (processes)",
    );
    assert_eq!(value, Term::list(vec![num(0.0), num(1.0)]));
}

#[test]
fn test_child_environment_is_a_snapshot() {
    // The child mutates its own copy of x; the parent never sees it
    let value = eval(
        "(def x 1)
         (spawn \"(set! x 99) (send 0 x)\")
         (def reply (recv 1000))
         (list x (head (tail reply)))",
    );
    assert_eq!(value, Term::list(vec![num(1.0), num(99.0)]));
}

#[test]
fn test_parent_changes_after_spawn_are_invisible() {
    let value = eval(
        "(def x 1)
         (def child (spawn \"(recv) (send 0 x)\"))
         (set! x 50)
         (send child :go)
         (recv 1000)",
    );
    assert_eq!(value, Term::list(vec![num(1.0), num(1.0)]));
}

#[test]
fn test_tables_are_copied_at_the_boundary() {
    // The parent mutates the table after sending; the child's copy is fixed
    let value = eval(
        "(def child (spawn \"(let ((m (recv))) (send 0 (fetch (head (tail m)) :k)))\"))
         (def t (store (table) :k 1))
         (send child t)
         (store t :k 2)
         (recv 1000)",
    );
    assert_eq!(value, Term::list(vec![num(1.0), num(1.0)]));
}

#[test]
fn test_child_exceptions_do_not_crash_the_parent() {
    let value = eval(
        "(spawn \"(throw (quote boom))\")
         (recv 30)
         (+ 1 1)",
    );
    assert_eq!(value, num(2.0));
}

#[test]
fn test_deadlock_is_reported() {
    let result = runtime().eval_source("(recv)");
    match result {
        Err(SlightError::Eval(e)) => assert!(e.to_string().contains("deadlock")),
        other => panic!("expected deadlock error, got {:?}", other),
    }
}

#[test]
fn test_ping_pong_conversation() {
    let value = eval(
        "(def child (spawn \"(let ((a (recv)))
                              (send (head a) (+ (head (tail a)) 1))
                              (let ((b (recv)))
                                (send (head b) (+ (head (tail b)) 1))))\"))
         (send child 1)
         (def first-reply (recv 1000))
         (send child 10)
         (def second-reply (recv 1000))
         (list (head (tail first-reply)) (head (tail second-reply)))",
    );
    assert_eq!(value, Term::list(vec![num(2.0), num(11.0)]));
}
