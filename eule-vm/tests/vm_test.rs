// eule-vm - Expression and control-flow tests
// Copyright (c) 2026 The eule authors. MIT licensed.

mod common;
use common::*;

#[test]
fn arithmetic_precedence() {
    assert_eq!(run_ok("print(1+2*3)"), "7\n");
    assert_eq!(run_ok("print((1+2)*3)"), "9\n");
    assert_eq!(run_ok("print(10 - 2 - 3)"), "5\n");
    assert_eq!(run_ok("print(7 / 2)"), "3.5\n");
    assert_eq!(run_ok("print(10 % 3)"), "1\n");
    assert_eq!(run_ok("print(-7 % 3)"), "-1\n");
}

#[test]
fn unary_operators() {
    assert_eq!(run_ok("print(-5)"), "-5\n");
    // Unary plus is absolute value.
    assert_eq!(run_ok("print(+(0 - 5))"), "5\n");
    assert_eq!(run_ok("print(!true, !void, not 1)"), "false true false\n");
    assert_eq!(run_ok("print(typeof 1)"), "number\n");
    assert_eq!(
        run_ok(r#"print(typeof void, typeof true, typeof "s", typeof {}, typeof print)"#),
        "void boolean string table function\n"
    );
}

#[test]
fn non_finite_numbers() {
    assert_eq!(run_ok("print(1/0, 0 - 1/0, 0/0)"), "inf -inf nan\n");
}

#[test]
fn comparisons() {
    assert_eq!(run_ok("print(1 < 2, 2 <= 2, 3 > 2, 2 >= 3)"), "true true true false\n");
    // NaN compares false from both sides, including strict greater.
    assert_eq!(run_ok("print(0/0 < 1, 0/0 > 1, 0/0 == 0/0)"), "false false false\n");
    assert_eq!(run_ok(r#"print(1 == 1, "a" == "a", "a" != "b")"#), "true true true\n");
    assert_eq!(run_ok("print(void == false, {} == {})"), "false false\n");
    assert_eq!(run_ok("var t = {}; var u = t; print(t == u)"), "true\n");
}

#[test]
fn string_concatenation() {
    assert_eq!(run_ok(r#"print("foo" + "bar")"#), "foobar\n");
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(run_ok("print(false || 2)"), "2\n");
    assert_eq!(run_ok("print(1 || unreachable())"), "1\n");
    assert_eq!(run_ok("print(void && unreachable())"), "void\n");
    assert_eq!(run_ok("print(1 and 2, false or 3)"), "2 3\n");
}

#[test]
fn ternary_both_spellings() {
    assert_eq!(run_ok("print(1 ? 2 : 3)"), "2\n");
    assert_eq!(run_ok("print(false then 4 else 5)"), "5\n");
}

#[test]
fn comma_expression_keeps_last() {
    assert_eq!(run_ok("print((1, 2, 3))"), "3\n");
}

#[test]
fn global_variables() {
    assert_eq!(run_ok("var x = 1; var y = 2; print(x + y)"), "3\n");
    assert_eq!(run_ok("var x; print(x)"), "void\n");
    assert_eq!(run_ok("var a = 1, b = 2; print(a + b)"), "3\n");
    assert_eq!(run_ok("var x = 1; x = x + 1; print(x)"), "2\n");
}

#[test]
fn local_scopes_shadow() {
    assert_eq!(
        run_ok("var x = 1; { var x = 2; print(x) } print(x)"),
        "2\n1\n"
    );
}

#[test]
fn compound_assignment() {
    assert_eq!(run_ok("var x = 10; x += 5; print(x)"), "15\n");
    assert_eq!(run_ok("var x = 10; x -= 5; print(x)"), "5\n");
    assert_eq!(run_ok("var x = 10; x *= 2; print(x)"), "20\n");
    assert_eq!(run_ok("var x = 10; x /= 4; print(x)"), "2.5\n");
    assert_eq!(run_ok("var x = 10; x %= 3; print(x)"), "1\n");
    assert_eq!(run_ok(r#"var s = "a"; s += "b"; print(s)"#), "ab\n");
    assert_eq!(run_ok("var a = void; a ||= 5; print(a)"), "5\n");
    assert_eq!(run_ok("var a = 1; a ||= 9; print(a)"), "1\n");
    assert_eq!(run_ok("var c = 1; c &&= 7; print(c)"), "7\n");
    assert_eq!(run_ok("var c = void; c &&= 7; print(c)"), "void\n");
}

#[test]
fn increment_and_decrement() {
    assert_eq!(
        run_ok("var i = 1; print(i++); print(i); print(++i); print(i)"),
        "1\n2\n3\n3\n"
    );
    assert_eq!(run_ok("var i = 5; print(i--); print(--i)"), "5\n3\n");
    assert_eq!(
        run_ok("var t = { .n = 1 }; print(t.n++); print(t.n); print(++t.n)"),
        "1\n2\n3\n"
    );
}

#[test]
fn if_and_unless() {
    assert_eq!(run_ok("if (1 < 2) print(1); else print(2)"), "1\n");
    assert_eq!(run_ok("if (1 > 2) print(1); else print(2)"), "2\n");
    assert_eq!(run_ok("unless (false) print(3)"), "3\n");
    assert_eq!(run_ok("unless (true) print(3); else print(4)"), "4\n");
}

#[test]
fn while_and_until_loops() {
    assert_eq!(
        run_ok("var i = 0; while (i < 3) i = i + 1; print(i)"),
        "3\n"
    );
    assert_eq!(
        run_ok("var i = 0; until (i == 4) i = i + 1; print(i)"),
        "4\n"
    );
}

#[test]
fn do_loops_run_at_least_once() {
    assert_eq!(run_ok("var i = 0; do i = i + 1; while (i < 3); print(i)"), "3\n");
    assert_eq!(run_ok("var i = 9; do i = i + 1; while (false); print(i)"), "10\n");
    assert_eq!(run_ok("var i = 0; do i = i + 1; until (i == 2); print(i)"), "2\n");
}

#[test]
fn for_loop_accumulates() {
    assert_eq!(
        run_ok("var x = 0; for (var i=0;i<5;i=i+1) x = x+i; print(x)"),
        "10\n"
    );
    assert_eq!(
        run_ok("var x = 0; for (var i=0;i<5;i++) x = x+i; print(x)"),
        "10\n"
    );
    // All three clauses are optional.
    assert_eq!(
        run_ok("var i = 0; for (;;) { i = i + 1; if (i == 3) break; } print(i)"),
        "3\n"
    );
}

#[test]
fn break_and_continue() {
    assert_eq!(
        run_ok("for (var i = 0; i < 10; i++) { if (i == 3) break\n print(i) }"),
        "0\n1\n2\n"
    );
    assert_eq!(
        run_ok("for (var i = 0; i < 5; i++) { if (i % 2 == 0) continue\n print(i) }"),
        "1\n3\n"
    );
}

#[test]
fn labelled_loops() {
    let source = r#"
outer: for (var i = 0; i < 3; i++) {
  for (var j = 0; j < 3; j++) {
    if (j == 1) continue outer
    print(i + j)
  }
}
"#;
    assert_eq!(lines(source), vec!["0", "1", "2"]);

    let source = r#"
outer: for (var i = 0; i < 3; i++) {
  for (var j = 0; j < 3; j++) {
    if (i == 1) break outer
    print(i * 10 + j)
  }
}
"#;
    assert_eq!(lines(source), vec!["0", "1", "2"]);
}

#[test]
fn labelled_block_break() {
    let source = r#"
thing: {
  print(1)
  break thing
  print(2)
}
print(3)
"#;
    assert_eq!(lines(source), vec!["1", "3"]);
}

#[test]
fn functions_declare_and_call() {
    assert_eq!(run_ok("func add(a, b) { return a + b }; print(add(2, 3))"), "5\n");
    assert_eq!(run_ok("var double (n) => n * 2; print(double(21))"), "42\n");
    assert_eq!(run_ok("var f = (n) => n + 1; print(f(1))"), "2\n");
    assert_eq!(run_ok("print(((a, b) => a * b)(6, 7))"), "42\n");
    // Missing arguments become void, excess is discarded.
    assert_eq!(run_ok("func f(a, b) { return b }; print(f(1))"), "void\n");
    assert_eq!(run_ok("func f(a) { return a }; print(f(1, 2, 3))"), "1\n");
}

#[test]
fn function_recursion() {
    assert_eq!(
        run_ok("func fib(n) { if (n < 2) return n\n return fib(n-1) + fib(n-2) }; print(fib(10))"),
        "55\n"
    );
    // Local function declarations can also recurse.
    assert_eq!(
        run_ok("{ func down(n) { if (n == 0) return 0\n return down(n - 1) }; print(down(5)) }"),
        "0\n"
    );
}

#[test]
fn return_without_value_yields_void() {
    assert_eq!(run_ok("func f() { return }; print(f())"), "void\n");
    assert_eq!(run_ok("func f() { }; print(f())"), "void\n");
}

#[test]
fn globals_persist_across_interpret_calls() {
    let (mut vm, buf) = capture_vm();
    vm.interpret("var counter = 41").expect("first line");
    vm.interpret("counter = counter + 1").expect("second line");
    vm.interpret("print(counter)").expect("third line");
    assert_eq!(buf.contents(), "42\n");
}

#[test]
fn vm_is_reusable_after_a_runtime_error() {
    let (mut vm, buf) = capture_vm();
    assert!(vm.interpret("nosuch()").is_err());
    vm.interpret("print(2)").expect("vm should recover");
    assert_eq!(buf.contents(), "2\n");
}

#[test]
fn stack_settles_after_each_statement() {
    let (mut vm, _buf) = capture_vm();
    vm.interpret("var i = 0; while (i < 100) { var t = { .n = i }; i = t.n + 1 }")
        .expect("script");
    // Only the script unit's own result remains.
    assert_eq!(vm.stack_depth(), 1);
}
