// eule-vm - Variadic call and spread tests
// Copyright (c) 2026 The eule authors. MIT licensed.

mod common;
use common::*;

#[test]
fn excess_arguments_pack_into_the_rest_table() {
    assert_eq!(
        run_ok("func f(a, b...) { print(b.length) }; f(1,2,3,4)"),
        "3\n"
    );
    assert_eq!(
        run_ok("func f(a, b...) { print(b[0], b[1], b[2]) }; f(1,2,3,4)"),
        "2 3 4\n"
    );
}

#[test]
fn exact_arity_yields_an_empty_rest_table() {
    assert_eq!(
        run_ok("func f(a, b...) { print(b.length) }; f(1)"),
        "0\n"
    );
    assert_eq!(
        run_ok("func f(rest...) { print(rest.length) }; f()"),
        "0\n"
    );
}

#[test]
fn rest_table_has_array_shape() {
    assert_eq!(
        run_ok("func f(all...) { print(all.length) }; f(1, 2, 3)"),
        "3\n"
    );
    // The rest table has no prototype, but its shape matches arrays.
    assert_eq!(
        run_ok("func f(all...) { print(all[0] + all[1]) }; f(20, 22)"),
        "42\n"
    );
}

#[test]
fn missing_fixed_arguments_become_void() {
    assert_eq!(
        run_ok("func f(a, b, rest...) { print(a, b, rest.length) }; f(1)"),
        "1 void 0\n"
    );
}

#[test]
fn spread_call_expands_an_array() {
    assert_eq!(
        run_ok("func add3(a, b, c) { return a + b + c }; var args = [1, 2, 3]; print(add3(args...))"),
        "6\n"
    );
    assert_eq!(
        run_ok("func add3(a, b, c) { return a + b + c }; var args = [2, 3]; print(add3(1, args...))"),
        "6\n"
    );
}

#[test]
fn spread_of_void_adds_nothing() {
    assert_eq!(
        run_ok("func f(a, b) { print(a, b) }; f(1, void...)"),
        "1 void\n"
    );
}

#[test]
fn spread_into_a_variadic_callee_round_trips() {
    let source = r#"
func collect(items...) { return items }
var a = collect(1, 2, 3)
var b = collect(a...)
print(b.length, b[0], b[2])
"#;
    assert_eq!(run_ok(source), "3 1 3\n");
}

#[test]
fn spread_reaches_natives() {
    assert_eq!(run_ok("var args = [1, 2, 3]; print(args...)"), "1 2 3\n");
}

#[test]
fn arrow_calls_compose_with_spread() {
    let source = r#"
var t = {
  .count (self, rest...) { return rest.length },
}
var args = [7, 8]
print(t->count(args...))
"#;
    assert_eq!(run_ok(source), "2\n");
}
