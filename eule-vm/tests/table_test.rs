// eule-vm - Table, prototype and array tests
// Copyright (c) 2026 The eule authors. MIT licensed.

mod common;
use common::*;

#[test]
fn table_literals_and_member_access() {
    assert_eq!(run_ok("var t = { .a = 1, .b = 2 }; print(t.a + t.b)"), "3\n");
    assert_eq!(run_ok("var t = {}; t.c = 7; print(t.c)"), "7\n");
    assert_eq!(run_ok("var t = {}; print(t.missing)"), "void\n");
    assert_eq!(run_ok("var t = { .a = 1 }; t.a = 2; print(t.a)"), "2\n");
}

#[test]
fn computed_and_positional_keys() {
    assert_eq!(run_ok(r#"var t = { [1+1] = "two" }; print(t[2])"#), "two\n");
    assert_eq!(run_ok(r#"var t = { "x", "y" }; print(t[0], t[1])"#), "x y\n");
    // Number and string keys coerce to the same entry.
    assert_eq!(run_ok(r#"var t = {}; t[1] = "one"; print(t["1"])"#), "one\n");
    assert_eq!(run_ok(r#"var t = {}; t[0.5] = "half"; print(t["0.5"])"#), "half\n");
}

#[test]
fn shorthand_member_copies_variable() {
    assert_eq!(run_ok("var x = 5; var t = { .x }; print(t.x)"), "5\n");
}

#[test]
fn method_members_in_literals() {
    assert_eq!(
        run_ok("var t = { .twice (n) => n * 2 }; print(t.twice(4))"),
        "8\n"
    );
}

#[test]
fn table_spread_copies_pairs() {
    assert_eq!(
        run_ok("var a = { .p = 1 }; var b = { a..., .q = 2 }; print(b.p + b.q)"),
        "3\n"
    );
    // Spreading void contributes nothing.
    assert_eq!(run_ok("var b = { void..., .q = 2 }; print(b.q)"), "2\n");
}

#[test]
fn store_key_evaluates_to_the_value() {
    assert_eq!(run_ok("var t = {}; print(t.a = 41 + 1)"), "42\n");
}

#[test]
fn prototype_chain_lookup() {
    assert_eq!(
        run_ok("var t = { .a = 1 }; var u = { .b = 2 }; setPrototype(u, t); print(u.a + u.b)"),
        "3\n"
    );
    // Stores stay shallow; the prototype is only consulted on a miss.
    let source = r#"
var base = { .kind = "base" }
var child = {}
setPrototype(child, base)
child.kind = "child"
print(child.kind, base.kind)
"#;
    assert_eq!(run_ok(source), "child base\n");
}

#[test]
fn prototype_accessors() {
    assert_eq!(
        run_ok("var p = {}; var t = {}; setPrototype(t, p); print(getPrototype(t) == p)"),
        "true\n"
    );
    assert_eq!(run_ok("print(getPrototype({}))"), "void\n");
    assert_eq!(
        run_ok("var t = []; setPrototype(t, void); print(getPrototype(t))"),
        "void\n"
    );
}

#[test]
fn cyclic_prototypes_do_not_hang() {
    let source = r#"
var a = {}
var b = {}
setPrototype(a, b)
setPrototype(b, a)
print(a.missing)
"#;
    assert_eq!(run_ok(source), "void\n");
}

#[test]
fn array_literals_have_length_and_elements() {
    assert_eq!(run_ok("var a = [1, 2, 3]; print(a.length, a[0], a[2])"), "3 1 3\n");
    assert_eq!(run_ok("print([].length)"), "0\n");
    assert_eq!(run_ok("var a = [7,]; print(a.length, a[0])"), "1 7\n");
}

#[test]
fn array_literals_share_the_array_prototype() {
    assert_eq!(run_ok("print(getPrototype([]) == getPrototype([1]))"), "true\n");
    assert_eq!(run_ok("print(getPrototype([]) == __array)"), "true\n");
}

#[test]
fn array_spread_appends_elements() {
    assert_eq!(
        run_ok("var a = [1, 2, 3]; var b = [0, a...]; print(b.length, b[0], b[3])"),
        "4 0 3\n"
    );
    assert_eq!(run_ok("var b = [void..., 5]; print(b.length, b[0])"), "1 5\n");
}

#[test]
fn array_push_and_pop() {
    let source = r#"
var a = []
a->push(1)
a->push(2)
print(a.length, a[1])
print(a->pop())
print(a.length)
print([]->pop())
"#;
    assert_eq!(lines(source), vec!["2 2", "2", "1", "void"]);
}

#[test]
fn array_queries() {
    assert_eq!(run_ok("print([]->isEmpty(), [1]->isEmpty())"), "true false\n");
    assert_eq!(run_ok("print([4,5,6]->first(), [4,5,6]->last())"), "4 6\n");
    assert_eq!(run_ok("print([4,5,6]->contains(5), [4,5,6]->contains(9))"), "true false\n");
    assert_eq!(run_ok("print([4,5,6]->indexOf(6), [4,5,6]->indexOf(9))"), "2 -1\n");
}

#[test]
fn array_transformations() {
    assert_eq!(
        run_ok("var d = [1,2,3]->map((n) => n * 2); print(d[0], d[1], d[2])"),
        "2 4 6\n"
    );
    assert_eq!(
        run_ok("var d = [1,2,3,4]->filter((n) => n % 2 == 0); print(d.length, d[0], d[1])"),
        "2 2 4\n"
    );
    assert_eq!(
        run_ok("var d = [1,2,3]->reverse(); print(d[0], d[1], d[2])"),
        "3 2 1\n"
    );
    assert_eq!(
        run_ok("var d = [1,2,3,4]->slice(1, 2); print(d.length, d[0], d[1])"),
        "2 2 3\n"
    );
    assert_eq!(run_ok(r#"print(["a","b","c"]->join("-"))"#), "a-b-c\n");
    assert_eq!(run_ok("var sum = 0; [1,2,3]->each((n) => sum += n); print(sum)"), "6\n");
}

#[test]
fn foreach_over_array_iterator() {
    assert_eq!(
        run_ok("var sum = 0; foreach (v in [5,6,7]->iterate()) sum = sum + v; print(sum)"),
        "18\n"
    );
}

#[test]
fn foreach_over_range() {
    assert_eq!(lines("foreach (i in range(4)) print(i)"), vec!["0", "1", "2", "3"]);
    assert_eq!(run_ok("foreach (i in range(0)) print(i); print(\"done\")"), "done\n");
}

#[test]
fn foreach_supports_break_and_continue() {
    let source = r#"
foreach (i in range(10)) {
  if (i == 3) break
  if (i == 1) continue
  print(i)
}
"#;
    assert_eq!(lines(source), vec!["0", "2"]);
}

#[test]
fn tables_print_opaquely() {
    assert_eq!(run_ok("print({}, [])"), "<table> <table>\n");
}

#[test]
fn garbage_cycles_are_collected() {
    let source = r#"
for (var i = 0; i < 1000; i++) {
  var a = {}
  var b = {}
  a.other = b
  b.other = a
}
print("ok")
"#;
    let (mut vm, buf) = capture_vm();
    vm.interpret(source).expect("script");
    assert_eq!(buf.contents(), "ok\n");
    // 2000 cyclic tables were allocated; reachability keeps only the
    // prelude and a bounded tail of garbage awaiting the next sweep.
    assert!(
        vm.heap().live_objects() < 1024,
        "heap grew unbounded: {} live objects",
        vm.heap().live_objects()
    );
}
